//! Built-in sample catalog for trying the planner without import files

use anyhow::Result;
use rusqlite::Connection;

use crate::db;
use crate::models::{FacilityData, Item, ItemCount, PROCESS_EXTRACTION, PROCESS_MINING, Recipe};

const ITEMS: &[(&str, &str)] = &[
    ("iron_ore", "Iron Ore"),
    ("copper_ore", "Copper Ore"),
    ("stone", "Stone"),
    ("crude_oil", "Crude Oil"),
    ("water", "Water"),
    ("iron_ingot", "Iron Ingot"),
    ("copper_ingot", "Copper Ingot"),
    ("magnet", "Magnet"),
    ("gear", "Gear"),
    ("magnetic_coil", "Magnetic Coil"),
    ("circuit_board", "Circuit Board"),
    ("electric_motor", "Electric Motor"),
    ("refined_oil", "Refined Oil"),
    ("hydrogen", "Hydrogen"),
    ("plastic", "Plastic"),
    ("graphite", "Energetic Graphite"),
    ("sulfuric_acid", "Sulfuric Acid"),
];

/// (id, name, process, seconds, inputs, outputs)
type RecipeRow = (
    i64,
    &'static str,
    &'static str,
    f64,
    &'static [(&'static str, f64)],
    &'static [(&'static str, f64)],
);

const RECIPES: &[RecipeRow] = &[
    (1, "Iron Ingot", "smelting", 1.0, &[("iron_ore", 1.0)], &[("iron_ingot", 1.0)]),
    (2, "Copper Ingot", "smelting", 1.0, &[("copper_ore", 1.0)], &[("copper_ingot", 1.0)]),
    (3, "Magnet", "smelting", 1.5, &[("iron_ore", 1.0)], &[("magnet", 1.0)]),
    (4, "Gear", "assembly", 1.0, &[("iron_ingot", 1.0)], &[("gear", 1.0)]),
    (
        5,
        "Magnetic Coil",
        "assembly",
        1.0,
        &[("magnet", 2.0), ("copper_ingot", 1.0)],
        &[("magnetic_coil", 2.0)],
    ),
    (
        6,
        "Circuit Board",
        "assembly",
        1.0,
        &[("iron_ingot", 2.0), ("copper_ingot", 1.0)],
        &[("circuit_board", 2.0)],
    ),
    (
        7,
        "Electric Motor",
        "assembly",
        2.0,
        &[("iron_ingot", 2.0), ("gear", 1.0), ("magnetic_coil", 1.0)],
        &[("electric_motor", 1.0)],
    ),
    (
        8,
        "Plasma Refining",
        "refining",
        4.0,
        &[("crude_oil", 2.0)],
        &[("refined_oil", 2.0), ("hydrogen", 1.0)],
    ),
    (
        9,
        "Plastic",
        "chemical",
        3.0,
        &[("refined_oil", 2.0), ("graphite", 1.0)],
        &[("plastic", 1.0)],
    ),
    (10, "Energetic Graphite", "smelting", 2.0, &[("refined_oil", 1.0), ("hydrogen", 1.0)], &[("graphite", 1.0)]),
    (
        11,
        "Sulfuric Acid",
        "chemical",
        6.0,
        &[("refined_oil", 6.0), ("stone", 8.0), ("water", 4.0)],
        &[("sulfuric_acid", 4.0)],
    ),
];

/// (id, name, process, speed)
const FACILITIES: &[(&str, &str, &str, f64)] = &[
    ("mining_machine", "Mining Machine", PROCESS_MINING, 1.0),
    ("advanced_mining_machine", "Advanced Mining Machine", PROCESS_MINING, 2.0),
    ("oil_extractor", "Oil Extractor", PROCESS_EXTRACTION, 1.0),
    ("water_pump", "Water Pump", PROCESS_EXTRACTION, 1.0),
    ("arc_smelter", "Arc Smelter", "smelting", 1.0),
    ("plane_smelter", "Plane Smelter", "smelting", 2.0),
    ("assembler_mk1", "Assembling Machine Mk.I", "assembly", 0.75),
    ("assembler_mk2", "Assembling Machine Mk.II", "assembly", 1.0),
    ("assembler_mk3", "Assembling Machine Mk.III", "assembly", 1.5),
    ("oil_refinery", "Oil Refinery", "refining", 1.0),
    ("chemical_plant", "Chemical Plant", "chemical", 1.0),
];

const DEFAULTS: &[(&str, &str)] = &[
    (PROCESS_MINING, "mining_machine"),
    (PROCESS_EXTRACTION, "oil_extractor"),
    ("smelting", "arc_smelter"),
    ("assembly", "assembler_mk2"),
    ("refining", "oil_refinery"),
    ("chemical", "chemical_plant"),
];

/// Seconds per ore for one mining facility
const MINING: &[(&str, f64)] = &[("iron_ore", 2.0), ("copper_ore", 2.0), ("stone", 1.0)];

/// Items per minute for one extraction facility
const EXTRACTION: &[(&str, f64)] = &[("crude_oil", 30.0), ("water", 50.0)];

/// Replace the catalog with the built-in sample set
pub fn load_sample_data(conn: &Connection) -> Result<()> {
    db::clear_catalog(conn)?;
    let tx = conn.unchecked_transaction()?;

    for (id, name) in ITEMS {
        db::upsert_item(
            &tx,
            &Item {
                id: id.to_string(),
                name: name.to_string(),
            },
        )?;
    }

    let slots = |list: &[(&str, f64)]| -> Vec<ItemCount> {
        list.iter().map(|(item, n)| ItemCount::new(*item, *n)).collect()
    };
    for (id, name, process, seconds, inputs, outputs) in RECIPES {
        db::upsert_recipe(
            &tx,
            &Recipe {
                id: *id,
                name: name.to_string(),
                process_type: process.to_string(),
                cycle_seconds: *seconds,
                inputs: slots(inputs),
                outputs: slots(outputs),
            },
        )?;
    }

    for (id, name, process, speed) in FACILITIES {
        db::upsert_facility(
            &tx,
            &FacilityData {
                id: id.to_string(),
                name: name.to_string(),
                process_type: process.to_string(),
                speed_multiplier: *speed,
            },
        )?;
    }
    for (process, facility) in DEFAULTS {
        db::set_default_facility(&tx, process, facility)?;
    }

    for (item, seconds) in MINING {
        db::set_mining_time(&tx, item, *seconds)?;
    }
    for (item, speed) in EXTRACTION {
        db::set_extraction_speed(&tx, item, *speed)?;
    }

    tx.commit()?;
    tracing::info!(
        target: "factory_planner::sample",
        items = ITEMS.len(),
        recipes = RECIPES.len(),
        facilities = FACILITIES.len(),
        "loaded sample catalog"
    );
    Ok(())
}
