//! Catalog import from plain-text `*.catalog` files
//!
//! Each non-blank line defines one catalog entry:
//!
//! ```text
//! item iron_ore "Iron Ore"
//! recipe 1 smelting 1 "Iron Ingot": iron_ore*1 -> iron_ingot*1
//! facility arc_smelter smelting 1 "Arc Smelter"
//! default smelting arc_smelter
//! mine iron_ore 2
//! extract crude_oil 30
//! ```
//!
//! Anything after `#` is a comment.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use regex::Regex;
use rusqlite::Connection;
use walkdir::WalkDir;

use crate::db;
use crate::models::{FacilityData, Item, ItemCount, Recipe, RecipeId};

/// One parsed catalog line
#[derive(Debug, Clone, PartialEq)]
pub enum Definition {
    Item(Item),
    Recipe(Recipe),
    Facility(FacilityData),
    Default { process_type: String, facility_id: String },
    Mine { item_id: String, mining_time: f64 },
    Extract { item_id: String, speed: f64 },
}

/// Compiled line patterns
pub struct LineParser {
    item: Regex,
    recipe: Regex,
    slot: Regex,
    facility: Regex,
    default: Regex,
    resource: Regex,
}

impl LineParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            item: Regex::new(r#"^item\s+([\w.-]+)\s+"([^"]*)"$"#)?,
            recipe: Regex::new(
                r#"^recipe\s+(-?\d+)\s+([\w.-]+)\s+([\d.]+)\s+"([^"]*)"\s*:\s*(.*?)\s*->\s*(.*)$"#,
            )?,
            slot: Regex::new(r"^([\w.-]+)\s*\*\s*([\d.]+)$")?,
            facility: Regex::new(r#"^facility\s+([\w.-]+)\s+([\w.-]+)\s+([\d.]+)\s+"([^"]*)"$"#)?,
            default: Regex::new(r"^default\s+([\w.-]+)\s+([\w.-]+)$")?,
            resource: Regex::new(r"^(mine|extract)\s+([\w.-]+)\s+([\d.]+)$")?,
        })
    }

    /// Parses one line. Blank and comment-only lines yield `Ok(None)`.
    pub fn parse(&self, line: &str) -> Result<Option<Definition>> {
        let line = match line.find('#') {
            Some(idx) => &line[..idx],
            None => line,
        }
        .trim();
        if line.is_empty() {
            return Ok(None);
        }

        if let Some(cap) = self.item.captures(line) {
            return Ok(Some(Definition::Item(Item {
                id: cap[1].to_string(),
                name: cap[2].to_string(),
            })));
        }

        if let Some(cap) = self.recipe.captures(line) {
            let id: RecipeId = cap[1].parse()?;
            let cycle_seconds = parse_positive(&cap[3], "cycle time")?;
            let inputs = self.parse_slots(&cap[5])?;
            let outputs = self.parse_slots(&cap[6])?;
            if outputs.is_empty() {
                bail!("recipe {} has no outputs", id);
            }
            return Ok(Some(Definition::Recipe(Recipe {
                id,
                name: cap[4].to_string(),
                process_type: cap[2].to_string(),
                cycle_seconds,
                inputs,
                outputs,
            })));
        }

        if let Some(cap) = self.facility.captures(line) {
            return Ok(Some(Definition::Facility(FacilityData {
                id: cap[1].to_string(),
                name: cap[4].to_string(),
                process_type: cap[2].to_string(),
                speed_multiplier: parse_positive(&cap[3], "speed multiplier")?,
            })));
        }

        if let Some(cap) = self.default.captures(line) {
            return Ok(Some(Definition::Default {
                process_type: cap[1].to_string(),
                facility_id: cap[2].to_string(),
            }));
        }

        if let Some(cap) = self.resource.captures(line) {
            let item_id = cap[2].to_string();
            return Ok(Some(if &cap[1] == "mine" {
                Definition::Mine {
                    item_id,
                    mining_time: parse_positive(&cap[3], "mining time")?,
                }
            } else {
                Definition::Extract {
                    item_id,
                    speed: parse_positive(&cap[3], "extraction speed")?,
                }
            }));
        }

        bail!("unrecognized line: {}", line)
    }

    fn parse_slots(&self, side: &str) -> Result<Vec<ItemCount>> {
        let side = side.trim();
        if side.is_empty() {
            return Ok(Vec::new());
        }
        side.split('+')
            .map(|slot| -> Result<ItemCount> {
                let slot = slot.trim();
                let cap = self
                    .slot
                    .captures(slot)
                    .with_context(|| format!("bad recipe slot '{}'", slot))?;
                Ok(ItemCount::new(&cap[1], cap[2].parse::<f64>()?))
            })
            .collect()
    }
}

fn parse_positive(text: &str, what: &str) -> Result<f64> {
    let value: f64 = text
        .parse()
        .with_context(|| format!("bad {} '{}'", what, text))?;
    if !(value.is_finite() && value > 0.0) {
        bail!("{} must be positive, got {}", what, value);
    }
    Ok(value)
}

/// Find all *.catalog files under `dir`, sorted by path
pub fn find_catalog_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        bail!("{} is not a directory", dir.display());
    }
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "catalog"))
        .collect();
    files.sort();
    Ok(files)
}

fn store(conn: &Connection, definition: &Definition, stats: &mut ExtractStats) -> Result<()> {
    match definition {
        Definition::Item(item) => {
            db::upsert_item(conn, item)?;
            stats.items += 1;
        }
        Definition::Recipe(recipe) => {
            db::upsert_recipe(conn, recipe)?;
            stats.recipes += 1;
        }
        Definition::Facility(facility) => {
            db::upsert_facility(conn, facility)?;
            stats.facilities += 1;
        }
        Definition::Default {
            process_type,
            facility_id,
        } => {
            db::set_default_facility(conn, process_type, facility_id)?;
            stats.facilities += 1;
        }
        Definition::Mine {
            item_id,
            mining_time,
        } => {
            db::set_mining_time(conn, item_id, *mining_time)?;
            stats.resources += 1;
        }
        Definition::Extract { item_id, speed } => {
            db::set_extraction_speed(conn, item_id, *speed)?;
            stats.resources += 1;
        }
    }
    Ok(())
}

/// Parse catalog text and write every definition to the database.
///
/// Bad lines are logged and counted; they do not abort the import.
pub fn import_str(
    conn: &Connection,
    parser: &LineParser,
    origin: &str,
    content: &str,
    stats: &mut ExtractStats,
) -> Result<()> {
    for (lineno, line) in content.lines().enumerate() {
        match parser.parse(line) {
            Ok(Some(definition)) => store(conn, &definition, stats)?,
            Ok(None) => stats.skipped += 1,
            Err(e) => {
                tracing::warn!(
                    target: "factory_planner::extract",
                    file = origin,
                    line = lineno + 1,
                    error = %e,
                    "skipping catalog line"
                );
                stats.errors += 1;
            }
        }
    }
    Ok(())
}

/// Import every catalog file under `dir` into the database
pub fn extract_to_database(conn: &Connection, dir: &Path) -> Result<ExtractStats> {
    let mut stats = ExtractStats::default();
    let parser = LineParser::new()?;

    tracing::info!(target: "factory_planner::extract", dir = %dir.display(), "scanning for catalog files");
    let files = find_catalog_files(dir)?;
    tracing::info!(target: "factory_planner::extract", count = files.len(), "found catalog files");

    let tx = conn.unchecked_transaction()?;
    for path in &files {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let before = stats.total();
        import_str(&tx, &parser, &path.display().to_string(), &content, &mut stats)?;
        tracing::debug!(
            target: "factory_planner::extract",
            file = %path.display(),
            definitions = stats.total() - before,
            "parsed catalog file"
        );
        stats.files += 1;
    }
    tx.commit()?;

    Ok(stats)
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ExtractStats {
    pub files: usize,
    pub items: usize,
    pub recipes: usize,
    pub facilities: usize,
    pub resources: usize,
    pub skipped: usize,
    pub errors: usize,
}

impl ExtractStats {
    fn total(&self) -> usize {
        self.items + self.recipes + self.facilities + self.resources
    }
}

impl std::fmt::Display for ExtractStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Imported {} items, {} recipes, {} facility entries, {} resources from {} files. Skipped: {}, Errors: {}",
            self.items,
            self.recipes,
            self.facilities,
            self.resources,
            self.files,
            self.skipped,
            self.errors
        )
    }
}
