//! Catalog database schema and operations

use anyhow::Result;
use rusqlite::{Connection, OptionalExtension};

use crate::catalog::Catalog;
use crate::models::{FacilityData, Item, ItemCount, Recipe, RecipeId};

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS items (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS recipes (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            process_type TEXT NOT NULL,
            cycle_seconds REAL NOT NULL,
            -- Lower priority wins when several recipes make the same item
            priority INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS recipe_inputs (
            recipe_id INTEGER NOT NULL,
            slot INTEGER NOT NULL,
            item_id TEXT NOT NULL,
            count REAL NOT NULL,
            PRIMARY KEY (recipe_id, slot)
        );

        CREATE TABLE IF NOT EXISTS recipe_outputs (
            recipe_id INTEGER NOT NULL,
            slot INTEGER NOT NULL,
            item_id TEXT NOT NULL,
            count REAL NOT NULL,
            PRIMARY KEY (recipe_id, slot)
        );

        CREATE TABLE IF NOT EXISTS facilities (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            process_type TEXT NOT NULL,
            speed_multiplier REAL NOT NULL
        );

        -- Default facility per process type
        CREATE TABLE IF NOT EXISTS process_defaults (
            process_type TEXT PRIMARY KEY,
            facility_id TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS mining (
            item_id TEXT PRIMARY KEY,
            mining_time REAL NOT NULL
        );

        CREATE TABLE IF NOT EXISTS extraction (
            item_id TEXT PRIMARY KEY,
            speed REAL NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_recipe_outputs_item ON recipe_outputs(item_id);
        "#,
    )?;
    Ok(())
}

/// Clear all catalog data (for re-import)
pub fn clear_catalog(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        DELETE FROM recipe_outputs;
        DELETE FROM recipe_inputs;
        DELETE FROM recipes;
        DELETE FROM process_defaults;
        DELETE FROM facilities;
        DELETE FROM mining;
        DELETE FROM extraction;
        DELETE FROM items;
        "#,
    )?;
    Ok(())
}

/// Insert or replace an item
pub fn upsert_item(conn: &Connection, item: &Item) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO items (id, name) VALUES (?1, ?2)",
        (&item.id, &item.name),
    )?;
    Ok(())
}

/// Insert or replace a recipe together with its input and output slots
pub fn upsert_recipe(conn: &Connection, recipe: &Recipe) -> Result<()> {
    // A re-imported recipe keeps its place among the producers of its items.
    let priority: i64 = conn.query_row(
        "SELECT COALESCE(
             (SELECT priority FROM recipes WHERE id = ?1),
             (SELECT COALESCE(MAX(priority), -1) + 1 FROM recipes)
         )",
        [recipe.id],
        |row| row.get(0),
    )?;
    conn.execute(
        "INSERT OR REPLACE INTO recipes (id, name, process_type, cycle_seconds, priority)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        (
            recipe.id,
            &recipe.name,
            &recipe.process_type,
            recipe.cycle_seconds,
            priority,
        ),
    )?;
    conn.execute("DELETE FROM recipe_inputs WHERE recipe_id = ?1", [recipe.id])?;
    conn.execute("DELETE FROM recipe_outputs WHERE recipe_id = ?1", [recipe.id])?;
    for (slot, input) in recipe.inputs.iter().enumerate() {
        conn.execute(
            "INSERT INTO recipe_inputs (recipe_id, slot, item_id, count) VALUES (?1, ?2, ?3, ?4)",
            (recipe.id, slot as i64, &input.item_id, input.count),
        )?;
    }
    for (slot, output) in recipe.outputs.iter().enumerate() {
        conn.execute(
            "INSERT INTO recipe_outputs (recipe_id, slot, item_id, count) VALUES (?1, ?2, ?3, ?4)",
            (recipe.id, slot as i64, &output.item_id, output.count),
        )?;
    }
    Ok(())
}

/// Insert or replace a facility
pub fn upsert_facility(conn: &Connection, facility: &FacilityData) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO facilities (id, name, process_type, speed_multiplier)
         VALUES (?1, ?2, ?3, ?4)",
        (
            &facility.id,
            &facility.name,
            &facility.process_type,
            facility.speed_multiplier,
        ),
    )?;
    Ok(())
}

pub fn set_default_facility(conn: &Connection, process_type: &str, facility_id: &str) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO process_defaults (process_type, facility_id) VALUES (?1, ?2)",
        (process_type, facility_id),
    )?;
    Ok(())
}

pub fn set_mining_time(conn: &Connection, item_id: &str, mining_time: f64) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO mining (item_id, mining_time) VALUES (?1, ?2)",
        (item_id, mining_time),
    )?;
    Ok(())
}

pub fn set_extraction_speed(conn: &Connection, item_id: &str, speed: f64) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO extraction (item_id, speed) VALUES (?1, ?2)",
        (item_id, speed),
    )?;
    Ok(())
}

fn get_slots(conn: &Connection, table: &str, recipe_id: RecipeId) -> Result<Vec<ItemCount>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT item_id, count FROM {} WHERE recipe_id = ?1 ORDER BY slot",
        table
    ))?;

    let rows = stmt.query_map([recipe_id], |row| {
        Ok(ItemCount {
            item_id: row.get(0)?,
            count: row.get(1)?,
        })
    })?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

/// Get a recipe with its slots
pub fn get_recipe(conn: &Connection, id: RecipeId) -> Result<Option<Recipe>> {
    let header = conn
        .query_row(
            "SELECT name, process_type, cycle_seconds FROM recipes WHERE id = ?1",
            [id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, f64>(2)?,
                ))
            },
        )
        .optional()?;

    let Some((name, process_type, cycle_seconds)) = header else {
        return Ok(None);
    };
    Ok(Some(Recipe {
        id,
        name,
        process_type,
        cycle_seconds,
        inputs: get_slots(conn, "recipe_inputs", id)?,
        outputs: get_slots(conn, "recipe_outputs", id)?,
    }))
}

pub fn get_item(conn: &Connection, id: &str) -> Result<Option<Item>> {
    let item = conn
        .query_row("SELECT id, name FROM items WHERE id = ?1", [id], |row| {
            Ok(Item {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })
        .optional()?;
    Ok(item)
}

/// Get all recipes that produce a given item, default first
pub fn get_producers(conn: &Connection, item_id: &str) -> Result<Vec<RecipeId>> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT r.id, r.priority
         FROM recipes r
         JOIN recipe_outputs ro ON r.id = ro.recipe_id
         WHERE ro.item_id = ?1
         ORDER BY r.priority, r.id",
    )?;

    let rows = stmt.query_map([item_id], |row| row.get::<_, RecipeId>(0))?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

pub fn get_mining_time(conn: &Connection, item_id: &str) -> Result<Option<f64>> {
    let time = conn
        .query_row(
            "SELECT mining_time FROM mining WHERE item_id = ?1",
            [item_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(time)
}

pub fn get_extraction_speed(conn: &Connection, item_id: &str) -> Result<Option<f64>> {
    let speed = conn
        .query_row(
            "SELECT speed FROM extraction WHERE item_id = ?1",
            [item_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(speed)
}

pub fn get_facility(conn: &Connection, id: &str) -> Result<Option<FacilityData>> {
    let facility = conn
        .query_row(
            "SELECT id, name, process_type, speed_multiplier FROM facilities WHERE id = ?1",
            [id],
            |row| {
                Ok(FacilityData {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    process_type: row.get(2)?,
                    speed_multiplier: row.get(3)?,
                })
            },
        )
        .optional()?;
    Ok(facility)
}

pub fn get_default_facility(conn: &Connection, process_type: &str) -> Result<Option<String>> {
    let id = conn
        .query_row(
            "SELECT facility_id FROM process_defaults WHERE process_type = ?1",
            [process_type],
            |row| row.get(0),
        )
        .optional()?;
    Ok(id)
}

/// List all items in the database
pub fn list_items(conn: &Connection) -> Result<Vec<Item>> {
    let mut stmt = conn.prepare("SELECT id, name FROM items ORDER BY name")?;

    let rows = stmt.query_map([], |row| {
        Ok(Item {
            id: row.get(0)?,
            name: row.get(1)?,
        })
    })?;

    let mut results = Vec::new();
    for row in rows {
        results.push(row?);
    }
    Ok(results)
}

/// List all recipes with their slots
pub fn list_recipes(conn: &Connection) -> Result<Vec<Recipe>> {
    let mut stmt = conn.prepare("SELECT id FROM recipes ORDER BY priority, id")?;
    let ids = stmt.query_map([], |row| row.get::<_, RecipeId>(0))?;

    let mut results = Vec::new();
    for id in ids {
        if let Some(recipe) = get_recipe(conn, id?)? {
            results.push(recipe);
        }
    }
    Ok(results)
}

/// Catalog view over a SQLite connection.
///
/// Query failures are logged and reported as "not found".
pub struct SqliteCatalog<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteCatalog<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    fn lookup<T>(&self, what: &str, result: Result<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(target: "factory_planner::db", lookup = what, error = %err, "catalog query failed");
                None
            }
        }
    }
}

impl Catalog for SqliteCatalog<'_> {
    fn recipe(&self, id: RecipeId) -> Option<Recipe> {
        self.lookup("recipe", get_recipe(self.conn, id)).flatten()
    }

    fn item(&self, id: &str) -> Option<Item> {
        self.lookup("item", get_item(self.conn, id)).flatten()
    }

    fn recipes_producing(&self, item_id: &str) -> Vec<RecipeId> {
        self.lookup("producers", get_producers(self.conn, item_id))
            .unwrap_or_default()
    }

    fn mining_time(&self, item_id: &str) -> Option<f64> {
        self.lookup("mining", get_mining_time(self.conn, item_id)).flatten()
    }

    fn extraction_speed(&self, item_id: &str) -> Option<f64> {
        self.lookup("extraction", get_extraction_speed(self.conn, item_id))
            .flatten()
    }

    fn facility(&self, id: &str) -> Option<FacilityData> {
        self.lookup("facility", get_facility(self.conn, id)).flatten()
    }

    fn default_facility_for(&self, process_type: &str) -> Option<String> {
        self.lookup("default facility", get_default_facility(self.conn, process_type))
            .flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        conn
    }

    fn recipe(id: RecipeId, inputs: &[(&str, f64)], outputs: &[(&str, f64)]) -> Recipe {
        Recipe {
            id,
            name: format!("recipe {}", id),
            process_type: "smelting".to_string(),
            cycle_seconds: 1.0,
            inputs: inputs.iter().map(|(i, c)| ItemCount::new(*i, *c)).collect(),
            outputs: outputs.iter().map(|(i, c)| ItemCount::new(*i, *c)).collect(),
        }
    }

    #[test]
    fn recipe_round_trips_with_slot_order() {
        let conn = conn();
        let r = recipe(5, &[("b", 2.0), ("a", 1.0)], &[("x", 1.0), ("y", 3.0)]);
        upsert_recipe(&conn, &r).unwrap();
        assert_eq!(get_recipe(&conn, 5).unwrap(), Some(r));
        assert_eq!(get_recipe(&conn, 6).unwrap(), None);
    }

    #[test]
    fn producers_follow_insertion_order() {
        let conn = conn();
        upsert_recipe(&conn, &recipe(9, &[("ore", 1.0)], &[("ingot", 1.0)])).unwrap();
        upsert_recipe(&conn, &recipe(2, &[("scrap", 1.0)], &[("ingot", 1.0)])).unwrap();
        assert_eq!(get_producers(&conn, "ingot").unwrap(), vec![9, 2]);
    }

    #[test]
    fn reimported_recipe_keeps_its_priority() {
        let conn = conn();
        upsert_recipe(&conn, &recipe(9, &[("ore", 1.0)], &[("ingot", 1.0)])).unwrap();
        upsert_recipe(&conn, &recipe(2, &[("scrap", 1.0)], &[("ingot", 1.0)])).unwrap();
        upsert_recipe(&conn, &recipe(9, &[("ore", 2.0)], &[("ingot", 1.0)])).unwrap();
        assert_eq!(get_producers(&conn, "ingot").unwrap(), vec![9, 2]);
        assert_eq!(get_recipe(&conn, 9).unwrap().unwrap().inputs[0].count, 2.0);
    }

    #[test]
    fn sqlite_catalog_answers_lookups() {
        let conn = conn();
        upsert_item(
            &conn,
            &Item {
                id: "ore".to_string(),
                name: "Iron Ore".to_string(),
            },
        )
        .unwrap();
        set_mining_time(&conn, "ore", 2.0).unwrap();
        set_extraction_speed(&conn, "gas", 0.5).unwrap();
        upsert_facility(
            &conn,
            &FacilityData {
                id: "smelter".to_string(),
                name: "Smelter".to_string(),
                process_type: "smelting".to_string(),
                speed_multiplier: 1.5,
            },
        )
        .unwrap();
        set_default_facility(&conn, "smelting", "smelter").unwrap();

        let catalog = SqliteCatalog::new(&conn);
        assert_eq!(catalog.item_name("ore"), "Iron Ore");
        assert_eq!(catalog.mining_time("ore"), Some(2.0));
        assert_eq!(catalog.mining_time("gas"), None);
        assert_eq!(catalog.extraction_speed("gas"), Some(0.5));
        assert_eq!(catalog.default_facility_for("smelting").as_deref(), Some("smelter"));
        assert_eq!(catalog.facility("smelter").unwrap().speed_multiplier, 1.5);
        assert!(catalog.recipe(1).is_none());
    }

    #[test]
    fn clear_catalog_empties_tables() {
        let conn = conn();
        upsert_recipe(&conn, &recipe(1, &[], &[("x", 1.0)])).unwrap();
        clear_catalog(&conn).unwrap();
        assert!(list_recipes(&conn).unwrap().is_empty());
    }
}
