//! Read-only game data lookups

use std::collections::HashMap;

use crate::models::{FacilityData, Item, ItemCount, Recipe, RecipeId};

/// Static game data queried by the planner.
///
/// Every lookup answers "not found" with `None` (or an empty list); the
/// planner treats a missing entry as a no-op rather than an error.
pub trait Catalog {
    fn recipe(&self, id: RecipeId) -> Option<Recipe>;

    fn item(&self, id: &str) -> Option<Item>;

    /// Recipes whose outputs include `item_id`. The first one is the default.
    fn recipes_producing(&self, item_id: &str) -> Vec<RecipeId>;

    fn mining_time(&self, item_id: &str) -> Option<f64>;

    /// Extraction rate in items per minute.
    fn extraction_speed(&self, item_id: &str) -> Option<f64>;

    fn facility(&self, id: &str) -> Option<FacilityData>;

    fn default_facility_for(&self, process_type: &str) -> Option<String>;

    /// Display name for an item, falling back to its id.
    fn item_name(&self, id: &str) -> String {
        self.item(id).map(|i| i.name).unwrap_or_else(|| id.to_string())
    }
}

impl<C: Catalog + ?Sized> Catalog for &C {
    fn recipe(&self, id: RecipeId) -> Option<Recipe> {
        (**self).recipe(id)
    }

    fn item(&self, id: &str) -> Option<Item> {
        (**self).item(id)
    }

    fn recipes_producing(&self, item_id: &str) -> Vec<RecipeId> {
        (**self).recipes_producing(item_id)
    }

    fn mining_time(&self, item_id: &str) -> Option<f64> {
        (**self).mining_time(item_id)
    }

    fn extraction_speed(&self, item_id: &str) -> Option<f64> {
        (**self).extraction_speed(item_id)
    }

    fn facility(&self, id: &str) -> Option<FacilityData> {
        (**self).facility(id)
    }

    fn default_facility_for(&self, process_type: &str) -> Option<String> {
        (**self).default_facility_for(process_type)
    }
}

/// Catalog held entirely in memory, built with the `with_*` methods.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    items: HashMap<String, Item>,
    recipes: Vec<Recipe>,
    mining: HashMap<String, f64>,
    extraction: HashMap<String, f64>,
    facilities: HashMap<String, FacilityData>,
    defaults: HashMap<String, String>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_item(mut self, id: &str, name: &str) -> Self {
        self.items.insert(
            id.to_string(),
            Item {
                id: id.to_string(),
                name: name.to_string(),
            },
        );
        self
    }

    /// Adds a recipe. Recipes registered first become the default producer.
    pub fn with_recipe(
        mut self,
        id: RecipeId,
        process_type: &str,
        cycle_seconds: f64,
        inputs: &[(&str, f64)],
        outputs: &[(&str, f64)],
    ) -> Self {
        let to_slots = |slots: &[(&str, f64)]| {
            slots
                .iter()
                .map(|(item, count)| ItemCount::new(*item, *count))
                .collect::<Vec<_>>()
        };
        let name = outputs
            .first()
            .map(|(item, _)| item.to_string())
            .unwrap_or_else(|| format!("recipe {}", id));
        self.recipes.retain(|r| r.id != id);
        self.recipes.push(Recipe {
            id,
            name,
            process_type: process_type.to_string(),
            cycle_seconds,
            inputs: to_slots(inputs),
            outputs: to_slots(outputs),
        });
        self
    }

    pub fn with_mining(mut self, item_id: &str, mining_time: f64) -> Self {
        self.mining.insert(item_id.to_string(), mining_time);
        self
    }

    pub fn with_extraction(mut self, item_id: &str, speed: f64) -> Self {
        self.extraction.insert(item_id.to_string(), speed);
        self
    }

    pub fn with_facility(mut self, id: &str, process_type: &str, speed_multiplier: f64) -> Self {
        self.facilities.insert(
            id.to_string(),
            FacilityData {
                id: id.to_string(),
                name: id.to_string(),
                process_type: process_type.to_string(),
                speed_multiplier,
            },
        );
        self
    }

    pub fn with_default_facility(mut self, process_type: &str, facility_id: &str) -> Self {
        self.defaults
            .insert(process_type.to_string(), facility_id.to_string());
        self
    }
}

impl Catalog for MemoryCatalog {
    fn recipe(&self, id: RecipeId) -> Option<Recipe> {
        self.recipes.iter().find(|r| r.id == id).cloned()
    }

    fn item(&self, id: &str) -> Option<Item> {
        self.items.get(id).cloned()
    }

    fn recipes_producing(&self, item_id: &str) -> Vec<RecipeId> {
        self.recipes
            .iter()
            .filter(|r| r.output_for(item_id).is_some())
            .map(|r| r.id)
            .collect()
    }

    fn mining_time(&self, item_id: &str) -> Option<f64> {
        self.mining.get(item_id).copied()
    }

    fn extraction_speed(&self, item_id: &str) -> Option<f64> {
        self.extraction.get(item_id).copied()
    }

    fn facility(&self, id: &str) -> Option<FacilityData> {
        self.facilities.get(id).cloned()
    }

    fn default_facility_for(&self, process_type: &str) -> Option<String> {
        self.defaults.get(process_type).cloned()
    }
}
