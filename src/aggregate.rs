//! Collapses every target's element tree into one node per item

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;

use crate::catalog::Catalog;
use crate::graph;
use crate::models::{ElementId, Recipe, RecipeId, Source, SourceKind};
use crate::state::PlannerState;

static NO_ITEMS: BTreeSet<String> = BTreeSet::new();

/// Totals for one item across all targets
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedItem {
    pub item_id: String,
    pub required_rate: f64,
    pub actual_rate: f64,
    pub element_count: usize,
    pub source_kinds: BTreeSet<SourceKind>,
    /// Facility id -> summed count.
    pub facilities: BTreeMap<String, f64>,
    /// Items feeding this one.
    pub suppliers: BTreeSet<String>,
}

impl AggregatedItem {
    fn new(item_id: &str) -> Self {
        Self {
            item_id: item_id.to_string(),
            required_rate: 0.0,
            actual_rate: 0.0,
            element_count: 0,
            source_kinds: BTreeSet::new(),
            facilities: BTreeMap::new(),
            suppliers: BTreeSet::new(),
        }
    }
}

/// Deduplicated `supplier -> consumer` flow between two items
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedEdge {
    pub supplier: String,
    pub consumer: String,
    pub rate: f64,
    pub items_per_cycle: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Aggregate {
    pub items: BTreeMap<String, AggregatedItem>,
    pub edges: Vec<AggregatedEdge>,
    #[serde(skip)]
    consumers: BTreeMap<String, BTreeSet<String>>,
}

impl Aggregate {
    pub fn item(&self, item_id: &str) -> Option<&AggregatedItem> {
        self.items.get(item_id)
    }

    pub fn suppliers_of(&self, item_id: &str) -> &BTreeSet<String> {
        self.items
            .get(item_id)
            .map_or(&NO_ITEMS, |item| &item.suppliers)
    }

    pub fn consumers_of(&self, item_id: &str) -> &BTreeSet<String> {
        self.consumers.get(item_id).unwrap_or(&NO_ITEMS)
    }

    pub fn edge(&self, supplier: &str, consumer: &str) -> Option<&AggregatedEdge> {
        self.edges
            .iter()
            .find(|e| e.supplier == supplier && e.consumer == consumer)
    }
}

/// Every element reachable from some target root, in discovery order.
///
/// Each target is walked with its own visited set; an element shared by
/// several targets is listed once.
pub fn reachable_elements(state: &PlannerState) -> Vec<ElementId> {
    let roots: Vec<ElementId> = state.targets.iter().map(|t| t.root).collect();
    reachable_from(state, &roots)
}

pub fn reachable_from(state: &PlannerState, roots: &[ElementId]) -> Vec<ElementId> {
    let mut all = Vec::new();
    let mut merged = BTreeSet::new();
    for root in roots {
        let mut visited = BTreeSet::new();
        let mut stack = vec![*root];
        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            let Some(element) = state.element(id) else {
                continue;
            };
            if merged.insert(id) {
                all.push(id);
            }
            stack.extend(element.children.iter().rev().copied());
        }
    }
    all
}

pub fn aggregate(catalog: &dyn Catalog, state: &PlannerState) -> Aggregate {
    let reachable = reachable_elements(state);
    let mut items: BTreeMap<String, AggregatedItem> = BTreeMap::new();
    let mut recipes: HashMap<RecipeId, Option<Recipe>> = HashMap::new();
    let mut edges: BTreeMap<(String, String), AggregatedEdge> = BTreeMap::new();

    for id in &reachable {
        let Some(element) = state.element(*id) else {
            continue;
        };
        let entry = items
            .entry(element.item_id.clone())
            .or_insert_with(|| AggregatedItem::new(&element.item_id));
        entry.required_rate += element.required_rate;
        entry.actual_rate += element.actual_rate;
        entry.element_count += 1;
        entry.source_kinds.insert(element.source_kind());
        if let Some(facility) = &element.facility {
            *entry.facilities.entry(facility.id.clone()).or_default() += facility.count;
        }

        let recipe = element
            .source
            .as_ref()
            .and_then(Source::recipe_id)
            .and_then(|rid| {
                recipes
                    .entry(rid)
                    .or_insert_with(|| catalog.recipe(rid))
                    .clone()
            });

        for child_id in &element.children {
            let Some(child) = state.element(*child_id) else {
                continue;
            };
            if child.item_id == element.item_id {
                continue;
            }
            let slot = recipe
                .as_ref()
                .and_then(|r| graph::slot_for_child(r, element, *child_id, &child.item_id).map(|s| (r, s)));
            let (rate, per_cycle) = match slot {
                Some((recipe, slot)) => (graph::slot_demand(recipe, element, slot), slot.count),
                None => (child.required_rate, 0.0),
            };
            let edge = edges
                .entry((child.item_id.clone(), element.item_id.clone()))
                .or_insert_with(|| AggregatedEdge {
                    supplier: child.item_id.clone(),
                    consumer: element.item_id.clone(),
                    rate: 0.0,
                    items_per_cycle: 0.0,
                });
            edge.rate += rate;
            edge.items_per_cycle += per_cycle;
        }
    }

    let mut consumers: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for (supplier, consumer) in edges.keys() {
        if let Some(item) = items.get_mut(consumer) {
            item.suppliers.insert(supplier.clone());
        }
        consumers
            .entry(supplier.clone())
            .or_default()
            .insert(consumer.clone());
    }

    Aggregate {
        items,
        edges: edges.into_values().collect(),
        consumers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;
    use crate::graph::{create_element, expand_fully, expand_with_recipe};
    use crate::models::{Target, TargetId};

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn catalog() -> MemoryCatalog {
        MemoryCatalog::new()
            .with_recipe(1, "assembly", 1.0, &[("plate", 2.0)], &[("gear", 1.0)])
            .with_recipe(2, "smelting", 1.0, &[("ore", 1.0)], &[("plate", 1.0)])
            .with_recipe(3, "assembly", 1.0, &[("plate", 1.0), ("gear", 1.0)], &[("motor", 1.0)])
            .with_recipe(4, "chem", 1.0, &[("water", 1.0)], &[("water", 2.0)])
            .with_mining("ore", 1.0)
    }

    fn add_target(catalog: &MemoryCatalog, state: &mut PlannerState, item: &str, recipe: i64, rate: f64) {
        let root = create_element(state, item, rate, None, 0);
        let id = TargetId(state.allocate_id());
        state.targets.push(Target {
            id,
            item_id: item.to_string(),
            rate,
            root,
        });
        expand_with_recipe(catalog, state, root, recipe);
        expand_fully(catalog, state, root);
    }

    #[test]
    fn same_item_across_targets_is_merged() {
        let catalog = catalog();
        let mut state = PlannerState::default();
        add_target(&catalog, &mut state, "gear", 1, 60.0);
        add_target(&catalog, &mut state, "plate", 2, 30.0);

        let agg = aggregate(&catalog, &state);
        let plate = agg.item("plate").unwrap();
        assert_eq!(plate.element_count, 2);
        assert!(close(plate.required_rate, 120.0 + 30.0));
        assert!(plate.source_kinds.contains(&SourceKind::Recipe));
        assert!(close(agg.item("ore").unwrap().required_rate, 150.0));
    }

    #[test]
    fn parallel_links_collapse_into_one_edge() {
        let catalog = catalog();
        let mut state = PlannerState::default();
        add_target(&catalog, &mut state, "motor", 3, 60.0);

        let agg = aggregate(&catalog, &state);
        // plate feeds gear and motor; gear's plate and motor's plate both reach ore
        let plate_ore: Vec<_> = agg
            .edges
            .iter()
            .filter(|e| e.supplier == "ore" && e.consumer == "plate")
            .collect();
        assert_eq!(plate_ore.len(), 1);
        assert!(close(plate_ore[0].rate, 60.0 + 120.0));
        assert!(close(plate_ore[0].items_per_cycle, 2.0));

        assert!(agg.suppliers_of("motor").contains("plate"));
        assert!(agg.suppliers_of("motor").contains("gear"));
        assert!(agg.consumers_of("plate").contains("motor"));
        assert!(agg.consumers_of("plate").contains("gear"));
        assert!(agg.consumers_of("motor").is_empty());
    }

    #[test]
    fn supplier_and_consumer_indices_agree() {
        let catalog = catalog();
        let mut state = PlannerState::default();
        add_target(&catalog, &mut state, "motor", 3, 10.0);
        add_target(&catalog, &mut state, "gear", 1, 10.0);
        let agg = aggregate(&catalog, &state);

        for item in agg.items.values() {
            for supplier in &item.suppliers {
                assert!(agg.consumers_of(supplier).contains(&item.item_id));
            }
        }
        for edge in &agg.edges {
            assert!(agg.suppliers_of(&edge.consumer).contains(&edge.supplier));
        }
    }

    #[test]
    fn item_self_loop_is_skipped_but_rates_kept() {
        let catalog = catalog();
        let mut state = PlannerState::default();
        add_target(&catalog, &mut state, "water", 4, 10.0);
        let agg = aggregate(&catalog, &state);
        let water = agg.item("water").unwrap();
        assert_eq!(water.element_count, 2);
        assert!(close(water.required_rate, 15.0));
        assert!(agg.edges.is_empty());
    }

    #[test]
    fn item_cycle_keeps_both_directions() {
        // a from b, b from two a
        let catalog = MemoryCatalog::new()
            .with_recipe(5, "loop", 1.0, &[("b", 1.0)], &[("a", 1.0)])
            .with_recipe(6, "loop", 1.0, &[("a", 2.0)], &[("b", 1.0)]);
        let mut state = PlannerState::default();
        add_target(&catalog, &mut state, "a", 5, 60.0);
        add_target(&catalog, &mut state, "b", 6, 30.0);
        let agg = aggregate(&catalog, &state);

        // a root draws 60 b, b under target b's a draws another 60
        assert!(close(agg.edge("b", "a").unwrap().rate, 120.0));
        // b under target a draws 120 a, the b root draws 60
        assert!(close(agg.edge("a", "b").unwrap().rate, 180.0));
        assert!(agg.suppliers_of("a").contains("b"));
        assert!(agg.suppliers_of("b").contains("a"));
        assert!(agg.consumers_of("a").contains("b"));
        assert!(agg.consumers_of("b").contains("a"));
        assert_eq!(agg.edges.len(), 2);
    }

    #[test]
    fn facility_counts_sum_by_facility() {
        let catalog = catalog();
        let mut state = PlannerState::default();
        add_target(&catalog, &mut state, "gear", 1, 60.0);
        add_target(&catalog, &mut state, "gear", 1, 120.0);
        let agg = aggregate(&catalog, &state);
        let gear = agg.item("gear").unwrap();
        assert!(close(gear.facilities["assembly"], 3.0));
    }

    #[test]
    fn missing_child_is_skipped() {
        let catalog = catalog();
        let mut state = PlannerState::default();
        add_target(&catalog, &mut state, "gear", 1, 60.0);
        let root = state.targets[0].root;
        state.elements.get_mut(&root).unwrap().children.push(ElementId(777));
        let agg = aggregate(&catalog, &state);
        assert_eq!(agg.items.len(), 3);
    }
}
