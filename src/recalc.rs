//! Subtree recalculation
//!
//! Pushes a changed required rate (or facility/modifier) down through the
//! descendants of one element. Updates collect in an overlay and are written
//! back in one go once the walk is complete.

use std::collections::{BTreeSet, HashMap, VecDeque};

use tracing::debug;

use crate::catalog::Catalog;
use crate::graph;
use crate::models::{Element, ElementId, Recipe, RecipeId, Source};
use crate::state::PlannerState;

/// Recalculates `root` and everything below it from their current required
/// rates. Returns the number of elements rewritten.
pub fn recalculate(catalog: &dyn Catalog, state: &mut PlannerState, root: ElementId) -> usize {
    recalculate_with_rate(catalog, state, root, None)
}

/// Like [`recalculate`], optionally giving `root` a new required rate first.
pub fn recalculate_with_rate(
    catalog: &dyn Catalog,
    state: &mut PlannerState,
    root: ElementId,
    root_rate: Option<f64>,
) -> usize {
    let order = walk_order(state, root);
    let mut recipes = RecipeCache::new(catalog);
    let mut overlay: HashMap<ElementId, Element> = HashMap::with_capacity(order.len());

    for id in &order {
        let Some(mut element) = state.element(*id).cloned() else {
            continue;
        };
        if *id == root {
            if let Some(rate) = root_rate {
                element.required_rate = rate;
            }
        } else if let Some(demand) = parent_demand(state, &overlay, &mut recipes, &element) {
            element.required_rate = demand;
        }

        match element.source.clone() {
            None => {}
            Some(Source::Recipe { recipe_id }) => {
                if let Some(recipe) = recipes.get(recipe_id) {
                    graph::refresh_recipe(&mut element, recipe);
                }
            }
            Some(_) => graph::refresh_leaf(&mut element),
        }
        overlay.insert(*id, element);
    }

    let updated = overlay.len();
    state.elements.extend(overlay);
    debug!(target: "factory_planner::recalc", root = %root, updated, "subtree recalculated");
    updated
}

/// Sum of what every parent of `element` asks of it, reading parents from
/// the overlay when they were already recomputed in this walk.
fn parent_demand(
    state: &PlannerState,
    overlay: &HashMap<ElementId, Element>,
    recipes: &mut RecipeCache<'_>,
    element: &Element,
) -> Option<f64> {
    let mut total = None;
    for parent_id in &element.parents {
        let Some(parent) = overlay.get(parent_id).or_else(|| state.element(*parent_id)) else {
            continue;
        };
        let Some(recipe_id) = parent.source.as_ref().and_then(Source::recipe_id) else {
            continue;
        };
        let Some(recipe) = recipes.get(recipe_id) else {
            continue;
        };
        let Some(slot) = graph::slot_for_child(recipe, parent, element.id, &element.item_id) else {
            continue;
        };
        *total.get_or_insert(0.0) += graph::slot_demand(recipe, parent, slot);
    }
    total
}

/// Elements reachable from `root`, parents before children, each once.
///
/// Only parents inside the walk hold a child back, so a shared child is
/// visited after every parent that will be recomputed. Anything caught in a
/// reference cycle is appended in discovery order.
fn walk_order(state: &PlannerState, root: ElementId) -> Vec<ElementId> {
    let mut discovered = Vec::new();
    let mut seen = BTreeSet::new();
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        if !seen.insert(id) {
            continue;
        }
        let Some(element) = state.element(id) else {
            continue;
        };
        discovered.push(id);
        if element.source.is_some() {
            stack.extend(element.children.iter().rev().copied());
        }
    }

    let members: BTreeSet<ElementId> = discovered.iter().copied().collect();
    let mut pending: HashMap<ElementId, usize> = discovered.iter().map(|id| (*id, 0)).collect();
    for id in &discovered {
        let Some(element) = state.element(*id) else {
            continue;
        };
        if element.source.is_none() {
            continue;
        }
        for child in &element.children {
            if *child != root && members.contains(child) {
                if let Some(count) = pending.get_mut(child) {
                    *count += 1;
                }
            }
        }
    }

    let mut order = Vec::with_capacity(discovered.len());
    let mut emitted = BTreeSet::new();
    let mut ready = VecDeque::from([root]);
    while let Some(id) = ready.pop_front() {
        if !members.contains(&id) || !emitted.insert(id) {
            continue;
        }
        order.push(id);
        let Some(element) = state.element(id) else {
            continue;
        };
        if element.source.is_none() {
            continue;
        }
        for child in &element.children {
            if let Some(count) = pending.get_mut(child) {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    ready.push_back(*child);
                }
            }
        }
    }
    for id in discovered {
        if !emitted.contains(&id) {
            order.push(id);
        }
    }
    order
}

struct RecipeCache<'c> {
    catalog: &'c dyn Catalog,
    recipes: HashMap<RecipeId, Option<Recipe>>,
}

impl<'c> RecipeCache<'c> {
    fn new(catalog: &'c dyn Catalog) -> Self {
        Self {
            catalog,
            recipes: HashMap::new(),
        }
    }

    fn get(&mut self, id: RecipeId) -> Option<&Recipe> {
        let catalog = self.catalog;
        self.recipes
            .entry(id)
            .or_insert_with(|| catalog.recipe(id))
            .as_ref()
    }
}
