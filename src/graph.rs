//! Production tree expansion and mutation
//!
//! Elements live in the flat table of [`PlannerState`]; every function here
//! edits that table in place on a working copy handed in by the caller.
//! Lookups that miss (unknown recipe, no mining data, dangling id) leave the
//! state untouched and report `false`.

use std::collections::BTreeSet;

use tracing::debug;

use crate::catalog::Catalog;
use crate::models::{
    Byproduct, Element, ElementId, Facility, ItemCount, Modifier, PROCESS_EXTRACTION,
    PROCESS_MINING, Recipe, RecipeId, Source,
};
use crate::rate;
use crate::recalc;
use crate::state::{GlobalDefaults, PlannerState};

/// Upper bound on how deep "expand fully" follows recipes.
pub const MAX_EXPANSION_DEPTH: usize = 32;

/// Rates derived from running a recipe for one element
#[derive(Debug, Clone, PartialEq)]
pub struct RecipePlan {
    pub output_per_facility: f64,
    pub facility_count: f64,
    pub actual_rate: f64,
    /// Demand of each active input slot, in slot order.
    pub input_demands: Vec<(String, f64)>,
    pub byproducts: Vec<(String, f64)>,
}

/// Works out facility count, input demands and byproducts for producing
/// `item_id` at `required_rate`. `None` if the recipe does not make the item.
pub fn plan_recipe(
    recipe: &Recipe,
    item_id: &str,
    required_rate: f64,
    facility: &Facility,
    modifier: &Modifier,
) -> Option<RecipePlan> {
    let output = recipe.output_for(item_id)?;
    let output_per_facility =
        rate::output_rate(output.count, recipe.cycle_seconds, facility.speed, modifier);
    let facility_count = if facility.pinned {
        facility.count
    } else {
        rate::required_facilities(required_rate, output_per_facility)
    };

    let input_demands = recipe
        .active_inputs()
        .map(|input| {
            let per_facility =
                rate::input_rate(input.count, recipe.cycle_seconds, facility.speed, modifier);
            (input.item_id.clone(), per_facility * facility_count)
        })
        .collect();

    let byproducts = recipe
        .outputs
        .iter()
        .filter(|o| o.item_id != item_id && o.count > 0.0)
        .map(|o| {
            let per_facility =
                rate::output_rate(o.count, recipe.cycle_seconds, facility.speed, modifier);
            (o.item_id.clone(), per_facility * facility_count)
        })
        .collect();

    Some(RecipePlan {
        output_per_facility,
        facility_count,
        actual_rate: output_per_facility * facility_count,
        input_demands,
        byproducts,
    })
}

/// The recipe input slot that `child` fills under `parent`.
///
/// Children are created in active-slot order, so the child's position picks
/// the slot; if the positions have drifted the first slot with a matching
/// item is used.
pub fn slot_for_child<'r>(
    recipe: &'r Recipe,
    parent: &Element,
    child: ElementId,
    child_item: &str,
) -> Option<&'r ItemCount> {
    let by_position = parent
        .children
        .iter()
        .position(|c| *c == child)
        .and_then(|pos| recipe.active_inputs().nth(pos))
        .filter(|slot| slot.item_id == child_item);
    by_position.or_else(|| recipe.active_inputs().find(|slot| slot.item_id == child_item))
}

/// Rate at which `parent` draws `slot` from its child.
pub fn slot_demand(recipe: &Recipe, parent: &Element, slot: &ItemCount) -> f64 {
    let Some(facility) = &parent.facility else {
        return 0.0;
    };
    rate::input_rate(slot.count, recipe.cycle_seconds, facility.speed, &parent.modifier)
        * facility.count
}

/// Per-facility output of a mining or extraction source.
pub fn leaf_rate_per_facility(source: &Source, facility_speed: f64) -> Option<f64> {
    match source {
        Source::Mining { mining_time } => Some(rate::mining_rate(*mining_time, facility_speed)),
        Source::Extraction { speed } => Some(speed * facility_speed),
        _ => None,
    }
}

/// Facility used for a process type: state default, then catalog default,
/// then a speed-1 stand-in named after the process.
pub fn choose_facility(
    catalog: &dyn Catalog,
    defaults: &GlobalDefaults,
    process_type: &str,
) -> Facility {
    let id = defaults
        .facilities
        .get(process_type)
        .cloned()
        .or_else(|| catalog.default_facility_for(process_type));
    match id {
        Some(id) => {
            let speed = catalog
                .facility(&id)
                .map(|f| f.speed_multiplier)
                .filter(|s| *s > 0.0 && s.is_finite())
                .unwrap_or(1.0);
            Facility::new(id, speed)
        }
        None => Facility::new(process_type, 1.0),
    }
}

/// Keeps consumer links of byproducts that are still produced.
pub fn merge_byproducts(previous: &[Byproduct], rates: Vec<(String, f64)>) -> Vec<Byproduct> {
    rates
        .into_iter()
        .map(|(item_id, rate)| {
            let consumers = previous
                .iter()
                .find(|b| b.item_id == item_id)
                .map(|b| b.consumers.clone())
                .unwrap_or_default();
            Byproduct {
                item_id,
                rate,
                consumers,
            }
        })
        .collect()
}

/// Recomputes facility count and actual rate of a mining, extraction or
/// gathered element from its required rate.
pub fn refresh_leaf(element: &mut Element) {
    match &element.source {
        Some(Source::Gathered) => element.actual_rate = element.required_rate,
        Some(source @ (Source::Mining { .. } | Source::Extraction { .. })) => {
            let speed = element.facility.as_ref().map_or(1.0, |f| f.speed);
            let per_facility = leaf_rate_per_facility(source, speed).unwrap_or(0.0);
            let process = match source {
                Source::Extraction { .. } => PROCESS_EXTRACTION,
                _ => PROCESS_MINING,
            };
            let required = element.required_rate;
            let facility = element
                .facility
                .get_or_insert_with(|| Facility::new(process, 1.0));
            if !facility.pinned {
                facility.count = rate::required_facilities(required, per_facility);
            }
            element.actual_rate = per_facility * facility.count;
        }
        _ => {}
    }
}

/// Recomputes rates and byproducts of a recipe-backed element. Children are
/// left alone.
pub fn refresh_recipe(element: &mut Element, recipe: &Recipe) -> Option<RecipePlan> {
    let facility = element.facility.as_mut()?;
    let plan = plan_recipe(
        recipe,
        &element.item_id,
        element.required_rate,
        facility,
        &element.modifier,
    )?;
    facility.count = plan.facility_count;
    element.actual_rate = plan.actual_rate;
    element.byproducts = merge_byproducts(&element.byproducts, plan.byproducts.clone());
    Some(plan)
}

/// Adds a sourceless leaf to the table.
pub fn create_element(
    state: &mut PlannerState,
    item_id: &str,
    required_rate: f64,
    parent: Option<ElementId>,
    depth: u32,
) -> ElementId {
    let id = ElementId(state.allocate_id());
    state
        .elements
        .insert(id, Element::leaf(id, item_id, required_rate, parent, depth));
    id
}

/// Gives a fresh leaf a mining or extraction source when the catalog has one.
pub fn auto_assign(catalog: &dyn Catalog, state: &mut PlannerState, id: ElementId) -> bool {
    let Some(item_id) = state.element(id).map(|e| e.item_id.clone()) else {
        return false;
    };
    if catalog.mining_time(&item_id).is_some() {
        set_to_mining(catalog, state, id)
    } else if catalog.extraction_speed(&item_id).is_some() {
        set_to_extraction(catalog, state, id)
    } else {
        false
    }
}

/// Sources `id` from `recipe_id`, replacing any previous descendants.
pub fn expand_with_recipe(
    catalog: &dyn Catalog,
    state: &mut PlannerState,
    id: ElementId,
    recipe_id: RecipeId,
) -> bool {
    let Some(element) = state.element(id) else {
        return false;
    };
    let Some(recipe) = catalog.recipe(recipe_id) else {
        debug!(target: "factory_planner::graph", recipe_id, "recipe not found");
        return false;
    };
    if recipe.output_for(&element.item_id).is_none() {
        debug!(
            target: "factory_planner::graph",
            recipe_id,
            item = %element.item_id,
            "recipe does not produce item"
        );
        return false;
    }

    let modifier = if element.source.is_some() {
        element.modifier.clone()
    } else {
        state.defaults.modifier.clone()
    };
    let facility = choose_facility(catalog, &state.defaults, &recipe.process_type);

    prune_children(state, id);
    let Some(element) = state.elements.get_mut(&id) else {
        return false;
    };
    element.source = Some(Source::Recipe { recipe_id });
    element.facility = Some(facility);
    element.modifier = modifier;
    derive_children(catalog, state, id, &recipe);
    true
}

/// Brings the children of a recipe-backed element in line with its recipe.
///
/// Existing children whose item still matches a slot are kept (their rates
/// are left to recalculation); missing slots get fresh leaves at the slot
/// demand, and children without a slot are pruned.
fn derive_children(catalog: &dyn Catalog, state: &mut PlannerState, id: ElementId, recipe: &Recipe) {
    let Some(element) = state.element(id) else {
        return;
    };
    let Some(facility) = element.facility.clone() else {
        return;
    };
    let Some(plan) = plan_recipe(
        recipe,
        &element.item_id,
        element.required_rate,
        &facility,
        &element.modifier,
    ) else {
        return;
    };
    let depth = element.depth + 1;
    let mut unused = element.children.clone();

    let mut children = Vec::with_capacity(plan.input_demands.len());
    let mut created = Vec::new();
    for (item_id, demand) in &plan.input_demands {
        let reused = unused.iter().position(|c| {
            state
                .element(*c)
                .is_some_and(|child| &child.item_id == item_id)
        });
        match reused {
            Some(pos) => children.push(unused.remove(pos)),
            None => {
                let child = create_element(state, item_id, *demand, Some(id), depth);
                created.push(child);
                children.push(child);
            }
        }
    }

    if let Some(element) = state.elements.get_mut(&id) {
        element.children = children;
        if let Some(f) = element.facility.as_mut() {
            f.count = plan.facility_count;
        }
        element.actual_rate = plan.actual_rate;
        element.byproducts = merge_byproducts(&element.byproducts, plan.byproducts);
    }
    detach(state, id, &unused);
    for child in created {
        auto_assign(catalog, state, child);
    }
}

/// Expands every sourceless descendant of `id` with its default recipe.
///
/// Items already on the path from the target root are left sourceless so
/// self-feeding recipes do not recurse forever.
pub fn expand_fully(catalog: &dyn Catalog, state: &mut PlannerState, id: ElementId) {
    let mut stack = vec![(id, ancestor_items(state, id))];
    while let Some((current, mut path)) = stack.pop() {
        let Some(element) = state.element(current) else {
            continue;
        };
        path.push(element.item_id.clone());
        if path.len() > MAX_EXPANSION_DEPTH {
            debug!(target: "factory_planner::graph", element = %current, "expansion depth limit");
            continue;
        }
        let children = element.children.clone();
        for child in children {
            let Some(node) = state.element(child) else {
                continue;
            };
            if node.source.is_none() && !path.contains(&node.item_id) {
                if let Some(&recipe_id) = catalog.recipes_producing(&node.item_id).first() {
                    expand_with_recipe(catalog, state, child, recipe_id);
                }
            }
            let is_recipe = state
                .element(child)
                .and_then(|e| e.source.as_ref())
                .is_some_and(|s| s.recipe_id().is_some());
            if is_recipe {
                stack.push((child, path.clone()));
            }
        }
    }
}

/// Items on the first-parent chain above `id`, root first.
fn ancestor_items(state: &PlannerState, id: ElementId) -> Vec<String> {
    let mut items = Vec::new();
    let mut seen = BTreeSet::from([id]);
    let mut current = state.element(id).and_then(|e| e.parents.first().copied());
    while let Some(parent) = current {
        if !seen.insert(parent) {
            break;
        }
        let Some(element) = state.element(parent) else {
            break;
        };
        items.push(element.item_id.clone());
        current = element.parents.first().copied();
    }
    items.reverse();
    items
}

fn set_leaf_source(
    state: &mut PlannerState,
    id: ElementId,
    source: Source,
    facility: Option<Facility>,
) -> bool {
    if state.element(id).is_none() {
        return false;
    }
    prune_children(state, id);
    let Some(element) = state.elements.get_mut(&id) else {
        return false;
    };
    element.source = Some(source);
    element.facility = facility;
    element.modifier = Modifier::default();
    element.byproducts.clear();
    refresh_leaf(element);
    true
}

pub fn set_to_mining(catalog: &dyn Catalog, state: &mut PlannerState, id: ElementId) -> bool {
    let Some(item_id) = state.element(id).map(|e| e.item_id.clone()) else {
        return false;
    };
    let Some(mining_time) = catalog.mining_time(&item_id) else {
        debug!(target: "factory_planner::graph", item = %item_id, "no mining data");
        return false;
    };
    let facility = choose_facility(catalog, &state.defaults, PROCESS_MINING);
    set_leaf_source(state, id, Source::Mining { mining_time }, Some(facility))
}

pub fn set_to_extraction(catalog: &dyn Catalog, state: &mut PlannerState, id: ElementId) -> bool {
    let Some(item_id) = state.element(id).map(|e| e.item_id.clone()) else {
        return false;
    };
    let Some(speed) = catalog.extraction_speed(&item_id) else {
        debug!(target: "factory_planner::graph", item = %item_id, "no extraction data");
        return false;
    };
    let facility = choose_facility(catalog, &state.defaults, PROCESS_EXTRACTION);
    set_leaf_source(state, id, Source::Extraction { speed }, Some(facility))
}

pub fn set_to_gathered(state: &mut PlannerState, id: ElementId) -> bool {
    set_leaf_source(state, id, Source::Gathered, None)
}

/// Swaps the facility of a recipe-backed element and re-derives everything
/// below it. `explicit_count` pins the facility count.
pub fn set_facility(
    catalog: &dyn Catalog,
    state: &mut PlannerState,
    id: ElementId,
    facility_id: &str,
    speed: f64,
    explicit_count: Option<f64>,
) -> bool {
    let Some(recipe_id) = state
        .element(id)
        .and_then(|e| e.source.as_ref())
        .and_then(Source::recipe_id)
    else {
        debug!(target: "factory_planner::graph", element = %id, "facility change needs a recipe source");
        return false;
    };
    let Some(recipe) = catalog.recipe(recipe_id) else {
        return false;
    };
    let explicit_count = explicit_count.filter(|c| c.is_finite() && *c >= 0.0);
    if let Some(element) = state.elements.get_mut(&id) {
        element.facility = Some(Facility {
            id: facility_id.to_string(),
            speed,
            count: explicit_count.unwrap_or(0.0),
            pinned: explicit_count.is_some(),
        });
    }
    derive_children(catalog, state, id, &recipe);
    recalc::recalculate(catalog, state, id);
    true
}

/// Replaces the modifier of a recipe-backed element and recalculates below it.
pub fn set_modifier(
    catalog: &dyn Catalog,
    state: &mut PlannerState,
    id: ElementId,
    mut modifier: Modifier,
) -> bool {
    let Some(element) = state.elements.get_mut(&id) else {
        return false;
    };
    if !matches!(element.source, Some(Source::Recipe { .. })) {
        return false;
    }
    modifier.level = modifier.level.min(rate::MAX_MODIFIER_LEVEL);
    element.modifier = modifier;
    recalc::recalculate(catalog, state, id);
    true
}

/// Drops source, facility, modifier, byproducts and all descendants.
pub fn clear_source(state: &mut PlannerState, id: ElementId) -> bool {
    if state.element(id).is_none() {
        return false;
    }
    prune_children(state, id);
    let Some(element) = state.elements.get_mut(&id) else {
        return false;
    };
    element.source = None;
    element.facility = None;
    element.modifier = Modifier::default();
    element.byproducts.clear();
    element.actual_rate = 0.0;
    true
}

/// Records `consumer` as taking `item_id` from `producer`'s byproducts.
pub fn link_byproduct(
    state: &mut PlannerState,
    producer: ElementId,
    item_id: &str,
    consumer: ElementId,
) -> bool {
    if producer == consumer
        || state
            .element(consumer)
            .is_none_or(|c| c.item_id != item_id)
    {
        return false;
    }
    let Some(element) = state.elements.get_mut(&producer) else {
        return false;
    };
    let Some(byproduct) = element.byproducts.iter_mut().find(|b| b.item_id == item_id) else {
        return false;
    };
    if byproduct.consumers.contains(&consumer) {
        return false;
    }
    byproduct.consumers.push(consumer);
    true
}

/// Removes every descendant of `id` that no other parent keeps alive.
pub fn prune_children(state: &mut PlannerState, id: ElementId) {
    let children = match state.elements.get_mut(&id) {
        Some(element) => std::mem::take(&mut element.children),
        None => return,
    };
    detach(state, id, &children);
}

/// Removes `root` and everything below it that is not shared with another
/// live parent.
pub fn remove_subtree(state: &mut PlannerState, root: ElementId) {
    let Some(element) = state.elements.remove(&root) else {
        return;
    };
    detach(state, root, &element.children);
    scrub_references(state, &BTreeSet::from([root]));
}

/// Cuts the `parent -> child` links and deletes children left without any
/// parent, cascading downwards.
fn detach(state: &mut PlannerState, parent: ElementId, children: &[ElementId]) {
    let mut removed = BTreeSet::new();
    let mut pending: Vec<(ElementId, ElementId)> = children.iter().map(|c| (parent, *c)).collect();
    while let Some((from, child)) = pending.pop() {
        let is_root = state.is_root(child);
        let Some(element) = state.elements.get_mut(&child) else {
            continue;
        };
        element.parents.retain(|p| *p != from);
        if element.parents.is_empty() && !is_root {
            if let Some(gone) = state.elements.remove(&child) {
                removed.insert(child);
                pending.extend(gone.children.iter().map(|c| (child, *c)));
            }
        }
    }
    scrub_references(state, &removed);
}

fn scrub_references(state: &mut PlannerState, removed: &BTreeSet<ElementId>) {
    if removed.is_empty() {
        return;
    }
    for element in state.elements.values_mut() {
        element.children.retain(|c| !removed.contains(c));
        element.parents.retain(|p| !removed.contains(p));
        for byproduct in &mut element.byproducts {
            byproduct.consumers.retain(|c| !removed.contains(c));
        }
    }
    if state
        .selection
        .element
        .is_some_and(|selected| removed.contains(&selected))
    {
        state.selection.element = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;
    use crate::models::{ModifierMode, SourceKind, Target, TargetId};

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn catalog() -> MemoryCatalog {
        MemoryCatalog::new()
            .with_recipe(1, "assembly", 60.0, &[("b", 2.0)], &[("a", 5.0)])
            .with_recipe(2, "smelting", 1.0, &[("ore", 1.0)], &[("b", 1.0)])
            .with_recipe(
                3,
                "refining",
                4.0,
                &[("crude", 2.0)],
                &[("oil", 2.0), ("gas", 1.0)],
            )
            .with_recipe(4, "assembly", 2.0, &[("a", 1.0), ("zero", 0.0)], &[("c", 1.0)])
            .with_mining("ore", 2.0)
            .with_extraction("crude", 30.0)
            .with_facility("assembler_mk2", "assembly", 1.5)
            .with_default_facility("assembly", "assembler_mk2")
    }

    fn with_root(item: &str, rate: f64) -> (PlannerState, ElementId) {
        let mut state = PlannerState::default();
        let root = create_element(&mut state, item, rate, None, 0);
        let id = TargetId(state.allocate_id());
        state.targets.push(Target {
            id,
            item_id: item.to_string(),
            rate,
            root,
        });
        (state, root)
    }

    #[test]
    fn create_element_is_sourceless_leaf() {
        let mut state = PlannerState::default();
        let id = create_element(&mut state, "a", 3.0, None, 0);
        let element = state.element(id).unwrap();
        assert!(element.source.is_none());
        assert!(element.children.is_empty());
        assert_eq!(element.required_rate, 3.0);
        assert_eq!(element.actual_rate, 0.0);
    }

    #[test]
    fn expand_creates_one_child_per_active_input() {
        let catalog = catalog();
        let (mut state, root) = with_root("c", 30.0);
        assert!(expand_with_recipe(&catalog, &mut state, root, 4));

        let element = state.element(root).unwrap();
        assert_eq!(element.children.len(), 1);
        let facility = element.facility.as_ref().unwrap();
        assert_eq!(facility.id, "assembler_mk2");
        // 30/min per facility at speed 1.5 needs 30 / 45 facilities
        assert!(close(facility.count, 30.0 / 45.0));
        assert!(close(element.actual_rate, 30.0));

        let child = state.element(element.children[0]).unwrap();
        assert_eq!(child.item_id, "a");
        assert_eq!(child.depth, 1);
        assert_eq!(child.parents, vec![root]);
        assert!(close(child.required_rate, 30.0));
    }

    #[test]
    fn expand_with_unknown_or_wrong_recipe_is_noop() {
        let catalog = catalog();
        let (mut state, root) = with_root("a", 10.0);
        let before = state.clone();
        assert!(!expand_with_recipe(&catalog, &mut state, root, 99));
        assert!(!expand_with_recipe(&catalog, &mut state, root, 2));
        assert_eq!(state, before);
    }

    #[test]
    fn children_are_auto_assigned_to_mining_and_extraction() {
        let catalog = catalog();
        let (mut state, root) = with_root("b", 60.0);
        expand_with_recipe(&catalog, &mut state, root, 2);
        let ore = state.element(state.element(root).unwrap().children[0]).unwrap();
        assert_eq!(ore.source_kind(), SourceKind::Mining);
        // 60/min of ore at 30/min per drill
        assert!(close(ore.facility_count(), 2.0));
        assert!(close(ore.actual_rate, 60.0));

        let (mut state, root) = with_root("oil", 30.0);
        expand_with_recipe(&catalog, &mut state, root, 3);
        let crude = state.element(state.element(root).unwrap().children[0]).unwrap();
        assert_eq!(crude.source_kind(), SourceKind::Extraction);
        assert!(close(crude.required_rate, 30.0));
        assert!(close(crude.facility_count(), 1.0));
    }

    #[test]
    fn extractor_speed_scales_extraction_output() {
        let catalog = catalog()
            .with_facility("fast_pump", "extraction", 2.0)
            .with_default_facility("extraction", "fast_pump");
        let (mut state, root) = with_root("oil", 30.0);
        expand_with_recipe(&catalog, &mut state, root, 3);
        let crude = state.element(state.element(root).unwrap().children[0]).unwrap();
        assert_eq!(crude.facility.as_ref().unwrap().id, "fast_pump");
        // 30/min per pump doubled
        assert!(close(crude.facility_count(), 0.5));
        assert!(close(crude.actual_rate, 30.0));
    }

    #[test]
    fn leaf_without_facility_gets_one_for_its_source() {
        let mut element = Element::leaf(ElementId(1), "crude", 60.0, None, 0);
        element.source = Some(Source::Extraction { speed: 30.0 });
        refresh_leaf(&mut element);
        let facility = element.facility.as_ref().unwrap();
        assert_eq!(facility.id, PROCESS_EXTRACTION);
        assert!(close(facility.count, 2.0));

        let mut element = Element::leaf(ElementId(2), "ore", 60.0, None, 0);
        element.source = Some(Source::Mining { mining_time: 2.0 });
        refresh_leaf(&mut element);
        assert_eq!(element.facility.as_ref().unwrap().id, PROCESS_MINING);
    }

    #[test]
    fn byproducts_follow_other_outputs() {
        let catalog = catalog();
        let (mut state, root) = with_root("oil", 30.0);
        expand_with_recipe(&catalog, &mut state, root, 3);
        let element = state.element(root).unwrap();
        assert_eq!(element.byproducts.len(), 1);
        assert_eq!(element.byproducts[0].item_id, "gas");
        assert!(close(element.byproducts[0].rate, 15.0));
    }

    #[test]
    fn expand_fully_reaches_raw_resources() {
        let catalog = catalog();
        let (mut state, root) = with_root("a", 10.0);
        expand_with_recipe(&catalog, &mut state, root, 1);
        expand_fully(&catalog, &mut state, root);

        let kinds: Vec<(String, SourceKind)> = state
            .elements
            .values()
            .map(|e| (e.item_id.clone(), e.source_kind()))
            .collect();
        assert!(kinds.contains(&("b".to_string(), SourceKind::Recipe)));
        assert!(kinds.contains(&("ore".to_string(), SourceKind::Mining)));
        assert_eq!(state.elements.len(), 3);
    }

    #[test]
    fn expand_fully_stops_on_self_feeding_item() {
        let catalog = MemoryCatalog::new().with_recipe(1, "loop", 1.0, &[("x", 1.0)], &[("x", 2.0)]);
        let (mut state, root) = with_root("x", 10.0);
        expand_with_recipe(&catalog, &mut state, root, 1);
        expand_fully(&catalog, &mut state, root);
        assert_eq!(state.elements.len(), 2);
        let child = state.element(state.element(root).unwrap().children[0]).unwrap();
        assert!(child.source.is_none());
    }

    #[test]
    fn clear_source_removes_descendants() {
        let catalog = catalog();
        let (mut state, root) = with_root("a", 10.0);
        expand_with_recipe(&catalog, &mut state, root, 1);
        expand_fully(&catalog, &mut state, root);
        assert!(clear_source(&mut state, root));

        assert_eq!(state.elements.len(), 1);
        let element = state.element(root).unwrap();
        assert!(element.source.is_none());
        assert!(element.facility.is_none());
        assert!(element.children.is_empty());
        assert_eq!(element.actual_rate, 0.0);
    }

    #[test]
    fn set_facility_requires_recipe_source() {
        let catalog = catalog();
        let (mut state, root) = with_root("ore", 10.0);
        assert!(set_to_mining(&catalog, &mut state, root));
        let before = state.clone();
        assert!(!set_facility(&catalog, &mut state, root, "drill", 2.0, None));
        assert_eq!(state, before);
    }

    #[test]
    fn set_facility_keeps_modifier_and_children() {
        let catalog = catalog();
        let (mut state, root) = with_root("a", 10.0);
        expand_with_recipe(&catalog, &mut state, root, 1);
        set_modifier(&catalog, &mut state, root, Modifier::new(ModifierMode::Speed, 1));
        let child = state.element(root).unwrap().children[0];

        assert!(set_facility(&catalog, &mut state, root, "assembler_mk3", 2.0, None));
        let element = state.element(root).unwrap();
        assert_eq!(element.children, vec![child]);
        assert_eq!(element.modifier.mode, ModifierMode::Speed);
        // 5 per minute * 2.0 speed * 1.25 boost
        assert!(close(element.facility_count(), 10.0 / 12.5));
        assert!(close(element.actual_rate, 10.0));
        // 2 per minute * 2.0 * 1.25 per facility
        assert!(close(state.element(child).unwrap().required_rate, 5.0 * 0.8));
    }

    #[test]
    fn pinned_facility_count_drives_rates() {
        let catalog = catalog();
        let (mut state, root) = with_root("a", 10.0);
        expand_with_recipe(&catalog, &mut state, root, 1);
        assert!(set_facility(&catalog, &mut state, root, "assembler", 1.0, Some(3.0)));

        let element = state.element(root).unwrap();
        assert!(close(element.facility_count(), 3.0));
        assert!(close(element.actual_rate, 15.0));
        let child = state.element(element.children[0]).unwrap();
        assert!(close(child.required_rate, 6.0));
    }

    #[test]
    fn link_byproduct_requires_matching_item() {
        let catalog = catalog();
        let (mut state, root) = with_root("oil", 30.0);
        expand_with_recipe(&catalog, &mut state, root, 3);
        let gas = create_element(&mut state, "gas", 5.0, None, 0);
        let crude = state.element(root).unwrap().children[0];

        assert!(!link_byproduct(&mut state, root, "gas", crude));
        assert!(link_byproduct(&mut state, root, "gas", gas));
        assert!(!link_byproduct(&mut state, root, "gas", gas));
        assert_eq!(state.element(root).unwrap().byproducts[0].consumers, vec![gas]);
    }

    #[test]
    fn shared_child_survives_one_parent_leaving() {
        let mut state = PlannerState::default();
        let left = create_element(&mut state, "l", 1.0, None, 0);
        let right = create_element(&mut state, "r", 1.0, None, 0);
        let shared = create_element(&mut state, "s", 1.0, Some(left), 1);
        state.elements.get_mut(&shared).unwrap().parents.push(right);
        state.elements.get_mut(&left).unwrap().children.push(shared);
        state.elements.get_mut(&right).unwrap().children.push(shared);

        prune_children(&mut state, left);
        assert_eq!(state.element(shared).unwrap().parents, vec![right]);

        prune_children(&mut state, right);
        assert!(state.element(shared).is_none());
        assert!(state.element(right).unwrap().children.is_empty());
    }
}
