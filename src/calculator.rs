//! Planner facade: target management, element edits, read views and reports
//!
//! Every edit clones the current state, runs the graph operations on the
//! copy and hands it to the [`Store`] as one transition.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

use crate::aggregate::{self, Aggregate, AggregatedEdge};
use crate::catalog::Catalog;
use crate::config::PlannerConfig;
use crate::error::{PlannerError, validate_facility_count, validate_rate, validate_speed};
use crate::graph;
use crate::layout::{self, LayoutConfig, NodePlacement};
use crate::models::{
    Element, ElementId, Modifier, ModifierMode, RecipeId, Source, SourceKind, Target, TargetId,
};
use crate::rate;
use crate::recalc;
use crate::state::{PlannerState, Position, Store};

pub struct Planner<C> {
    catalog: C,
    store: Store,
    config: PlannerConfig,
}

impl<C: Catalog> Planner<C> {
    pub fn new(catalog: C) -> Self {
        Self::with_state(catalog, PlannerState::default())
    }

    pub fn with_state(catalog: C, state: PlannerState) -> Self {
        Self {
            catalog,
            store: Store::new(state),
            config: PlannerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: PlannerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn state(&self) -> &PlannerState {
        self.store.state()
    }

    pub fn on_change<F>(&mut self, listener: F) -> usize
    where
        F: FnMut(&PlannerState) + 'static,
    {
        self.store.on_change(listener)
    }

    pub fn unsubscribe(&mut self, handle: usize) -> bool {
        self.store.unsubscribe(handle)
    }

    fn transition<R>(&mut self, edit: impl FnOnce(&dyn Catalog, &mut PlannerState) -> R) -> R {
        let catalog: &dyn Catalog = &self.catalog;
        self.store.apply_with(|current| {
            let mut next = current.clone();
            let out = edit(catalog, &mut next);
            (next, out)
        })
    }

    // -- targets ------------------------------------------------------------

    pub fn add_target(&mut self, item_id: &str, rate: f64) -> Result<TargetId, PlannerError> {
        self.add_target_with(item_id, rate, self.config.expand_fully_by_default)
    }

    /// Adds a target and sources its root with the item's default recipe,
    /// or with mining/extraction for raw items.
    pub fn add_target_with(
        &mut self,
        item_id: &str,
        rate: f64,
        expand_fully: bool,
    ) -> Result<TargetId, PlannerError> {
        let rate = validate_rate(rate)?;
        let id = self.transition(|catalog, state| {
            let root = graph::create_element(state, item_id, rate, None, 0);
            let id = TargetId(state.allocate_id());
            state.targets.push(Target {
                id,
                item_id: item_id.to_string(),
                rate,
                root,
            });
            match catalog.recipes_producing(item_id).first() {
                Some(&recipe_id) => {
                    graph::expand_with_recipe(catalog, state, root, recipe_id);
                    if expand_fully {
                        graph::expand_fully(catalog, state, root);
                    }
                }
                None => {
                    graph::auto_assign(catalog, state, root);
                }
            }
            id
        });
        tracing::debug!(target: "factory_planner::calculator", target_id = %id, item = item_id, rate, "target added");
        Ok(id)
    }

    /// Removes the target and every element only it kept alive.
    pub fn remove_target(&mut self, id: TargetId) -> bool {
        self.transition(|_, state| {
            let Some(pos) = state.targets.iter().position(|t| t.id == id) else {
                return false;
            };
            let target = state.targets.remove(pos);
            if !state.is_root(target.root) {
                graph::remove_subtree(state, target.root);
            }
            if state.selection.target == Some(id) {
                state.selection.target = None;
            }
            true
        })
    }

    pub fn update_target_rate(&mut self, id: TargetId, rate: f64) -> Result<bool, PlannerError> {
        let rate = validate_rate(rate)?;
        Ok(self.transition(|catalog, state| {
            let Some(target) = state.targets.iter_mut().find(|t| t.id == id) else {
                return false;
            };
            target.rate = rate;
            let root = target.root;
            recalc::recalculate_with_rate(catalog, state, root, Some(rate));
            true
        }))
    }

    // -- element edits ------------------------------------------------------

    pub fn set_recipe(&mut self, id: ElementId, recipe_id: RecipeId, expand_fully: bool) -> bool {
        self.transition(|catalog, state| {
            let changed = graph::expand_with_recipe(catalog, state, id, recipe_id);
            if changed && expand_fully {
                graph::expand_fully(catalog, state, id);
            }
            changed
        })
    }

    pub fn set_to_mining(&mut self, id: ElementId) -> bool {
        self.transition(|catalog, state| graph::set_to_mining(catalog, state, id))
    }

    pub fn set_to_extraction(&mut self, id: ElementId) -> bool {
        self.transition(|catalog, state| graph::set_to_extraction(catalog, state, id))
    }

    pub fn set_to_gathered(&mut self, id: ElementId) -> bool {
        self.transition(|_, state| graph::set_to_gathered(state, id))
    }

    pub fn set_facility(
        &mut self,
        id: ElementId,
        facility_id: &str,
        speed: f64,
        explicit_count: Option<f64>,
    ) -> Result<bool, PlannerError> {
        let speed = validate_speed(speed)?;
        let explicit_count = explicit_count.map(validate_facility_count).transpose()?;
        Ok(self.transition(|catalog, state| {
            graph::set_facility(catalog, state, id, facility_id, speed, explicit_count)
        }))
    }

    pub fn set_modifier(
        &mut self,
        id: ElementId,
        mode: ModifierMode,
        level: u8,
        item_id: Option<String>,
    ) -> bool {
        let modifier = Modifier {
            mode,
            level,
            item_id,
        };
        self.transition(|catalog, state| graph::set_modifier(catalog, state, id, modifier))
    }

    pub fn clear_source(&mut self, id: ElementId) -> bool {
        self.transition(|_, state| graph::clear_source(state, id))
    }

    pub fn link_byproduct(&mut self, producer: ElementId, item_id: &str, consumer: ElementId) -> bool {
        self.transition(|_, state| graph::link_byproduct(state, producer, item_id, consumer))
    }

    // -- defaults, positions, selection -------------------------------------

    /// Facility used for `process_type` by later expansions.
    pub fn set_default_facility(&mut self, process_type: &str, facility_id: &str) {
        self.transition(|_, state| {
            state
                .defaults
                .facilities
                .insert(process_type.to_string(), facility_id.to_string());
        });
    }

    pub fn set_default_modifier(&mut self, mode: ModifierMode, level: u8) {
        let modifier = Modifier::new(mode, level.min(rate::MAX_MODIFIER_LEVEL));
        self.transition(|_, state| state.defaults.modifier = modifier);
    }

    pub fn set_node_position(&mut self, item_id: &str, x: f64, y: f64) {
        if !(x.is_finite() && y.is_finite()) {
            return;
        }
        self.transition(|_, state| {
            state
                .node_positions
                .insert(item_id.to_string(), Position { x, y });
        });
    }

    pub fn clear_node_position(&mut self, item_id: &str) -> bool {
        self.transition(|_, state| state.node_positions.remove(item_id).is_some())
    }

    pub fn select(&mut self, target: Option<TargetId>, element: Option<ElementId>) {
        self.transition(|_, state| {
            state.selection.target = target.filter(|t| state.target(*t).is_some());
            state.selection.element = element.filter(|e| state.element(*e).is_some());
        });
    }

    // -- views --------------------------------------------------------------

    /// Elements of one target's tree, depth first, each listed once.
    pub fn target_elements(&self, id: TargetId) -> Vec<&Element> {
        let state = self.state();
        let Some(target) = state.target(id) else {
            return Vec::new();
        };
        let mut seen = BTreeSet::new();
        let mut out = Vec::new();
        let mut stack = vec![target.root];
        while let Some(current) = stack.pop() {
            if !seen.insert(current) {
                continue;
            }
            let Some(element) = state.element(current) else {
                continue;
            };
            out.push(element);
            stack.extend(element.children.iter().rev().copied());
        }
        out
    }

    /// Draw on everything not made by a recipe, summed over all targets.
    pub fn resource_needs(&self) -> Vec<ResourceNeed> {
        let state = self.state();
        resource_needs_of(state, &aggregate::reachable_elements(state))
    }

    /// Facility id -> total count over all targets.
    pub fn facility_summary(&self) -> BTreeMap<String, f64> {
        let state = self.state();
        facilities_of(state, &aggregate::reachable_elements(state))
    }

    /// Charge item -> items per minute consumed by modifiers.
    pub fn modifier_consumption(&self) -> BTreeMap<String, f64> {
        let state = self.state();
        let mut totals = BTreeMap::new();
        for id in aggregate::reachable_elements(state) {
            let Some(element) = state.element(id) else {
                continue;
            };
            let (Some(recipe_id), Some(facility)) = (
                element.source.as_ref().and_then(Source::recipe_id),
                element.facility.as_ref(),
            ) else {
                continue;
            };
            let Some(recipe) = self.catalog.recipe(recipe_id) else {
                continue;
            };
            if let Some(used) = rate::modifier_consumption(
                recipe.total_input_count(),
                recipe.cycle_seconds,
                facility.speed,
                facility.count,
                &element.modifier,
            ) {
                *totals.entry(element.modifier.charge_item()).or_insert(0.0) += used;
            }
        }
        totals
    }

    pub fn aggregate(&self) -> Aggregate {
        aggregate::aggregate(&self.catalog, self.state())
    }

    /// Aggregated graph laid out with the configured layout settings.
    pub fn totals_graph(&self) -> TotalsGraph {
        self.totals_graph_with(&self.config.layout)
    }

    /// Aggregated graph with placements; manual positions win over the
    /// computed ones.
    pub fn totals_graph_with(&self, config: &LayoutConfig) -> TotalsGraph {
        let state = self.state();
        let aggregate = self.aggregate();
        let targets: BTreeSet<String> = state.targets.iter().map(|t| t.item_id.clone()).collect();
        let mut placed = layout::layout(&aggregate, &targets, config);

        let nodes = aggregate
            .items
            .values()
            .filter_map(|item| {
                let mut placement = placed.nodes.remove(&item.item_id)?;
                let manual = match state.node_positions.get(&item.item_id) {
                    Some(pos) => {
                        placement.x = pos.x;
                        placement.y = pos.y;
                        true
                    }
                    None => false,
                };
                Some(GraphNode {
                    item_id: item.item_id.clone(),
                    name: self.catalog.item_name(&item.item_id),
                    required_rate: item.required_rate,
                    actual_rate: item.actual_rate,
                    source_kinds: item.source_kinds.clone(),
                    facilities: item.facilities.clone(),
                    placement,
                    manual,
                })
            })
            .collect();

        TotalsGraph {
            nodes,
            edges: aggregate.edges,
        }
    }

    // -- reports ------------------------------------------------------------

    /// Indented tree of one target, one element per line.
    pub fn format_production_tree(&self, id: TargetId) -> String {
        let mut output = String::new();
        if let Some(target) = self.state().target(id) {
            let mut path = Vec::new();
            self.write_tree(target.root, 0, &mut path, &mut output);
        }
        output
    }

    fn write_tree(&self, id: ElementId, indent: usize, path: &mut Vec<ElementId>, output: &mut String) {
        let Some(element) = self.state().element(id) else {
            return;
        };
        let prefix = "  ".repeat(indent);
        let name = self.catalog.item_name(&element.item_id);
        output.push_str(&format!(
            "{}{} @ {:.2}/min [{}] {}\n",
            prefix,
            name,
            element.required_rate,
            id,
            self.describe_source(element)
        ));
        for byproduct in &element.byproducts {
            output.push_str(&format!(
                "{}  + {} @ {:.2}/min (byproduct)\n",
                prefix,
                self.catalog.item_name(&byproduct.item_id),
                byproduct.rate
            ));
        }
        if path.contains(&id) {
            return;
        }
        path.push(id);
        for child in &element.children {
            self.write_tree(*child, indent + 1, path, output);
        }
        path.pop();
    }

    fn describe_source(&self, element: &Element) -> String {
        let facility = match &element.facility {
            Some(f) => {
                let pin = if f.pinned { ", pinned" } else { "" };
                format!(" {:.2}x {}{}", f.count, self.facility_name(&f.id), pin)
            }
            None => String::new(),
        };
        let modifier = if element.modifier.is_inert() {
            String::new()
        } else {
            format!(" +{} L{}", element.modifier.mode, element.modifier.level)
        };
        match &element.source {
            Some(Source::Recipe { recipe_id }) => {
                let recipe = self
                    .catalog
                    .recipe(*recipe_id)
                    .map(|r| r.name)
                    .unwrap_or_else(|| format!("recipe {}", recipe_id));
                format!("via {}:{}{}", recipe, facility, modifier)
            }
            Some(source) if facility.is_empty() => source.kind().to_string(),
            Some(source) => format!("{}:{}", source.kind(), facility),
            None => "unassigned".to_string(),
        }
    }

    fn facility_name(&self, id: &str) -> String {
        self.catalog
            .facility(id)
            .map(|f| f.name)
            .unwrap_or_else(|| id.to_string())
    }

    pub fn summarize_target(&self, id: TargetId) -> Option<ProductionSummary> {
        let state = self.state();
        let target = state.target(id)?;
        let elements = aggregate::reachable_from(state, &[target.root]);

        let facilities = facilities_of(state, &elements)
            .into_iter()
            .map(|(id, count)| (self.facility_name(&id), count))
            .collect();

        let mut byproducts: BTreeMap<String, f64> = BTreeMap::new();
        for element in elements.iter().filter_map(|e| state.element(*e)) {
            for byproduct in &element.byproducts {
                *byproducts.entry(byproduct.item_id.clone()).or_insert(0.0) += byproduct.rate;
            }
        }

        Some(ProductionSummary {
            target_item: self.catalog.item_name(&target.item_id),
            target_rate: target.rate,
            actual_rate: state.element(target.root).map_or(0.0, |e| e.actual_rate),
            facilities,
            raw_inputs: resource_needs_of(state, &elements)
                .into_iter()
                .map(|need| (self.catalog.item_name(&need.item_id), need.kind, need.rate))
                .collect(),
            byproducts: byproducts
                .into_iter()
                .map(|(item, rate)| (self.catalog.item_name(&item), rate))
                .collect(),
        })
    }
}

fn resource_needs_of(state: &PlannerState, elements: &[ElementId]) -> Vec<ResourceNeed> {
    let mut totals: BTreeMap<(String, SourceKind), f64> = BTreeMap::new();
    for element in elements.iter().filter_map(|id| state.element(*id)) {
        let kind = element.source_kind();
        if kind == SourceKind::Recipe {
            continue;
        }
        *totals.entry((element.item_id.clone(), kind)).or_insert(0.0) += element.required_rate;
    }
    totals
        .into_iter()
        .map(|((item_id, kind), rate)| ResourceNeed { item_id, kind, rate })
        .collect()
}

fn facilities_of(state: &PlannerState, elements: &[ElementId]) -> BTreeMap<String, f64> {
    let mut totals = BTreeMap::new();
    for element in elements.iter().filter_map(|id| state.element(*id)) {
        if let Some(facility) = &element.facility {
            *totals.entry(facility.id.clone()).or_insert(0.0) += facility.count;
        }
    }
    totals
}

/// Rate drawn for an item that is not produced by a recipe
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceNeed {
    pub item_id: String,
    pub kind: SourceKind,
    pub rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphNode {
    pub item_id: String,
    pub name: String,
    pub required_rate: f64,
    pub actual_rate: f64,
    pub source_kinds: BTreeSet<SourceKind>,
    pub facilities: BTreeMap<String, f64>,
    pub placement: NodePlacement,
    /// Placement comes from a saved manual position.
    pub manual: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TotalsGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<AggregatedEdge>,
}

impl TotalsGraph {
    pub fn node(&self, item_id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.item_id == item_id)
    }
}

/// Summary of one target's production chain
#[derive(Debug)]
pub struct ProductionSummary {
    pub target_item: String,
    pub target_rate: f64,
    pub actual_rate: f64,
    /// (facility name, count)
    pub facilities: Vec<(String, f64)>,
    /// (item name, how it is sourced, rate)
    pub raw_inputs: Vec<(String, SourceKind, f64)>,
    pub byproducts: Vec<(String, f64)>,
}

impl fmt::Display for ProductionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Production Summary ===")?;
        writeln!(
            f,
            "Target: {} @ {:.2}/min (producing {:.2}/min)",
            self.target_item, self.target_rate, self.actual_rate
        )?;
        writeln!(f)?;

        writeln!(f, "Facilities required:")?;
        for (name, count) in &self.facilities {
            writeln!(f, "  {:.2}x {}", count, name)?;
        }
        writeln!(f)?;

        writeln!(f, "Raw inputs required:")?;
        for (name, kind, rate) in &self.raw_inputs {
            writeln!(f, "  {} @ {:.2}/min ({})", name, rate, kind)?;
        }

        if !self.byproducts.is_empty() {
            writeln!(f)?;
            writeln!(f, "Byproducts:")?;
            for (name, rate) in &self.byproducts {
                writeln!(f, "  {} @ {:.2}/min", name, rate)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::catalog::MemoryCatalog;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn catalog() -> MemoryCatalog {
        MemoryCatalog::new()
            .with_item("gear", "Gear")
            .with_item("ore", "Iron Ore")
            .with_recipe(1, "assembly", 1.0, &[("plate", 2.0)], &[("gear", 1.0)])
            .with_recipe(2, "smelting", 2.0, &[("ore", 1.0)], &[("plate", 1.0)])
            .with_recipe(3, "refining", 4.0, &[("oil", 2.0)], &[("fuel", 2.0), ("gas", 1.0)])
            .with_mining("ore", 2.0)
            .with_extraction("oil", 30.0)
            .with_facility("assembler", "assembly", 1.0)
            .with_facility("fast_assembler", "assembly", 2.0)
            .with_default_facility("assembly", "assembler")
    }

    #[test]
    fn add_target_rejects_bad_rates() {
        let mut planner = Planner::new(catalog());
        for rate in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(planner.add_target("gear", rate).is_err());
        }
        assert!(planner.state().targets.is_empty());
    }

    #[test]
    fn add_target_expands_default_recipe() {
        let mut planner = Planner::new(catalog());
        let id = planner.add_target("gear", 60.0).unwrap();
        let elements = planner.target_elements(id);
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0].item_id, "gear");
        assert_eq!(elements[1].item_id, "plate");
        assert!(close(elements[1].required_rate, 120.0));
        assert!(elements[1].source.is_none());
    }

    #[test]
    fn full_expansion_reaches_mining() {
        let mut planner = Planner::new(catalog());
        let id = planner.add_target_with("gear", 60.0, true).unwrap();
        let items: Vec<_> = planner
            .target_elements(id)
            .iter()
            .map(|e| e.item_id.clone())
            .collect();
        assert_eq!(items, vec!["gear", "plate", "ore"]);

        let needs = planner.resource_needs();
        assert_eq!(needs.len(), 1);
        assert_eq!(needs[0].kind, SourceKind::Mining);
        assert!(close(needs[0].rate, 120.0));
        // 30 ore per minute per mining facility
        assert!(close(planner.facility_summary()["mining"], 4.0));
    }

    #[test]
    fn raw_target_is_auto_assigned() {
        let mut planner = Planner::new(catalog());
        let id = planner.add_target("oil", 45.0).unwrap();
        let root = planner.target_elements(id)[0];
        assert_eq!(root.source_kind(), SourceKind::Extraction);
        assert!(close(root.facility_count(), 1.5));
    }

    #[test]
    fn update_rate_rescales_the_tree() {
        let mut planner = Planner::new(catalog());
        let id = planner.add_target_with("gear", 60.0, true).unwrap();
        assert!(planner.update_target_rate(id, 30.0).unwrap());
        assert!(planner.update_target_rate(id, 0.0).is_err());
        assert!(!planner.update_target_rate(TargetId(999), 5.0).unwrap());

        let elements = planner.target_elements(id);
        assert!(close(elements[0].required_rate, 30.0));
        assert!(close(elements[2].required_rate, 60.0));
        assert!(close(planner.state().targets[0].rate, 30.0));
    }

    #[test]
    fn remove_target_drops_its_elements() {
        let mut planner = Planner::new(catalog());
        let a = planner.add_target_with("gear", 60.0, true).unwrap();
        planner.add_target("oil", 30.0).unwrap();
        assert!(planner.remove_target(a));
        assert!(!planner.remove_target(a));
        assert_eq!(planner.state().elements.len(), 1);
    }

    #[test]
    fn set_facility_validates_input() {
        let mut planner = Planner::new(catalog());
        let id = planner.add_target("gear", 60.0).unwrap();
        let root = planner.state().targets[0].root;
        assert!(planner.set_facility(root, "fast_assembler", 0.0, None).is_err());
        assert!(planner.set_facility(root, "fast_assembler", 2.0, Some(-1.0)).is_err());
        assert!(planner.set_facility(root, "fast_assembler", 2.0, None).unwrap());
        assert!(close(planner.target_elements(id)[0].facility_count(), 0.5));
    }

    #[test]
    fn modifier_charges_are_reported_per_charge_item() {
        let mut planner = Planner::new(catalog());
        planner.add_target("gear", 60.0).unwrap();
        let root = planner.state().targets[0].root;
        assert!(planner.set_modifier(root, ModifierMode::Speed, 1, None));
        let used = planner.modifier_consumption();
        // 2 plates per craft, 60 crafts/min at 1.25x over 0.8 facilities, 12 charges each
        assert!(close(used["proliferator_mk1"], 2.0 * 60.0 * 1.25 * 0.8 / 12.0));
    }

    #[test]
    fn listeners_see_each_change() {
        let mut planner = Planner::new(catalog());
        let seen = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&seen);
        planner.on_change(move |_| *counter.borrow_mut() += 1);

        planner.add_target("gear", 60.0).unwrap();
        planner.set_default_modifier(ModifierMode::Product, 9);
        assert!(!planner.clear_node_position("gear"));
        assert_eq!(*seen.borrow(), 2);
        assert_eq!(planner.state().defaults.modifier.level, 3);
    }

    #[test]
    fn manual_positions_override_layout() {
        let mut planner = Planner::new(catalog());
        planner.add_target_with("gear", 60.0, true).unwrap();
        planner.set_node_position("plate", 500.0, 42.0);

        let graph = planner.totals_graph();
        let plate = graph.node("plate").unwrap();
        assert!(plate.manual);
        assert_eq!(plate.placement.x, 500.0);
        assert_eq!(plate.placement.y, 42.0);
        assert!(!graph.node("gear").unwrap().manual);
        assert_eq!(graph.node("gear").unwrap().placement.row, 0);
        assert_eq!(graph.edges.len(), 2);
    }

    #[test]
    fn reports_mention_byproducts() {
        let mut planner = Planner::new(catalog());
        let id = planner.add_target_with("fuel", 30.0, true).unwrap();
        let tree = planner.format_production_tree(id);
        assert!(tree.contains("gas @ 15.00/min (byproduct)"));
        assert!(tree.lines().nth(2).is_some_and(|l| l.starts_with("  oil")));

        let summary = planner.summarize_target(id).unwrap();
        assert_eq!(summary.byproducts, vec![("gas".to_string(), 15.0)]);
        let text = summary.to_string();
        assert!(text.contains("Byproducts:"));
        assert!(text.contains("oil @ 30.00/min (extracted)"));
    }

    #[test]
    fn select_ignores_unknown_ids() {
        let mut planner = Planner::new(catalog());
        let id = planner.add_target("gear", 60.0).unwrap();
        planner.select(Some(id), Some(ElementId(999)));
        assert_eq!(planner.state().selection.target, Some(id));
        assert_eq!(planner.state().selection.element, None);
    }
}
