//! Layered layout for the aggregated item graph
//!
//! Four phases:
//! 1. Row assignment (longest path from raw materials, inverted, targets pinned to row 0)
//! 2. Rigid-chain detection (single-consumer/single-supplier runs share an X)
//! 3. Ordering within rows (alternating barycenter sweeps)
//! 4. X-coordinate assignment (anchored nodes first, then floating nodes)
//!
//! The result is a readability heuristic. It never fails; with nothing to
//! improve it degrades to plain left-to-right packing.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::aggregate::Aggregate;

const EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub min_node_width: f64,
    /// Extra width per distinct supplier.
    pub supplier_slot_width: f64,
    pub node_padding: f64,
    /// Minimum horizontal gap between two nodes of a row.
    pub gap: f64,
    pub row_height: f64,
    /// Number of alternating barycenter sweeps.
    pub sweeps: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            min_node_width: 120.0,
            supplier_slot_width: 36.0,
            node_padding: 24.0,
            gap: 40.0,
            row_height: 140.0,
            sweeps: 4,
        }
    }
}

impl LayoutConfig {
    pub fn node_width(&self, suppliers: usize) -> f64 {
        (suppliers as f64 * self.supplier_slot_width + self.node_padding).max(self.min_node_width)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodePlacement {
    pub item_id: String,
    pub row: usize,
    /// Position within the row after ordering.
    pub order: usize,
    /// Left edge.
    pub x: f64,
    pub y: f64,
    pub width: f64,
    /// Group key of the rigid chain the node belongs to.
    pub chain: Option<String>,
}

impl NodePlacement {
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn center(&self) -> f64 {
        self.x + self.width / 2.0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Layout {
    pub nodes: BTreeMap<String, NodePlacement>,
    /// Item ids per row, in left-to-right order.
    pub rows: Vec<Vec<String>>,
}

impl Layout {
    pub fn node(&self, item_id: &str) -> Option<&NodePlacement> {
        self.nodes.get(item_id)
    }
}

/// Lays out every item of `aggregate`. Items in `targets` always land on
/// row 0.
pub fn layout(aggregate: &Aggregate, targets: &BTreeSet<String>, config: &LayoutConfig) -> Layout {
    if aggregate.items.is_empty() {
        return Layout::default();
    }
    let rows_of = assign_rows(aggregate, targets);
    let chains = detect_chains(aggregate, &rows_of);
    let rows = order_rows(aggregate, &rows_of, &chains, config.sweeps);
    let nodes = assign_x(aggregate, &rows, &chains, config);
    Layout { nodes, rows }
}

// ---------------------------------------------------------------------------
// Phase 1: rows
// ---------------------------------------------------------------------------

/// Longest distance from a leaf item, inverted so the furthest consumers sit
/// on row 0. Empty rows are squeezed out.
pub fn assign_rows(aggregate: &Aggregate, targets: &BTreeSet<String>) -> BTreeMap<String, usize> {
    let limit = aggregate.items.len();
    let mut distance: BTreeMap<&str, usize> = BTreeMap::new();
    let mut queue: VecDeque<&str> = VecDeque::new();
    for (item_id, item) in &aggregate.items {
        if item.suppliers.is_empty() {
            distance.insert(item_id, 0);
            queue.push_back(item_id);
        }
    }

    while let Some(item_id) = queue.pop_front() {
        let next = distance[item_id] + 1;
        // Item cycles would grow distances forever.
        if next >= limit {
            continue;
        }
        for consumer in aggregate.consumers_of(item_id) {
            let longer = distance.get(consumer.as_str()).is_none_or(|d| next > *d);
            if longer {
                distance.insert(consumer, next);
                queue.push_back(consumer);
            }
        }
    }

    let max = distance.values().copied().max().unwrap_or(0);
    let raw: BTreeMap<&str, usize> = aggregate
        .items
        .keys()
        .map(|item_id| {
            let row = if targets.contains(item_id) {
                0
            } else {
                max - distance.get(item_id.as_str()).copied().unwrap_or(0)
            };
            (item_id.as_str(), row)
        })
        .collect();

    let used: BTreeSet<usize> = raw.values().copied().collect();
    let compact: HashMap<usize, usize> = used.iter().enumerate().map(|(i, r)| (*r, i)).collect();
    raw.into_iter()
        .map(|(item_id, row)| (item_id.to_string(), compact[&row]))
        .collect()
}

// ---------------------------------------------------------------------------
// Phase 2: rigid chains
// ---------------------------------------------------------------------------

/// Maps every member of a rigid chain to the chain's key (its topmost item).
///
/// `s` links up to `c` when `c` is the only consumer of `s`, `s` is the only
/// supplier of `c`, and `c` sits on a higher row.
pub fn detect_chains(
    aggregate: &Aggregate,
    rows_of: &BTreeMap<String, usize>,
) -> BTreeMap<String, String> {
    let mut up: BTreeMap<&str, &str> = BTreeMap::new();
    for item_id in aggregate.items.keys() {
        let consumers = aggregate.consumers_of(item_id);
        if consumers.len() != 1 {
            continue;
        }
        let Some(consumer) = consumers.iter().next() else {
            continue;
        };
        if aggregate.suppliers_of(consumer).len() != 1 {
            continue;
        }
        if rows_of.get(consumer) < rows_of.get(item_id) {
            up.insert(item_id, consumer);
        }
    }
    let has_link_below: BTreeSet<&str> = up.values().copied().collect();

    let mut chains = BTreeMap::new();
    // Walk from each chain bottom upwards.
    for bottom in up.keys().filter(|item| !has_link_below.contains(*item)) {
        let mut members = vec![*bottom];
        let mut current = *bottom;
        while let Some(next) = up.get(current) {
            if members.contains(next) {
                break;
            }
            members.push(*next);
            current = *next;
        }
        let key = current.to_string();
        for member in members {
            chains.insert(member.to_string(), key.clone());
        }
    }
    chains
}

// ---------------------------------------------------------------------------
// Phase 3: ordering
// ---------------------------------------------------------------------------

#[derive(Clone, Copy)]
enum Sweep {
    /// Order by supplier positions.
    Up,
    /// Order by consumer positions.
    Down,
}

fn neighbours<'a>(aggregate: &'a Aggregate, item_id: &str, sweep: Sweep) -> &'a BTreeSet<String> {
    match sweep {
        Sweep::Up => aggregate.suppliers_of(item_id),
        Sweep::Down => aggregate.consumers_of(item_id),
    }
}

fn positions(rows: &[Vec<String>]) -> HashMap<String, f64> {
    rows.iter()
        .flat_map(|row| row.iter().enumerate().map(|(i, item)| (item.clone(), i as f64)))
        .collect()
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}

/// Mean position of the neighbours of an item, or of the whole chain it
/// belongs to (neighbours inside the chain excluded).
fn barycenter(
    aggregate: &Aggregate,
    item_id: &str,
    sweep: Sweep,
    chains: &BTreeMap<String, String>,
    members: &BTreeMap<&str, Vec<&str>>,
    pos: &HashMap<String, f64>,
) -> Option<f64> {
    match chains.get(item_id) {
        Some(key) => {
            let group = members.get(key.as_str())?;
            mean(
                group
                    .iter()
                    .flat_map(|m| neighbours(aggregate, m, sweep))
                    .filter(|n| chains.get(*n) != Some(key))
                    .filter_map(|n| pos.get(n).copied()),
            )
        }
        None => mean(
            neighbours(aggregate, item_id, sweep)
                .iter()
                .filter_map(|n| pos.get(n).copied()),
        ),
    }
}

fn reorder_row(
    rows: &mut [Vec<String>],
    index: usize,
    aggregate: &Aggregate,
    sweep: Sweep,
    chains: &BTreeMap<String, String>,
    members: &BTreeMap<&str, Vec<&str>>,
) {
    let pos = positions(rows);
    let mut keyed: Vec<(f64, usize, String)> = rows[index]
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let key = barycenter(aggregate, item, sweep, chains, members, &pos).unwrap_or(i as f64);
            (key, i, item.clone())
        })
        .collect();
    keyed.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
    rows[index] = keyed.into_iter().map(|(_, _, item)| item).collect();
}

/// Bottom row by consumer positions, the rest alphabetical, then
/// `sweeps` alternating barycenter passes.
pub fn order_rows(
    aggregate: &Aggregate,
    rows_of: &BTreeMap<String, usize>,
    chains: &BTreeMap<String, String>,
    sweeps: usize,
) -> Vec<Vec<String>> {
    let row_count = rows_of.values().copied().max().map_or(0, |m| m + 1);
    let mut rows: Vec<Vec<String>> = vec![Vec::new(); row_count];
    // BTreeMap iteration keeps each row alphabetical.
    for (item_id, row) in rows_of {
        rows[*row].push(item_id.clone());
    }
    if row_count == 0 {
        return rows;
    }

    let mut members: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for (item_id, key) in chains {
        members.entry(key.as_str()).or_default().push(item_id.as_str());
    }

    let bottom = row_count - 1;
    if bottom > 0 {
        reorder_row(&mut rows, bottom, aggregate, Sweep::Down, chains, &members);
    }

    for sweep in 0..sweeps {
        if sweep % 2 == 0 {
            for index in (0..bottom).rev() {
                reorder_row(&mut rows, index, aggregate, Sweep::Up, chains, &members);
            }
        } else {
            for index in 1..row_count {
                reorder_row(&mut rows, index, aggregate, Sweep::Down, chains, &members);
            }
        }
    }
    rows
}

// ---------------------------------------------------------------------------
// Phase 4: X coordinates
// ---------------------------------------------------------------------------

fn fits(x: f64, width: f64, occupied: &[(f64, f64)], gap: f64) -> bool {
    occupied
        .iter()
        .all(|(left, right)| x + width + gap <= left + EPSILON || right + gap <= x + EPSILON)
}

/// Non-overlapping spot nearest `desired`, trying the desired spot, then
/// right of and left of every occupied interval. `None` if nothing fits.
fn nearest_free(desired: f64, width: f64, occupied: &[(f64, f64)], gap: f64) -> Option<f64> {
    let mut candidates = vec![desired];
    for (left, right) in occupied {
        candidates.push(right + gap);
        candidates.push(left - gap - width);
    }
    candidates
        .into_iter()
        .filter(|x| fits(*x, width, occupied, gap))
        .min_by(|a, b| (a - desired).abs().total_cmp(&(b - desired).abs()))
}

fn right_edge(occupied: &[(f64, f64)], gap: f64) -> f64 {
    occupied
        .iter()
        .map(|(_, right)| right + gap)
        .fold(None, |acc: Option<f64>, r| Some(acc.map_or(r, |a| a.max(r))))
        .unwrap_or(0.0)
}

pub fn assign_x(
    aggregate: &Aggregate,
    rows: &[Vec<String>],
    chains: &BTreeMap<String, String>,
    config: &LayoutConfig,
) -> BTreeMap<String, NodePlacement> {
    let mut placed: BTreeMap<String, NodePlacement> = BTreeMap::new();
    let place = |item_id: &str, row: usize, order: usize, x: f64, width: f64| NodePlacement {
        item_id: item_id.to_string(),
        row,
        order,
        x,
        y: row as f64 * config.row_height,
        width,
        chain: chains.get(item_id).cloned(),
    };

    for (row, items) in rows.iter().enumerate() {
        let widths: Vec<f64> = items
            .iter()
            .map(|item| config.node_width(aggregate.suppliers_of(item).len()))
            .collect();

        if row == 0 {
            let mut x = 0.0;
            for (order, (item, width)) in items.iter().zip(&widths).enumerate() {
                placed.insert(item.clone(), place(item, row, order, x, *width));
                x += width + config.gap;
            }
            continue;
        }

        let mut anchored: Vec<(f64, usize)> = Vec::new();
        let mut floating: Vec<(Option<f64>, usize)> = Vec::new();
        for (order, item) in items.iter().enumerate() {
            let consumers = aggregate.consumers_of(item);
            let desired_center = mean(
                consumers
                    .iter()
                    .filter_map(|c| placed.get(c))
                    .map(NodePlacement::center),
            );
            let desired = desired_center.map(|c| c - widths[order] / 2.0);
            match desired {
                Some(x) if consumers.len() == 1 => anchored.push((x, order)),
                _ => floating.push((desired, order)),
            }
        }

        let mut occupied: Vec<(f64, f64)> = Vec::with_capacity(items.len());
        anchored.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        let mut cursor: Option<f64> = None;
        for (desired, order) in anchored {
            let width = widths[order];
            let x = match cursor {
                Some(right) => desired.max(right + config.gap),
                None => desired,
            };
            cursor = Some(x + width);
            occupied.push((x, x + width));
            placed.insert(items[order].clone(), place(&items[order], row, order, x, width));
        }

        for (desired, order) in floating {
            let width = widths[order];
            let fallback = right_edge(&occupied, config.gap);
            let x = desired
                .and_then(|d| nearest_free(d, width, &occupied, config.gap))
                .unwrap_or(fallback);
            occupied.push((x, x + width));
            placed.insert(items[order].clone(), place(&items[order], row, order, x, width));
        }
    }

    let min_x = placed.values().map(|n| n.x).fold(f64::INFINITY, f64::min);
    if min_x.is_finite() && min_x != 0.0 {
        for node in placed.values_mut() {
            node.x -= min_x;
        }
    }
    placed
}
