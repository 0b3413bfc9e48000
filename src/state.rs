//! Planner state and the container that serializes every mutation
//!
//! The state is only ever replaced as a whole: a transition receives the
//! current state, builds the next one and hands it back. Subscribers are told
//! about the new state after the swap.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::models::{Element, ElementId, Modifier, Target, TargetId};

/// Defaults applied when elements are expanded
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GlobalDefaults {
    /// Process type -> facility id.
    #[serde(default)]
    pub facilities: BTreeMap<String, String>,
    #[serde(default)]
    pub modifier: Modifier,
}

/// Manually placed node in the totals graph
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Selection {
    #[serde(default)]
    pub target: Option<TargetId>,
    #[serde(default)]
    pub element: Option<ElementId>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlannerState {
    #[serde(default)]
    pub targets: Vec<Target>,
    #[serde(default)]
    pub defaults: GlobalDefaults,
    #[serde(default)]
    pub elements: BTreeMap<ElementId, Element>,
    /// Item id -> manual position override.
    #[serde(default)]
    pub node_positions: BTreeMap<String, Position>,
    #[serde(default)]
    pub selection: Selection,
    #[serde(default)]
    pub next_id: u64,
}

impl PlannerState {
    pub fn element(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(&id)
    }

    pub fn target(&self, id: TargetId) -> Option<&Target> {
        self.targets.iter().find(|t| t.id == id)
    }

    /// Hands out a fresh id. Element and target ids share one counter.
    pub fn allocate_id(&mut self) -> u64 {
        // Loaded states may carry a stale counter.
        while self.elements.contains_key(&ElementId(self.next_id))
            || self.targets.iter().any(|t| t.id.0 == self.next_id)
        {
            self.next_id += 1;
        }
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn is_root(&self, id: ElementId) -> bool {
        self.targets.iter().any(|t| t.root == id)
    }
}

pub type Listener = Box<dyn FnMut(&PlannerState)>;

/// Single point through which the planner state changes.
pub struct Store {
    state: PlannerState,
    listeners: HashMap<usize, Listener>,
    next_listener: usize,
}

impl Store {
    pub fn new(state: PlannerState) -> Self {
        Self {
            state,
            listeners: HashMap::new(),
            next_listener: 0,
        }
    }

    pub fn state(&self) -> &PlannerState {
        &self.state
    }

    /// Replaces the state with `transition(current)` and notifies listeners
    /// if anything changed. Returns whether the state changed.
    pub fn apply<F>(&mut self, transition: F) -> bool
    where
        F: FnOnce(&PlannerState) -> PlannerState,
    {
        let next = transition(&self.state);
        self.commit(next)
    }

    /// Like [`Store::apply`], but the transition also hands back a value.
    pub fn apply_with<R, F>(&mut self, transition: F) -> R
    where
        F: FnOnce(&PlannerState) -> (PlannerState, R),
    {
        let (next, out) = transition(&self.state);
        self.commit(next);
        out
    }

    fn commit(&mut self, next: PlannerState) -> bool {
        if next == self.state {
            return false;
        }
        self.state = next;
        let mut ids: Vec<usize> = self.listeners.keys().copied().collect();
        ids.sort_unstable();
        for id in ids {
            if let Some(listener) = self.listeners.get_mut(&id) {
                listener(&self.state);
            }
        }
        true
    }

    /// Registers a change callback; the returned handle unsubscribes it.
    pub fn on_change<F>(&mut self, listener: F) -> usize
    where
        F: FnMut(&PlannerState) + 'static,
    {
        let id = self.next_listener;
        self.next_listener += 1;
        self.listeners.insert(id, Box::new(listener));
        id
    }

    pub fn unsubscribe(&mut self, handle: usize) -> bool {
        self.listeners.remove(&handle).is_some()
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new(PlannerState::default())
    }
}
