//! Factory Planner
//!
//! Production chain planner for factory-building games: per-target element
//! trees with live rate propagation, an item-level totals graph and its
//! layered layout.

pub mod aggregate;
pub mod calculator;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod graph;
pub mod layout;
pub mod models;
pub mod persist;
pub mod rate;
pub mod recalc;
pub mod sample;
pub mod state;

pub use calculator::Planner;
pub use catalog::{Catalog, MemoryCatalog};
pub use error::PlannerError;
pub use state::{PlannerState, Store};
