//! Save and load hooks for planner state
//!
//! Loading never fails: a missing or unreadable file yields the empty state.
//! Saving is wired as a [`Store`](crate::state::Store) subscriber whose
//! failures are logged and otherwise ignored.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::state::PlannerState;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("failed to read state from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write state to {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to decode state: {0}")]
    Decode(#[from] serde_json::Error),
}

pub fn decode_state(json: &str) -> Result<PlannerState, PersistError> {
    Ok(serde_json::from_str(json)?)
}

pub fn encode_state(state: &PlannerState) -> Result<String, PersistError> {
    Ok(serde_json::to_string_pretty(state)?)
}

pub fn read_state(path: &Path) -> Result<PlannerState, PersistError> {
    let contents = fs::read_to_string(path).map_err(|source| PersistError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    decode_state(&contents)
}

/// Loads state from `path`, falling back to the empty state.
pub fn load_state(path: &Path) -> PlannerState {
    match read_state(path) {
        Ok(state) => {
            tracing::info!(
                target: "factory_planner::persist",
                path = %path.display(),
                targets = state.targets.len(),
                elements = state.elements.len(),
                "state.loaded"
            );
            state
        }
        Err(PersistError::Read { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(target: "factory_planner::persist", path = %path.display(), "state.missing");
            PlannerState::default()
        }
        Err(err) => {
            tracing::warn!(
                target: "factory_planner::persist",
                path = %path.display(),
                error = %err,
                "state.load_failed"
            );
            PlannerState::default()
        }
    }
}

/// Writes through a sibling temp file so a failed write leaves the old file.
pub fn save_state(path: &Path, state: &PlannerState) -> Result<(), PersistError> {
    let json = encode_state(state)?;
    let tmp = path.with_extension("json.tmp");
    let write_err = |source| PersistError::Write {
        path: path.to_path_buf(),
        source,
    };
    fs::write(&tmp, json).map_err(write_err)?;
    fs::rename(&tmp, path).map_err(write_err)?;
    Ok(())
}

/// Change subscriber that saves every new state to `path`.
pub fn file_subscriber(path: PathBuf) -> impl FnMut(&PlannerState) + 'static {
    move |state| {
        if let Err(err) = save_state(&path, state) {
            tracing::warn!(
                target: "factory_planner::persist",
                path = %path.display(),
                error = %err,
                "state.save_failed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Element, ElementId, Target, TargetId};
    use crate::state::{Position, Store};

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("factory-planner-{}-{}", name, std::process::id()));
        let _ = fs::create_dir_all(&dir);
        dir.join("state.json")
    }

    fn sample_state() -> PlannerState {
        let mut state = PlannerState::default();
        let root = ElementId(0);
        state
            .elements
            .insert(root, Element::leaf(root, "gear", 10.0, None, 0));
        state.targets.push(Target {
            id: TargetId(1),
            item_id: "gear".to_string(),
            rate: 10.0,
            root,
        });
        state
            .node_positions
            .insert("gear".to_string(), Position { x: 4.0, y: 8.0 });
        state.selection.target = Some(TargetId(1));
        state.next_id = 2;
        state
    }

    #[test]
    fn state_round_trips_through_json() {
        let state = sample_state();
        let decoded = decode_state(&encode_state(&state).unwrap()).unwrap();
        assert_eq!(decoded, state);
    }

    #[test]
    fn missing_or_malformed_file_loads_empty_state() {
        let path = scratch("malformed");
        let _ = fs::remove_file(&path);
        assert_eq!(load_state(&path), PlannerState::default());

        fs::write(&path, "{ \"targets\": 12 ").unwrap();
        assert_eq!(load_state(&path), PlannerState::default());
    }

    #[test]
    fn subscriber_saves_on_change() {
        let path = scratch("subscriber");
        let _ = fs::remove_file(&path);
        let mut store = Store::default();
        store.on_change(file_subscriber(path.clone()));
        store.apply(|_| sample_state());

        assert_eq!(load_state(&path), sample_state());
    }

    #[test]
    fn failed_save_leaves_memory_state_alone() {
        let path = std::env::temp_dir()
            .join("factory-planner-no-such-dir")
            .join("nested")
            .join("state.json");
        let mut store = Store::default();
        store.on_change(file_subscriber(path));
        assert!(store.apply(|_| sample_state()));
        assert_eq!(store.state(), &sample_state());
    }
}
