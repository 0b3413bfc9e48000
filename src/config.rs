//! Planner configuration: layout tuning and expansion defaults

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::layout::LayoutConfig;

pub const CONFIG_ENV_VAR: &str = "FACTORY_PLANNER_CONFIG";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub layout: LayoutConfig,
    /// Expand new targets all the way down to raw resources.
    pub expand_fully_by_default: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse planner config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read planner config from {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl PlannerConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents)
    }
}

/// Loads the config from `explicit`, else from `FACTORY_PLANNER_CONFIG`,
/// else the built-in defaults. Unreadable files fall back to the defaults.
pub fn load_config(explicit: Option<&Path>) -> PlannerConfig {
    let path = explicit
        .map(Path::to_path_buf)
        .or_else(|| env::var(CONFIG_ENV_VAR).ok().map(PathBuf::from));

    let Some(path) = path else {
        tracing::debug!(target: "factory_planner::config", "config.loaded=builtin");
        return PlannerConfig::default();
    };

    match PlannerConfig::from_file(&path) {
        Ok(config) => {
            tracing::info!(
                target: "factory_planner::config",
                path = %path.display(),
                "config.loaded=file"
            );
            config
        }
        Err(err) => {
            tracing::warn!(
                target: "factory_planner::config",
                path = %path.display(),
                error = %err,
                "config.load_failed"
            );
            PlannerConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config =
            PlannerConfig::from_json_str(r#"{ "layout": { "gap": 12.0 }, "expand_fully_by_default": true }"#)
                .unwrap();
        assert_eq!(config.layout.gap, 12.0);
        assert_eq!(config.layout.sweeps, LayoutConfig::default().sweeps);
        assert!(config.expand_fully_by_default);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(
            PlannerConfig::from_json_str("{ nope"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let path = env::temp_dir().join("factory-planner-missing-config.json");
        let _ = fs::remove_file(&path);
        assert!(matches!(
            PlannerConfig::from_file(&path),
            Err(ConfigError::Read { .. })
        ));
        assert_eq!(load_config(Some(&path)), PlannerConfig::default());
    }
}
