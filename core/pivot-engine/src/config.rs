//! FILENAME: core/pivot-engine/src/config.rs
//! Engine configuration: the names of the synthetic axes and index defaults.

use std::path::Path;

use datamodel::MAX_JSON_ARRAY_LEN;
use serde::{Deserialize, Serialize};

use crate::error::PivotError;

/// Smallest and largest value accepted on an integer axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidRange {
    pub min: i64,
    #[serde(default)]
    pub max: Option<i64>,
}

impl ValidRange {
    pub fn from_min(min: i64) -> Self {
        ValidRange { min, max: None }
    }

    pub fn contains(&self, value: i64) -> bool {
        value >= self.min && self.max.map_or(true, |max| value <= max)
    }
}

impl Default for ValidRange {
    fn default() -> Self {
        ValidRange { min: 1, max: None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PivotConfig {
    /// Axis holding parameter names.
    #[serde(default = "default_parameter_axis")]
    pub parameter_axis: String,

    /// The scalar index axis (the value row's integer index).
    #[serde(default = "default_index_axis")]
    pub index_axis: String,

    /// Axis along which json array values are exploded.
    #[serde(default = "default_json_axis")]
    pub json_axis: String,

    /// Frozen value used for the index axis when nothing else selects one.
    #[serde(default = "default_index")]
    pub default_index: i64,

    /// Accepted values on the index axis.
    #[serde(default)]
    pub index_range: ValidRange,

    /// Accepted values on the json axis. Bounded, since saving packs the
    /// entries into one array as long as the largest index.
    #[serde(default = "default_json_range")]
    pub json_range: ValidRange,
}

fn default_parameter_axis() -> String {
    "db parameter".to_string()
}

fn default_index_axis() -> String {
    "db index".to_string()
}

fn default_json_axis() -> String {
    "json time".to_string()
}

fn default_index() -> i64 {
    1
}

fn default_json_range() -> ValidRange {
    ValidRange {
        min: 1,
        max: Some(MAX_JSON_ARRAY_LEN),
    }
}

impl Default for PivotConfig {
    fn default() -> Self {
        PivotConfig {
            parameter_axis: default_parameter_axis(),
            index_axis: default_index_axis(),
            json_axis: default_json_axis(),
            default_index: default_index(),
            index_range: ValidRange::default(),
            json_range: default_json_range(),
        }
    }
}

impl PivotConfig {
    pub fn from_json_str(json: &str) -> Result<Self, PivotError> {
        serde_json::from_str(json).map_err(|e| PivotError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, PivotError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| PivotError::Config(format!("{}: {}", path.display(), e)))?;
        let config = Self::from_json_str(&text)?;
        log::debug!(target: "PIVOT", "loaded config from {}", path.display());
        Ok(config)
    }

    /// True for the synthetic axes that are never entity names.
    pub fn is_synthetic_axis(&self, axis: &str) -> bool {
        axis == self.parameter_axis || axis == self.index_axis || axis == self.json_axis
    }
}
