//! Feature configuration files.
//!
//! A configuration is a JSON document declaring context and per-position
//! (example) feature specs and an optional list size:
//!
//! ```json
//! {
//!   "context_features": {
//!     "query_length": {"kind": "fixed", "shape": [1], "dtype": "int64"}
//!   },
//!   "example_features": {
//!     "unigrams": {"kind": "variable", "dtype": "string"},
//!     "relevance": {"kind": "fixed", "shape": [1], "dtype": "float32", "default_value": -1}
//!   },
//!   "list_size": 10
//! }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{RankDataError, Result};
use crate::feature::spec::FeatureSpecs;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureConfig {
    #[serde(default)]
    pub context_features: FeatureSpecs,
    pub example_features: FeatureSpecs,
    /// Fixed list size; absent or zero means the list size follows each batch.
    #[serde(default)]
    pub list_size: Option<usize>,
}

impl FeatureConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            RankDataError::config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_json(&content)
    }
}
