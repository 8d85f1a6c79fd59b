//! Loader-wide configuration

use std::path::{Path, PathBuf};

use serde::{Serialize, Deserialize};

use super::null_handling::NullConfig;
use crate::DataError;

/// Configuration shared by every load a [`crate::DataLoader`] performs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Directory dataset paths are resolved against
    pub base_dir: PathBuf,

    /// Collapse concurrent loads of the same request into one fetch
    pub coalesce_requests: bool,

    /// Null tokens applied to every delimited load
    pub null_config: NullConfig,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            coalesce_requests: true,
            null_config: NullConfig::default(),
        }
    }
}

impl LoaderConfig {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            ..Self::default()
        }
    }

    pub fn with_coalescing(mut self, enabled: bool) -> Self {
        self.coalesce_requests = enabled;
        self
    }

    /// Parse a JSON configuration document; missing fields take defaults
    pub fn from_json_str(json: &str) -> Result<Self, DataError> {
        serde_json::from_str(json).map_err(|e| DataError::Config(e.to_string()))
    }

    pub fn from_json_file(path: &Path) -> Result<Self, DataError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}
