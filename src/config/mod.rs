//! Container configuration
//!
//! Loaded from TOML, e.g.
//!
//! ```toml
//! max_instantiation_depth = 40
//! max_nested_resolutions = 64
//! ```

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

/// Default bound on the depth of one dependency graph
pub const DEFAULT_MAX_INSTANTIATION_DEPTH: u32 = 25;

/// Default bound on resolves nested inside factories on one thread
pub const DEFAULT_MAX_NESTED_RESOLUTIONS: u32 = 64;

/// Environment variable overriding [`ContainerConfig::max_instantiation_depth`]
pub const MAX_DEPTH_ENV: &str = "AUTOWIRE_MAX_DEPTH";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    pub max_instantiation_depth: u32,
    /// Factories may resolve through the container; this caps that re-entry
    pub max_nested_resolutions: u32,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            max_instantiation_depth: DEFAULT_MAX_INSTANTIATION_DEPTH,
            max_nested_resolutions: DEFAULT_MAX_NESTED_RESOLUTIONS,
        }
    }
}

impl ContainerConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::TomlParse("<inline>".to_string(), e))
    }

    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let shown = path.display().to_string();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::FileRead(shown.clone(), e))?;
        let config = toml::from_str(&content).map_err(|e| ConfigError::TomlParse(shown.clone(), e))?;
        tracing::debug!(path = %shown, "Loaded container configuration");
        Ok(config)
    }

    /// Apply `AUTOWIRE_MAX_DEPTH` if set
    pub fn with_env(self) -> Result<Self, ConfigError> {
        match env::var(MAX_DEPTH_ENV) {
            Ok(value) => self.with_depth_override(&value),
            Err(_) => Ok(self),
        }
    }

    fn with_depth_override(mut self, value: &str) -> Result<Self, ConfigError> {
        self.max_instantiation_depth = value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidEnv(MAX_DEPTH_ENV, value.to_string()))?;
        Ok(self)
    }
}
