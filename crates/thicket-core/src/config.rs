//! Store configuration

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Behaviour switches for a store and all of its views.
///
/// ```toml
/// directed = false
/// allow_self_loops = true
/// fail_fast = true
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Default traversal mode. Undirected traversals yield each mutual pair once.
    pub directed: bool,
    /// Accept edges whose source equals their target.
    pub allow_self_loops: bool,
    /// Cursors check the structure generation on every step.
    pub fail_fast: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            directed: true,
            allow_self_loops: true,
            fail_fast: true,
        }
    }
}

impl StoreConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load from a TOML file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}
