//! Work graph configuration.
//!
//! Configuration is plain data with serde defaults, so a partial TOML file
//! only needs to name the values it overrides:
//!
//! ```toml
//! [cache]
//! max_entries_per_slot = 4
//!
//! [execution]
//! failure_policy = "abort"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::WorkGraphError;

/// Default number of pooled resources kept per cache slot.
pub const DEFAULT_MAX_ENTRIES_PER_SLOT: usize = 8;

/// Top-level configuration of a [`WorkGraph`](crate::WorkGraph).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkGraphConfig {
    pub cache: CacheConfig,
    pub execution: ExecutionConfig,
}

/// Transient resource cache settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum pooled entries per output slot; `0` disables the bound.
    pub max_entries_per_slot: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries_per_slot: DEFAULT_MAX_ENTRIES_PER_SLOT,
        }
    }
}

/// Scheduler settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    pub failure_policy: FailurePolicy,
}

/// What the scheduler does when a node fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Contain the failure: dependents see the node's outputs as absent.
    #[default]
    SkipDependents,
    /// Stop the invocation at the first node failure.
    Abort,
}

impl WorkGraphConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, WorkGraphError> {
        Ok(toml::from_str(content)?)
    }

    /// Load a configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, WorkGraphError> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        log::info!(
            "Loaded work graph config from {} (cache bound {}, policy {:?})",
            path.display(),
            config.cache.max_entries_per_slot,
            config.execution.failure_policy
        );
        Ok(config)
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.execution.failure_policy = policy;
        self
    }

    pub fn with_max_entries_per_slot(mut self, max_entries: usize) -> Self {
        self.cache.max_entries_per_slot = max_entries;
        self
    }
}
