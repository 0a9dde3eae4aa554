//! Engine configuration with environment variable support.
//!
//! # Example
//!
//! ```ignore
//! use valgroup::config::EngineConfig;
//!
//! // VALGROUP_UNGROUPED_ORDER=last VALGROUP_RESET_ON_RUN=false
//! let config = EngineConfig::from_env().expect("Failed to load config");
//! let validations = Validations::with_config(BuiltinRules, config);
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for configuration loading failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable deserialization failed.
    #[error("Configuration error: {0}")]
    Env(#[from] envy::Error),
}

/// Where ungrouped rules run during a full validity check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UngroupedOrder {
    /// Before every group
    #[default]
    First,
    /// After every group
    Last,
}

/// Engine configuration.
///
/// Missing keys take their defaults, so an empty environment yields
/// [`EngineConfig::default`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Position of ungrouped rules in a full run
    pub ungrouped_order: UngroupedOrder,
    /// Start every top-level run call with an empty error snapshot
    pub reset_on_run: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ungrouped_order: UngroupedOrder::First,
            reset_on_run: true,
        }
    }
}

impl EngineConfig {
    /// Prefix of the environment variables read by [`EngineConfig::from_env`].
    pub const ENV_PREFIX: &'static str = "VALGROUP_";

    /// Load the configuration from `VALGROUP_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        envy::prefixed(Self::ENV_PREFIX)
            .from_env::<Self>()
            .map_err(ConfigError::from)
    }

    /// Load the configuration from `VALGROUP_*` pairs of an iterator.
    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::prefixed(Self::ENV_PREFIX)
            .from_iter::<_, Self>(vars)
            .map_err(ConfigError::from)
    }

    /// Set where ungrouped rules run.
    pub fn ungrouped_order(mut self, order: UngroupedOrder) -> Self {
        self.ungrouped_order = order;
        self
    }

    /// Set whether run calls reset the error snapshot.
    pub fn reset_on_run(mut self, reset: bool) -> Self {
        self.reset_on_run = reset;
        self
    }
}
