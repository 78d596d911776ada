//! Configuration sections for the callback bridge

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Environment variable overriding `logging.filter`
pub const LOG_FILTER_ENV: &str = "OSIBRIDGE_LOG";

/// Environment variable overriding `dispatch.max_stack_slots`
pub const MAX_STACK_SLOTS_ENV: &str = "OSIBRIDGE_MAX_STACK_SLOTS";

/// Top-level bridge configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Dispatch buffer and script stack settings
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Symbol resolution settings
    #[serde(default)]
    pub resolution: ResolutionConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Dispatch configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Number of pending-callback buffers allocated up front.
    ///
    /// The pool still grows past this when dispatch nests deeper.
    #[serde(default = "default_pool_levels")]
    pub pool_levels: usize,

    /// Largest script stack the runtime may grow to before a handler is skipped
    #[serde(default = "default_max_stack_slots")]
    pub max_stack_slots: usize,
}

fn default_pool_levels() -> usize {
    4
}

// Matches LUAI_MAXSTACK
fn default_max_stack_slots() -> usize {
    1_000_000
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            pool_levels: default_pool_levels(),
            max_stack_slots: default_max_stack_slots(),
        }
    }
}

/// Symbol resolution configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionConfig {
    /// Suffix appended to a derived query's name to find its backing node
    #[serde(default = "default_user_query_suffix")]
    pub user_query_suffix: String,
}

fn default_user_query_suffix() -> String {
    "__DEF__".to_string()
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            user_query_suffix: default_user_query_suffix(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `"info"` or `"osibridge_core=debug"`
    #[serde(default = "default_filter")]
    pub filter: String,

    /// Emit ANSI colour codes
    #[serde(default = "default_true")]
    pub ansi: bool,
}

fn default_filter() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            ansi: true,
        }
    }
}

impl BridgeConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(source: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges that serde cannot express
    pub fn validate(&self) -> ConfigResult<()> {
        if self.dispatch.max_stack_slots == 0 {
            return Err(ConfigError::invalid(
                "dispatch.max_stack_slots must be greater than zero",
            ));
        }
        if self.resolution.user_query_suffix.is_empty() {
            return Err(ConfigError::invalid(
                "resolution.user_query_suffix must not be empty",
            ));
        }
        Ok(())
    }

    /// Apply `OSIBRIDGE_*` environment overrides in place
    pub fn apply_env_overrides(&mut self) {
        if let Ok(filter) = std::env::var(LOG_FILTER_ENV) {
            if !filter.is_empty() {
                self.logging.filter = filter;
            }
        }

        if let Ok(raw) = std::env::var(MAX_STACK_SLOTS_ENV) {
            match raw.parse::<usize>() {
                Ok(slots) if slots > 0 => self.dispatch.max_stack_slots = slots,
                _ => warn!(
                    "Ignoring {}={:?}: expected a positive integer",
                    MAX_STACK_SLOTS_ENV, raw
                ),
            }
        }
    }
}
