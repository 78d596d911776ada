//! Configuration error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file does not exist
    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The configuration file could not be read
    #[error("IO error reading {}: {source}", path.display())]
    Io {
        /// File that failed to read
        path: PathBuf,
        /// Underlying IO failure
        #[source]
        source: std::io::Error,
    },

    /// The configuration is not valid TOML or does not match the schema
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value parsed but is out of range
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    /// Create an invalid-value error
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }
}

/// Specialized Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;
