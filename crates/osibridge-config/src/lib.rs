//! # Osiris Bridge Configuration
//!
//! Type-safe configuration for the Osiris callback bridge.
//!
//! ## Sections
//!
//! - `[dispatch]`: pending-callback pool sizing and script stack limits
//! - `[resolution]`: symbol resolution knobs (derived-query alias suffix)
//! - `[logging]`: tracing filter and output settings
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use osibridge_config::ConfigLoader;
//!
//! let config = ConfigLoader::load_or_default("osibridge.toml")?;
//! assert!(config.dispatch.max_stack_slots > 0);
//! # Ok::<(), osibridge_config::ConfigError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod config;
mod error;
mod loader;

pub use config::*;
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
