//! Tracing subscriber bootstrap

use osibridge_config::LoggingConfig;
use tracing_subscriber::EnvFilter;

/// Install a global `fmt` subscriber built from `config`.
///
/// Returns `false` when a global subscriber was already set.
pub fn init_logging(config: &LoggingConfig) -> bool {
    let filter = EnvFilter::try_new(&config.filter).unwrap_or_else(|err| {
        eprintln!(
            "Warning: invalid log filter {:?} ({}), falling back to info",
            config.filter, err
        );
        EnvFilter::new("info")
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(config.ansi)
        .try_init()
        .is_ok()
}
