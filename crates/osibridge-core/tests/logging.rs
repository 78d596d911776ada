//! Global subscriber bootstrap. Kept out of the unit-test binary, which
//! installs its own capturing subscriber.

use osibridge_config::LoggingConfig;
use osibridge_core::init_logging;

#[test]
fn second_init_reports_existing_subscriber() {
    let config = LoggingConfig {
        filter: "osibridge_core=debug".into(),
        ansi: false,
    };
    init_logging(&config);
    assert!(!init_logging(&config));
}

#[test]
fn bad_filter_does_not_panic() {
    let config = LoggingConfig {
        filter: "[[[not a filter".into(),
        ansi: false,
    };
    init_logging(&config);
}
