//! Tracing subscriber setup for test binaries.

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::TableTestConfig;

/// Installs a compact `fmt` subscriber filtered by `config.log_level`
/// (falling back to `info`) and routed through the test writer.
///
/// Returns `false` when a global subscriber was already installed, which is
/// the normal case for every test after the first.
pub fn init(config: &TableTestConfig) -> bool {
    let filter = EnvFilter::try_new(&config.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_test_writer()
        .compact()
        .try_init()
        .is_ok()
}
