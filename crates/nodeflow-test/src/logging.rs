//! Tracing setup for tests.

use tracing_subscriber::EnvFilter;

/// Installs a compact subscriber writing to the test harness.
///
/// Honors `RUST_LOG` and falls back to `debug` for nodeflow targets. Safe to
/// call from every test; only the first call installs anything.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("warn,nodeflow_runtime=debug,nodeflow_core=debug"))
        .unwrap_or_default();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .compact()
        .try_init();
}
