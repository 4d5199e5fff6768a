//! Tracing initialization helpers shared by binaries and tests.

use std::sync::Once;

use tracing::info;
use tracing_subscriber::EnvFilter;

/// Default filter directive applied when `RUST_LOG` is not set.
const DEFAULT_DIRECTIVES: &str = "info";

/// Initializes the global tracing subscriber for a long-running process.
///
/// The filter is taken from the `RUST_LOG` environment variable, falling back
/// to `info` when unset. Panics if a global subscriber was already installed,
/// since silently ignoring that would hide misconfigured processes.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));
    let rendered_filter = filter.to_string();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!(filter = %rendered_filter, "tracing initialized");
}

/// Initializes tracing for tests.
///
/// Safe to call from every test: initialization runs once per process and
/// subsequent calls are no-ops. Output is captured by the test harness.
pub fn init_test_tracing() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .init();
    });
}
