//! # Logging
//!
//! Tracing subscriber setup for the binary and the integration tests.

use crate::constants::DEFAULT_LOG_FILTER;
use tracing_subscriber::EnvFilter;

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into())
}

/// Install a `fmt` subscriber filtered by `RUST_LOG` (default `caapf_e2e=info`).
pub fn init_tracing() {
    tracing_subscriber::fmt().with_env_filter(env_filter()).init();
}

/// Like [`init_tracing`], but writes through the test harness's captured
/// output. Only the first call in a test binary installs anything.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_test_writer()
        .try_init();
}
