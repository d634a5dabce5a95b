//! Tracing subscriber setup for embedders and tests.

use tracing_subscriber::EnvFilter;

/// Install a formatted tracing subscriber honoring `RUST_LOG`.
///
/// Falls back to `info` when no filter is configured. Safe to call more
/// than once; only the first call installs a subscriber.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
