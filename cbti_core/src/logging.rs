//! Tracing setup for the cbti binary.
//!
//! Diagnostics go to stderr. Stdout carries only command output (metrics
//! boxes, weekly summaries, recommendations) so it can be piped or captured
//! without log noise. Rejected entries and skipped journal lines surface at
//! WARN; recorded nights and recommendations at INFO.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Quiet default for interactive use: only warnings and errors.
/// `RUST_LOG=info` (or `debug`) shows per-night calculations.
pub fn init() {
    init_with_level("warn")
}

/// Install a stderr subscriber filtered at `default_level` unless
/// `RUST_LOG` is set.
pub fn init_with_level(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .init();
}

/// Debug-level capture for unit tests; safe to call from every test
#[cfg(test)]
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(EnvFilter::new("debug"))
        .try_init();
}
