//! Tracing initialization for the SDK.
//!
//! This is a convenience entrypoint only — host applications embedding this
//! crate are free to install their own `tracing` subscriber instead.

use tracing_subscriber::EnvFilter;

/// Install a default `tracing_subscriber::fmt` subscriber honoring `RUST_LOG`
/// (or the given fallback level when the environment variable is unset).
///
/// Safe to call more than once; subsequent calls are no-ops if a global
/// subscriber is already installed.
pub fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
