//! Shared utilities for Vantage: configuration, logging, error types.

#![forbid(unsafe_code)]

pub mod config;

pub use config::{Config, ConfigError, DisplayLayout, Overrides, RawConfig};

/// Initialize tracing for a Vantage process.
///
/// `RUST_LOG` takes precedence when set; otherwise `default_level` applies
/// (an `EnvFilter` directive, e.g. `"info"` or `"vantage_motion=debug"`).
pub fn init_tracing(default_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}
