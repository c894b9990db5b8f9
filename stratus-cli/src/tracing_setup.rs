//! Tracing setup for the stratus binary
//!
//! Usage:
//!   stratus --debug ...              # Debug logging to stderr
//!   RUST_LOG=stratus=debug stratus   # Fine-grained log control
//!   RUST_LOG=sqlx=trace stratus      # Every statement sqlx runs (default: sqlx=warn)
//!
//! sqlx reports statements through `log`; the subscriber bridges those
//! records into tracing.

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

/// Tracing configuration options
#[derive(Debug, Clone, Default)]
pub struct TracingConfig {
    /// Enable debug logging (sets RUST_LOG=debug if not already set)
    pub debug: bool,
}

/// Initialize console tracing
pub fn init(config: &TracingConfig) -> Result<()> {
    let default_level = if config.debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{default_level},sqlx=warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.debug)
        .with_writer(std::io::stderr)
        .compact()
        .try_init()
        .map_err(|err| anyhow!(err))
}
