//! Tracing subscriber setup
//!
//! The binary embedding this crate calls [`init`] once at startup.
//! Priority: RUST_LOG env var > config file level.

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LogConfig;

/// Initialize the global tracing subscriber.
///
/// Returns an error when a subscriber is already installed.
pub fn init(config: &LogConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.level));

    fmt::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {}", e))?;

    Ok(())
}
