use anyhow::{Context, Result};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use crate::config::LogFileConfig;

/// Install the diagnostic sink. Stdout carries the protocol, so output goes
/// to stderr or the configured file. When logging is off nothing is
/// installed and every event is discarded.
pub fn init(config: &LogFileConfig, debug: bool) -> Result<()> {
    if !config.enabled && !debug {
        return Ok(());
    }

    let default_directive = if debug { "debug" } else { config.level.as_str() };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    match &config.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(Arc::new(file)),
                )
                .with(env_filter)
                .try_init()
                .context("failed to install log subscriber")?;
        }
        None => {
            tracing_subscriber::registry()
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .with(env_filter)
                .try_init()
                .context("failed to install log subscriber")?;
        }
    }
    Ok(())
}
