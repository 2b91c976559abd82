//! Shared startup for the rankdb binaries.

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use rankdb_core::config::{Config, Settings};

/// Log to stderr; `RUST_LOG` overrides the default level.
pub fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

pub fn load_settings() -> Result<Settings> {
    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {}", e);
        e
    })?;
    Ok(config.settings()?)
}
