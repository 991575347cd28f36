// Path: crates/validator/src/config.rs
//! Loading of chain configuration files.

use anyhow::{Context, Result};
use chroma_types::config::ChainConfig;
use std::path::Path;

/// Reads a `ChainConfig` from a TOML file. Missing fields take their defaults.
pub fn load_chain_config(path: impl AsRef<Path>) -> Result<ChainConfig> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading chain config {}", path.display()))?;
    parse_chain_config(&text).with_context(|| format!("parsing chain config {}", path.display()))
}

/// Parses a `ChainConfig` from TOML text.
pub fn parse_chain_config(text: &str) -> Result<ChainConfig> {
    let config: ChainConfig = toml::from_str(text)?;
    anyhow::ensure!(config.max_call_depth > 0, "max_call_depth must be positive");
    anyhow::ensure!(
        config.ingest_channel_capacity > 0,
        "ingest_channel_capacity must be positive"
    );
    anyhow::ensure!(
        config.max_batch_attempts > 0,
        "max_batch_attempts must be positive"
    );
    Ok(config)
}
