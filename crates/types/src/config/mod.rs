// Path: crates/types/src/config/mod.rs

//! Configuration structures for a chain instance.
use serde::{Deserialize, Serialize};

/// Tunables of a single chain pipeline.
///
/// Every field has a default, so an empty TOML document is a valid config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Maximum number of simultaneously active call frames per request.
    #[serde(default = "default_max_call_depth")]
    pub max_call_depth: usize,
    /// Upper bound in milliseconds on how long the batch loop idles when
    /// nothing is ready.
    #[serde(default = "default_idle_backoff_ms")]
    pub idle_backoff_ms: u64,
    /// Capacity of the ledger request feed.
    #[serde(default = "default_ingest_channel_capacity")]
    pub ingest_channel_capacity: usize,
    /// Number of request results kept for handle lookups.
    #[serde(default = "default_receipt_cache_size")]
    pub receipt_cache_size: usize,
    /// Number of recent block headers retained by the virtual state.
    #[serde(default = "default_recent_blocks")]
    pub recent_blocks: usize,
    /// Consecutive failed attempts after which a batch is split into
    /// single requests, and a single request is dropped with a refund.
    #[serde(default = "default_max_batch_attempts")]
    pub max_batch_attempts: u32,
}

fn default_max_call_depth() -> usize {
    128
}
fn default_idle_backoff_ms() -> u64 {
    50
}
fn default_ingest_channel_capacity() -> usize {
    1024
}
fn default_receipt_cache_size() -> usize {
    4096
}
fn default_recent_blocks() -> usize {
    64
}
fn default_max_batch_attempts() -> u32 {
    3
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            max_call_depth: default_max_call_depth(),
            idle_backoff_ms: default_idle_backoff_ms(),
            ingest_channel_capacity: default_ingest_channel_capacity(),
            receipt_cache_size: default_receipt_cache_size(),
            recent_blocks: default_recent_blocks(),
            max_batch_attempts: default_max_batch_attempts(),
        }
    }
}
