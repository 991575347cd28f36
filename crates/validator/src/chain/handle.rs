// Path: crates/validator/src/chain/handle.rs

use super::ChainInner;
use chroma_types::app::{RequestId, RequestResult};
use chroma_types::error::ChainError;
use std::sync::Arc;
use std::time::Duration;

/// Tracks the inclusion of one submitted request.
#[derive(Clone)]
pub struct RequestHandle {
    pub(super) id: RequestId,
    pub(super) chain: Arc<ChainInner>,
}

impl RequestHandle {
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// The result, if the request is already part of a committed block and
    /// its receipt is still cached.
    pub fn try_result(&self) -> Option<RequestResult> {
        self.chain.receipt(&self.id)
    }

    /// Waits until the request is included in a committed block.
    ///
    /// Receipts live in a bounded cache; a receipt evicted before the wait
    /// starts is never observed, so long waits should use
    /// [`wait_timeout`](Self::wait_timeout).
    pub async fn wait(&self) -> Result<RequestResult, ChainError> {
        let mut committed = self.chain.committed.subscribe();
        let mut shutdown = self.chain.shutdown.subscribe();
        loop {
            if let Some(result) = self.chain.receipt(&self.id) {
                return Ok(result);
            }
            if *shutdown.borrow() {
                return Err(ChainError::Shutdown);
            }
            tokio::select! {
                changed = committed.changed() => changed.map_err(|_| ChainError::Shutdown)?,
                _ = shutdown.changed() => {}
            }
        }
    }

    pub async fn wait_timeout(&self, timeout: Duration) -> Result<RequestResult, ChainError> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| ChainError::Timeout(format!("request {}", self.id)))?
    }
}

impl std::fmt::Debug for RequestHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestHandle")
            .field("id", &self.id)
            .field("chain", &self.chain.chain_id)
            .finish()
    }
}
