// Path: crates/validator/src/chain/batch_loop.rs

use super::Chain;
use chroma_types::error::{ChainError, ErrorCode};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

/// Runs batches back to back while requests are ready. When nothing is
/// ready, waits for a backlog insert or the idle backoff, whichever comes
/// first; after a failed batch it always waits the full backoff. Stops when
/// `shutdown` flips to `true`.
pub(super) async fn run_batch_loop(chain: Chain, mut shutdown: watch::Receiver<bool>) {
    let idle = Duration::from_millis(chain.inner.config.idle_backoff_ms.max(1));
    info!(
        target: "chain",
        event = "batch_loop_started",
        chain = %chain.chain_id(),
        idle_backoff_ms = idle.as_millis() as u64,
    );

    loop {
        if *shutdown.borrow() {
            break;
        }
        let (progressed, failed) = match chain.run_batch().await {
            Ok(report) => (report.is_some(), false),
            Err(ChainError::Shutdown) => break,
            Err(e) => {
                warn!(
                    target: "chain",
                    event = "batch_failed",
                    chain = %chain.chain_id(),
                    code = e.code(),
                    error = %e,
                );
                (false, true)
            }
        };
        if progressed {
            continue;
        }
        // A failed batch was requeued, which signals the backlog; back off anyway.
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = chain.inner.backlog.notified(), if !failed => {}
            _ = tokio::time::sleep(idle) => {}
        }
    }

    info!(target: "chain", event = "batch_loop_stopped", chain = %chain.chain_id());
}
