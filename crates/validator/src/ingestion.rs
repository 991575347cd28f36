// Path: crates/validator/src/ingestion.rs

use crate::backlog::Backlog;
use chroma_telemetry::ChainMetricsSink;
use chroma_types::app::{ChainId, RequestRef};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

/// Maximum number of already-buffered requests moved per lock acquisition.
const INGEST_CHUNK: usize = 256;

/// Moves requests from the ledger feed into the backlog until the feed
/// closes or `shutdown` flips to `true`.
pub async fn run_ingestion_worker(
    chain: ChainId,
    mut feed: mpsc::Receiver<RequestRef>,
    backlog: Arc<Backlog>,
    sink: Arc<dyn ChainMetricsSink>,
    mut shutdown: watch::Receiver<bool>,
) {
    info!(target: "ingest", event = "worker_started", chain = %chain);
    let mut chunk = Vec::with_capacity(INGEST_CHUNK);

    loop {
        let first = tokio::select! {
            biased;
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
                continue;
            }
            item = feed.recv() => match item {
                Some(request) => request,
                None => break,
            },
        };

        chunk.push(first);
        while chunk.len() < INGEST_CHUNK {
            match feed.try_recv() {
                Ok(request) => chunk.push(request),
                Err(_) => break,
            }
        }

        for request in &chunk {
            debug!(
                target: "ingest",
                event = "request_observed",
                chain = %chain,
                request = %request.id,
                time_lock = request.time_lock,
            );
        }
        backlog.push_all(chunk.drain(..));
        sink.set_backlog_len(backlog.len());
    }

    info!(target: "ingest", event = "worker_stopped", chain = %chain);
}
