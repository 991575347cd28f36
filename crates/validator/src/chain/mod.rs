// Path: crates/validator/src/chain/mod.rs
//! One chain instance: its state, backlog, ingestion and batch pipeline.
//!
//! All state transitions go through [`Chain::run_batch`], which holds the
//! chain's writer lock for its whole duration. A block is only committed
//! after the ledger confirmed its anchoring transaction; if anchoring fails
//! the staged block is dropped and its requests go back to the front of the
//! backlog, so nothing the ledger never saw becomes visible. Batches that
//! keep failing are split and finally dropped.

mod batch_loop;
mod handle;
mod retry;

pub use handle::RequestHandle;

use retry::{BatchRetry, Verdict};

use crate::backlog::Backlog;
use crate::collator::{BatchCollator, LogicalClock};
use crate::ingestion::run_ingestion_worker;
use chroma_api::ledger::Level1Client;
use chroma_api::state::{ReadOnlyNamespacedStateAccess, StateReader};
use chroma_execution::{origin_block, Executor, GenesisParams, VmEnvironment};
use chroma_state::accounts;
use chroma_state::VirtualState;
use chroma_telemetry::time::BatchTimer;
use chroma_telemetry::ChainMetricsSink;
use chroma_types::app::{
    Address, AgentId, BlockHeader, ChainId, Color, HashValue, Hname, Params, RequestId,
    RequestOutcome, RequestRef, RequestResult, RequestSection, TxId,
};
use chroma_types::config::ChainConfig;
use chroma_types::error::{ChainError, ErrorCode, StateError, VmError};
use chroma_types::keys;
use lru::LruCache;
use parity_scale_codec::Encode;
use parking_lot::{Mutex, RwLock};
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Identity and governance of a new chain.
#[derive(Debug, Clone)]
pub struct ChainParams {
    pub chain_id: ChainId,
    pub owner: AgentId,
    pub description: String,
    /// Color fees are paid in.
    pub fee_color: Color,
    /// Receiver of validator fees; the owner when unset.
    pub validator_fee_target: Option<AgentId>,
}

/// What one committed batch produced.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub header: BlockHeader,
    pub results: Vec<RequestResult>,
    /// The ledger transaction that anchored the block.
    pub anchor_tx: TxId,
}

/// The anchor a batch's block is bound to. Derived from data every replica
/// agrees on, so replaying the batch yields the same block and entropy.
pub fn batch_anchor(chain: &ChainId, prev_state_hash: &HashValue, requests: &[RequestId]) -> TxId {
    TxId::from(HashValue::digest(&[
        b"chroma/anchor",
        chain.as_bytes(),
        prev_state_hash.as_bytes(),
        &requests.encode(),
    ]))
}

fn origin_anchor(chain: &ChainId) -> TxId {
    TxId::from(HashValue::digest(&[b"chroma/origin", chain.as_bytes()]))
}

fn outcome_label(result: &RequestResult) -> &str {
    match &result.outcome {
        RequestOutcome::Success(_) => "success",
        RequestOutcome::Failure { code, .. } => code,
    }
}

pub(crate) struct ChainInner {
    chain_id: ChainId,
    config: ChainConfig,
    executor: Executor,
    ledger: Arc<dyn Level1Client>,
    sink: Arc<dyn ChainMetricsSink>,
    backlog: Arc<Backlog>,
    collator: BatchCollator,
    clock: LogicalClock,
    state: RwLock<VirtualState>,
    writer: tokio::sync::Mutex<BatchRetry>,
    receipts: Mutex<LruCache<RequestId, RequestResult>>,
    committed: watch::Sender<u64>,
    shutdown: watch::Sender<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl ChainInner {
    fn receipt(&self, id: &RequestId) -> Option<RequestResult> {
        self.receipts.lock().get(id).cloned()
    }

    fn is_shut_down(&self) -> bool {
        *self.shutdown.borrow()
    }
}

/// A running chain. Cheap to clone; all clones share the same instance.
#[derive(Clone)]
pub struct Chain {
    inner: Arc<ChainInner>,
}

impl Chain {
    /// Creates the chain: commits and anchors the origin block, subscribes to
    /// the ledger feed and starts the ingestion worker. Batches only run when
    /// [`run_batch`](Self::run_batch) is called.
    pub async fn new(
        params: ChainParams,
        config: ChainConfig,
        env: Arc<VmEnvironment>,
        ledger: Arc<dyn Level1Client>,
        sink: Arc<dyn ChainMetricsSink>,
    ) -> Result<Self, ChainError> {
        let chain_id = params.chain_id;
        let mut state = VirtualState::new(chain_id, config.recent_blocks);
        let genesis = GenesisParams {
            chain_id,
            owner: params.owner,
            description: params.description,
            fee_color: params.fee_color,
            validator_fee_target: params.validator_fee_target,
            anchor: origin_anchor(&chain_id),
            timestamp: 0,
        };
        let origin = origin_block(&genesis, &state)?;
        let header = origin.header.clone();
        state.apply_block(origin)?;
        ledger
            .post_state_transition(&chain_id, &header, Vec::new())
            .await?;
        state.commit()?;

        let feed = ledger
            .subscribe(&chain_id, config.ingest_channel_capacity)
            .await?;

        let backlog = Arc::new(Backlog::new());
        let receipt_capacity =
            NonZeroUsize::new(config.receipt_cache_size).unwrap_or(NonZeroUsize::MIN);
        let (committed, _) = watch::channel(0);
        let (shutdown, _) = watch::channel(false);
        let executor = Executor::new(env).with_max_call_depth(config.max_call_depth);
        let inner = Arc::new(ChainInner {
            chain_id,
            config,
            executor,
            ledger,
            sink,
            collator: BatchCollator::new(backlog.clone()),
            backlog,
            clock: LogicalClock::default(),
            state: RwLock::new(state),
            writer: tokio::sync::Mutex::new(BatchRetry::default()),
            receipts: Mutex::new(LruCache::new(receipt_capacity)),
            committed,
            shutdown,
            tasks: Mutex::new(Vec::new()),
        });

        let worker = tokio::spawn(run_ingestion_worker(
            chain_id,
            feed,
            inner.backlog.clone(),
            inner.sink.clone(),
            inner.shutdown.subscribe(),
        ));
        inner.tasks.lock().push(worker);

        info!(
            target: "chain",
            event = "chain_created",
            chain = %chain_id,
            owner = %params.owner,
            state_hash = %header.state_hash,
        );
        Ok(Self { inner })
    }

    /// [`new`](Self::new), plus a background loop running batches whenever
    /// requests are ready.
    pub async fn start(
        params: ChainParams,
        config: ChainConfig,
        env: Arc<VmEnvironment>,
        ledger: Arc<dyn Level1Client>,
        sink: Arc<dyn ChainMetricsSink>,
    ) -> Result<Self, ChainError> {
        let chain = Self::new(params, config, env, ledger, sink).await?;
        let task = tokio::spawn(batch_loop::run_batch_loop(
            chain.clone(),
            chain.inner.shutdown.subscribe(),
        ));
        chain.inner.tasks.lock().push(task);
        Ok(chain)
    }

    pub fn chain_id(&self) -> ChainId {
        self.inner.chain_id
    }

    /// Submits one request through the ledger on behalf of `sender`. The
    /// attached transfer is paid from the sender's ledger balance.
    pub async fn post_request(
        &self,
        sender: &Address,
        section: RequestSection,
    ) -> Result<RequestHandle, ChainError> {
        let mut handles = self.post_requests(sender, vec![section]).await?;
        handles
            .pop()
            .ok_or_else(|| ChainError::Execution("no request posted".into()))
    }

    /// Submits several requests in one ledger transaction. Handles are
    /// returned in section order.
    pub async fn post_requests(
        &self,
        sender: &Address,
        sections: Vec<RequestSection>,
    ) -> Result<Vec<RequestHandle>, ChainError> {
        if self.inner.is_shut_down() {
            return Err(ChainError::Shutdown);
        }
        let count = sections.len();
        let tx_id = self
            .inner
            .ledger
            .post_request_transaction(sender, &self.inner.chain_id, sections)
            .await?;
        debug!(
            target: "chain",
            event = "requests_posted",
            chain = %self.inner.chain_id,
            tx = %tx_id,
            count,
        );
        (0..count)
            .map(|index| {
                let index = u16::try_from(index)
                    .map_err(|_| ChainError::Execution("too many sections".into()))?;
                Ok(RequestHandle {
                    id: RequestId::new(tx_id, index),
                    chain: self.inner.clone(),
                })
            })
            .collect()
    }

    /// Runs a view entry point against the last committed state.
    pub fn call_view(
        &self,
        contract: Hname,
        entry_point: Hname,
        params: Params,
    ) -> Result<Params, VmError> {
        let state = self.inner.state.read();
        self.inner
            .executor
            .call_view(&state, contract, entry_point, params)
    }

    /// Reads a key of a contract's namespace from the last committed state.
    pub fn get_state(&self, contract: Hname, key: &[u8]) -> Result<Option<Vec<u8>>, StateError> {
        self.inner
            .state
            .read()
            .get(&keys::contract_key(contract, key))
    }

    /// An agent's on-chain balance of `color`.
    pub fn balance(&self, agent: &AgentId, color: &Color) -> Result<u64, StateError> {
        let state = self.inner.state.read();
        let accounts_state = ReadOnlyNamespacedStateAccess::new(&*state, keys::accounts_hname());
        accounts::balance_of(&accounts_state, agent, color)
    }

    pub fn backlog_len(&self) -> usize {
        self.inner.backlog.len()
    }

    pub fn logical_time(&self) -> u64 {
        self.inner.clock.now()
    }

    /// Moves logical time forward and wakes the batch loop so newly unlocked
    /// requests run without waiting for the idle backoff.
    pub fn advance_logical_time(&self, delta: u64) -> u64 {
        let now = self.inner.clock.advance(delta);
        self.inner.backlog.wake();
        now
    }

    pub fn block_index(&self) -> u64 {
        self.inner.state.read().block_index()
    }

    pub fn state_hash(&self) -> HashValue {
        self.inner.state.read().state_hash()
    }

    pub fn latest_header(&self) -> Option<BlockHeader> {
        self.inner.state.read().latest_header().cloned()
    }

    /// The cached result of a committed request.
    pub fn receipt(&self, id: &RequestId) -> Option<RequestResult> {
        self.inner.receipt(id)
    }

    /// Collates the ready requests, executes them and commits the resulting
    /// block once the ledger anchored it. Returns `None` when no request is
    /// ready.
    ///
    /// On any error the committed state is unchanged and the batch's requests
    /// are put back at the front of the backlog, unless the batch has failed
    /// too often, in which case its requests are dropped with a failure
    /// receipt.
    pub async fn run_batch(&self) -> Result<Option<BatchReport>, ChainError> {
        let inner = &*self.inner;
        let mut retry = inner.writer.lock().await;
        if inner.is_shut_down() {
            return Err(ChainError::Shutdown);
        }

        let batch = inner
            .collator
            .collate_at_most(inner.clock.now(), retry.batch_limit());
        if batch.requests.is_empty() {
            return Ok(None);
        }
        let timer = BatchTimer::start(inner.sink.as_ref());

        let prev_state_hash = inner.state.read().state_hash();
        let anchor = batch_anchor(&inner.chain_id, &prev_state_hash, &batch.request_ids());
        let batch = batch
            .with_anchor(anchor)
            .with_refunds(retry.pending_refunds());

        let executed = {
            let state = inner.state.read();
            inner.executor.run(&batch, &state)
        };
        let output = match executed {
            Ok(output) => output,
            Err(e) => return Err(self.batch_failed(&mut retry, batch.requests, e)),
        };
        let header = output.block.header.clone();
        let staged = inner.state.write().apply_block(output.block);
        if let Err(e) = staged {
            return Err(self.batch_failed(&mut retry, batch.requests, e.into()));
        }

        let anchored = inner
            .ledger
            .post_state_transition(&inner.chain_id, &header, output.outbound)
            .await;
        let anchor_tx = match anchored {
            Ok(tx) => tx,
            Err(e) => {
                inner.state.write().discard_pending();
                inner.sink.inc_anchor_failures();
                return Err(self.batch_failed(&mut retry, batch.requests, e.into()));
            }
        };
        let committed = inner.state.write().commit();
        let header = match committed {
            Ok(header) => header,
            Err(e) => return Err(self.batch_failed(&mut retry, batch.requests, e.into())),
        };
        retry.committed();

        {
            let mut receipts = inner.receipts.lock();
            for result in &output.results {
                inner.sink.inc_requests_processed(outcome_label(result));
                receipts.put(result.request_id, result.clone());
            }
        }
        inner.sink.inc_blocks_committed();
        inner.sink.set_backlog_len(inner.backlog.len());
        inner.committed.send_replace(header.index);

        info!(
            target: "chain",
            event = "block_committed",
            chain = %inner.chain_id,
            index = header.index,
            requests = output.results.len(),
            failed = output.results.iter().filter(|r| !r.is_success()).count(),
            refunds = batch.refunds.len(),
            state_hash = %header.state_hash,
            anchor_tx = %anchor_tx,
            elapsed_ms = timer.elapsed().as_millis() as u64,
        );
        Ok(Some(BatchReport {
            header,
            results: output.results,
            anchor_tx,
        }))
    }

    fn batch_failed(
        &self,
        retry: &mut BatchRetry,
        requests: Vec<RequestRef>,
        err: ChainError,
    ) -> ChainError {
        let inner = &*self.inner;
        let verdict = retry.failed(requests.len(), inner.config.max_batch_attempts);
        warn!(
            target: "chain",
            event = "batch_abandoned",
            chain = %inner.chain_id,
            requests = requests.len(),
            verdict = ?verdict,
            code = err.code(),
            error = %err,
        );
        if verdict != Verdict::Drop {
            inner.backlog.requeue_front(requests);
            return err;
        }

        {
            let mut receipts = inner.receipts.lock();
            for request in &requests {
                let receipt = retry.drop_request(request, &err);
                inner.sink.inc_requests_processed(outcome_label(&receipt));
                receipts.put(request.id, receipt);
                warn!(
                    target: "chain",
                    event = "request_dropped",
                    chain = %inner.chain_id,
                    request = %request.id,
                    sender = %request.sender,
                );
            }
        }
        inner.sink.set_backlog_len(inner.backlog.len());
        // Wake waiters; the committed index itself is unchanged.
        inner.committed.send_modify(|_| {});
        err
    }

    /// Stops the ingestion worker and the batch loop and waits for both.
    /// Pending request handles resolve with [`ChainError::Shutdown`].
    pub async fn shutdown(&self) {
        self.inner.shutdown.send_replace(true);
        self.inner.backlog.wake();
        let tasks = std::mem::take(&mut *self.inner.tasks.lock());
        for task in tasks {
            if let Err(e) = task.await {
                warn!(
                    target: "chain",
                    event = "task_join_failed",
                    chain = %self.inner.chain_id,
                    error = %e,
                );
            }
        }
        info!(target: "chain", event = "chain_stopped", chain = %self.inner.chain_id);
    }
}

impl std::fmt::Debug for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chain")
            .field("chain_id", &self.inner.chain_id)
            .field("block_index", &self.block_index())
            .finish()
    }
}
