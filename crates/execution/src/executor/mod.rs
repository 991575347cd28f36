// Path: crates/execution/src/executor/mod.rs
//! The batch executor.
//!
//! `run` turns one [`Batch`] and one [`VirtualState`] snapshot into exactly
//! one sealed [`Block`] plus the per-request results. It never touches the
//! snapshot: all writes go to a [`StateOverlay`] that is drained into the
//! block at the end.
//!
//! A failing request only loses the changes made after its fees were
//! charged; the batch always runs to completion. Errors of the executor's
//! own bookkeeping abort the run and are returned to the caller.

use crate::context::{BlockContext, CallFrame, RequestContext, VmContext};
use crate::core_contracts::root;
use crate::environment::VmEnvironment;
use chroma_api::state::{NamespacedStateAccess, ReadOnlyNamespacedStateAccess, StateOverlay};
use chroma_api::vm::Entropy;
use chroma_state::accounts as ledger;
use chroma_state::block::seal_block;
use chroma_state::VirtualState;
use chroma_types::app::{
    AgentId, Batch, Block, ChainInfo, ColoredBalances, ContractId, Hname, OutboundEffect, Params,
    RequestOutcome, RequestRef, RequestResult,
};
use chroma_types::error::{ChainError, ErrorCode, StateError, VmError};
use chroma_types::keys;
use chroma_types::prelude::OptionExt;
use std::sync::Arc;


/// Everything a batch run produces.
#[derive(Debug, Clone)]
pub struct BatchOutput {
    /// The sealed block, ready for `VirtualState::apply_block`.
    pub block: Block,
    /// One result per request, in batch order.
    pub results: Vec<RequestResult>,
    /// Effects to be realized by the anchoring transaction.
    pub outbound: Vec<OutboundEffect>,
}

/// Converts a failure of the executor's own bookkeeping into a fatal error.
fn bookkeeping(err: VmError) -> ChainError {
    match err {
        VmError::State(e) => ChainError::State(e),
        other => ChainError::Execution(other.to_string()),
    }
}

fn load_chain_info(state: &StateOverlay<'_>) -> Result<ChainInfo, ChainError> {
    let root_state = ReadOnlyNamespacedStateAccess::new(state, keys::root_hname());
    root::chain_info(&root_state)?.required(ChainError::NotInitialized)
}

fn credit(
    state: &mut StateOverlay<'_>,
    agent: &AgentId,
    tokens: &ColoredBalances,
) -> Result<(), ChainError> {
    let mut accounts = NamespacedStateAccess::new(state, keys::accounts_hname());
    ledger::credit(&mut accounts, agent, tokens).map_err(bookkeeping)
}

fn failure(request: &RequestRef, err: &VmError, events: Vec<String>) -> RequestResult {
    RequestResult {
        request_id: request.id,
        outcome: RequestOutcome::Failure {
            code: err.code().to_string(),
            reason: err.to_string(),
        },
        events,
    }
}

/// Runs batches for one chain.
#[derive(Clone)]
pub struct Executor {
    env: Arc<VmEnvironment>,
    max_call_depth: usize,
}

impl Executor {
    pub fn new(env: Arc<VmEnvironment>) -> Self {
        let max_call_depth = env.max_call_depth();
        Self {
            env,
            max_call_depth,
        }
    }

    /// Overrides the environment's call depth ceiling for this chain.
    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth.max(1);
        self
    }

    pub fn max_call_depth(&self) -> usize {
        self.max_call_depth
    }

    pub fn environment(&self) -> &VmEnvironment {
        &self.env
    }

    /// Executes `batch` against `snapshot` and seals the resulting block.
    ///
    /// The block's index and previous hash follow the snapshot's latest block,
    /// so the caller must hold the chain's single-writer lock from here until
    /// the block is committed.
    pub fn run(&self, batch: &Batch, snapshot: &VirtualState) -> Result<BatchOutput, ChainError> {
        if !snapshot.is_initialized() {
            return Err(ChainError::NotInitialized);
        }
        let prev_state_hash = snapshot.state_hash();
        let block_ctx = BlockContext {
            index: snapshot.next_block_index(),
            timestamp: batch.timestamp,
            entropy: Entropy::for_block(&batch.anchor, &prev_state_hash),
        };

        let mut state = StateOverlay::new(snapshot);
        if !batch.free_tokens.is_empty() {
            let owner = load_chain_info(&state)?.owner;
            credit(&mut state, &owner, &batch.free_tokens)?;
        }
        for (agent, tokens) in &batch.refunds {
            credit(&mut state, agent, tokens)?;
        }

        let mut results = Vec::with_capacity(batch.requests.len());
        let mut outbound = Vec::new();
        for (index, request) in batch.requests.iter().enumerate() {
            let request_ctx = RequestContext {
                id: request.id,
                entropy: block_ctx.entropy.for_request(index),
            };
            let result =
                self.run_request(&mut state, &block_ctx, request_ctx, request, &mut outbound)?;
            tracing::debug!(
                target: "vm",
                event = "request_executed",
                request = %request.id,
                success = result.is_success(),
                code = result.error_code().unwrap_or("OK"),
            );
            results.push(result);
            state.discard_journal();
        }

        let block = seal_block(
            block_ctx.index,
            prev_state_hash,
            batch.anchor,
            batch.timestamp,
            batch.request_ids(),
            state.into_ordered_batch(),
        );
        tracing::info!(
            target: "vm",
            event = "batch_executed",
            block = block.index(),
            requests = results.len(),
            mutations = block.mutation_count(),
            outbound = outbound.len(),
            state_hash = %block.header.state_hash,
        );
        Ok(BatchOutput {
            block,
            results,
            outbound,
        })
    }

    fn run_request(
        &self,
        state: &mut StateOverlay<'_>,
        block: &BlockContext,
        request_ctx: RequestContext,
        request: &RequestRef,
        outbound: &mut Vec<OutboundEffect>,
    ) -> Result<RequestResult, ChainError> {
        let chain = load_chain_info(state)?;
        let target = request.target;

        let record = if target.chain_id == chain.chain_id {
            let root_state = ReadOnlyNamespacedStateAccess::new(&*state, keys::root_hname());
            root::find_contract(&root_state, target.hname)?
        } else {
            None
        };
        let Some(record) = record else {
            credit(state, &request.sender, &request.transfer)?;
            let err = VmError::UnknownContract(target.to_string());
            return Ok(failure(request, &err, Vec::new()));
        };

        // Fees come out of the attached tokens before anything reaches the contract.
        let fees = self
            .env
            .fee_policy()
            .fees_for(&*state, &chain, &record)?;
        let mut remainder = request.transfer.clone();
        let available = remainder.get(&fees.color);
        if available < fees.total() {
            remainder.take(&fees.color);
            credit(state, &fees.owner_target, &ColoredBalances::single(fees.color, available))?;
            credit(state, &request.sender, &remainder)?;
            let err = VmError::InsufficientBalance {
                agent: request.sender,
                color: fees.color,
                needed: fees.total(),
                available,
            };
            return Ok(failure(request, &err, Vec::new()));
        }
        remainder.set(fees.color, available - fees.total());
        credit(state, &fees.owner_target, &ColoredBalances::single(fees.color, fees.owner_fee))?;
        credit(
            state,
            &fees.validator_target,
            &ColoredBalances::single(fees.color, fees.validator_fee),
        )?;
        let contract = AgentId::Contract(target);
        credit(state, &contract, &remainder)?;

        let checkpoint = state.checkpoint();
        let frame = CallFrame::new(
            request.sender,
            target,
            &record,
            request.params.clone(),
            remainder.clone(),
        );
        let mut vm = VmContext::new(&self.env, state, chain, block, request_ctx, frame)
            .with_max_call_depth(self.max_call_depth);
        let result = vm.run_full(request.entry_point);
        let (effects, events) = vm.into_effects();

        match result {
            Ok(output) => {
                outbound.extend(effects);
                Ok(RequestResult {
                    request_id: request.id,
                    outcome: RequestOutcome::Success(output),
                    events,
                })
            }
            Err(err) => {
                state.revert_to(checkpoint);
                let mut accounts = NamespacedStateAccess::new(state, keys::accounts_hname());
                ledger::transfer(&mut accounts, &contract, &request.sender, &remainder)
                    .map_err(bookkeeping)?;
                Ok(failure(request, &err, events))
            }
        }
    }

    /// Runs a view entry point against the committed state.
    pub fn call_view(
        &self,
        snapshot: &VirtualState,
        contract: Hname,
        entry_point: Hname,
        params: Params,
    ) -> Result<Params, VmError> {
        let mut state = StateOverlay::new(snapshot);
        let root_state = ReadOnlyNamespacedStateAccess::new(&state, keys::root_hname());
        let chain = root::chain_info(&root_state)?
            .ok_or_else(|| StateError::Validation("chain is not initialized".into()))?;
        let record = root::find_contract(&root_state, contract)?
            .ok_or_else(|| VmError::UnknownContract(contract.to_string()))?;

        let target = ContractId::new(chain.chain_id, contract);
        let block = BlockContext {
            index: snapshot.block_index(),
            timestamp: snapshot.timestamp(),
            entropy: Entropy(snapshot.state_hash()),
        };
        let frame = CallFrame::new(
            AgentId::Contract(target),
            target,
            &record,
            params,
            ColoredBalances::new(),
        );
        let mut vm = VmContext::new(
            &self.env,
            &mut state,
            chain,
            &block,
            RequestContext::default(),
            frame,
        )
        .with_max_call_depth(self.max_call_depth);
        vm.run_view(entry_point)
    }
}
