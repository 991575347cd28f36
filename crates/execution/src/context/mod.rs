// Path: crates/execution/src/context/mod.rs
//! The VM context: call frames, nested dispatch and staged outflows.
//!
//! One `VmContext` lives for one request (or one external view call). It
//! owns the call stack and hands contract code either a
//! [`MutatingContext`] or a [`ViewContext`] depending on the kind of the
//! entry point being run.

mod sandbox;
mod view;

pub(crate) use sandbox::MutatingContext;
pub(crate) use view::ViewContext;

use crate::core_contracts::{accounts as accounts_contract, root};
use crate::environment::VmEnvironment;
use chroma_api::state::{NamespacedStateAccess, ReadOnlyNamespacedStateAccess, StateOverlay};
use chroma_api::vm::{ContractLogger, EntryPoint, Entropy, Handler};
use chroma_state::accounts as ledger;
use chroma_types::app::{
    Address, AgentId, ChainId, ChainInfo, Color, ColoredBalances, ContractId, ContractRecord,
    HashValue, Hname, OutboundEffect, Params, RequestId, RequestSection,
};
use chroma_types::error::VmError;
use chroma_types::keys;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

/// Per-block values visible to every call in the block.
#[derive(Debug, Clone)]
pub(crate) struct BlockContext {
    pub index: u64,
    pub timestamp: u64,
    pub entropy: Entropy,
}

/// The request a context was opened for.
#[derive(Debug, Clone, Default)]
pub(crate) struct RequestContext {
    pub id: RequestId,
    pub entropy: HashValue,
}

/// One active call.
#[derive(Debug, Clone)]
pub(crate) struct CallFrame {
    pub caller: AgentId,
    pub contract: ContractId,
    pub contract_name: String,
    pub creator: AgentId,
    pub params: Params,
    pub transfer: ColoredBalances,
}

impl CallFrame {
    pub fn new(
        caller: AgentId,
        contract: ContractId,
        record: &ContractRecord,
        params: Params,
        transfer: ColoredBalances,
    ) -> Self {
        Self {
            caller,
            contract,
            contract_name: record.name.clone(),
            creator: record.creator,
            params,
            transfer,
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

pub(crate) struct VmContext<'s, 'b> {
    env: &'s VmEnvironment,
    state: &'s mut StateOverlay<'b>,
    chain: ChainInfo,
    block: &'s BlockContext,
    request: RequestContext,
    current: CallFrame,
    parents: Vec<CallFrame>,
    max_call_depth: usize,
    outbound: Vec<OutboundEffect>,
    events: Vec<String>,
}

impl<'s, 'b> VmContext<'s, 'b> {
    pub fn new(
        env: &'s VmEnvironment,
        state: &'s mut StateOverlay<'b>,
        chain: ChainInfo,
        block: &'s BlockContext,
        request: RequestContext,
        frame: CallFrame,
    ) -> Self {
        Self {
            env,
            state,
            chain,
            block,
            request,
            current: frame,
            parents: Vec::new(),
            max_call_depth: env.max_call_depth(),
            outbound: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    /// Number of active frames.
    pub fn depth(&self) -> usize {
        self.parents.len() + 1
    }

    /// Outbound effects and events staged by successful calls.
    pub fn into_effects(self) -> (Vec<OutboundEffect>, Vec<String>) {
        (self.outbound, self.events)
    }

    /// Runs a full entry point of the current frame's contract.
    pub fn run_full(&mut self, entry_point: Hname) -> Result<Params, VmError> {
        let contract = self.current.contract.hname;
        let (_, entry) = self.resolve(contract, entry_point)?;
        if entry.is_view() {
            return Err(VmError::UnknownEntryPoint {
                contract,
                entry_point,
            });
        }
        self.invoke(&entry)
    }

    /// Runs a view entry point of the current frame's contract.
    pub fn run_view(&mut self, entry_point: Hname) -> Result<Params, VmError> {
        let contract = self.current.contract.hname;
        let (_, entry) = self.resolve(contract, entry_point)?;
        if !entry.is_view() {
            return Err(VmError::ViewCallMutationAttempt {
                contract,
                entry_point,
            });
        }
        self.invoke(&entry)
    }

    // --- frame plumbing ---

    fn current_agent(&self) -> AgentId {
        AgentId::Contract(self.current.contract)
    }

    fn resolve(
        &self,
        contract: Hname,
        entry_point: Hname,
    ) -> Result<(ContractRecord, EntryPoint), VmError> {
        let root_state = ReadOnlyNamespacedStateAccess::new(&*self.state, keys::root_hname());
        let record = root::find_contract(&root_state, contract)?
            .ok_or_else(|| VmError::UnknownContract(contract.to_string()))?;
        let processor = self.env.processor(&record.program_hash, &*self.state)?;
        let entry = processor
            .entry_point(entry_point)
            .cloned()
            .ok_or(VmError::UnknownEntryPoint {
                contract,
                entry_point,
            })?;
        Ok((record, entry))
    }

    fn ensure_depth(&self) -> Result<(), VmError> {
        let max = self.max_call_depth;
        if self.depth() >= max {
            return Err(VmError::CallDepthExceeded(max));
        }
        Ok(())
    }

    /// Pushes `frame`, runs `entry` in it and pops it again.
    fn enter(&mut self, frame: CallFrame, entry: &EntryPoint) -> Result<Params, VmError> {
        self.ensure_depth()?;
        let parent = std::mem::replace(&mut self.current, frame);
        self.parents.push(parent);
        let result = self.invoke(entry);
        if let Some(parent) = self.parents.pop() {
            self.current = parent;
        }
        result
    }

    /// Runs `entry` in the current frame. Panics raised by contract code are
    /// contained here and reported as `Panic`.
    fn invoke(&mut self, entry: &EntryPoint) -> Result<Params, VmError> {
        let handler = entry.handler().clone();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| match &handler {
            Handler::Full(f) => f(&mut MutatingContext::new(&mut *self)),
            Handler::View(f) => f(&mut ViewContext::new(&mut *self)),
        }));
        outcome.unwrap_or_else(|payload| {
            let msg = panic_message(payload.as_ref());
            tracing::warn!(
                target: "vm",
                event = "contract_panic",
                contract = %self.current.contract_name,
                entry_point = %entry.name(),
                message = %msg,
            );
            Err(VmError::Panic(msg))
        })
    }

    // --- operations shared by both call kinds ---

    fn balances(&self) -> Result<ColoredBalances, VmError> {
        let accounts = ReadOnlyNamespacedStateAccess::new(&*self.state, keys::accounts_hname());
        Ok(ledger::balances_of(&accounts, &self.current_agent())?)
    }

    fn logger(&self) -> ContractLogger {
        ContractLogger::new(self.current.contract_name.clone(), self.current.contract.hname)
    }

    fn call_view(
        &mut self,
        contract: Hname,
        entry_point: Hname,
        params: Params,
    ) -> Result<Params, VmError> {
        let (record, entry) = self.resolve(contract, entry_point)?;
        if !entry.is_view() {
            return Err(VmError::ViewCallMutationAttempt {
                contract,
                entry_point,
            });
        }
        let frame = CallFrame::new(
            self.current_agent(),
            ContractId::new(self.chain.chain_id, contract),
            &record,
            params,
            ColoredBalances::new(),
        );
        self.enter(frame, &entry)
    }

    // --- mutating operations ---

    fn call_full(
        &mut self,
        contract: Hname,
        entry_point: Hname,
        params: Params,
        transfer: ColoredBalances,
    ) -> Result<Params, VmError> {
        let (record, entry) = self.resolve(contract, entry_point)?;
        self.ensure_depth()?;

        let checkpoint = self.state.checkpoint();
        let outbound_mark = self.outbound.len();
        let result = self.transfer_and_enter(contract, &record, &entry, params, transfer);
        if result.is_err() {
            self.state.revert_to(checkpoint);
            self.outbound.truncate(outbound_mark);
        }
        result
    }

    fn transfer_and_enter(
        &mut self,
        contract: Hname,
        record: &ContractRecord,
        entry: &EntryPoint,
        params: Params,
        transfer: ColoredBalances,
    ) -> Result<Params, VmError> {
        let caller = self.current_agent();
        let callee = ContractId::new(self.chain.chain_id, contract);
        // Views cannot hold an incoming transfer.
        let transfer = if entry.is_view() {
            ColoredBalances::new()
        } else {
            transfer
        };
        if !transfer.is_empty() {
            let mut accounts = NamespacedStateAccess::new(&mut *self.state, keys::accounts_hname());
            ledger::transfer(&mut accounts, &caller, &AgentId::Contract(callee), &transfer)?;
        }
        let frame = CallFrame::new(caller, callee, record, params, transfer);
        self.enter(frame, entry)
    }

    fn deploy(
        &mut self,
        program_hash: HashValue,
        name: &str,
        description: &str,
        init_params: Params,
    ) -> Result<(), VmError> {
        let deployer = if self.current.contract.hname == keys::root_hname() {
            self.current.caller
        } else {
            self.current_agent()
        };
        let allowed = self
            .env
            .deploy_policy()
            .can_deploy(&*self.state, &self.chain, &deployer)?;
        if !allowed {
            return Err(VmError::PermissionDenied(format!(
                "{} may not deploy contracts",
                deployer
            )));
        }
        if name.is_empty() {
            return Err(VmError::MissingParameter(root::PARAM_NAME.into()));
        }

        let hname = Hname::of(name);
        let root_state = ReadOnlyNamespacedStateAccess::new(&*self.state, keys::root_hname());
        if root::find_contract(&root_state, hname)?.is_some() {
            return Err(VmError::DuplicateContractName(name.to_string()));
        }
        let processor = self.env.processor(&program_hash, &*self.state)?;

        let record = ContractRecord {
            program_hash,
            name: name.to_string(),
            description: description.to_string(),
            creator: deployer,
            owner_fee: 0,
            validator_fee: 0,
        };
        let checkpoint = self.state.checkpoint();
        let outbound_mark = self.outbound.len();
        let init = processor.entry_point(Hname::of(keys::INIT_ENTRY_POINT));
        let result = self.install(hname, &record, init, init_params);
        if result.is_err() {
            self.state.revert_to(checkpoint);
            self.outbound.truncate(outbound_mark);
            return result;
        }

        tracing::info!(
            target: "vm",
            event = "contract_deployed",
            name = %name,
            hname = %hname,
            program = %program_hash,
            deployer = %deployer,
        );
        Ok(())
    }

    fn install(
        &mut self,
        hname: Hname,
        record: &ContractRecord,
        init: Option<&EntryPoint>,
        init_params: Params,
    ) -> Result<(), VmError> {
        let mut root_state = NamespacedStateAccess::new(&mut *self.state, keys::root_hname());
        root::store_contract(&mut root_state, hname, record)?;
        if let Some(init) = init.filter(|ep| !ep.is_view()) {
            let frame = CallFrame::new(
                record.creator,
                ContractId::new(self.chain.chain_id, hname),
                record,
                init_params,
                ColoredBalances::new(),
            );
            self.enter(frame, init)?;
        }
        Ok(())
    }

    fn move_tokens(&mut self, target: &AgentId, color: &Color, amount: u64) -> bool {
        let from = self.current_agent();
        self.move_balance(&from, target, &ColoredBalances::single(*color, amount))
            .is_ok()
    }

    fn move_balance(
        &mut self,
        from: &AgentId,
        to: &AgentId,
        transfer: &ColoredBalances,
    ) -> Result<(), VmError> {
        let checkpoint = self.state.checkpoint();
        let mut accounts = NamespacedStateAccess::new(&mut *self.state, keys::accounts_hname());
        let result = ledger::transfer(&mut accounts, from, to, transfer);
        if let Err(err) = &result {
            self.state.revert_to(checkpoint);
            if !matches!(err, VmError::InsufficientBalance { .. }) {
                tracing::warn!(target: "vm", event = "move_failed", error = %err);
            }
        }
        result
    }

    /// Debits the running contract and stages an effect for the anchoring
    /// transaction.
    fn stage_outflow(&mut self, transfer: &ColoredBalances, effect: OutboundEffect) -> bool {
        let from = self.current_agent();
        let checkpoint = self.state.checkpoint();
        let mut accounts = NamespacedStateAccess::new(&mut *self.state, keys::accounts_hname());
        match ledger::debit(&mut accounts, &from, transfer) {
            Ok(()) => {
                self.outbound.push(effect);
                true
            }
            Err(err) => {
                self.state.revert_to(checkpoint);
                tracing::debug!(target: "vm", event = "outflow_rejected", from = %from, error = %err);
                false
            }
        }
    }

    fn transfer_to_address(&mut self, address: &Address, transfer: &ColoredBalances) -> bool {
        if transfer.is_empty() {
            return false;
        }
        let effect = OutboundEffect::TransferToAddress {
            from: self.current_agent(),
            address: *address,
            transfer: transfer.clone(),
        };
        self.stage_outflow(transfer, effect)
    }

    fn post_request(&mut self, section: RequestSection) -> bool {
        let transfer = section.transfer.clone();
        let effect = OutboundEffect::PostRequest {
            sender: self.current_agent(),
            section,
        };
        self.stage_outflow(&transfer, effect)
    }

    fn transfer_cross_chain(
        &mut self,
        target: &AgentId,
        chain: &ChainId,
        transfer: &ColoredBalances,
    ) -> bool {
        if transfer.is_empty() {
            return false;
        }
        let section = RequestSection::new(
            ContractId::new(*chain, keys::accounts_hname()),
            Hname::of(accounts_contract::FUNC_DEPOSIT),
        )
        .with_params(Params::new().with(accounts_contract::PARAM_AGENT_ID, *target))
        .with_transfer(transfer.clone());
        self.post_request(section)
    }

    fn event(&mut self, msg: &str) {
        tracing::info!(
            target: "vm",
            event = "contract_event",
            contract = %self.current.contract_name,
            message = %msg,
        );
        self.events
            .push(format!("[{}] {}", self.current.contract_name, msg));
    }

    fn is_privileged(&self) -> bool {
        keys::is_core_contract(self.current.contract.hname)
    }
}
