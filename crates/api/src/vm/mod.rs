// Path: crates/api/src/vm/mod.rs
//! Capability interfaces handed to contract code.
//!
//! A full (mutating) call receives a [`Sandbox`]; a view call receives a
//! [`SandboxView`]. The view interface has no transfer, deploy or outbound
//! operations at all and only a read-only state handle, so view code cannot
//! express a mutation.

use crate::state::{NamespacedStateAccess, ReadOnlyNamespacedStateAccess};
use chroma_types::app::{
    Address, AgentId, ChainId, Color, ColoredBalances, ContractId, HashValue, Hname, Params,
    RequestId, RequestSection,
};
use chroma_types::error::VmError;

mod logger;
mod processor;
/// Deterministic entropy derived from anchors.
pub mod randomness;

pub use logger::ContractLogger;
pub use processor::{
    ContractInterface, ContractProcessor, EntryPoint, FullHandler, Handler, ViewHandler,
    VmConstructor,
};
pub use randomness::Entropy;

/// Operations shared by both call kinds.
pub trait SandboxBase {
    /// The chain the contract runs on.
    fn chain_id(&self) -> ChainId;
    /// The current chain owner.
    fn chain_owner_id(&self) -> AgentId;
    /// The running contract.
    fn contract_id(&self) -> ContractId;
    /// The agent that deployed the running contract.
    fn contract_creator(&self) -> AgentId;
    /// Logical time of the current block.
    fn timestamp(&self) -> u64;
    /// Arguments of the current call.
    fn params(&self) -> &Params;
    /// The running contract's own balances, including any incoming transfer.
    fn balances(&self) -> Result<ColoredBalances, VmError>;
    /// The running contract's balance of one color.
    fn balance(&self, color: &Color) -> Result<u64, VmError> {
        Ok(self.balances()?.get(color))
    }
    /// A logger tagged with the running contract. Diagnostics only.
    fn log(&self) -> ContractLogger;
}

/// The mutating capability interface of a full call.
pub trait Sandbox: SandboxBase {
    /// The agent that invoked this call.
    fn caller(&self) -> AgentId;
    /// The request being processed.
    fn request_id(&self) -> RequestId;
    /// Deterministic per-request entropy derived from the block anchor.
    fn entropy(&self) -> HashValue;
    /// Tokens attached to this call, already reflected in `balances()`.
    fn incoming_transfer(&self) -> &ColoredBalances;
    /// Mutable handle on the running contract's namespace.
    fn state(&mut self) -> NamespacedStateAccess<'_>;
    /// Synchronously invokes another contract on this chain, moving `transfer`
    /// from the running contract to the callee first.
    fn call(
        &mut self,
        contract: Hname,
        entry_point: Hname,
        params: Params,
        transfer: ColoredBalances,
    ) -> Result<Params, VmError>;
    /// Deploys a new contract bound to `program_hash` and runs its `init`.
    fn deploy_contract(
        &mut self,
        program_hash: HashValue,
        name: &str,
        description: &str,
        init_params: Params,
    ) -> Result<(), VmError>;
    /// Moves tokens from the running contract to `target` on this chain.
    /// Returns `false` and changes nothing if the balance is insufficient.
    fn move_tokens(&mut self, target: &AgentId, color: &Color, amount: u64) -> bool;
    /// Sends tokens from the running contract to a ledger address once the
    /// block is anchored.
    fn transfer_to_address(&mut self, address: &Address, transfer: &ColoredBalances) -> bool;
    /// Credits tokens to `target`'s account on another chain.
    fn transfer_cross_chain(
        &mut self,
        target: &AgentId,
        chain: &ChainId,
        transfer: &ColoredBalances,
    ) -> bool;
    /// Posts a request on behalf of the running contract once the block is
    /// anchored. The attached transfer is debited immediately.
    fn post_request(&mut self, section: RequestSection) -> bool;
    /// Publishes an event. Diagnostics only.
    fn event(&mut self, msg: &str);
    /// Extra capabilities available to core contracts only.
    fn privileged(&mut self) -> Option<&mut dyn PrivilegedSandbox>;
}

/// The read-only capability interface of a view call.
pub trait SandboxView: SandboxBase {
    /// Read-only handle on the running contract's namespace.
    fn state(&self) -> ReadOnlyNamespacedStateAccess<'_>;
    /// Invokes a view entry point of another contract. Reaching a mutating
    /// entry point fails with `ViewCallMutationAttempt`.
    fn call(&mut self, contract: Hname, entry_point: Hname, params: Params)
        -> Result<Params, VmError>;
}

/// Balance operations reserved to the chain's core contracts.
pub trait PrivilegedSandbox {
    /// Moves tokens between any two accounts on this chain.
    fn move_balance(
        &mut self,
        from: &AgentId,
        to: &AgentId,
        transfer: &ColoredBalances,
    ) -> Result<(), VmError>;
}
