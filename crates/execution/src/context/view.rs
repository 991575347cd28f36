// Path: crates/execution/src/context/view.rs

use super::VmContext;
use chroma_api::state::ReadOnlyNamespacedStateAccess;
use chroma_api::vm::{ContractLogger, SandboxBase, SandboxView};
use chroma_types::app::{AgentId, ChainId, ColoredBalances, ContractId, Hname, Params};
use chroma_types::error::VmError;

/// The [`SandboxView`] handed to view entry points. It only ever exposes the
/// state through a read-only handle.
pub(crate) struct ViewContext<'c, 's, 'b> {
    vm: &'c mut VmContext<'s, 'b>,
}

impl<'c, 's, 'b> ViewContext<'c, 's, 'b> {
    pub fn new(vm: &'c mut VmContext<'s, 'b>) -> Self {
        Self { vm }
    }
}

impl SandboxBase for ViewContext<'_, '_, '_> {
    fn chain_id(&self) -> ChainId {
        self.vm.chain.chain_id
    }

    fn chain_owner_id(&self) -> AgentId {
        self.vm.chain.owner
    }

    fn contract_id(&self) -> ContractId {
        self.vm.current.contract
    }

    fn contract_creator(&self) -> AgentId {
        self.vm.current.creator
    }

    fn timestamp(&self) -> u64 {
        self.vm.block.timestamp
    }

    fn params(&self) -> &Params {
        &self.vm.current.params
    }

    fn balances(&self) -> Result<ColoredBalances, VmError> {
        self.vm.balances()
    }

    fn log(&self) -> ContractLogger {
        self.vm.logger()
    }
}

impl SandboxView for ViewContext<'_, '_, '_> {
    fn state(&self) -> ReadOnlyNamespacedStateAccess<'_> {
        ReadOnlyNamespacedStateAccess::new(&*self.vm.state, self.vm.current.contract.hname)
    }

    fn call(
        &mut self,
        contract: Hname,
        entry_point: Hname,
        params: Params,
    ) -> Result<Params, VmError> {
        self.vm.call_view(contract, entry_point, params)
    }
}
