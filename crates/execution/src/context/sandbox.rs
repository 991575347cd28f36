// Path: crates/execution/src/context/sandbox.rs

use super::VmContext;
use chroma_api::state::NamespacedStateAccess;
use chroma_api::vm::{ContractLogger, PrivilegedSandbox, Sandbox, SandboxBase};
use chroma_types::app::{
    Address, AgentId, ChainId, Color, ColoredBalances, ContractId, HashValue, Hname, Params,
    RequestId, RequestSection,
};
use chroma_types::error::VmError;

/// The [`Sandbox`] handed to full entry points.
pub(crate) struct MutatingContext<'c, 's, 'b> {
    vm: &'c mut VmContext<'s, 'b>,
}

impl<'c, 's, 'b> MutatingContext<'c, 's, 'b> {
    pub fn new(vm: &'c mut VmContext<'s, 'b>) -> Self {
        Self { vm }
    }
}

impl SandboxBase for MutatingContext<'_, '_, '_> {
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

impl Sandbox for MutatingContext<'_, '_, '_> {
    fn caller(&self) -> AgentId {
        self.vm.current.caller
    }

    fn request_id(&self) -> RequestId {
        self.vm.request.id
    }

    fn entropy(&self) -> HashValue {
        self.vm.request.entropy
    }

    fn incoming_transfer(&self) -> &ColoredBalances {
        &self.vm.current.transfer
    }

    fn state(&mut self) -> NamespacedStateAccess<'_> {
        let hname = self.vm.current.contract.hname;
        NamespacedStateAccess::new(&mut *self.vm.state, hname)
    }

    fn call(
        &mut self,
        contract: Hname,
        entry_point: Hname,
        params: Params,
        transfer: ColoredBalances,
    ) -> Result<Params, VmError> {
        self.vm.call_full(contract, entry_point, params, transfer)
    }

    fn deploy_contract(
        &mut self,
        program_hash: HashValue,
        name: &str,
        description: &str,
        init_params: Params,
    ) -> Result<(), VmError> {
        self.vm.deploy(program_hash, name, description, init_params)
    }

    fn move_tokens(&mut self, target: &AgentId, color: &Color, amount: u64) -> bool {
        self.vm.move_tokens(target, color, amount)
    }

    fn transfer_to_address(&mut self, address: &Address, transfer: &ColoredBalances) -> bool {
        self.vm.transfer_to_address(address, transfer)
    }

    fn transfer_cross_chain(
        &mut self,
        target: &AgentId,
        chain: &ChainId,
        transfer: &ColoredBalances,
    ) -> bool {
        self.vm.transfer_cross_chain(target, chain, transfer)
    }

    fn post_request(&mut self, section: RequestSection) -> bool {
        self.vm.post_request(section)
    }

    fn event(&mut self, msg: &str) {
        self.vm.event(msg)
    }

    fn privileged(&mut self) -> Option<&mut dyn PrivilegedSandbox> {
        if self.vm.is_privileged() {
            Some(self)
        } else {
            None
        }
    }
}

impl PrivilegedSandbox for MutatingContext<'_, '_, '_> {
    fn move_balance(
        &mut self,
        from: &AgentId,
        to: &AgentId,
        transfer: &ColoredBalances,
    ) -> Result<(), VmError> {
        self.vm.move_balance(from, to, transfer)
    }
}
