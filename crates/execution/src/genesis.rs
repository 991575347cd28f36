// Path: crates/execution/src/genesis.rs
//! Construction of a chain's origin block.

use crate::core_contracts::{self, root};
use chroma_api::state::{NamespacedStateAccess, StateOverlay};
use chroma_api::vm::ContractProcessor;
use chroma_state::block::seal_block;
use chroma_state::VirtualState;
use chroma_types::app::{AgentId, Block, ChainId, ChainInfo, Color, ContractRecord, HashValue, TxId};
use chroma_types::error::{BlockError, ChainError};
use chroma_types::keys;

/// Parameters of a new chain.
#[derive(Debug, Clone)]
pub struct GenesisParams {
    pub chain_id: ChainId,
    pub owner: AgentId,
    pub description: String,
    pub fee_color: Color,
    /// Receiver of validator fees; the owner when unset.
    pub validator_fee_target: Option<AgentId>,
    /// Identity of the transaction that created the chain.
    pub anchor: TxId,
    pub timestamp: u64,
}

/// Builds block 0: the chain info record and the registry entries of the
/// core contracts, owned and created by the chain owner, with zero fees.
pub fn origin_block(params: &GenesisParams, snapshot: &VirtualState) -> Result<Block, ChainError> {
    if snapshot.is_initialized() {
        return Err(BlockError::InvalidIndex {
            expected: snapshot.next_block_index(),
            got: 0,
        }
        .into());
    }

    let mut overlay = StateOverlay::new(snapshot);
    let mut root_state = NamespacedStateAccess::new(&mut overlay, keys::root_hname());
    let info = ChainInfo {
        chain_id: params.chain_id,
        owner: params.owner,
        pending_owner: None,
        description: params.description.clone(),
        fee_color: params.fee_color,
        validator_fee_target: params.validator_fee_target.unwrap_or(params.owner),
    };
    root::store_chain_info(&mut root_state, &info)?;

    for iface in core_contracts::interfaces() {
        let record = ContractRecord {
            program_hash: iface.program_hash(),
            name: iface.contract_name().to_string(),
            description: iface.description().to_string(),
            creator: params.owner,
            owner_fee: 0,
            validator_fee: 0,
        };
        root::store_contract(&mut root_state, iface.hname(), &record)?;
    }

    let block = seal_block(
        0,
        HashValue::NIL,
        params.anchor,
        params.timestamp,
        Vec::new(),
        overlay.into_ordered_batch(),
    );
    tracing::info!(
        target: "vm",
        event = "origin_block",
        chain = %params.chain_id,
        owner = %params.owner,
        state_hash = %block.header.state_hash,
    );
    Ok(block)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chroma_api::state::{ReadOnlyNamespacedStateAccess, StateReader};
    use chroma_types::app::Address;

    fn params() -> GenesisParams {
        GenesisParams {
            chain_id: ChainId([7; 32]),
            owner: AgentId::Address(Address([1; 32])),
            description: "test chain".into(),
            fee_color: Color::BASE,
            validator_fee_target: None,
            anchor: TxId([9; 32]),
            timestamp: 0,
        }
    }

    #[test]
    fn origin_registers_core_contracts() {
        let mut state = VirtualState::new(ChainId([7; 32]), 8);
        let block = origin_block(&params(), &state).unwrap();
        assert_eq!(block.index(), 0);
        state.apply_block(block).unwrap();
        state.commit().unwrap();

        let root_state = ReadOnlyNamespacedStateAccess::new(&state, keys::root_hname());
        let info = root::chain_info(&root_state).unwrap().unwrap();
        assert_eq!(info.validator_fee_target, params().owner);
        for name in [keys::ROOT_CONTRACT, keys::ACCOUNTS_CONTRACT, keys::BLOB_CONTRACT] {
            let record = root::find_contract(&root_state, chroma_types::app::Hname::of(name))
                .unwrap()
                .unwrap();
            assert_eq!(record.name, name);
        }
        assert!(state.has(&keys::contract_key(keys::root_hname(), keys::CHAIN_INFO_KEY)).unwrap());
    }

    #[test]
    fn origin_is_deterministic_and_only_once() {
        let mut state = VirtualState::new(ChainId([7; 32]), 8);
        let a = origin_block(&params(), &state).unwrap();
        let b = origin_block(&params(), &state).unwrap();
        assert_eq!(a, b);
        state.apply_block(a).unwrap();
        state.commit().unwrap();
        assert!(origin_block(&params(), &state).is_err());
    }
}
