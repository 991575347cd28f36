// Path: crates/types/src/app/contract.rs
use super::{AgentId, ChainId, Color, HashValue};
use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// The registry entry of a deployed contract, kept by the root contract.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub struct ContractRecord {
    /// Hash of the program the contract runs.
    pub program_hash: HashValue,
    /// Unique name on the chain.
    pub name: String,
    /// Free text description.
    pub description: String,
    /// The agent that deployed the contract.
    pub creator: AgentId,
    /// Fee paid to the chain owner per request.
    pub owner_fee: u64,
    /// Fee paid to the validator fee target per request.
    pub validator_fee: u64,
}

/// Chain-wide parameters kept by the root contract.
#[derive(Clone, Debug, PartialEq, Eq, Encode, Decode, Serialize, Deserialize)]
pub struct ChainInfo {
    /// Identity of the chain.
    pub chain_id: ChainId,
    /// Current chain owner.
    pub owner: AgentId,
    /// Owner-designate awaiting `claimChainOwnership`.
    pub pending_owner: Option<AgentId>,
    /// Free text description.
    pub description: String,
    /// The color in which fees are paid.
    pub fee_color: Color,
    /// Receiver of validator fees.
    pub validator_fee_target: AgentId,
}

/// The fees due for one request and where they go.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeeInfo {
    /// Fee color.
    pub color: Color,
    /// Amount credited to `owner_target`.
    pub owner_fee: u64,
    /// Amount credited to `validator_target`.
    pub validator_fee: u64,
    /// Receiver of the owner fee.
    pub owner_target: AgentId,
    /// Receiver of the validator fee.
    pub validator_target: AgentId,
}

impl FeeInfo {
    /// Owner fee plus validator fee, saturating.
    pub fn total(&self) -> u64 {
        self.owner_fee.saturating_add(self.validator_fee)
    }
}
