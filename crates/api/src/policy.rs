// Path: crates/api/src/policy.rs
//! Governance hooks consulted by the executor.
//!
//! The executor owns the mechanism (debiting fees, registering contracts);
//! these traits own the decision. The default implementations read the
//! root contract's state.

use crate::state::StateReader;
use chroma_types::app::{AgentId, ChainInfo, ContractRecord, FeeInfo};
use chroma_types::error::StateError;

/// Decides who may deploy contracts.
pub trait DeployPolicy: Send + Sync {
    /// Whether `deployer` may deploy a contract on the chain described by `chain`.
    fn can_deploy(
        &self,
        state: &dyn StateReader,
        chain: &ChainInfo,
        deployer: &AgentId,
    ) -> Result<bool, StateError>;
}

/// Decides the fees charged for a request to a contract.
pub trait FeePolicy: Send + Sync {
    /// The fees due for one request targeting `contract`.
    fn fees_for(
        &self,
        state: &dyn StateReader,
        chain: &ChainInfo,
        contract: &ContractRecord,
    ) -> Result<FeeInfo, StateError>;
}
