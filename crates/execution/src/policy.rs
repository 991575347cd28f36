// Path: crates/execution/src/policy.rs
//! Default governance policies, backed by the root contract's state.

use crate::core_contracts::root;
use chroma_api::policy::{DeployPolicy, FeePolicy};
use chroma_api::state::{ReadOnlyNamespacedStateAccess, StateReader};
use chroma_types::app::{AgentId, ChainInfo, ContractRecord, FeeInfo};
use chroma_types::error::StateError;
use chroma_types::keys;

/// The chain owner may always deploy; anyone else needs a permission granted
/// through `root.grantDeployPermission`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RootDeployPolicy;

impl DeployPolicy for RootDeployPolicy {
    fn can_deploy(
        &self,
        state: &dyn StateReader,
        chain: &ChainInfo,
        deployer: &AgentId,
    ) -> Result<bool, StateError> {
        if *deployer == chain.owner {
            return Ok(true);
        }
        let root_state = ReadOnlyNamespacedStateAccess::new(state, keys::root_hname());
        root::has_deploy_permission(&root_state, deployer)
    }
}

/// Charges the per-contract fees recorded by `root.setContractFee`, in the
/// chain's fee color. The owner fee goes to the chain owner, the validator
/// fee to the chain's validator fee target.
#[derive(Debug, Default, Clone, Copy)]
pub struct ContractFeePolicy;

impl FeePolicy for ContractFeePolicy {
    fn fees_for(
        &self,
        _state: &dyn StateReader,
        chain: &ChainInfo,
        contract: &ContractRecord,
    ) -> Result<FeeInfo, StateError> {
        Ok(FeeInfo {
            color: chain.fee_color,
            owner_fee: contract.owner_fee,
            validator_fee: contract.validator_fee,
            owner_target: chain.owner,
            validator_target: chain.validator_fee_target,
        })
    }
}
