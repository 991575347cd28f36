// Path: crates/execution/src/environment.rs

use crate::core_contracts::{self, blob};
use crate::policy::{ContractFeePolicy, RootDeployPolicy};
use chroma_api::policy::{DeployPolicy, FeePolicy};
use chroma_api::state::{ReadOnlyNamespacedStateAccess, StateReader};
use chroma_api::vm::{ContractInterface, ContractProcessor, VmConstructor};
use chroma_types::app::HashValue;
use chroma_types::config::ChainConfig;
use chroma_types::error::VmError;
use chroma_types::keys;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Constructors of contract processors, keyed by VM type name.
#[derive(Clone, Default)]
pub struct VmTypeRegistry {
    constructors: BTreeMap<String, VmConstructor>,
}

impl VmTypeRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the constructor of `vm_type`.
    pub fn register(&mut self, vm_type: &str, constructor: VmConstructor) {
        self.constructors.insert(vm_type.to_string(), constructor);
    }

    /// Looks up the constructor of `vm_type`.
    pub fn get(&self, vm_type: &str) -> Option<&VmConstructor> {
        self.constructors.get(vm_type)
    }

    /// Registered VM type names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.constructors.keys().map(String::as_str)
    }
}

/// Everything the executor needs besides state: the programs it can run,
/// the VM types it can load programs for, the governance policies and the
/// call depth ceiling.
///
/// Built once by an explicit initialization step and handed to each chain.
/// The core contracts are always present.
pub struct VmEnvironment {
    natives: BTreeMap<HashValue, Arc<dyn ContractProcessor>>,
    loaded: RwLock<HashMap<HashValue, Arc<dyn ContractProcessor>>>,
    vm_types: VmTypeRegistry,
    deploy_policy: Arc<dyn DeployPolicy>,
    fee_policy: Arc<dyn FeePolicy>,
    max_call_depth: usize,
}

impl VmEnvironment {
    /// Starts building an environment.
    pub fn builder() -> VmEnvironmentBuilder {
        VmEnvironmentBuilder::default()
    }

    /// Maximum number of simultaneously active call frames.
    pub fn max_call_depth(&self) -> usize {
        self.max_call_depth
    }

    /// The deploy policy.
    pub fn deploy_policy(&self) -> &dyn DeployPolicy {
        self.deploy_policy.as_ref()
    }

    /// The fee policy.
    pub fn fee_policy(&self) -> &dyn FeePolicy {
        self.fee_policy.as_ref()
    }

    /// The VM type registry.
    pub fn vm_types(&self) -> &VmTypeRegistry {
        &self.vm_types
    }

    /// Resolves the processor of `program_hash`.
    ///
    /// Native programs are found by hash. Otherwise the program must be a
    /// blob on the chain naming a registered VM type; the constructed
    /// processor is cached, which is sound because blobs are content
    /// addressed.
    pub fn processor(
        &self,
        program_hash: &HashValue,
        state: &dyn StateReader,
    ) -> Result<Arc<dyn ContractProcessor>, VmError> {
        if let Some(p) = self.natives.get(program_hash) {
            return Ok(p.clone());
        }
        if let Some(p) = self.loaded.read().get(program_hash) {
            return Ok(p.clone());
        }

        let blobs = ReadOnlyNamespacedStateAccess::new(state, keys::blob_hname());
        let vm_type = blob::get_field(&blobs, program_hash, keys::BLOB_FIELD_VM_TYPE)?
            .ok_or(VmError::UnknownProgram(*program_hash))?;
        let vm_type = String::from_utf8(vm_type)
            .map_err(|_| VmError::UnknownVmType("<non-utf8>".into()))?;
        let binary = blob::get_field(&blobs, program_hash, keys::BLOB_FIELD_PROGRAM_BINARY)?
            .ok_or(VmError::UnknownProgram(*program_hash))?;
        let constructor = self
            .vm_types
            .get(&vm_type)
            .ok_or_else(|| VmError::UnknownVmType(vm_type.clone()))?;

        let processor = constructor(&binary)?;
        tracing::debug!(
            target: "vm",
            event = "program_loaded",
            program = %program_hash,
            vm_type = %vm_type,
        );
        self.loaded.write().insert(*program_hash, processor.clone());
        Ok(processor)
    }
}

/// Builder of [`VmEnvironment`].
pub struct VmEnvironmentBuilder {
    natives: BTreeMap<HashValue, Arc<dyn ContractProcessor>>,
    vm_types: VmTypeRegistry,
    deploy_policy: Option<Arc<dyn DeployPolicy>>,
    fee_policy: Option<Arc<dyn FeePolicy>>,
    max_call_depth: usize,
}

impl Default for VmEnvironmentBuilder {
    fn default() -> Self {
        Self {
            natives: BTreeMap::new(),
            vm_types: VmTypeRegistry::new(),
            deploy_policy: None,
            fee_policy: None,
            max_call_depth: ChainConfig::default().max_call_depth,
        }
    }
}

impl VmEnvironmentBuilder {
    /// Registers a native program under its program hash.
    pub fn with_processor(mut self, processor: Arc<dyn ContractProcessor>) -> Self {
        self.natives.insert(processor.program_hash(), processor);
        self
    }

    /// Registers a native contract interface.
    pub fn with_contract(self, contract: ContractInterface) -> Self {
        self.with_processor(Arc::new(contract))
    }

    /// Registers a VM type for blob programs.
    pub fn with_vm_type(mut self, vm_type: &str, constructor: VmConstructor) -> Self {
        self.vm_types.register(vm_type, constructor);
        self
    }

    /// Replaces the default deploy policy.
    pub fn with_deploy_policy(mut self, policy: Arc<dyn DeployPolicy>) -> Self {
        self.deploy_policy = Some(policy);
        self
    }

    /// Replaces the default fee policy.
    pub fn with_fee_policy(mut self, policy: Arc<dyn FeePolicy>) -> Self {
        self.fee_policy = Some(policy);
        self
    }

    /// Sets the call depth ceiling.
    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth.max(1);
        self
    }

    /// Applies the VM-related fields of a chain config.
    pub fn with_config(self, config: &ChainConfig) -> Self {
        self.with_max_call_depth(config.max_call_depth)
    }

    /// Finishes the environment, adding the core contracts.
    pub fn build(self) -> VmEnvironment {
        let mut natives = self.natives;
        for iface in core_contracts::interfaces() {
            let processor: Arc<dyn ContractProcessor> = Arc::new(iface);
            natives.insert(processor.program_hash(), processor);
        }
        VmEnvironment {
            natives,
            loaded: RwLock::new(HashMap::new()),
            vm_types: self.vm_types,
            deploy_policy: self
                .deploy_policy
                .unwrap_or_else(|| Arc::new(RootDeployPolicy)),
            fee_policy: self.fee_policy.unwrap_or_else(|| Arc::new(ContractFeePolicy)),
            max_call_depth: self.max_call_depth,
        }
    }
}
