// Path: crates/api/src/vm/logger.rs

use chroma_types::app::Hname;

/// Diagnostic logger handed to contract code.
///
/// Output goes to `tracing` under the `contract` target and never reaches
/// state, so it has no influence on the block.
#[derive(Debug, Clone)]
pub struct ContractLogger {
    contract: String,
    hname: Hname,
}

impl ContractLogger {
    /// Creates a logger for the contract `name`.
    pub fn new(contract: impl Into<String>, hname: Hname) -> Self {
        Self {
            contract: contract.into(),
            hname,
        }
    }

    /// Logs at info level.
    pub fn info(&self, msg: &str) {
        tracing::info!(target: "contract", contract = %self.contract, hname = %self.hname, "{}", msg);
    }

    /// Logs at debug level.
    pub fn debug(&self, msg: &str) {
        tracing::debug!(target: "contract", contract = %self.contract, hname = %self.hname, "{}", msg);
    }

    /// Logs at warn level.
    pub fn warn(&self, msg: &str) {
        tracing::warn!(target: "contract", contract = %self.contract, hname = %self.hname, "{}", msg);
    }
}
