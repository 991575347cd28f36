// Path: crates/types/src/error/mod.rs
//! Core error types for the chain VM.

use crate::app::{AgentId, ChainId, Color, HashValue, Hname};
use thiserror::Error;

/// A trait for assigning a stable, machine-readable string code to an error.
pub trait ErrorCode {
    /// Returns the unique, stable string identifier for this error variant.
    fn code(&self) -> &'static str;
}

/// Errors related to the key/value state and its encodings.
#[derive(Error, Debug)]
pub enum StateError {
    /// State validation failed.
    #[error("Validation failed: {0}")]
    Validation(String),
    /// Applying a state change failed.
    #[error("Apply failed: {0}")]
    Apply(String),
    /// The provided value was invalid.
    #[error("Invalid value: {0}")]
    InvalidValue(String),
    /// An error occurred during state deserialization.
    #[error("Decode error: {0}")]
    Decode(String),
}

impl ErrorCode for StateError {
    fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "STATE_VALIDATION_FAILED",
            Self::Apply(_) => "STATE_APPLY_FAILED",
            Self::InvalidValue(_) => "STATE_INVALID_VALUE",
            Self::Decode(_) => "STATE_DECODE_ERROR",
        }
    }
}

/// Errors raised while executing contract code or the sandbox operations it
/// invokes. These fail the current call chain, never the batch.
#[derive(Error, Debug)]
pub enum VmError {
    /// A required parameter was not supplied.
    #[error("Missing parameter: {0}")]
    MissingParameter(String),
    /// A parameter could not be decoded as the expected type.
    #[error("Invalid encoding of parameter: {0}")]
    InvalidParameterEncoding(String),
    /// An agent tried to spend more of a color than it holds.
    #[error("Insufficient balance of {agent}: needed {needed} of {color}, available {available}")]
    InsufficientBalance {
        /// The agent being debited.
        agent: AgentId,
        /// The color being debited.
        color: Color,
        /// The amount requested.
        needed: u64,
        /// The amount held.
        available: u64,
    },
    /// The nested call stack reached its ceiling.
    #[error("Call depth exceeded: limit is {0}")]
    CallDepthExceeded(usize),
    /// The target contract is not deployed on this chain.
    #[error("Unknown contract: {0}")]
    UnknownContract(String),
    /// The contract has no such entry point (or not of the required kind).
    #[error("Unknown entry point {entry_point} of contract {contract}")]
    UnknownEntryPoint {
        /// The contract hname.
        contract: Hname,
        /// The entry point hname.
        entry_point: Hname,
    },
    /// The caller may not perform the operation.
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    /// A view context tried to reach a mutating entry point.
    #[error("View call cannot invoke mutating entry point {entry_point} of contract {contract}")]
    ViewCallMutationAttempt {
        /// The contract hname.
        contract: Hname,
        /// The entry point hname.
        entry_point: Hname,
    },
    /// A contract with the same name is already deployed.
    #[error("Contract name already in use: {0}")]
    DuplicateContractName(String),
    /// No processor is available for the program hash.
    #[error("Unknown program: {0}")]
    UnknownProgram(HashValue),
    /// The program names a VM type that is not registered.
    #[error("Unknown VM type: {0}")]
    UnknownVmType(String),
    /// Contract code aborted explicitly.
    #[error("Aborted: {0}")]
    Aborted(String),
    /// Contract code panicked.
    #[error("Contract panicked: {0}")]
    Panic(String),
    /// A state access failed.
    #[error("State error: {0}")]
    State(#[from] StateError),
}

impl ErrorCode for VmError {
    fn code(&self) -> &'static str {
        match self {
            Self::MissingParameter(_) => "VM_MISSING_PARAMETER",
            Self::InvalidParameterEncoding(_) => "VM_INVALID_PARAMETER_ENCODING",
            Self::InsufficientBalance { .. } => "VM_INSUFFICIENT_BALANCE",
            Self::CallDepthExceeded(_) => "VM_CALL_DEPTH_EXCEEDED",
            Self::UnknownContract(_) => "VM_UNKNOWN_CONTRACT",
            Self::UnknownEntryPoint { .. } => "VM_UNKNOWN_ENTRY_POINT",
            Self::PermissionDenied(_) => "VM_PERMISSION_DENIED",
            Self::ViewCallMutationAttempt { .. } => "VM_VIEW_CALL_MUTATION_ATTEMPT",
            Self::DuplicateContractName(_) => "VM_DUPLICATE_CONTRACT_NAME",
            Self::UnknownProgram(_) => "VM_UNKNOWN_PROGRAM",
            Self::UnknownVmType(_) => "VM_UNKNOWN_VM_TYPE",
            Self::Aborted(_) => "VM_ABORTED",
            Self::Panic(_) => "VM_PANIC",
            Self::State(_) => "VM_STATE_ERROR",
        }
    }
}

/// Errors related to block validation against the virtual state.
#[derive(Debug, Error)]
pub enum BlockError {
    /// The block's index is incorrect.
    #[error("Invalid block index. Expected {expected}, got {got}")]
    InvalidIndex {
        /// The expected block index.
        expected: u64,
        /// The index of the received block.
        got: u64,
    },
    /// The block's previous state hash does not match the current state hash.
    #[error("Mismatched previous state hash. Expected {expected}, got {got}")]
    MismatchedPrevHash {
        /// The current state hash.
        expected: HashValue,
        /// The previous hash carried by the block.
        got: HashValue,
    },
    /// The block's declared state hash does not match its contents.
    #[error("Mismatched state hash. Computed {computed}, declared {declared}")]
    MismatchedStateHash {
        /// The hash recomputed from the block contents.
        computed: HashValue,
        /// The hash declared in the header.
        declared: HashValue,
    },
    /// A block is already staged and awaiting commit.
    #[error("A block is already pending commit")]
    AlreadyPending,
    /// `commit` was called with nothing staged.
    #[error("No block is pending commit")]
    NothingPending,
}

impl ErrorCode for BlockError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidIndex { .. } => "BLOCK_INVALID_INDEX",
            Self::MismatchedPrevHash { .. } => "BLOCK_MISMATCHED_PREV_HASH",
            Self::MismatchedStateHash { .. } => "BLOCK_MISMATCHED_STATE_HASH",
            Self::AlreadyPending => "BLOCK_ALREADY_PENDING",
            Self::NothingPending => "BLOCK_NOTHING_PENDING",
        }
    }
}

/// Errors of the external ledger collaborator.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The sender cannot fund the transaction.
    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),
    /// The chain is not known to the ledger.
    #[error("Unknown chain: {0}")]
    UnknownChain(ChainId),
    /// The transaction was rejected.
    #[error("Transaction rejected: {0}")]
    Rejected(String),
    /// The ledger connection is closed.
    #[error("Ledger connection closed")]
    Closed,
}

impl ErrorCode for LedgerError {
    fn code(&self) -> &'static str {
        match self {
            Self::InsufficientFunds(_) => "LEDGER_INSUFFICIENT_FUNDS",
            Self::UnknownChain(_) => "LEDGER_UNKNOWN_CHAIN",
            Self::Rejected(_) => "LEDGER_REJECTED",
            Self::Closed => "LEDGER_CLOSED",
        }
    }
}

/// Errors of the chain pipeline and the executor's own bookkeeping.
///
/// Unlike [`VmError`], these abort the whole batch run; the virtual state is
/// left untouched because commit only happens after a block is fully built.
#[derive(Debug, Error)]
pub enum ChainError {
    /// A block failed validation.
    #[error("Block error: {0}")]
    Block(#[from] BlockError),
    /// A state access outside contract code failed.
    #[error("State error: {0}")]
    State(#[from] StateError),
    /// The ledger collaborator failed.
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
    /// The chain has no origin block yet.
    #[error("Chain is not initialized")]
    NotInitialized,
    /// Executor bookkeeping failed.
    #[error("Execution bookkeeping failed: {0}")]
    Execution(String),
    /// The chain has been shut down.
    #[error("Chain is shut down")]
    Shutdown,
    /// Waiting for a result timed out.
    #[error("Timed out waiting for {0}")]
    Timeout(String),
}

impl ErrorCode for ChainError {
    fn code(&self) -> &'static str {
        match self {
            Self::Block(_) => "CHAIN_BLOCK_ERROR",
            Self::State(_) => "CHAIN_STATE_ERROR",
            Self::Ledger(_) => "CHAIN_LEDGER_ERROR",
            Self::NotInitialized => "CHAIN_NOT_INITIALIZED",
            Self::Execution(_) => "CHAIN_EXECUTION_ERROR",
            Self::Shutdown => "CHAIN_SHUTDOWN",
            Self::Timeout(_) => "CHAIN_TIMEOUT",
        }
    }
}
