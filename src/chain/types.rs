//! Chain-side types and error definitions.

use alloy::primitives::{Address, TxHash, U256};
use thiserror::Error;

/// Errors that can occur while talking to one chain.
#[derive(Debug, Error)]
pub enum ChainError {
    /// RPC connection or request failed.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// RPC request timed out.
    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),

    /// Transaction was not included within the polling budget.
    #[error("Transaction {tx_hash} not included after {polls} polls")]
    InclusionTimeout { tx_hash: TxHash, polls: u32 },

    /// Transaction was included but reverted.
    #[error("Transaction reverted: {0}")]
    Reverted(TxHash),

    /// An account cannot pay for a transaction.
    #[error("Insufficient funds: {address} holds {balance} wei, needs {required} wei")]
    InsufficientFunds {
        address: Address,
        balance: U256,
        required: U256,
    },

    /// Chain configuration mismatch.
    #[error("Chain ID mismatch: expected {expected}, got {actual}")]
    ChainMismatch { expected: u64, actual: u64 },

    /// Creation receipt did not report a contract address.
    #[error("Transaction {0} created no contract")]
    NoContractCreated(TxHash),

    /// Chain process could not be started.
    #[error("Failed to start chain: {0}")]
    Process(String),

    /// Handle was used after shutdown.
    #[error("Chain is not running")]
    NotRunning,

    /// Wait abandoned because shutdown was triggered.
    #[error("Operation cancelled")]
    Cancelled,
}

/// Result type for chain operations.
pub type ChainResult<T> = Result<T, ChainError>;

/// What the orchestrator needs from a transaction receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InclusionReceipt {
    pub tx_hash: TxHash,
    pub block_number: u64,
    /// False if the transaction reverted.
    pub success: bool,
    pub gas_used: u64,
    /// Set for contract creations.
    pub contract_address: Option<Address>,
}
