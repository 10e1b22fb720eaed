//! Orchestration errors.

use thiserror::Error;

use crate::chain::ChainError;
use crate::deployment::DeployError;
use crate::network::state::NetworkState;

/// Errors surfaced to the test driver. All of them abort the suite.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// Bad input caught before any chain I/O.
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Deployment error: {0}")]
    Deploy(#[from] DeployError),

    #[error("Configuration error: {0}")]
    Config(String),

    /// A per-chain step failed.
    #[error("Chain {index} ({name}): {source}")]
    Chain {
        index: usize,
        name: String,
        source: ChainError,
    },

    /// A chain never answered its health check within the retry budget.
    #[error("Chain {index} ({name}) unhealthy after {attempts} attempts: {last}")]
    Unhealthy {
        index: usize,
        name: String,
        attempts: u32,
        #[source]
        last: ChainError,
    },

    /// Deployed state differs across chains. Never retried.
    #[error("Invariant violated for '{label}': {detail}")]
    Invariant { label: String, detail: String },

    #[error("Invalid state transition from {from} to {to}")]
    State { from: NetworkState, to: NetworkState },

    #[error("Network is {actual}, operation requires {required}")]
    WrongState {
        required: NetworkState,
        actual: NetworkState,
    },

    #[error("Operation cancelled")]
    Cancelled,
}

impl HarnessError {
    /// Attribute a chain error to the chain it happened on.
    pub fn on_chain(index: usize, name: &str, source: ChainError) -> Self {
        match source {
            ChainError::Cancelled => HarnessError::Cancelled,
            source => HarnessError::Chain {
                index,
                name: name.to_string(),
                source,
            },
        }
    }

    /// True for errors that mean the deployment mechanism itself is broken.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, HarnessError::Invariant { .. })
    }
}

/// Result type for orchestration.
pub type HarnessResult<T> = Result<T, HarnessError>;
