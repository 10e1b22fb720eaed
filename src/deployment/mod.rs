//! Contract deployment values.
//!
//! # Data Flow
//! ```text
//! artifact file (forge JSON / hex)
//!     → artifact.rs (load creation bytecode)
//!     → keyless.rs (canonical-signature legacy tx, sender + contract address)
//!     → network orchestrator (same raw bytes submitted to every chain)
//!
//! registry.rs:
//!     registry creation bytecode + base contract address
//!     → constructor-encoded initcode deployed by the funded account
//! ```
//!
//! Nothing in this module performs network I/O.

pub mod artifact;
pub mod keyless;
pub mod registry;

use thiserror::Error;

pub use artifact::ContractArtifact;
pub use keyless::{DeploymentSpec, KeylessDeployer, KeylessDeployment};

/// Errors raised while preparing deployment transactions.
///
/// These are validation failures: they happen before any chain is touched
/// and are never retried.
#[derive(Debug, Error)]
pub enum DeployError {
    /// Creation bytecode was empty.
    #[error("contract bytecode is empty")]
    EmptyBytecode,

    /// Gas price was zero.
    #[error("gas price must be greater than zero")]
    ZeroGasPrice,

    /// Artifact could not be read or parsed.
    #[error("artifact error: {0}")]
    Artifact(String),

    /// Raw transaction is not a keyless contract creation.
    #[error("malformed deployment transaction: {0}")]
    MalformedTransaction(String),

    /// The canonical signature does not recover to a sender.
    #[error("signature recovery failed: {0}")]
    Recovery(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for deployment preparation.
pub type DeployResult<T> = Result<T, DeployError>;
