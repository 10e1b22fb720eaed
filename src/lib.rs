//! Keyless multi-chain deployment harness.
//!
//! Stands up several local EVM chains, deploys a contract at the same address
//! on every one of them without holding its deployer's key, and hands the
//! ready network to message-delivery flows.

pub mod chain;
pub mod config;
pub mod deployment;
pub mod lifecycle;
pub mod network;
pub mod observability;
pub mod resilience;

pub use config::schema::HarnessConfig;
pub use deployment::{DeploymentSpec, KeylessDeployer, KeylessDeployment};
pub use lifecycle::Shutdown;
pub use network::{HarnessError, NetworkOrchestrator, NetworkState};
