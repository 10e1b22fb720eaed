//! Multi-chain network orchestration.
//!
//! # Data Flow
//! ```text
//! HarnessConfig + GenesisConfig
//!     → orchestrator.rs bring_up (provision all chains, wait healthy)
//!     → deploy_contract / deploy_keyless (fund sender → submit raw → verify code)
//!     → deploy_registry_contracts (funded account deploys registry per chain)
//!     → flows drive the Ready network
//!     → tear_down (cancel waits, stop every chain)
//! ```
//!
//! # Design Decisions
//! - Every per-chain step is a fan-out with a barrier; the first failure
//!   cancels the rest
//! - A failed bring-up never leaves chains running
//! - Differing code across chains is an invariant violation, never retried

pub mod error;
pub mod fanout;
pub mod genesis;
pub mod instance;
pub mod orchestrator;
pub mod state;

pub use error::{HarnessError, HarnessResult};
pub use genesis::{GenesisConfig, GenesisError};
pub use instance::ChainInstance;
pub use orchestrator::{FundedAccount, NetworkOrchestrator, REGISTRY_LABEL};
pub use state::NetworkState;
