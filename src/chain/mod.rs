//! Chain instance subsystem.
//!
//! # Data Flow
//! ```text
//! ChainConfig + GenesisConfig
//!     → anvil.rs (spawn one anvil per chain, seeded from genesis)
//!     → rpc.rs (alloy HTTP provider, per-call timeouts)
//!     → handle.rs (ChainHandle trait the orchestrator drives)
//!     → inclusion.rs (submit → poll receipt until included / timeout / cancel)
//! ```
//!
//! # Design Decisions
//! - The orchestrator only sees `dyn ChainHandle`; tests plug in an
//!   in-memory chain behind the same trait
//! - Chain-side semantics (nonces, de-duplication) are the node's job
//! - Every RPC call carries a deadline

pub mod anvil;
pub mod handle;
pub mod inclusion;
pub mod rpc;
pub mod types;

pub use anvil::AnvilProvisioner;
pub use handle::{ChainHandle, ChainProvisioner};
pub use inclusion::{fund_and_wait, submit_raw_and_wait, wait_included};
pub use rpc::RpcChain;
pub use types::{ChainError, ChainResult, InclusionReceipt};
