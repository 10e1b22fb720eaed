//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! orchestrator / chain handles / deployer:
//!     → tracing events with structured fields (chain, chain_id, tx_hash, address)
//!     → logging.rs (EnvFilter + fmt layer, human or JSON)
//!     → stdout
//! ```

pub mod logging;

pub use logging::init_logging;
