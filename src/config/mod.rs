//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! harness.toml
//!     → loader.rs (parse & deserialize, env override for the funded key)
//!     → validation.rs (semantic checks, all errors at once)
//!     → HarnessConfig (validated, immutable)
//!     → orchestrator, provisioner, driver
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Retry and polling budgets are configuration, documented in schema.rs

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError, FUNDED_KEY_ENV_VAR};
pub use schema::{
    ChainConfig, DeploymentConfig, FundedAccountConfig, HarnessConfig, HealthCheckConfig,
    InclusionConfig, NetworkConfig, ObservabilityConfig,
};
