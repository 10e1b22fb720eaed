//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the harness.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the harness.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct HarnessConfig {
    /// Chains to bring up and how to launch them.
    pub network: NetworkConfig,

    /// Bounded retry budget for chain health checks.
    pub health_check: HealthCheckConfig,

    /// Transaction inclusion polling.
    pub inclusion: InclusionConfig,

    /// Contract deployment settings.
    pub deployment: DeploymentConfig,

    /// Pre-funded signer paying for deployments.
    pub funded_account: FundedAccountConfig,

    /// Logging settings.
    pub observability: ObservabilityConfig,
}

/// Network configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Chain instances, in index order.
    pub chains: Vec<ChainConfig>,

    /// Genesis document shared by every chain (geth JSON format).
    pub genesis_path: String,

    /// Path or name of the `anvil` executable.
    pub anvil_binary: String,

    /// Interface chain RPC servers bind to.
    pub host: String,

    /// Per-request RPC timeout in seconds.
    pub rpc_timeout_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            chains: vec![
                ChainConfig::new("A", 68_430),
                ChainConfig::new("B", 68_431),
            ],
            genesis_path: "genesis.json".to_string(),
            anvil_binary: "anvil".to_string(),
            host: "127.0.0.1".to_string(),
            rpc_timeout_secs: 10,
        }
    }
}

/// A single chain instance.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ChainConfig {
    /// Human-readable name used in logs.
    pub name: String,

    /// EVM chain id.
    pub chain_id: u64,

    /// RPC port; 0 picks a free one.
    #[serde(default)]
    pub port: u16,

    /// Interval mining in seconds; unset mines on every transaction.
    #[serde(default)]
    pub block_time_secs: Option<u64>,
}

impl ChainConfig {
    pub fn new(name: impl Into<String>, chain_id: u64) -> Self {
        Self {
            name: name.into(),
            chain_id,
            port: 0,
            block_time_secs: None,
        }
    }
}

/// Health check configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Health checks before a chain is declared dead.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            base_delay_ms: 100,
            max_delay_ms: 2000,
        }
    }
}

/// Transaction inclusion polling configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct InclusionConfig {
    /// Interval between receipt polls in milliseconds.
    pub poll_interval_ms: u64,

    /// Maximum number of receipt polls.
    pub max_polls: u32,

    /// Overall deadline in seconds.
    pub timeout_secs: u64,
}

impl Default for InclusionConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 250,
            max_polls: 240,
            timeout_secs: 60,
        }
    }
}

/// Deployment configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DeploymentConfig {
    /// Label the keyless contract is recorded under.
    pub label: String,

    /// Messenger artifact (forge JSON or hex).
    pub artifact_path: String,

    /// Gas price of the keyless transaction in wei.
    pub gas_price_wei: u64,

    /// Use the canonical fixed gas limit instead of sizing it from bytecode.
    pub deterministic: bool,

    /// Check code is byte-identical on every chain after deployment.
    pub verify: bool,

    /// Registry artifact; registry deployment is skipped when unset.
    pub registry_artifact_path: Option<String>,

    /// Directory to write the keyless transaction and addresses to.
    pub output_dir: Option<String>,
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            label: "Messenger".to_string(),
            artifact_path: "contracts/out/Messenger.sol/Messenger.json".to_string(),
            gas_price_wei: 2_500_000_000_000,
            deterministic: true,
            verify: true,
            registry_artifact_path: None,
            output_dir: None,
        }
    }
}

/// Funded account configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FundedAccountConfig {
    /// Hex private key. Overridden by `XCHAIN_FUNDED_PRIVATE_KEY`.
    pub private_key: String,
}

impl Default for FundedAccountConfig {
    fn default() -> Self {
        Self {
            // Anvil's first dev account. Test networks only.
            private_key: "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"
                .to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of the human format.
    pub json: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json: false,
        }
    }
}
