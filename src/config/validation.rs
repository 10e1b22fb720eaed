//! Configuration validation.
//!
//! Serde handles syntax; this checks semantics and reports every problem at
//! once rather than the first.

use std::collections::HashSet;
use std::fmt;

use alloy::signers::local::PrivateKeySigner;

use crate::config::schema::HarnessConfig;

/// Minimum number of chains a cross-chain network needs.
pub const MIN_CHAINS: usize = 2;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &HarnessConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let chains = &config.network.chains;
    if chains.len() < MIN_CHAINS {
        errors.push(ValidationError::new(
            "network.chains",
            format!("at least {} chains are required, found {}", MIN_CHAINS, chains.len()),
        ));
    }

    let mut names = HashSet::new();
    let mut chain_ids = HashSet::new();
    let mut ports = HashSet::new();
    for (i, chain) in chains.iter().enumerate() {
        let field = format!("network.chains[{}]", i);
        if chain.name.is_empty() {
            errors.push(ValidationError::new(format!("{}.name", field), "must not be empty"));
        } else if !names.insert(chain.name.as_str()) {
            errors.push(ValidationError::new(
                format!("{}.name", field),
                format!("duplicate chain name '{}'", chain.name),
            ));
        }
        if chain.chain_id == 0 {
            errors.push(ValidationError::new(format!("{}.chain_id", field), "must be non-zero"));
        } else if !chain_ids.insert(chain.chain_id) {
            errors.push(ValidationError::new(
                format!("{}.chain_id", field),
                format!("duplicate chain id {}", chain.chain_id),
            ));
        }
        if chain.port != 0 && !ports.insert(chain.port) {
            errors.push(ValidationError::new(
                format!("{}.port", field),
                format!("port {} used by more than one chain", chain.port),
            ));
        }
    }

    if config.network.rpc_timeout_secs == 0 {
        errors.push(ValidationError::new("network.rpc_timeout_secs", "must be greater than 0"));
    }

    let health = &config.health_check;
    if health.max_attempts == 0 {
        errors.push(ValidationError::new("health_check.max_attempts", "must be greater than 0"));
    }
    if health.base_delay_ms > health.max_delay_ms {
        errors.push(ValidationError::new(
            "health_check.base_delay_ms",
            "must not exceed max_delay_ms",
        ));
    }

    let inclusion = &config.inclusion;
    if inclusion.poll_interval_ms == 0 {
        errors.push(ValidationError::new("inclusion.poll_interval_ms", "must be greater than 0"));
    }
    if inclusion.max_polls == 0 {
        errors.push(ValidationError::new("inclusion.max_polls", "must be greater than 0"));
    }
    if inclusion.timeout_secs == 0 {
        errors.push(ValidationError::new("inclusion.timeout_secs", "must be greater than 0"));
    }

    if config.deployment.label.is_empty() {
        errors.push(ValidationError::new("deployment.label", "must not be empty"));
    }
    if config.deployment.gas_price_wei == 0 {
        errors.push(ValidationError::new("deployment.gas_price_wei", "must be greater than 0"));
    }

    let key = config.funded_account.resolve_private_key();
    if key.strip_prefix("0x").unwrap_or(&key).parse::<PrivateKeySigner>().is_err() {
        errors.push(ValidationError::new(
            "funded_account.private_key",
            "not a valid secp256k1 private key",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
