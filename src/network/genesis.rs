//! Genesis document shared by every chain in the network.
//!
//! Kept as an opaque JSON value; only `config.chainId` and `alloc` are read,
//! and only `config.chainId` is rewritten per chain.

use std::fs;
use std::path::{Path, PathBuf};

use alloy::primitives::{Address, U256};
use serde_json::{json, Value};
use thiserror::Error;

/// Errors reading a genesis document.
#[derive(Debug, Error)]
pub enum GenesisError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid genesis JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid genesis: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenesisConfig {
    document: Value,
}

impl GenesisConfig {
    pub fn load(path: &Path) -> Result<Self, GenesisError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, GenesisError> {
        let document: Value = serde_json::from_str(content)?;
        if !document.is_object() {
            return Err(GenesisError::Invalid("top level must be an object".to_string()));
        }
        if let Some(alloc) = document.get("alloc") {
            if !alloc.is_object() {
                return Err(GenesisError::Invalid("alloc must be an object".to_string()));
            }
        }
        Ok(Self { document })
    }

    /// `config.chainId`, if present.
    pub fn chain_id(&self) -> Option<u64> {
        self.document.get("config")?.get("chainId")?.as_u64()
    }

    /// Pre-allocated balance of `address`, if the genesis funds it.
    pub fn alloc_balance(&self, address: Address) -> Option<U256> {
        let alloc = self.document.get("alloc")?.as_object()?;
        alloc.iter().find_map(|(key, account)| {
            let prefixed;
            let key = if key.starts_with("0x") {
                key.as_str()
            } else {
                prefixed = format!("0x{}", key);
                prefixed.as_str()
            };
            if key.parse::<Address>().ok()? != address {
                return None;
            }
            match account.get("balance")? {
                Value::String(s) => s.parse::<U256>().ok(),
                Value::Number(n) => n.as_u64().map(U256::from),
                _ => None,
            }
        })
    }

    /// The document with `config.chainId` set to `chain_id`.
    pub fn for_chain(&self, chain_id: u64) -> Value {
        let mut document = self.document.clone();
        if let Some(root) = document.as_object_mut() {
            let config = root.entry("config").or_insert_with(|| json!({}));
            if let Some(config) = config.as_object_mut() {
                config.insert("chainId".to_string(), json!(chain_id));
            }
        }
        document
    }

    /// Write the per-chain document to `dir/genesis.json`.
    pub fn write_for_chain(&self, dir: &Path, chain_id: u64) -> Result<PathBuf, GenesisError> {
        let path = dir.join("genesis.json");
        fs::write(&path, serde_json::to_vec_pretty(&self.for_chain(chain_id))?)?;
        Ok(path)
    }
}
