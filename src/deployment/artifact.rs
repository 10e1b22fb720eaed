//! Compiled contract artifacts.
//!
//! Accepts forge output (`{"bytecode": {"object": "0x…"}}`), hardhat output
//! (`{"bytecode": "0x…"}`) or a bare hex file.

use std::fs;
use std::path::Path;

use alloy::hex;
use alloy::primitives::Bytes;
use serde_json::Value;

use crate::deployment::{DeployError, DeployResult};

/// Creation bytecode of a compiled contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractArtifact {
    bytecode: Bytes,
}

impl ContractArtifact {
    /// Load an artifact from disk.
    pub fn from_file(path: &Path) -> DeployResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            DeployError::Artifact(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
    }

    /// Parse artifact contents, JSON or hex.
    pub fn parse(content: &str) -> DeployResult<Self> {
        let trimmed = content.trim();
        let hex_str = if trimmed.starts_with('{') {
            let json: Value = serde_json::from_str(trimmed)
                .map_err(|e| DeployError::Artifact(format!("invalid JSON: {}", e)))?;
            bytecode_field(&json)?.to_string()
        } else {
            trimmed.to_string()
        };

        let bytecode = decode_hex(&hex_str)?;
        if bytecode.is_empty() {
            return Err(DeployError::EmptyBytecode);
        }
        Ok(Self { bytecode })
    }

    pub fn bytecode(&self) -> &Bytes {
        &self.bytecode
    }

    pub fn into_bytecode(self) -> Bytes {
        self.bytecode
    }
}

fn bytecode_field(json: &Value) -> DeployResult<&str> {
    match json.get("bytecode") {
        Some(Value::String(s)) => Ok(s),
        Some(Value::Object(obj)) => obj
            .get("object")
            .and_then(Value::as_str)
            .ok_or_else(|| DeployError::Artifact("bytecode.object is missing".to_string())),
        _ => Err(DeployError::Artifact("no bytecode field".to_string())),
    }
}

fn decode_hex(s: &str) -> DeployResult<Bytes> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    if digits.len() % 2 != 0 {
        return Err(DeployError::Artifact(format!(
            "odd-length hex bytecode ({} digits)",
            digits.len()
        )));
    }
    hex::decode(digits)
        .map(Bytes::from)
        .map_err(|e| DeployError::Artifact(format!("invalid hex bytecode: {}", e)))
}
