//! Protocol registry initcode.
//!
//! The registry maps protocol versions to messenger addresses. It is deployed
//! after the keyless messenger, with the messenger registered as version 1.

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol;
use alloy::sol_types::SolConstructor;

use crate::deployment::{ContractArtifact, DeployError, DeployResult};

sol! {
    contract ProtocolRegistry {
        struct ProtocolRegistryEntry {
            uint256 version;
            address protocolAddress;
        }

        constructor(ProtocolRegistryEntry[] initialEntries);
    }
}

pub use ProtocolRegistry::ProtocolRegistryEntry;

/// Version the base messenger is registered under.
pub const INITIAL_PROTOCOL_VERSION: u64 = 1;

/// Creation bytecode of the registry with its constructor arguments appended.
pub fn registry_initcode(
    artifact: &ContractArtifact,
    base_contract: Address,
) -> DeployResult<Bytes> {
    if base_contract == Address::ZERO {
        return Err(DeployError::Artifact(
            "registry base contract address is zero".to_string(),
        ));
    }

    let entries = vec![ProtocolRegistryEntry {
        version: U256::from(INITIAL_PROTOCOL_VERSION),
        protocolAddress: base_contract,
    }];
    let args = ProtocolRegistry::constructorCall {
        initialEntries: entries,
    }
    .abi_encode();

    let mut initcode = artifact.bytecode().to_vec();
    initcode.extend_from_slice(&args);
    Ok(initcode.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    #[test]
    fn test_initcode_appends_entries() {
        let artifact = ContractArtifact::parse("0x60016000").unwrap();
        let base = address!("253b2784c75e510dd0ff1da844684a1ac0aa5fcf");
        let initcode = registry_initcode(&artifact, base).unwrap();

        // offset + length + one (version, address) tuple
        assert_eq!(initcode.len(), 4 + 32 * 4);
        assert_eq!(&initcode[..4], artifact.bytecode().as_ref());

        let version_word = &initcode[4 + 64..4 + 96];
        assert_eq!(version_word[31], INITIAL_PROTOCOL_VERSION as u8);
        let address_word = &initcode[4 + 96..];
        assert_eq!(&address_word[12..], base.as_slice());
    }

    #[test]
    fn test_rejects_zero_base() {
        let artifact = ContractArtifact::parse("0x60016000").unwrap();
        assert!(registry_initcode(&artifact, Address::ZERO).is_err());
    }
}
