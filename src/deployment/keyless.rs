//! Keyless contract-creation transactions.
//!
//! A keyless deployment is a legacy contract-creation transaction whose
//! signature is a fixed public constant instead of the output of a private
//! key. ECDSA recovery over that constant yields a sender address nobody holds
//! a key for; that account can only ever broadcast this one transaction, at
//! nonce 0, so the created contract lands at `keccak(rlp(sender, 0))` on
//! every chain it is submitted to.
//!
//! # Invariants
//! - No chain id is encoded (pre-EIP-155), so the bytes are valid everywhere.
//! - `build` is pure: identical [`DeploymentSpec`]s give identical output.

use std::fs;
use std::path::Path;

use alloy::consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy::eips::eip2718::{Decodable2718, Encodable2718};
use alloy::primitives::{Address, Bytes, Signature, TxKind, B256, U256};

use crate::deployment::{DeployError, DeployResult};

/// Gas limit of deterministic deployments, independent of artifact size.
pub const CANONICAL_GAS_LIMIT: u64 = 2_000_000;

/// Default creation gas price, 2500 gwei.
pub const DEFAULT_GAS_PRICE_WEI: u128 = 2_500_000_000_000;

/// `r` and `s` of the canonical keyless signature.
const CANONICAL_SIGNATURE_WORD: [u8; 32] = [0x22; 32];

const TX_BASE_GAS: u64 = 21_000;
const CREATE_GAS: u64 = 32_000;
const ZERO_BYTE_GAS: u64 = 4;
const NONZERO_BYTE_GAS: u64 = 16;
const INITCODE_WORD_GAS: u64 = 2;
const CODE_DEPOSIT_GAS: u64 = 200;

/// Inputs of a keyless deployment. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentSpec {
    bytecode: Bytes,
    gas_price: u128,
    deterministic: bool,
}

impl DeploymentSpec {
    /// Create a spec.
    ///
    /// With `deterministic` set the gas limit is [`CANONICAL_GAS_LIMIT`];
    /// otherwise it is sized from the bytecode, never below that limit.
    pub fn new(bytecode: impl Into<Bytes>, gas_price: u128, deterministic: bool) -> Self {
        Self {
            bytecode: bytecode.into(),
            gas_price,
            deterministic,
        }
    }

    pub fn bytecode(&self) -> &Bytes {
        &self.bytecode
    }

    pub fn gas_price(&self) -> u128 {
        self.gas_price
    }

    pub fn is_deterministic(&self) -> bool {
        self.deterministic
    }

    /// Gas limit the deployment transaction will carry.
    pub fn gas_limit(&self) -> u64 {
        if self.deterministic {
            CANONICAL_GAS_LIMIT
        } else {
            sized_gas_limit(&self.bytecode)
        }
    }
}

/// Intrinsic cost plus code deposit for `code`, with 25% headroom, floored at
/// [`CANONICAL_GAS_LIMIT`].
///
/// The deposit term only covers the initcode itself, not what the constructor
/// executes or returns. The floor leaves room for that; a keyless sender that
/// runs out of gas has burned its only nonce.
fn sized_gas_limit(code: &[u8]) -> u64 {
    let len = code.len() as u64;
    let zero = code.iter().filter(|b| **b == 0).count() as u64;
    let nonzero = len - zero;

    let intrinsic = TX_BASE_GAS
        + CREATE_GAS
        + zero * ZERO_BYTE_GAS
        + nonzero * NONZERO_BYTE_GAS
        + len.div_ceil(32) * INITCODE_WORD_GAS;
    let deposit = len * CODE_DEPOSIT_GAS;

    ((intrinsic + deposit) * 5 / 4).max(CANONICAL_GAS_LIMIT)
}

/// A signed keyless contract-creation transaction and the addresses it implies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeylessDeployment {
    /// RLP-encoded signed transaction, ready for `eth_sendRawTransaction`.
    pub raw_transaction: Bytes,
    /// Recovered sender. Has no private key.
    pub sender_address: Address,
    /// `sender_address.create(0)`.
    pub contract_address: Address,
    pub tx_hash: B256,
    pub gas_limit: u64,
    pub gas_price: u128,
}

impl KeylessDeployment {
    /// Fee the sender must hold before the transaction can be included.
    pub fn required_fee(&self) -> U256 {
        U256::from(self.gas_price) * U256::from(self.gas_limit)
    }

    /// Recover the deployment values from raw transaction bytes.
    ///
    /// Rejects anything that is not an unprotected nonce-0 contract creation,
    /// since only those land at the same address on every chain.
    pub fn decode(raw: &[u8]) -> DeployResult<Self> {
        let envelope = TxEnvelope::decode_2718(&mut &raw[..])
            .map_err(|e| DeployError::MalformedTransaction(e.to_string()))?;

        let TxEnvelope::Legacy(signed) = envelope else {
            return Err(DeployError::MalformedTransaction(
                "expected a legacy transaction".to_string(),
            ));
        };

        let tx = signed.tx();
        if let Some(chain_id) = tx.chain_id {
            return Err(DeployError::MalformedTransaction(format!(
                "transaction is replay-protected for chain {}",
                chain_id
            )));
        }
        if tx.nonce != 0 {
            return Err(DeployError::MalformedTransaction(format!(
                "expected nonce 0, found {}",
                tx.nonce
            )));
        }
        if !tx.to.is_create() {
            return Err(DeployError::MalformedTransaction(
                "transaction is not a contract creation".to_string(),
            ));
        }

        let sender_address = signed
            .signature()
            .recover_address_from_prehash(&tx.signature_hash())
            .map_err(|e| DeployError::Recovery(e.to_string()))?;

        Ok(Self {
            raw_transaction: Bytes::copy_from_slice(raw),
            sender_address,
            contract_address: sender_address.create(0),
            tx_hash: *signed.hash(),
            gas_limit: tx.gas_limit,
            gas_price: tx.gas_price,
        })
    }

    /// Persist the transaction and both addresses as 0x-hex text files named
    /// `<name>DeployerTransaction.txt`, `<name>DeployerAddress.txt` and
    /// `<name>ContractAddress.txt`.
    pub fn write_to_dir(&self, dir: &Path, name: &str) -> DeployResult<()> {
        fs::create_dir_all(dir)?;
        fs::write(
            dir.join(format!("{}DeployerTransaction.txt", name)),
            self.raw_transaction.to_string(),
        )?;
        fs::write(
            dir.join(format!("{}DeployerAddress.txt", name)),
            self.sender_address.to_string(),
        )?;
        fs::write(
            dir.join(format!("{}ContractAddress.txt", name)),
            self.contract_address.to_string(),
        )?;

        tracing::info!(
            dir = %dir.display(),
            name = name,
            "Keyless deployment artifacts written"
        );
        Ok(())
    }
}

/// Builds keyless deployments.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeylessDeployer;

impl KeylessDeployer {
    /// The fixed `(r, s, v = 27)` every keyless transaction carries.
    pub fn canonical_signature() -> Signature {
        let word = U256::from_be_bytes(CANONICAL_SIGNATURE_WORD);
        Signature::new(word, word, false)
    }

    /// Construct the keyless deployment for `spec`.
    pub fn build(spec: &DeploymentSpec) -> DeployResult<KeylessDeployment> {
        if spec.bytecode.is_empty() {
            return Err(DeployError::EmptyBytecode);
        }
        if spec.gas_price == 0 {
            return Err(DeployError::ZeroGasPrice);
        }

        let gas_limit = spec.gas_limit();
        let tx = TxLegacy {
            chain_id: None,
            nonce: 0,
            gas_price: spec.gas_price,
            gas_limit,
            to: TxKind::Create,
            value: U256::ZERO,
            input: spec.bytecode.clone(),
        };

        let signature = Self::canonical_signature();
        let sender_address = signature
            .recover_address_from_prehash(&tx.signature_hash())
            .map_err(|e| DeployError::Recovery(e.to_string()))?;

        let signed = tx.into_signed(signature);
        let tx_hash = *signed.hash();
        let raw_transaction = Bytes::from(TxEnvelope::Legacy(signed).encoded_2718());

        let deployment = KeylessDeployment {
            raw_transaction,
            sender_address,
            contract_address: sender_address.create(0),
            tx_hash,
            gas_limit,
            gas_price: spec.gas_price,
        };

        tracing::debug!(
            sender = %deployment.sender_address,
            contract = %deployment.contract_address,
            gas_limit = gas_limit,
            "Keyless deployment built"
        );

        Ok(deployment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::bytes;

    fn fixture() -> Bytes {
        bytes!("600a600c600039600a6000f3602a60005260206000f3")
    }

    #[test]
    fn test_build_is_deterministic() {
        let spec = DeploymentSpec::new(fixture(), DEFAULT_GAS_PRICE_WEI, true);
        let a = KeylessDeployer::build(&spec).unwrap();
        let b = KeylessDeployer::build(&spec.clone()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.raw_transaction, b.raw_transaction);
    }

    #[test]
    fn test_contract_address_is_sender_nonce_zero() {
        let spec = DeploymentSpec::new(fixture(), DEFAULT_GAS_PRICE_WEI, true);
        let deployment = KeylessDeployer::build(&spec).unwrap();
        assert_eq!(deployment.contract_address, deployment.sender_address.create(0));
        assert_ne!(deployment.sender_address, Address::ZERO);
    }

    #[test]
    fn test_sender_depends_on_payload() {
        let a = KeylessDeployer::build(&DeploymentSpec::new(fixture(), 1_000, true)).unwrap();
        let b = KeylessDeployer::build(&DeploymentSpec::new(fixture(), 2_000, true)).unwrap();
        assert_ne!(a.sender_address, b.sender_address);
        assert_ne!(a.contract_address, b.contract_address);
    }

    #[test]
    fn test_gas_limit_modes() {
        let fixed = DeploymentSpec::new(fixture(), 1, true);
        assert_eq!(fixed.gas_limit(), CANONICAL_GAS_LIMIT);

        let sized = DeploymentSpec::new(fixture(), 1, false);
        assert_eq!(sized.gas_limit(), CANONICAL_GAS_LIMIT);
    }

    #[test]
    fn test_sized_limit_covers_storage_writing_constructor() {
        // SSTORE(0, 1) then return 10 bytes of runtime: ~77.5k to run, more
        // than intrinsic + deposit + 25% headroom
        let constructor = bytes!("6001600055600a8060106000396000f3602a60005260206000f3");
        let sized = DeploymentSpec::new(constructor, 1, false);
        assert_eq!(sized.gas_limit(), CANONICAL_GAS_LIMIT);
    }

    #[test]
    fn test_sized_limit_grows_past_canonical() {
        let code = vec![0xfe; 24_576];
        let sized = DeploymentSpec::new(code, 1, false);
        // (21000 + 32000 + 24576 * 16 + 768 * 2 + 24576 * 200) * 5 / 4
        assert_eq!(sized.gas_limit(), 6_703_690);
    }

    #[test]
    fn test_required_fee() {
        let spec = DeploymentSpec::new(fixture(), 3, true);
        let deployment = KeylessDeployer::build(&spec).unwrap();
        assert_eq!(deployment.required_fee(), U256::from(3 * CANONICAL_GAS_LIMIT));
    }

    #[test]
    fn test_decode_recovers_build_output() {
        let spec = DeploymentSpec::new(fixture(), DEFAULT_GAS_PRICE_WEI, false);
        let built = KeylessDeployer::build(&spec).unwrap();
        let decoded = KeylessDeployment::decode(&built.raw_transaction).unwrap();
        assert_eq!(decoded, built);
    }

    #[test]
    fn test_decode_rejects_replay_protected() {
        let tx = TxLegacy {
            chain_id: Some(1),
            nonce: 0,
            gas_price: 1,
            gas_limit: 100_000,
            to: TxKind::Create,
            value: U256::ZERO,
            input: fixture(),
        };
        let raw = TxEnvelope::Legacy(tx.into_signed(KeylessDeployer::canonical_signature()))
            .encoded_2718();
        let err = KeylessDeployment::decode(&raw).unwrap_err();
        assert!(err.to_string().contains("replay-protected"));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(KeylessDeployment::decode(&[0xde, 0xad]).is_err());
    }

    #[test]
    fn test_validation_errors() {
        let err = KeylessDeployer::build(&DeploymentSpec::new(Bytes::new(), 1, true)).unwrap_err();
        assert!(matches!(err, DeployError::EmptyBytecode));

        let err = KeylessDeployer::build(&DeploymentSpec::new(fixture(), 0, true)).unwrap_err();
        assert!(matches!(err, DeployError::ZeroGasPrice));
    }

    #[test]
    fn test_write_to_dir() {
        let dir = tempfile::tempdir().unwrap();
        let spec = DeploymentSpec::new(fixture(), DEFAULT_GAS_PRICE_WEI, true);
        let deployment = KeylessDeployer::build(&spec).unwrap();
        deployment.write_to_dir(dir.path(), "Messenger").unwrap();

        let address = fs::read_to_string(dir.path().join("MessengerContractAddress.txt")).unwrap();
        assert_eq!(address.parse::<Address>().unwrap(), deployment.contract_address);

        let raw = fs::read_to_string(dir.path().join("MessengerDeployerTransaction.txt")).unwrap();
        assert_eq!(raw.parse::<Bytes>().unwrap(), deployment.raw_transaction);
    }
}
