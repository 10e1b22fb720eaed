//! Shared utilities for integration testing.
//!
//! `MockChain` is an in-memory chain behind the same `ChainHandle` seam the
//! orchestrator drives in production. It validates nonces and fees, recovers
//! senders from raw signed bytes, de-duplicates resubmissions and treats
//! creation input as the deployed code.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::consensus::{SignableTransaction, TxEnvelope};
use alloy::eips::eip2718::Decodable2718;
use alloy::primitives::{bytes, keccak256, Address, Bytes, TxHash, TxKind, U256};
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;

use xchain_harness::chain::{
    ChainError, ChainHandle, ChainProvisioner, ChainResult, InclusionReceipt,
};
use xchain_harness::config::{ChainConfig, HarnessConfig};
use xchain_harness::network::GenesisConfig;

/// Well-known Anvil development key, the harness default.
pub const FUNDED_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

/// Initcode whose runtime returns 42.
pub fn fixture_bytecode() -> Bytes {
    bytes!("600a600c600039600a6000f3602a60005260206000f3")
}

pub fn funded_address() -> Address {
    FUNDED_KEY.parse::<PrivateKeySigner>().unwrap().address()
}

/// Genesis funding the default account with 1000 ether.
pub fn genesis() -> GenesisConfig {
    GenesisConfig::from_json(&format!(
        r#"{{
            "config": {{ "chainId": 1337 }},
            "alloc": {{ "{}": {{ "balance": "0x3635c9adc5dea00000" }} }}
        }}"#,
        funded_address()
    ))
    .unwrap()
}

/// Config for `chains` chains with fast health and inclusion budgets.
pub fn config(chains: usize) -> HarnessConfig {
    let mut config = HarnessConfig::default();
    config.network.chains = (0..chains)
        .map(|i| ChainConfig::new(format!("chain-{}", i), 68430 + i as u64))
        .collect();
    config.funded_account.private_key = FUNDED_KEY.to_string();
    config.health_check.max_attempts = 5;
    config.health_check.base_delay_ms = 1;
    config.health_check.max_delay_ms = 5;
    config.inclusion.poll_interval_ms = 1;
    config.inclusion.max_polls = 50;
    config.inclusion.timeout_secs = 5;
    config
}

/// Knobs for misbehaving chains.
#[derive(Debug, Clone, Default)]
pub struct MockOptions {
    /// Polls that return no receipt before a transaction shows as included.
    pub pending_polls: u32,
    /// Transactions are accepted but never included.
    pub never_include: bool,
    /// The health check always fails.
    pub never_healthy: bool,
    /// Deployed code gets an extra byte appended.
    pub tamper_code: bool,
    /// Reported chain id, if different from the configured one.
    pub chain_id_override: Option<u64>,
}

/// A raw transaction as the chain saw it on arrival.
#[derive(Debug, Clone)]
pub struct Submission {
    pub sender: Address,
    pub balance_at_submit: U256,
    pub fee: U256,
}

#[derive(Debug)]
struct Pending {
    receipt: InclusionReceipt,
    polls_left: u32,
}

#[derive(Debug, Default)]
struct MockState {
    balances: HashMap<Address, U256>,
    nonces: HashMap<Address, u64>,
    code: HashMap<Address, Bytes>,
    receipts: HashMap<TxHash, Pending>,
    submissions: Vec<Submission>,
    transfers: Vec<(Address, U256)>,
    block_number: u64,
}

pub struct MockChain {
    name: String,
    chain_id: u64,
    options: MockOptions,
    state: Mutex<MockState>,
    running: AtomicBool,
    live: Arc<AtomicUsize>,
}

impl MockChain {
    pub fn new(name: &str, chain_id: u64, options: MockOptions, live: Arc<AtomicUsize>) -> Self {
        live.fetch_add(1, Ordering::SeqCst);
        Self {
            name: name.to_string(),
            chain_id,
            options,
            state: Mutex::new(MockState::default()),
            running: AtomicBool::new(true),
            live,
        }
    }

    pub fn set_balance(&self, address: Address, balance: U256) {
        self.state.lock().unwrap().balances.insert(address, balance);
    }

    pub fn set_code(&self, address: Address, code: Bytes) {
        self.state.lock().unwrap().code.insert(address, code);
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.state.lock().unwrap().submissions.clone()
    }

    /// Recipients and amounts of funding transfers, in order.
    pub fn transfers(&self) -> Vec<(Address, U256)> {
        self.state.lock().unwrap().transfers.clone()
    }

    fn ensure_running(&self) -> ChainResult<()> {
        if self.running.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ChainError::NotRunning)
        }
    }

    fn deployed_code(&self, initcode: &Bytes) -> Bytes {
        if self.options.tamper_code {
            let mut code = initcode.to_vec();
            code.push(0xfe);
            Bytes::from(code)
        } else {
            initcode.clone()
        }
    }

    /// Charge `fee`, bump the nonce, apply the effect and queue a receipt.
    fn include(
        &self,
        state: &mut MockState,
        tx_hash: TxHash,
        from: Address,
        fee: U256,
        to: TxKind,
        value: U256,
        input: &Bytes,
    ) -> ChainResult<()> {
        let balance = state.balances.get(&from).copied().unwrap_or_default();
        let cost = fee + value;
        if balance < cost {
            return Err(ChainError::Rpc(format!(
                "insufficient funds for gas * price + value: have {} want {}",
                balance, cost
            )));
        }

        let nonce = state.nonces.get(&from).copied().unwrap_or_default();
        state.balances.insert(from, balance - cost);
        state.nonces.insert(from, nonce + 1);

        let contract_address = match to {
            TxKind::Create => {
                let address = from.create(nonce);
                state.code.insert(address, self.deployed_code(input));
                Some(address)
            }
            TxKind::Call(to) => {
                let entry = state.balances.entry(to).or_default();
                *entry += value;
                state.transfers.push((to, value));
                None
            }
        };

        state.block_number += 1;
        let receipt = InclusionReceipt {
            tx_hash,
            block_number: state.block_number,
            success: true,
            gas_used: 21_000,
            contract_address,
        };
        state.receipts.insert(
            tx_hash,
            Pending {
                receipt,
                polls_left: self.options.pending_polls,
            },
        );
        Ok(())
    }

    /// Locally signed transactions get a synthetic hash and zero fee.
    fn submit_local(
        &self,
        from: Address,
        to: TxKind,
        value: U256,
        input: Bytes,
    ) -> ChainResult<TxHash> {
        self.ensure_running()?;
        let mut state = self.state.lock().unwrap();
        let nonce = state.nonces.get(&from).copied().unwrap_or_default();

        let mut preimage = from.to_vec();
        preimage.extend_from_slice(&nonce.to_be_bytes());
        preimage.extend_from_slice(self.name.as_bytes());
        let tx_hash = keccak256(preimage);

        self.include(&mut state, tx_hash, from, U256::ZERO, to, value, &input)?;
        Ok(tx_hash)
    }
}

#[async_trait]
impl ChainHandle for MockChain {
    fn name(&self) -> &str {
        &self.name
    }

    async fn chain_id(&self) -> ChainResult<u64> {
        self.ensure_running()?;
        Ok(self.options.chain_id_override.unwrap_or(self.chain_id))
    }

    async fn block_number(&self) -> ChainResult<u64> {
        self.ensure_running()?;
        if self.options.never_healthy {
            return Err(ChainError::Rpc("connection refused".to_string()));
        }
        Ok(self.state.lock().unwrap().block_number)
    }

    async fn submit_raw(&self, raw: &Bytes) -> ChainResult<TxHash> {
        self.ensure_running()?;
        let envelope = TxEnvelope::decode_2718(&mut raw.as_ref())
            .map_err(|e| ChainError::Rpc(format!("rlp: {}", e)))?;
        let TxEnvelope::Legacy(signed) = envelope else {
            return Err(ChainError::Rpc("unsupported transaction type".to_string()));
        };
        let tx_hash = *signed.hash();

        let mut state = self.state.lock().unwrap();
        if state.receipts.contains_key(&tx_hash) {
            return Ok(tx_hash);
        }

        let tx = signed.tx();
        let sender = signed
            .signature()
            .recover_address_from_prehash(&tx.signature_hash())
            .map_err(|e| ChainError::Rpc(format!("invalid sender: {}", e)))?;

        let nonce = state.nonces.get(&sender).copied().unwrap_or_default();
        if tx.nonce != nonce {
            return Err(ChainError::Rpc(format!(
                "nonce too low: next nonce {}, tx nonce {}",
                nonce, tx.nonce
            )));
        }

        let fee = U256::from(tx.gas_price) * U256::from(tx.gas_limit);
        let balance = state.balances.get(&sender).copied().unwrap_or_default();
        state.submissions.push(Submission {
            sender,
            balance_at_submit: balance,
            fee,
        });

        if self.options.never_include {
            return Ok(tx_hash);
        }

        self.include(&mut state, tx_hash, sender, fee, tx.to, tx.value, &tx.input)?;
        Ok(tx_hash)
    }

    async fn receipt(&self, tx_hash: TxHash) -> ChainResult<Option<InclusionReceipt>> {
        self.ensure_running()?;
        let mut state = self.state.lock().unwrap();
        match state.receipts.get_mut(&tx_hash) {
            Some(pending) if pending.polls_left == 0 => Ok(Some(pending.receipt.clone())),
            Some(pending) => {
                pending.polls_left -= 1;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn fund_account(
        &self,
        signer: &PrivateKeySigner,
        to: Address,
        amount: U256,
    ) -> ChainResult<TxHash> {
        self.submit_local(signer.address(), TxKind::Call(to), amount, Bytes::new())
    }

    async fn deploy_from(&self, signer: &PrivateKeySigner, initcode: Bytes) -> ChainResult<TxHash> {
        self.submit_local(signer.address(), TxKind::Create, U256::ZERO, initcode)
    }

    async fn get_balance(&self, address: Address) -> ChainResult<U256> {
        self.ensure_running()?;
        Ok(self.state.lock().unwrap().balances.get(&address).copied().unwrap_or_default())
    }

    async fn get_code(&self, address: Address) -> ChainResult<Bytes> {
        self.ensure_running()?;
        Ok(self.state.lock().unwrap().code.get(&address).cloned().unwrap_or_default())
    }

    async fn shutdown(&self) -> ChainResult<()> {
        if self.running.swap(false, Ordering::SeqCst) {
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Provisions `MockChain`s seeded from the genesis allocation.
pub struct MockProvisioner {
    live: Arc<AtomicUsize>,
    chains: Mutex<Vec<Arc<MockChain>>>,
    options: HashMap<usize, MockOptions>,
    fail_index: Option<usize>,
}

impl MockProvisioner {
    pub fn new() -> Self {
        Self {
            live: Arc::new(AtomicUsize::new(0)),
            chains: Mutex::new(Vec::new()),
            options: HashMap::new(),
            fail_index: None,
        }
    }

    /// Make chain `index` fail to start.
    pub fn failing_at(mut self, index: usize) -> Self {
        self.fail_index = Some(index);
        self
    }

    pub fn with_options(mut self, index: usize, options: MockOptions) -> Self {
        self.options.insert(index, options);
        self
    }

    /// Chains started and not yet shut down.
    pub fn live_chains(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Every chain this provisioner started, in start order.
    pub fn chains(&self) -> Vec<Arc<MockChain>> {
        self.chains.lock().unwrap().clone()
    }

    pub fn chain(&self, name: &str) -> Arc<MockChain> {
        self.chains()
            .into_iter()
            .find(|chain| chain.name() == name)
            .unwrap()
    }
}

#[async_trait]
impl ChainProvisioner for MockProvisioner {
    async fn provision(
        &self,
        index: usize,
        chain: &ChainConfig,
        genesis: &GenesisConfig,
    ) -> ChainResult<Arc<dyn ChainHandle>> {
        if self.fail_index == Some(index) {
            // Let the other chains start first.
            tokio::time::sleep(Duration::from_millis(20)).await;
            return Err(ChainError::Process(format!("{} failed to start", chain.name)));
        }

        let options = self.options.get(&index).cloned().unwrap_or_default();
        let mock = Arc::new(MockChain::new(
            &chain.name,
            chain.chain_id,
            options,
            self.live.clone(),
        ));
        if let Some(balance) = genesis.alloc_balance(funded_address()) {
            mock.set_balance(funded_address(), balance);
        }

        self.chains.lock().unwrap().push(mock.clone());
        Ok(mock)
    }
}
