//! JSON-RPC chain handle with timeout and error handling.
//!
//! # Responsibilities
//! - Connect to a chain's JSON-RPC endpoint
//! - Query chain state (block number, balances, code, receipts)
//! - Broadcast raw and locally-signed transactions
//! - Own the chain's process, if this harness started it

use std::fmt::Display;
use std::future::IntoFuture;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{keccak256, Address, Bytes, TxHash, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::{TransactionReceipt, TransactionRequest};
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;
use tokio::time::timeout;
use url::Url;

use crate::chain::anvil::ChainProcess;
use crate::chain::handle::ChainHandle;
use crate::chain::types::{ChainError, ChainResult, InclusionReceipt};

/// Chain handle backed by an alloy HTTP provider.
pub struct RpcChain {
    name: String,
    url: Url,
    provider: DynProvider,
    /// Request timeout duration.
    timeout_duration: Duration,
    process: Mutex<Option<ChainProcess>>,
    running: AtomicBool,
}

impl RpcChain {
    /// Create a handle for the chain at `rpc_url`.
    ///
    /// Does not contact the node; health is the caller's concern.
    pub fn connect(name: &str, rpc_url: &str, rpc_timeout_secs: u64) -> ChainResult<Self> {
        let url: Url = rpc_url
            .parse()
            .map_err(|e| ChainError::Rpc(format!("Invalid RPC URL '{}': {}", rpc_url, e)))?;

        let provider = ProviderBuilder::new().connect_http(url.clone()).erased();

        Ok(Self {
            name: name.to_string(),
            url,
            provider,
            timeout_duration: Duration::from_secs(rpc_timeout_secs),
            process: Mutex::new(None),
            running: AtomicBool::new(true),
        })
    }

    /// Attach the process serving this endpoint; it is stopped on shutdown.
    pub fn with_process(self, process: ChainProcess) -> Self {
        if let Ok(mut slot) = self.process.lock() {
            *slot = Some(process);
        }
        self
    }

    fn ensure_running(&self) -> ChainResult<()> {
        if self.running.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ChainError::NotRunning)
        }
    }

    /// Run one RPC call under the request deadline.
    async fn call<T, E, F>(&self, method: &'static str, fut: F) -> ChainResult<T>
    where
        F: IntoFuture<Output = Result<T, E>>,
        E: Display,
    {
        self.ensure_running()?;
        match timeout(self.timeout_duration, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                tracing::debug!(chain = %self.name, method = method, error = %e, "RPC error");
                Err(ChainError::Rpc(format!("{}: {}", method, e)))
            }
            Err(_) => {
                tracing::debug!(chain = %self.name, method = method, "RPC timeout");
                Err(ChainError::Timeout(self.timeout_duration.as_secs()))
            }
        }
    }

    /// Provider that fills and signs transactions with `signer`.
    fn signing_provider(&self, signer: &PrivateKeySigner) -> impl Provider {
        ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer.clone()))
            .connect_http(self.url.clone())
    }

    async fn send_signed(
        &self,
        signer: &PrivateKeySigner,
        tx: TransactionRequest,
    ) -> ChainResult<TxHash> {
        let provider = self.signing_provider(signer);
        let pending = self.call("eth_sendTransaction", provider.send_transaction(tx)).await?;
        Ok(*pending.tx_hash())
    }
}

fn to_inclusion_receipt(receipt: TransactionReceipt) -> InclusionReceipt {
    InclusionReceipt {
        tx_hash: receipt.transaction_hash,
        block_number: receipt.block_number.unwrap_or_default(),
        success: receipt.status(),
        gas_used: receipt.gas_used,
        contract_address: receipt.contract_address,
    }
}

#[async_trait]
impl ChainHandle for RpcChain {
    fn name(&self) -> &str {
        &self.name
    }

    async fn chain_id(&self) -> ChainResult<u64> {
        self.call("eth_chainId", self.provider.get_chain_id()).await
    }

    async fn block_number(&self) -> ChainResult<u64> {
        self.call("eth_blockNumber", self.provider.get_block_number()).await
    }

    async fn submit_raw(&self, raw: &Bytes) -> ChainResult<TxHash> {
        let tx_hash = keccak256(raw);
        match self
            .call("eth_sendRawTransaction", self.provider.send_raw_transaction(raw))
            .await
        {
            Ok(pending) => Ok(*pending.tx_hash()),
            Err(ChainError::Rpc(message)) if message.contains("already known") => {
                tracing::debug!(
                    chain = %self.name,
                    tx_hash = %tx_hash,
                    "Transaction already in mempool"
                );
                Ok(tx_hash)
            }
            Err(e) => match self.receipt(tx_hash).await {
                Ok(Some(_)) => {
                    tracing::info!(
                        chain = %self.name,
                        tx_hash = %tx_hash,
                        "Transaction already included"
                    );
                    Ok(tx_hash)
                }
                _ => Err(e),
            },
        }
    }

    async fn receipt(&self, tx_hash: TxHash) -> ChainResult<Option<InclusionReceipt>> {
        let receipt = self
            .call("eth_getTransactionReceipt", self.provider.get_transaction_receipt(tx_hash))
            .await?;
        Ok(receipt.map(to_inclusion_receipt))
    }

    async fn fund_account(
        &self,
        signer: &PrivateKeySigner,
        to: Address,
        amount: U256,
    ) -> ChainResult<TxHash> {
        let tx = TransactionRequest::default().with_to(to).with_value(amount);
        self.send_signed(signer, tx).await
    }

    async fn deploy_from(&self, signer: &PrivateKeySigner, initcode: Bytes) -> ChainResult<TxHash> {
        let tx = TransactionRequest::default().with_deploy_code(initcode);
        self.send_signed(signer, tx).await
    }

    async fn get_balance(&self, address: Address) -> ChainResult<U256> {
        self.call("eth_getBalance", self.provider.get_balance(address)).await
    }

    async fn get_code(&self, address: Address) -> ChainResult<Bytes> {
        self.call("eth_getCode", self.provider.get_code_at(address)).await
    }

    async fn shutdown(&self) -> ChainResult<()> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Ok(());
        }

        let process = self.process.lock().ok().and_then(|mut slot| slot.take());
        if let Some(process) = process {
            process.stop().await?;
        }

        tracing::info!(chain = %self.name, url = %self.url, "Chain stopped");
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for RpcChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcChain")
            .field("name", &self.name)
            .field("url", &self.url.as_str())
            .field("timeout_secs", &self.timeout_duration.as_secs())
            .field("running", &self.is_running())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_rejects_bad_url() {
        let err = RpcChain::connect("a", "not a url", 5).unwrap_err();
        assert!(err.to_string().contains("Invalid RPC URL"));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_errors() {
        // Nothing listens on port 1.
        let chain = RpcChain::connect("a", "http://127.0.0.1:1", 2).unwrap();
        assert!(chain.block_number().await.is_err());
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent() {
        let chain = RpcChain::connect("a", "http://127.0.0.1:1", 2).unwrap();
        assert!(chain.is_running());
        chain.shutdown().await.unwrap();
        chain.shutdown().await.unwrap();
        assert!(!chain.is_running());
        assert!(matches!(chain.block_number().await, Err(ChainError::NotRunning)));
    }
}
