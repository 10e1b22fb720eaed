//! The seam between the orchestrator and a running chain.

use std::sync::Arc;

use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::signers::local::PrivateKeySigner;
use async_trait::async_trait;

use crate::chain::types::{ChainResult, InclusionReceipt};
use crate::config::ChainConfig;
use crate::network::genesis::GenesisConfig;

/// One running chain instance.
///
/// Submission is fire-and-forget; pair with
/// [`wait_included`](crate::chain::wait_included) to block on inclusion.
#[async_trait]
pub trait ChainHandle: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Chain id reported by the node.
    async fn chain_id(&self) -> ChainResult<u64>;

    /// Latest block number. Doubles as the health check.
    async fn block_number(&self) -> ChainResult<u64>;

    /// Broadcast signed transaction bytes.
    ///
    /// Resubmitting bytes the chain has already included must succeed.
    async fn submit_raw(&self, raw: &Bytes) -> ChainResult<TxHash>;

    /// Receipt for `tx_hash`, `None` while pending.
    async fn receipt(&self, tx_hash: TxHash) -> ChainResult<Option<InclusionReceipt>>;

    /// Transfer `amount` from `signer` to `to`.
    async fn fund_account(
        &self,
        signer: &PrivateKeySigner,
        to: Address,
        amount: U256,
    ) -> ChainResult<TxHash>;

    /// Create a contract from `initcode`, paid and signed by `signer`.
    async fn deploy_from(&self, signer: &PrivateKeySigner, initcode: Bytes) -> ChainResult<TxHash>;

    async fn get_balance(&self, address: Address) -> ChainResult<U256>;

    /// Runtime code at `address`; empty if none.
    async fn get_code(&self, address: Address) -> ChainResult<Bytes>;

    /// Stop the chain and release its resources. Idempotent.
    async fn shutdown(&self) -> ChainResult<()>;

    fn is_running(&self) -> bool;
}

/// Starts chain instances for a network bring-up.
#[async_trait]
pub trait ChainProvisioner: Send + Sync {
    /// Start chain `index`. Returns once the process is launched; the caller
    /// waits for health.
    async fn provision(
        &self,
        index: usize,
        chain: &ChainConfig,
        genesis: &GenesisConfig,
    ) -> ChainResult<Arc<dyn ChainHandle>>;
}
