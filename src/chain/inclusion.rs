//! Waiting for transactions to land.

use alloy::primitives::{Address, Bytes, TxHash, U256};
use alloy::signers::local::PrivateKeySigner;
use tokio::time::{interval, timeout, MissedTickBehavior};

use crate::chain::handle::ChainHandle;
use crate::chain::types::{ChainError, ChainResult, InclusionReceipt};
use crate::lifecycle::Shutdown;
use crate::resilience::InclusionPolicy;

/// Poll for `tx_hash` until it is included, the policy's budget runs out, or
/// `shutdown` fires.
///
/// RPC errors while polling are treated as transient. A reverted receipt is
/// returned as [`ChainError::Reverted`].
pub async fn wait_included(
    handle: &dyn ChainHandle,
    tx_hash: TxHash,
    policy: &InclusionPolicy,
    shutdown: &Shutdown,
) -> ChainResult<InclusionReceipt> {
    let mut cancelled = shutdown.subscribe();

    let poll = async {
        let mut ticker = interval(policy.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        for attempt in 1..=policy.max_polls {
            ticker.tick().await;

            match handle.receipt(tx_hash).await {
                Ok(Some(receipt)) if receipt.success => {
                    tracing::debug!(
                        chain = handle.name(),
                        tx_hash = %tx_hash,
                        block_number = receipt.block_number,
                        "Transaction included"
                    );
                    return Ok(receipt);
                }
                Ok(Some(_)) => return Err(ChainError::Reverted(tx_hash)),
                Ok(None) => {
                    tracing::trace!(
                        chain = handle.name(),
                        tx_hash = %tx_hash,
                        attempt = attempt,
                        "Transaction pending"
                    );
                }
                Err(e) => {
                    tracing::debug!(
                        chain = handle.name(),
                        tx_hash = %tx_hash,
                        error = %e,
                        "Receipt poll failed"
                    );
                }
            }
        }

        Err(ChainError::InclusionTimeout {
            tx_hash,
            polls: policy.max_polls,
        })
    };

    tokio::select! {
        result = timeout(policy.timeout, poll) => match result {
            Ok(outcome) => outcome,
            Err(_) => Err(ChainError::InclusionTimeout { tx_hash, polls: policy.max_polls }),
        },
        _ = cancelled.cancelled() => Err(ChainError::Cancelled),
    }
}

/// Broadcast `raw` and wait for its inclusion.
pub async fn submit_raw_and_wait(
    handle: &dyn ChainHandle,
    raw: &Bytes,
    policy: &InclusionPolicy,
    shutdown: &Shutdown,
) -> ChainResult<InclusionReceipt> {
    let tx_hash = handle.submit_raw(raw).await?;
    wait_included(handle, tx_hash, policy, shutdown).await
}

/// Transfer `amount` to `to` and wait for the transfer's inclusion.
pub async fn fund_and_wait(
    handle: &dyn ChainHandle,
    signer: &PrivateKeySigner,
    to: Address,
    amount: U256,
    policy: &InclusionPolicy,
    shutdown: &Shutdown,
) -> ChainResult<InclusionReceipt> {
    let tx_hash = handle.fund_account(signer, to, amount).await?;
    tracing::debug!(
        chain = handle.name(),
        to = %to,
        amount = %amount,
        tx_hash = %tx_hash,
        "Funding sent"
    );
    wait_included(handle, tx_hash, policy, shutdown).await
}
