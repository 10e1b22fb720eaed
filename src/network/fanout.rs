//! Concurrent per-chain steps with a completion barrier.

use std::future::Future;

use futures_util::future::try_join_all;

use crate::chain::ChainResult;
use crate::network::error::{HarnessError, HarnessResult};
use crate::network::instance::ChainInstance;

/// Run `op` on every chain concurrently and wait for all of them.
///
/// The first failure drops the remaining in-flight operations and is returned
/// attributed to its chain. Results come back in chain index order.
pub async fn fan_out<'a, T, F, Fut>(chains: &'a [ChainInstance], op: F) -> HarnessResult<Vec<T>>
where
    F: Fn(&'a ChainInstance) -> Fut,
    Fut: Future<Output = ChainResult<T>> + 'a,
{
    try_join_all(chains.iter().map(|chain| {
        let step = op(chain);
        async move {
            step.await
                .map_err(|source| HarnessError::on_chain(chain.index(), chain.name(), source))
        }
    }))
    .await
}
