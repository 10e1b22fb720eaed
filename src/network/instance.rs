//! One provisioned chain as seen by the orchestrator.

use std::sync::Arc;

use alloy::primitives::{Address, U256};

use crate::chain::ChainHandle;

/// A healthy chain instance. Owned by the orchestrator; callers borrow it.
pub struct ChainInstance {
    index: usize,
    name: String,
    chain_id: u64,
    handle: Arc<dyn ChainHandle>,
    /// Funded account balance observed at bring-up.
    funded_balance: U256,
    registry_address: Option<Address>,
}

impl ChainInstance {
    pub fn new(
        index: usize,
        name: String,
        chain_id: u64,
        handle: Arc<dyn ChainHandle>,
        funded_balance: U256,
    ) -> Self {
        Self {
            index,
            name,
            chain_id,
            handle,
            funded_balance,
            registry_address: None,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn handle(&self) -> &dyn ChainHandle {
        self.handle.as_ref()
    }

    pub fn funded_balance(&self) -> U256 {
        self.funded_balance
    }

    pub fn registry_address(&self) -> Option<Address> {
        self.registry_address
    }

    pub(crate) fn set_registry_address(&mut self, address: Address) {
        self.registry_address = Some(address);
    }

    pub(crate) fn into_handle(self) -> Arc<dyn ChainHandle> {
        self.handle
    }
}

impl std::fmt::Debug for ChainInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainInstance")
            .field("index", &self.index)
            .field("name", &self.name)
            .field("chain_id", &self.chain_id)
            .field("running", &self.handle.is_running())
            .field("funded_balance", &self.funded_balance)
            .field("registry_address", &self.registry_address)
            .finish()
    }
}
