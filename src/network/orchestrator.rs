//! Multi-chain bring-up, deployment and teardown.
//!
//! # Responsibilities
//! - Provision every configured chain and wait until each is healthy
//! - Deploy keyless contracts at one address on every chain
//! - Deploy the protocol registry against the deployed messenger
//! - Tear everything down, exactly once
//!
//! Every per-chain step runs concurrently across chains with a barrier before
//! the next step. A failure on one chain cancels the step on the others.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use alloy::primitives::{Address, Bytes, U256};
use alloy::signers::local::PrivateKeySigner;
use futures_util::future::{join_all, try_join_all};

use crate::chain::{
    fund_and_wait, submit_raw_and_wait, wait_included, ChainError, ChainHandle, ChainProvisioner,
    ChainResult,
};
use crate::config::validation::validate_config;
use crate::config::{ChainConfig, ConfigError, HarnessConfig};
use crate::deployment::registry::registry_initcode;
use crate::deployment::{ContractArtifact, KeylessDeployment};
use crate::lifecycle::Shutdown;
use crate::network::error::{HarnessError, HarnessResult};
use crate::network::fanout::fan_out;
use crate::network::genesis::GenesisConfig;
use crate::network::instance::ChainInstance;
use crate::network::state::NetworkState;
use crate::resilience::{retry_with_backoff, InclusionPolicy, RetryError, RetryPolicy};

/// Label the protocol registry is recorded under when it lands at the same
/// address on every chain.
pub const REGISTRY_LABEL: &str = "ProtocolRegistry";

/// The network's pre-funded signer.
#[derive(Clone)]
pub struct FundedAccount {
    signer: PrivateKeySigner,
}

impl FundedAccount {
    pub fn from_private_key(private_key_hex: &str) -> HarnessResult<Self> {
        let key_hex = private_key_hex.strip_prefix("0x").unwrap_or(private_key_hex);
        let signer: PrivateKeySigner = key_hex.parse().map_err(|e| {
            HarnessError::Config(format!("Invalid funded account private key: {}", e))
        })?;
        Ok(Self { signer })
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub fn signer(&self) -> &PrivateKeySigner {
        &self.signer
    }
}

impl std::fmt::Debug for FundedAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FundedAccount")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

type StartedChains = Mutex<Vec<Option<Arc<dyn ChainHandle>>>>;

/// Owns a set of chain instances and drives them through their lifecycle.
///
/// Construct one per suite and pass it to every flow. `tear_down` must be
/// awaited before drop; chains still running at drop are killed with their
/// handles but not awaited.
pub struct NetworkOrchestrator {
    config: HarnessConfig,
    provisioner: Arc<dyn ChainProvisioner>,
    state: NetworkState,
    chains: Vec<ChainInstance>,
    funded: FundedAccount,
    deployed_contracts: BTreeMap<String, Address>,
    health: RetryPolicy,
    inclusion: InclusionPolicy,
    shutdown: Shutdown,
}

impl NetworkOrchestrator {
    /// Validates `config` before anything is started; an invalid config is a
    /// [`HarnessError::Config`].
    pub fn new(
        config: HarnessConfig,
        provisioner: Arc<dyn ChainProvisioner>,
    ) -> HarnessResult<Self> {
        validate_config(&config)
            .map_err(|errors| HarnessError::Config(ConfigError::Validation(errors).to_string()))?;

        let funded = FundedAccount::from_private_key(&config.funded_account.resolve_private_key())?;
        let health = RetryPolicy::from(&config.health_check);
        let inclusion = InclusionPolicy::from(&config.inclusion);

        Ok(Self {
            config,
            provisioner,
            state: NetworkState::Uninitialized,
            chains: Vec::new(),
            funded,
            deployed_contracts: BTreeMap::new(),
            health,
            inclusion,
            shutdown: Shutdown::new(),
        })
    }

    pub fn state(&self) -> NetworkState {
        self.state
    }

    /// Handle that cancels in-flight bring-up and deployment waits.
    ///
    /// An interrupted `bring_up` stops the chains it started; an interrupted
    /// deployment returns [`HarnessError::Cancelled`] and leaves teardown to
    /// the caller.
    pub fn abort_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    pub fn chains(&self) -> &[ChainInstance] {
        &self.chains
    }

    pub fn chain(&self, index: usize) -> Option<&ChainInstance> {
        self.chains.get(index)
    }

    pub fn chain_count(&self) -> usize {
        self.chains.len()
    }

    pub fn deployed_contracts(&self) -> &BTreeMap<String, Address> {
        &self.deployed_contracts
    }

    pub fn contract_address(&self, label: &str) -> Option<Address> {
        self.deployed_contracts.get(label).copied()
    }

    pub fn registry_address(&self, index: usize) -> Option<Address> {
        self.chains.get(index).and_then(ChainInstance::registry_address)
    }

    fn transition(&mut self, next: NetworkState) -> HarnessResult<()> {
        if !self.state.can_transition_to(next) {
            return Err(HarnessError::State {
                from: self.state,
                to: next,
            });
        }
        tracing::info!(from = %self.state, to = %next, "Network state transition");
        self.state = next;
        Ok(())
    }

    fn require_ready(&self) -> HarnessResult<()> {
        if self.state == NetworkState::Ready {
            Ok(())
        } else {
            Err(HarnessError::WrongState {
                required: NetworkState::Ready,
                actual: self.state,
            })
        }
    }

    /// Start every configured chain and wait for all of them to be healthy.
    ///
    /// On any failure every chain already started is stopped, the network
    /// ends `TornDown`, and the first error is returned.
    pub async fn bring_up(&mut self, genesis: GenesisConfig) -> HarnessResult<()> {
        let chain_configs = self.config.network.chains.clone();
        self.transition(NetworkState::Provisioning)?;

        if genesis.alloc_balance(self.funded.address()).is_none() {
            tracing::warn!(
                funded_account = %self.funded.address(),
                "Funded account has no genesis allocation"
            );
        }

        let started: StartedChains = Mutex::new(vec![None; chain_configs.len()]);

        match self.provision_all(&chain_configs, &genesis, &started).await {
            Ok(chains) => {
                self.chains = chains;
                self.transition(NetworkState::Ready)?;
                tracing::info!(chains = self.chains.len(), "Network ready");
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "Network bring-up failed, stopping started chains");
                let handles: Vec<Arc<dyn ChainHandle>> = started
                    .into_inner()
                    .unwrap_or_else(|poisoned| poisoned.into_inner())
                    .into_iter()
                    .flatten()
                    .collect();
                self.shutdown.trigger();
                stop_chains(&handles).await;
                self.transition(NetworkState::TornDown)?;
                Err(e)
            }
        }
    }

    async fn provision_all(
        &self,
        configs: &[ChainConfig],
        genesis: &GenesisConfig,
        started: &StartedChains,
    ) -> HarnessResult<Vec<ChainInstance>> {
        let mut cancelled = self.shutdown.subscribe();

        let provision = try_join_all(configs.iter().enumerate().map(|(index, chain)| async move {
            let handle = self
                .provisioner
                .provision(index, chain, genesis)
                .await
                .map_err(|source| HarnessError::on_chain(index, &chain.name, source))?;

            if let Ok(mut slots) = started.lock() {
                slots[index] = Some(handle.clone());
            }

            self.await_healthy(index, chain, handle).await
        }));

        tokio::select! {
            result = provision => result,
            _ = cancelled.cancelled() => Err(HarnessError::Cancelled),
        }
    }

    async fn await_healthy(
        &self,
        index: usize,
        chain: &ChainConfig,
        handle: Arc<dyn ChainHandle>,
    ) -> HarnessResult<ChainInstance> {
        let health = retry_with_backoff(&self.health, &self.shutdown, "health_check", |_| {
            let handle = handle.clone();
            async move { handle.block_number().await }
        })
        .await;

        let block_number = match health {
            Ok(block_number) => block_number,
            Err(RetryError::Cancelled) => return Err(HarnessError::Cancelled),
            Err(RetryError::Exhausted { attempts, last }) => {
                return Err(HarnessError::Unhealthy {
                    index,
                    name: chain.name.clone(),
                    attempts,
                    last,
                })
            }
        };

        let on_chain = |source: ChainError| HarnessError::on_chain(index, &chain.name, source);

        let chain_id = handle.chain_id().await.map_err(on_chain)?;
        if chain_id != chain.chain_id {
            return Err(on_chain(ChainError::ChainMismatch {
                expected: chain.chain_id,
                actual: chain_id,
            }));
        }

        let funded_balance = handle
            .get_balance(self.funded.address())
            .await
            .map_err(on_chain)?;
        if funded_balance.is_zero() {
            tracing::warn!(chain = %chain.name, "Funded account has no balance on chain");
        }

        tracing::info!(
            index = index,
            chain = %chain.name,
            chain_id = chain_id,
            block_number = block_number,
            funded_balance = %funded_balance,
            "Chain healthy"
        );

        Ok(ChainInstance::new(index, chain.name.clone(), chain_id, handle, funded_balance))
    }

    /// Address and signer of the pre-funded account.
    pub fn funded_account_info(&self) -> HarnessResult<(Address, PrivateKeySigner)> {
        self.require_ready()?;
        Ok((self.funded.address(), self.funded.signer().clone()))
    }

    /// Deploy a keyless contract on every chain and record it under `label`.
    ///
    /// `sender_address` and `contract_address` must be the values the raw
    /// transaction implies. Chains that already have code at
    /// `contract_address` are skipped. With `verify`, the code must be
    /// non-empty and byte-identical everywhere.
    pub async fn deploy_contract(
        &mut self,
        label: &str,
        deployment_tx: &Bytes,
        sender_address: Address,
        contract_address: Address,
        funded_key: &PrivateKeySigner,
        verify: bool,
    ) -> HarnessResult<()> {
        self.require_ready()?;

        let deployment = KeylessDeployment::decode(deployment_tx)?;
        if deployment.sender_address != sender_address {
            return Err(HarnessError::Validation(format!(
                "transaction is sent by {}, not {}",
                deployment.sender_address, sender_address
            )));
        }
        if deployment.contract_address != contract_address {
            return Err(HarnessError::Validation(format!(
                "transaction creates {}, not {}",
                deployment.contract_address, contract_address
            )));
        }

        let fee = deployment.required_fee();
        tracing::info!(
            label = label,
            sender = %sender_address,
            contract = %contract_address,
            fee = %fee,
            chains = self.chains.len(),
            "Deploying keyless contract"
        );

        let policy = self.inclusion;
        let shutdown = &self.shutdown;
        fan_out(&self.chains, |chain| {
            deploy_keyless_on_chain(
                chain.handle(),
                deployment_tx,
                sender_address,
                contract_address,
                fee,
                funded_key,
                policy,
                shutdown,
            )
        })
        .await?;

        if verify {
            verify_identical_code(&self.chains, label, |_| contract_address).await?;
        }

        self.deployed_contracts.insert(label.to_string(), contract_address);
        tracing::info!(
            label = label,
            contract = %contract_address,
            "Contract deployed on every chain"
        );
        Ok(())
    }

    /// [`deploy_contract`](Self::deploy_contract) for a built deployment,
    /// paid for by the network's funded account.
    pub async fn deploy_keyless(
        &mut self,
        label: &str,
        deployment: &KeylessDeployment,
        verify: bool,
    ) -> HarnessResult<()> {
        let funded_key = self.funded.signer().clone();
        self.deploy_contract(
            label,
            &deployment.raw_transaction,
            deployment.sender_address,
            deployment.contract_address,
            &funded_key,
            verify,
        )
        .await
    }

    /// Deploy the configured registry artifact on every chain, registering
    /// `base_contract_address` as protocol version 1.
    pub async fn deploy_registry_contracts(
        &mut self,
        base_contract_address: Address,
        funded_key: &PrivateKeySigner,
    ) -> HarnessResult<Vec<Address>> {
        let path = self
            .config
            .deployment
            .registry_artifact_path
            .clone()
            .ok_or_else(|| {
                HarnessError::Config("deployment.registry_artifact_path is not set".to_string())
            })?;
        let artifact = ContractArtifact::from_file(Path::new(&path))?;
        self.deploy_registry_with_artifact(&artifact, base_contract_address, funded_key)
            .await
    }

    /// Deploy `artifact` as the registry on every chain.
    ///
    /// Returns the per-chain registry addresses in chain index order.
    pub async fn deploy_registry_with_artifact(
        &mut self,
        artifact: &ContractArtifact,
        base_contract_address: Address,
        funded_key: &PrivateKeySigner,
    ) -> HarnessResult<Vec<Address>> {
        self.require_ready()?;
        let initcode = registry_initcode(artifact, base_contract_address)?;

        let base_codes = fan_out(&self.chains, |chain| {
            chain.handle().get_code(base_contract_address)
        })
        .await?;
        if let Some(chain) = self
            .chains
            .iter()
            .zip(&base_codes)
            .find_map(|(chain, code)| code.is_empty().then_some(chain))
        {
            return Err(HarnessError::Invariant {
                label: REGISTRY_LABEL.to_string(),
                detail: format!(
                    "base contract {} has no code on chain {}",
                    base_contract_address,
                    chain.name()
                ),
            });
        }

        tracing::info!(
            base = %base_contract_address,
            chains = self.chains.len(),
            "Deploying protocol registry"
        );

        let policy = self.inclusion;
        let shutdown = &self.shutdown;
        let addresses = fan_out(&self.chains, |chain| {
            deploy_registry_on_chain(chain.handle(), &initcode, funded_key, policy, shutdown)
        })
        .await?;

        verify_identical_code(&self.chains, REGISTRY_LABEL, |index| addresses[index]).await?;

        for (chain, address) in self.chains.iter_mut().zip(&addresses) {
            chain.set_registry_address(*address);
        }

        if addresses.windows(2).all(|pair| pair[0] == pair[1]) {
            self.deployed_contracts.insert(REGISTRY_LABEL.to_string(), addresses[0]);
        } else {
            tracing::info!(addresses = ?addresses, "Registry addresses differ per chain");
        }

        Ok(addresses)
    }

    /// Runtime code of a recorded contract on every chain, in chain order.
    pub async fn contract_code(&self, label: &str) -> HarnessResult<Vec<Bytes>> {
        self.require_ready()?;
        let address = self
            .contract_address(label)
            .ok_or_else(|| {
                HarnessError::Validation(format!("no contract recorded as '{}'", label))
            })?;
        fan_out(&self.chains, |chain| chain.handle().get_code(address)).await
    }

    /// Stop every chain and release its resources.
    ///
    /// Idempotent, and valid in any state.
    pub async fn tear_down(&mut self) {
        if self.state.is_terminal() {
            tracing::debug!("Network already torn down");
            return;
        }

        self.shutdown.trigger();

        let handles: Vec<Arc<dyn ChainHandle>> = std::mem::take(&mut self.chains)
            .into_iter()
            .map(ChainInstance::into_handle)
            .collect();
        stop_chains(&handles).await;

        self.deployed_contracts.clear();
        self.state = NetworkState::TornDown;
        tracing::info!(chains = handles.len(), "Network torn down");
    }
}

impl Drop for NetworkOrchestrator {
    fn drop(&mut self) {
        if !self.chains.is_empty() {
            tracing::warn!(
                chains = self.chains.len(),
                "Network dropped without tear_down; chain processes are killed without waiting"
            );
        }
    }
}

impl std::fmt::Debug for NetworkOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkOrchestrator")
            .field("state", &self.state)
            .field("chains", &self.chains)
            .field("funded", &self.funded)
            .field("deployed_contracts", &self.deployed_contracts)
            .finish()
    }
}

async fn stop_chains(handles: &[Arc<dyn ChainHandle>]) {
    join_all(handles.iter().map(|handle| async move {
        if let Err(e) = handle.shutdown().await {
            tracing::warn!(chain = handle.name(), error = %e, "Chain shutdown failed");
        }
    }))
    .await;
}

/// Fund the keyless sender, then submit the deployment, on one chain.
#[allow(clippy::too_many_arguments)]
async fn deploy_keyless_on_chain(
    handle: &dyn ChainHandle,
    raw: &Bytes,
    sender: Address,
    contract: Address,
    fee: U256,
    funded_key: &PrivateKeySigner,
    policy: InclusionPolicy,
    shutdown: &Shutdown,
) -> ChainResult<()> {
    if !handle.get_code(contract).await?.is_empty() {
        tracing::info!(
            chain = handle.name(),
            contract = %contract,
            "Contract already deployed, skipping"
        );
        return Ok(());
    }

    let balance = handle.get_balance(sender).await?;
    if balance < fee {
        fund_and_wait(handle, funded_key, sender, fee - balance, &policy, shutdown).await?;
    }

    let balance = handle.get_balance(sender).await?;
    if balance < fee {
        return Err(ChainError::InsufficientFunds {
            address: sender,
            balance,
            required: fee,
        });
    }

    let receipt = submit_raw_and_wait(handle, raw, &policy, shutdown).await?;
    tracing::info!(
        chain = handle.name(),
        contract = %contract,
        block_number = receipt.block_number,
        gas_used = receipt.gas_used,
        "Keyless deployment included"
    );
    Ok(())
}

async fn deploy_registry_on_chain(
    handle: &dyn ChainHandle,
    initcode: &Bytes,
    funded_key: &PrivateKeySigner,
    policy: InclusionPolicy,
    shutdown: &Shutdown,
) -> ChainResult<Address> {
    let tx_hash = handle.deploy_from(funded_key, initcode.clone()).await?;
    let receipt = wait_included(handle, tx_hash, &policy, shutdown).await?;
    let address = receipt
        .contract_address
        .ok_or(ChainError::NoContractCreated(tx_hash))?;
    tracing::info!(chain = handle.name(), registry = %address, "Registry deployed");
    Ok(address)
}

/// Check that each chain has non-empty, identical code at `address_of(index)`.
async fn verify_identical_code<A>(
    chains: &[ChainInstance],
    label: &str,
    address_of: A,
) -> HarnessResult<()>
where
    A: Fn(usize) -> Address,
{
    let codes = fan_out(chains, |chain| chain.handle().get_code(address_of(chain.index()))).await?;

    let reference = &codes[0];
    for (chain, code) in chains.iter().zip(&codes) {
        let address = address_of(chain.index());
        if code.is_empty() {
            return Err(HarnessError::Invariant {
                label: label.to_string(),
                detail: format!("no code at {} on chain {}", address, chain.name()),
            });
        }
        if code != reference {
            return Err(HarnessError::Invariant {
                label: label.to_string(),
                detail: format!(
                    "code at {} on chain {} ({} bytes) differs from chain {} ({} bytes)",
                    address,
                    chain.name(),
                    code.len(),
                    chains[0].name(),
                    reference.len()
                ),
            });
        }
    }

    tracing::debug!(
        label = label,
        code_len = reference.len(),
        "Code verified identical across chains"
    );
    Ok(())
}
