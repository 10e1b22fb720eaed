//! End-to-end tests against real `anvil` processes.
//!
//! Ignored by default; run with `cargo test -- --ignored` with `anvil` on
//! `PATH`.

use std::path::Path;
use std::sync::Arc;

use alloy::primitives::bytes;

use xchain_harness::chain::AnvilProvisioner;
use xchain_harness::deployment::{ContractArtifact, DeploymentSpec, KeylessDeployer};
use xchain_harness::network::{GenesisConfig, NetworkOrchestrator, NetworkState};

mod common;

fn fixture_genesis() -> GenesisConfig {
    GenesisConfig::load(Path::new(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/tests/fixtures/genesis.json"
    )))
    .unwrap()
}

#[tokio::test]
#[ignore = "requires anvil"]
async fn test_anvil_messenger_and_registry() {
    let mut config = common::config(2);
    config.inclusion.poll_interval_ms = 100;
    config.inclusion.max_polls = 300;
    config.inclusion.timeout_secs = 30;
    config.health_check.max_attempts = 30;
    config.health_check.base_delay_ms = 100;
    config.health_check.max_delay_ms = 1000;

    let provisioner = Arc::new(AnvilProvisioner::new(&config.network));
    let mut network = NetworkOrchestrator::new(config, provisioner).unwrap();
    network.bring_up(fixture_genesis()).await.unwrap();
    assert_eq!(network.state(), NetworkState::Ready);

    let spec = DeploymentSpec::new(common::fixture_bytecode(), 2_500_000_000_000, true);
    let deployment = KeylessDeployer::build(&spec).unwrap();
    network
        .deploy_keyless("Messenger", &deployment, true)
        .await
        .unwrap();

    // Runtime code of the fixture, not its initcode.
    let codes = network.contract_code("Messenger").await.unwrap();
    assert!(codes
        .iter()
        .all(|code| *code == bytes!("602a60005260206000f3")));

    // Resubmitting is a no-op.
    network
        .deploy_keyless("Messenger", &deployment, true)
        .await
        .unwrap();

    let (_, funded_key) = network.funded_account_info().unwrap();
    let registry =
        ContractArtifact::parse("0x600a600c600039600a6000f3602a60005260206000f3").unwrap();
    let addresses = network
        .deploy_registry_with_artifact(&registry, deployment.contract_address, &funded_key)
        .await
        .unwrap();
    assert_eq!(addresses.len(), 2);

    network.tear_down().await;
    assert_eq!(network.state(), NetworkState::TornDown);
}

#[tokio::test]
#[ignore = "requires anvil"]
async fn test_anvil_resubmitted_raw_transaction_is_accepted() {
    let mut config = common::config(2);
    config.inclusion.poll_interval_ms = 100;
    config.health_check.base_delay_ms = 100;
    config.health_check.max_attempts = 30;

    let provisioner = Arc::new(AnvilProvisioner::new(&config.network));
    let mut network = NetworkOrchestrator::new(config, provisioner).unwrap();
    network.bring_up(fixture_genesis()).await.unwrap();

    let spec = DeploymentSpec::new(common::fixture_bytecode(), 2_500_000_000_000, true);
    let deployment = KeylessDeployer::build(&spec).unwrap();
    network
        .deploy_keyless("Messenger", &deployment, true)
        .await
        .unwrap();

    for chain in network.chains() {
        let tx_hash = chain.handle().submit_raw(&deployment.raw_transaction).await.unwrap();
        assert_eq!(tx_hash, deployment.tx_hash);
    }

    network.tear_down().await;
}
