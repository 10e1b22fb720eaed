//! Keyless Multi-Chain Harness (v1)
//!
//! # Architecture Overview
//!
//! ```text
//!     harness.toml ──▶ config ──▶ NetworkOrchestrator
//!                                      │
//!           ┌──────────────────────────┼──────────────────────────┐
//!           ▼                          ▼                          ▼
//!     ┌───────────┐              ┌───────────┐              ┌───────────┐
//!     │  chain A  │              │  chain B  │     ...      │  chain N  │
//!     │  (anvil)  │              │  (anvil)  │              │  (anvil)  │
//!     └───────────┘              └───────────┘              └───────────┘
//!           ▲                          ▲                          ▲
//!           └──────── same raw keyless transaction bytes ─────────┘
//!                                      │
//!                              KeylessDeployer
//!                        (canonical signature, nonce 0)
//! ```
//!
//! # Commands
//!
//! - `keyless`: build the deployment transaction for an artifact and print or
//!   write it
//! - `up`: bring up the configured network, deploy, wait for Ctrl-C, tear down

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};

use xchain_harness::chain::AnvilProvisioner;
use xchain_harness::config::{load_config, HarnessConfig};
use xchain_harness::deployment::keyless::DEFAULT_GAS_PRICE_WEI;
use xchain_harness::deployment::{
    ContractArtifact, DeploymentSpec, KeylessDeployer, KeylessDeployment,
};
use xchain_harness::lifecycle::trigger_on_signal;
use xchain_harness::network::{GenesisConfig, NetworkOrchestrator};
use xchain_harness::observability::init_logging;

#[derive(Parser)]
#[command(name = "xchain-harness")]
#[command(about = "Keyless multi-chain deployment harness", long_about = None)]
struct Cli {
    /// Harness configuration file; defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the keyless deployment transaction for an artifact
    Keyless {
        /// Contract artifact (forge/hardhat JSON or bare hex)
        artifact: PathBuf,

        #[arg(long, default_value_t = DEFAULT_GAS_PRICE_WEI)]
        gas_price: u128,

        /// Size the gas limit from the bytecode; never below the canonical limit
        #[arg(long)]
        sized_gas: bool,

        /// Write the transaction and addresses into this directory
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// File name prefix for written artifacts
        #[arg(long, default_value = "Messenger")]
        name: String,
    },
    /// Bring up the network, deploy, and hold it until Ctrl-C
    Up,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => HarnessConfig::default(),
    };
    init_logging(&config.observability);

    tracing::info!("xchain-harness v0.1.0 starting");

    match cli.command {
        Commands::Keyless {
            artifact,
            gas_price,
            sized_gas,
            out_dir,
            name,
        } => {
            let artifact = ContractArtifact::from_file(&artifact)?;
            let spec = DeploymentSpec::new(artifact.into_bytecode(), gas_price, !sized_gas);
            let deployment = KeylessDeployer::build(&spec)?;
            print_deployment(&name, &deployment);
            if let Some(dir) = out_dir {
                deployment.write_to_dir(&dir, &name)?;
                tracing::info!(dir = %dir.display(), "Deployment artifacts written");
            }
        }
        Commands::Up => run_network(config).await?,
    }

    Ok(())
}

fn print_deployment(name: &str, deployment: &KeylessDeployment) {
    println!("{} deployer:    {}", name, deployment.sender_address);
    println!("{} contract:    {}", name, deployment.contract_address);
    println!("{} tx hash:     {}", name, deployment.tx_hash);
    println!("{} gas limit:   {}", name, deployment.gas_limit);
    println!("{} gas price:   {}", name, deployment.gas_price);
    println!("{} fee:         {}", name, deployment.required_fee());
    println!("{} raw tx:      {}", name, deployment.raw_transaction);
}

async fn run_network(config: HarnessConfig) -> Result<(), Box<dyn std::error::Error>> {
    let genesis = GenesisConfig::load(Path::new(&config.network.genesis_path))?;
    let artifact = ContractArtifact::from_file(Path::new(&config.deployment.artifact_path))?;
    let spec = DeploymentSpec::new(
        artifact.into_bytecode(),
        u128::from(config.deployment.gas_price_wei),
        config.deployment.deterministic,
    );
    let deployment = KeylessDeployer::build(&spec)?;

    let provisioner = Arc::new(AnvilProvisioner::new(&config.network));
    let mut network = NetworkOrchestrator::new(config.clone(), provisioner)?;

    let interrupt = trigger_on_signal(network.abort_handle());

    let result = bring_up_and_deploy(&mut network, &config, genesis, &deployment).await;

    if result.is_ok() {
        print_network(&network);
        tracing::info!("Network ready, press Ctrl-C to tear down");
        let mut cancelled = network.abort_handle().subscribe();
        cancelled.cancelled().await;
    }

    interrupt.abort();
    network.tear_down().await;
    tracing::info!("Shutdown complete");
    result
}

async fn bring_up_and_deploy(
    network: &mut NetworkOrchestrator,
    config: &HarnessConfig,
    genesis: GenesisConfig,
    deployment: &KeylessDeployment,
) -> Result<(), Box<dyn std::error::Error>> {
    network.bring_up(genesis).await?;

    let label = &config.deployment.label;
    network
        .deploy_keyless(label, deployment, config.deployment.verify)
        .await?;

    if config.deployment.registry_artifact_path.is_some() {
        let (_, funded_key) = network.funded_account_info()?;
        network
            .deploy_registry_contracts(deployment.contract_address, &funded_key)
            .await?;
    }

    if let Some(dir) = &config.deployment.output_dir {
        deployment.write_to_dir(Path::new(dir), label)?;
        tracing::info!(dir = %dir, "Deployment artifacts written");
    }

    Ok(())
}

fn print_network(network: &NetworkOrchestrator) {
    for chain in network.chains() {
        println!(
            "chain {} ({}): chain id {}, registry {}",
            chain.index(),
            chain.name(),
            chain.chain_id(),
            chain
                .registry_address()
                .map(|address| address.to_string())
                .unwrap_or_else(|| "-".to_string())
        );
    }
    for (label, address) in network.deployed_contracts() {
        println!("{}: {}", label, address);
    }
}
