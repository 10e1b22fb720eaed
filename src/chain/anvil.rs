//! Local chain instances backed by `anvil` processes.

use std::net::TcpListener;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::process::{Child, Command};

use crate::chain::handle::{ChainHandle, ChainProvisioner};
use crate::chain::rpc::RpcChain;
use crate::chain::types::{ChainError, ChainResult};
use crate::config::{ChainConfig, NetworkConfig};
use crate::network::genesis::GenesisConfig;

/// A chain process and the scratch directory holding its genesis file.
///
/// The process is killed when this is dropped.
#[derive(Debug)]
pub struct ChainProcess {
    child: Child,
    workdir: TempDir,
}

impl ChainProcess {
    pub fn new(child: Child, workdir: TempDir) -> Self {
        Self { child, workdir }
    }

    /// Kill the process, reap it, and remove the scratch directory.
    pub async fn stop(mut self) -> ChainResult<()> {
        if let Err(e) = self.child.kill().await {
            tracing::warn!(error = %e, "Failed to kill chain process");
        }
        self.workdir
            .close()
            .map_err(|e| ChainError::Process(format!("failed to remove scratch dir: {}", e)))
    }
}

/// Provisions chains by spawning one `anvil` per chain.
#[derive(Debug, Clone)]
pub struct AnvilProvisioner {
    binary: String,
    host: String,
    rpc_timeout_secs: u64,
}

impl AnvilProvisioner {
    pub fn new(config: &NetworkConfig) -> Self {
        Self {
            binary: config.anvil_binary.clone(),
            host: config.host.clone(),
            rpc_timeout_secs: config.rpc_timeout_secs,
        }
    }

    fn pick_port(&self, chain: &ChainConfig) -> ChainResult<u16> {
        if chain.port != 0 {
            return Ok(chain.port);
        }
        TcpListener::bind((self.host.as_str(), 0))
            .and_then(|listener| listener.local_addr())
            .map(|addr| addr.port())
            .map_err(|e| ChainError::Process(format!("no free port on {}: {}", self.host, e)))
    }
}

#[async_trait]
impl ChainProvisioner for AnvilProvisioner {
    async fn provision(
        &self,
        index: usize,
        chain: &ChainConfig,
        genesis: &GenesisConfig,
    ) -> ChainResult<Arc<dyn ChainHandle>> {
        let workdir = tempfile::Builder::new()
            .prefix(&format!("xchain-{}-", chain.name))
            .tempdir()
            .map_err(|e| ChainError::Process(format!("failed to create scratch dir: {}", e)))?;

        let genesis_path = genesis
            .write_for_chain(workdir.path(), chain.chain_id)
            .map_err(|e| ChainError::Process(format!("failed to write genesis: {}", e)))?;

        let port = self.pick_port(chain)?;

        let mut command = Command::new(&self.binary);
        command
            .arg("--host")
            .arg(&self.host)
            .arg("--port")
            .arg(port.to_string())
            .arg("--chain-id")
            .arg(chain.chain_id.to_string())
            .arg("--init")
            .arg(&genesis_path)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        if let Some(block_time) = chain.block_time_secs {
            command.arg("--block-time").arg(block_time.to_string());
        }

        let child = command
            .spawn()
            .map_err(|e| ChainError::Process(format!("failed to spawn {}: {}", self.binary, e)))?;

        tracing::info!(
            index = index,
            chain = %chain.name,
            chain_id = chain.chain_id,
            port = port,
            pid = ?child.id(),
            "Chain process started"
        );

        let rpc_url = format!("http://{}:{}", self.host, port);
        let handle = RpcChain::connect(&chain.name, &rpc_url, self.rpc_timeout_secs)?
            .with_process(ChainProcess::new(child, workdir));

        Ok(Arc::new(handle))
    }
}
