//! The target environment for a run.
//!
//! Everything an orchestrator call needs to know about where it is
//! deploying lives here and is passed explicitly; there is no ambient
//! "current network" state.

use std::path::PathBuf;

use alloy_core::primitives::Address;
use anyhow::{Context, Result};
use url::Url;

/// Context for one environment (network + operator account + paths),
/// threaded through every deploy and wiring call.
#[derive(Debug, Clone)]
pub struct Environment {
    /// Environment identifier; keys the persisted registry and report.
    pub network: String,
    /// Expected chain id of the node behind `rpc_url`.
    pub chain_id: u64,
    /// JSON-RPC endpoint of the target node.
    pub rpc_url: Url,
    /// Account that signs deployments and wiring calls. The node holds
    /// the key (Ganache/Anvil style `eth_sendTransaction`).
    pub sender: Address,
    /// Directory of Truffle-format build artifacts (`<Name>.json`).
    pub artifacts: PathBuf,
    /// Directory for the persisted registry and run report.
    pub outdata: PathBuf,
}

impl Environment {
    pub fn new(
        network: impl Into<String>,
        chain_id: u64,
        rpc_url: &str,
        sender: Address,
        artifacts: impl Into<PathBuf>,
        outdata: impl Into<PathBuf>,
    ) -> Result<Self> {
        let rpc_url = Url::parse(rpc_url)
            .with_context(|| format!("Invalid RPC URL: {}", rpc_url))?;

        let outdata: PathBuf = outdata.into();
        std::fs::create_dir_all(&outdata).with_context(|| {
            format!("Failed to create output directory {}", outdata.display())
        })?;

        Ok(Self {
            network: network.into(),
            chain_id,
            rpc_url,
            sender,
            artifacts: artifacts.into(),
            outdata,
        })
    }

    /// Path of the persisted address registry for this environment.
    pub fn registry_path(&self) -> PathBuf {
        self.outdata.join(format!("{}.addresses.json", self.network))
    }

    /// Path of the persisted run report for this environment.
    pub fn report_path(&self) -> PathBuf {
        self.outdata.join(format!("{}.report.json", self.network))
    }

    /// Path of the build artifact for a component.
    pub fn artifact_path(&self, component: &str) -> PathBuf {
        self.artifacts.join(format!("{}.json", component))
    }
}
