use std::path::PathBuf;

use alloy_core::primitives::Address;
use clap::{Parser, Subcommand};
use tracing::level_filters::LevelFilter;
use wireup_orchestrate::EthRpcClient;

/// The default target network (local Ganache).
const DEFAULT_NETWORK: Network = Network::Ganache;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum Network {
    Ganache,
    Sepolia,
}

impl Network {
    pub fn to_chain_id(&self) -> u64 {
        match self {
            Network::Ganache => 5777,
            Network::Sepolia => 11155111,
        }
    }

    pub fn default_rpc_url(&self) -> &'static str {
        match self {
            Network::Ganache => "http://127.0.0.1:7545",
            Network::Sepolia => "https://ethereum-sepolia-rpc.publicnode.com",
        }
    }
}

#[derive(Parser)]
#[command(name = "wireup")]
#[command(
    author,
    version,
    about = "Deploy a set of interdependent contracts and wire their addresses together"
)]
pub struct Cli {
    /// The verbosity level.
    #[arg(short, long, env = "WIREUP_VERBOSITY", default_value_t = LevelFilter::INFO)]
    pub verbosity: LevelFilter,

    /// Path to the deployment manifest.
    #[arg(short, long, env = "WIREUP_MANIFEST", default_value = "Wireup.toml")]
    pub manifest: PathBuf,

    /// The target network (chain id and RPC presets).
    #[arg(short, long, env = "WIREUP_NETWORK", default_value_t = DEFAULT_NETWORK)]
    pub network: Network,

    /// JSON-RPC endpoint override.
    ///
    /// If not provided, the network's default endpoint is used
    /// (Ganache on 127.0.0.1:7545, or a public Sepolia node).
    #[arg(long, alias = "rpc", env = "WIREUP_RPC_URL")]
    pub rpc_url: Option<String>,

    /// Chain id override, for nodes that do not use the network preset.
    #[arg(long, env = "WIREUP_CHAIN_ID")]
    pub chain_id: Option<u64>,

    /// Account that signs every deployment and wiring transaction.
    /// The node must hold this account's key.
    #[arg(short, long, env = "WIREUP_SENDER")]
    pub sender: Address,

    /// Seconds to wait for a submitted transaction to confirm before
    /// the step is treated as timed out.
    #[arg(
        long,
        env = "WIREUP_CONFIRMATION_TIMEOUT",
        default_value_t = EthRpcClient::DEFAULT_CONFIRMATION_TIMEOUT_SECS
    )]
    pub confirmation_timeout: u64,

    /// Directory of Truffle-format build artifacts.
    #[arg(long, env = "WIREUP_ARTIFACTS", default_value = "build/contracts")]
    pub artifacts: PathBuf,

    /// The path to the output data directory.
    ///
    /// If not provided, the data will be stored at: ./data-<network>
    #[arg(long, alias = "outdata", env = "WIREUP_OUTDATA")]
    pub outdata: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Deploy every component in dependency order.
    Deploy {
        /// Discard recorded addresses and deploy everything again.
        /// Without it, components with a recorded address are skipped.
        #[arg(long, env = "WIREUP_REDEPLOY", default_value_t = false)]
        redeploy: bool,
    },
    /// Run the wiring pass over already-deployed components.
    Wire,
    /// Deploy, then wire, in one invocation.
    Run {
        /// Discard recorded addresses and deploy everything again.
        #[arg(long, env = "WIREUP_REDEPLOY", default_value_t = false)]
        redeploy: bool,
    },
    /// Show recorded addresses and the accumulated run report.
    Status,
}
