//! The chain boundary: deploy, mutate, and read calls.
//!
//! [`ChainClient`] is the seam between the orchestrator core and the
//! node transport. The orchestrator never encodes business logic into
//! these calls; it only needs "deploy this", "tell this contract that
//! address", and "read this view".

use alloy_core::primitives::{Address, B256, U256};
use serde::Deserialize;

use crate::abi;
use crate::env::Environment;
use crate::error::ChainError;
use crate::manifest::ArgValue;
use crate::rpc;

/// Boundary collaborator performing the actual chain calls.
///
/// Every call blocks (awaits) until confirmed or failed; there is no
/// in-process retry. Implemented by [`EthRpcClient`] for real nodes
/// and by scripted mocks in tests.
#[allow(async_fn_in_trait)]
pub trait ChainClient {
    /// Deploy a component and return its address once confirmed.
    async fn deploy(
        &self,
        component: &str,
        args: &[ArgValue],
        value: U256,
        sender: Address,
    ) -> Result<Address, ChainError>;

    /// Invoke a state-mutating method and wait for confirmation.
    async fn send(
        &self,
        target: Address,
        method: &str,
        args: &[ArgValue],
        sender: Address,
    ) -> Result<(), ChainError>;

    /// Invoke a read-only method and return the raw result word.
    async fn view(
        &self,
        target: Address,
        method: &str,
        args: &[ArgValue],
    ) -> Result<B256, ChainError>;

    /// Current balance of an account in wei.
    async fn balance(&self, account: Address) -> Result<U256, ChainError>;
}

/// Truffle-format build artifact; only the creation bytecode matters.
#[derive(Debug, Deserialize)]
struct Artifact {
    bytecode: String,
}

/// [`ChainClient`] over Ethereum JSON-RPC.
///
/// Transactions are submitted with `eth_sendTransaction`: the node is
/// expected to hold the sender's key, which is how Ganache- and
/// Anvil-style development nodes operate.
pub struct EthRpcClient {
    client: reqwest::Client,
    env: Environment,
    confirmation_timeout_secs: u64,
}

/// Gas limit attached to every transaction, matching the Truffle
/// development default.
const DEFAULT_GAS_HEX: &str = "0x6691b7";

impl EthRpcClient {
    /// How long a submitted transaction may stay unmined before the
    /// step is treated as timed out.
    pub const DEFAULT_CONFIRMATION_TIMEOUT_SECS: u64 = 120;

    pub fn new(env: &Environment) -> anyhow::Result<Self> {
        Ok(Self {
            client: rpc::create_client()?,
            env: env.clone(),
            confirmation_timeout_secs: Self::DEFAULT_CONFIRMATION_TIMEOUT_SECS,
        })
    }

    fn url(&self) -> &str {
        self.env.rpc_url.as_str()
    }

    pub fn confirmation_timeout_secs(mut self, secs: u64) -> Self {
        self.confirmation_timeout_secs = secs;
        self
    }

    /// Verify the node at the other end serves the expected chain.
    pub async fn verify_chain_id(&self, expected: u64) -> anyhow::Result<()> {
        let result: String =
            rpc::json_rpc_call(&self.client, self.url(), "eth_chainId", vec![]).await?;
        let actual = rpc::parse_quantity(&result)?;
        anyhow::ensure!(
            actual == expected,
            "node at {} serves chain id {}, expected {}",
            self.url(),
            actual,
            expected
        );
        Ok(())
    }

    fn load_bytecode(&self, component: &str) -> Result<String, ChainError> {
        let path = self.env.artifact_path(component);
        let content = std::fs::read_to_string(&path).map_err(|e| {
            ChainError::Artifact(format!("failed to read {}: {}", path.display(), e))
        })?;
        let artifact: Artifact = serde_json::from_str(&content).map_err(|e| {
            ChainError::Artifact(format!("failed to parse {}: {}", path.display(), e))
        })?;
        if !artifact.bytecode.starts_with("0x") || artifact.bytecode.len() <= 2 {
            return Err(ChainError::Artifact(format!(
                "artifact {} has no creation bytecode",
                path.display()
            )));
        }
        Ok(artifact.bytecode)
    }

    async fn submit_and_confirm(
        &self,
        tx: serde_json::Value,
    ) -> Result<rpc::TxReceipt, ChainError> {
        let tx_hash: String =
            rpc::json_rpc_call(&self.client, self.url(), "eth_sendTransaction", vec![tx])
                .await
                .map_err(classify_rpc_error)?;

        tracing::debug!(tx_hash = %tx_hash, "Transaction submitted, waiting for confirmation");

        let receipt = rpc::wait_for_receipt(
            &self.client,
            self.url(),
            &tx_hash,
            self.confirmation_timeout_secs,
        )
        .await
        .ok_or(ChainError::Timeout(self.confirmation_timeout_secs))?;

        if !receipt.succeeded() {
            return Err(ChainError::Reverted(format!(
                "transaction {} reverted",
                tx_hash
            )));
        }
        Ok(receipt)
    }
}

impl ChainClient for EthRpcClient {
    async fn deploy(
        &self,
        component: &str,
        args: &[ArgValue],
        value: U256,
        sender: Address,
    ) -> Result<Address, ChainError> {
        let bytecode = self.load_bytecode(component)?;
        let data = abi::encode_deployment(&bytecode, args);

        let mut tx = serde_json::json!({
            "from": sender,
            "data": data,
            "gas": DEFAULT_GAS_HEX,
        });
        if value > U256::ZERO {
            tx["value"] = serde_json::json!(format!("0x{:x}", value));
        }

        let receipt = self.submit_and_confirm(tx).await?;

        receipt
            .contract_address
            .as_deref()
            .and_then(|addr| addr.parse().ok())
            .ok_or_else(|| {
                ChainError::Transport("confirmation receipt carries no contract address".into())
            })
    }

    async fn send(
        &self,
        target: Address,
        method: &str,
        args: &[ArgValue],
        sender: Address,
    ) -> Result<(), ChainError> {
        let tx = serde_json::json!({
            "from": sender,
            "to": target,
            "data": abi::encode_call(method, args),
            "gas": DEFAULT_GAS_HEX,
        });
        self.submit_and_confirm(tx).await.map(|_| ())
    }

    async fn view(
        &self,
        target: Address,
        method: &str,
        args: &[ArgValue],
    ) -> Result<B256, ChainError> {
        let call = serde_json::json!({
            "to": target,
            "data": abi::encode_call(method, args),
        });
        let result: String = rpc::json_rpc_call(
            &self.client,
            self.url(),
            "eth_call",
            vec![call, serde_json::json!("latest")],
        )
        .await
        .map_err(classify_rpc_error)?;

        abi::decode_word(&result).ok_or_else(|| {
            ChainError::Transport(format!("eth_call returned a short result: {}", result))
        })
    }

    async fn balance(&self, account: Address) -> Result<U256, ChainError> {
        let result: String = rpc::json_rpc_call(
            &self.client,
            self.url(),
            "eth_getBalance",
            vec![serde_json::json!(account), serde_json::json!("latest")],
        )
        .await
        .map_err(classify_rpc_error)?;

        U256::from_str_radix(result.trim_start_matches("0x"), 16)
            .map_err(|e| ChainError::Transport(format!("invalid balance {}: {}", result, e)))
    }
}

/// A node that rejects a call with a revert message is an execution
/// failure, not a transport one; keep the two apart so the run report
/// points at the right culprit.
fn classify_rpc_error(error: anyhow::Error) -> ChainError {
    let message = error.to_string();
    if message.contains("revert") {
        ChainError::Reverted(message)
    } else {
        ChainError::Transport(message)
    }
}
