//! Shared JSON-RPC plumbing for talking to an Ethereum node.

use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Per-request timeout. Confirmation waits are bounded separately.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Interval between receipt polls while waiting for confirmation.
const CONFIRMATION_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// A transaction receipt, reduced to the fields the orchestrator
/// inspects.
#[derive(Debug, Clone, Deserialize)]
pub struct TxReceipt {
    /// Execution status: `0x1` success, `0x0` reverted.
    pub status: Option<String>,
    /// Address of the created contract, present on deployments.
    #[serde(rename = "contractAddress")]
    pub contract_address: Option<String>,
}

impl TxReceipt {
    pub fn succeeded(&self) -> bool {
        self.status.as_deref() == Some("0x1")
    }
}

/// Build the HTTP client used for all RPC traffic.
pub fn create_client() -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .context("Failed to create HTTP client")
}

/// Make a JSON-RPC call and deserialize the `result` field.
///
/// An `error` object in the response body is surfaced as an error with
/// the node's message, since those carry the actionable cause
/// (rejected transaction, bad method, ...).
pub async fn json_rpc_call<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    method: &str,
    params: Vec<Value>,
) -> anyhow::Result<T> {
    let body = serde_json::json!({
        "jsonrpc": "2.0",
        "method": method,
        "params": params,
        "id": 1,
    });

    let response: Value = client
        .post(url)
        .json(&body)
        .send()
        .await
        .with_context(|| format!("Failed to send {} request", method))?
        .json()
        .await
        .with_context(|| format!("Failed to parse {} response", method))?;

    if let Some(error) = response.get("error") {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("unknown");
        anyhow::bail!("node rejected {}: {}", method, message);
    }

    let result = response
        .get("result")
        .with_context(|| format!("No result in {} response", method))?
        .clone();

    serde_json::from_value(result)
        .with_context(|| format!("Failed to deserialize {} result", method))
}

/// Poll for the receipt of a transaction until it is mined or the
/// timeout elapses.
///
/// Returns `None` on timeout so the caller can classify the step as
/// timed out rather than transport-failed. Transport errors during
/// polling are retried until the deadline; a node that is briefly
/// unreachable must not fail a transaction it already accepted.
pub async fn wait_for_receipt(
    client: &reqwest::Client,
    url: &str,
    tx_hash: &str,
    timeout_secs: u64,
) -> Option<TxReceipt> {
    let deadline = std::time::Instant::now() + Duration::from_secs(timeout_secs);

    loop {
        let attempt: anyhow::Result<Option<TxReceipt>> = json_rpc_call(
            client,
            url,
            "eth_getTransactionReceipt",
            vec![serde_json::json!(tx_hash)],
        )
        .await;

        match attempt {
            Ok(Some(receipt)) => return Some(receipt),
            Ok(None) => {
                tracing::trace!(tx_hash, "Transaction not yet mined");
            }
            Err(e) => {
                tracing::trace!(error = %e, tx_hash, "Receipt poll failed, retrying");
            }
        }

        if std::time::Instant::now() >= deadline {
            return None;
        }
        tokio::time::sleep(CONFIRMATION_POLL_INTERVAL).await;
    }
}

/// Parse a `0x`-prefixed hex quantity into a u64.
pub fn parse_quantity(hex_value: &str) -> anyhow::Result<u64> {
    u64::from_str_radix(hex_value.trim_start_matches("0x"), 16)
        .with_context(|| format!("Invalid hex quantity: {}", hex_value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receipt_status() {
        let mined = TxReceipt {
            status: Some("0x1".to_string()),
            contract_address: Some("0x5FbDB2315678afecb367f032d93F642f64180aa3".to_string()),
        };
        assert!(mined.succeeded());

        let reverted = TxReceipt {
            status: Some("0x0".to_string()),
            contract_address: None,
        };
        assert!(!reverted.succeeded());

        let pre_byzantium = TxReceipt {
            status: None,
            contract_address: None,
        };
        assert!(!pre_byzantium.succeeded());
    }

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("0x1691").unwrap(), 5777);
        assert_eq!(parse_quantity("0x0").unwrap(), 0);
        assert!(parse_quantity("0xzz").is_err());
    }
}
