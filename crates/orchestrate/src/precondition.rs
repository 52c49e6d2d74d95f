//! Read-only precondition checks gating wiring edges.
//!
//! A precondition is pure observation: a view call whose result is
//! compared against the expected value. The verifier never mutates
//! state; its only consumer is the wiring executor, which skips the
//! edge with a diagnostic when the check is unmet.

use alloy_core::primitives::Address;

use crate::abi;
use crate::chain::ChainClient;
use crate::error::ChainError;
use crate::manifest::Precondition;

/// Result of evaluating a precondition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreconditionStatus {
    Met,
    Unmet { reason: String },
}

/// Evaluate a precondition against the component at `target`.
///
/// The caller resolves `precondition.component` to an address first so
/// that a missing component is reported as an unresolved dependency of
/// the edge rather than swallowed here.
pub async fn check<C: ChainClient>(
    precondition: &Precondition,
    target: Address,
    chain: &C,
) -> Result<PreconditionStatus, ChainError> {
    let observed = chain
        .view(target, &precondition.method, &precondition.args)
        .await?;

    let expected = abi::encode_word(&precondition.expect);
    if observed == expected {
        return Ok(PreconditionStatus::Met);
    }

    tracing::debug!(
        component = %precondition.component,
        method = %precondition.method,
        observed = %observed,
        expected = %expected,
        "Precondition unmet"
    );

    Ok(PreconditionStatus::Unmet {
        reason: format!(
            "{}.{} returned {}, expected {}",
            precondition.component, precondition.method, observed, precondition.expect
        ),
    })
}
