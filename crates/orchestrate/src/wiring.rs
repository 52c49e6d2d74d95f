//! The wiring phase: inject peer addresses into deployed components.
//!
//! Edges run in the order they are declared; wiring has no natural
//! topological relationship to deployment order, so the plan is
//! explicit rather than inferred. Edges are largely independent: one
//! failing edge never aborts the rest, and an unmet precondition is a
//! skip (an operator action is pending out of band), not a failure.

use alloy_core::primitives::Address;
use anyhow::Result;

use crate::abi;
use crate::chain::ChainClient;
use crate::env::Environment;
use crate::manifest::{ArgValue, Manifest, WireTarget, WiringEdge};
use crate::precondition::{self, PreconditionStatus};
use crate::registry::AddressRegistry;
use crate::report::{PhaseOutcome, RunReport, StepKind, StepResult};

/// Execute the wiring plan.
///
/// Re-run safe: edges already marked `Success` in the persisted report
/// are not re-attempted, and a target that already holds the correct
/// address counts as a success without re-invoking the setter.
pub async fn run_wiring_phase<C: ChainClient>(
    manifest: &Manifest,
    env: &Environment,
    chain: &C,
    registry: &AddressRegistry,
    report: &mut RunReport,
) -> Result<PhaseOutcome> {
    tracing::info!(
        network = %env.network,
        edges = manifest.wires.len(),
        "Starting wiring phase"
    );

    let mut outcome = PhaseOutcome::default();
    for edge in &manifest.wires {
        let step = wire_one(edge, env, chain, registry, report).await;
        outcome.tally(step.status);
        report.push(step);
        report.save(&env.report_path())?;
    }

    tracing::info!(
        succeeded = outcome.succeeded,
        skipped = outcome.skipped,
        failed = outcome.failed,
        "Wiring phase finished"
    );
    Ok(outcome)
}

async fn wire_one<C: ChainClient>(
    edge: &WiringEdge,
    env: &Environment,
    chain: &C,
    registry: &AddressRegistry,
    report: &RunReport,
) -> StepResult {
    let label = edge.label();

    if report.wire_succeeded(&label) {
        return StepResult::wired(&label, "already wired in a previous run; setter not re-invoked");
    }

    let unresolved = |component: &str| {
        StepResult::failed(
            StepKind::Wire,
            &label,
            format!("unresolved dependency: no recorded address for {}", component),
        )
    };

    let Some(from) = registry.get(&edge.from) else {
        return unresolved(&edge.from);
    };
    let to: Address = match &edge.to {
        WireTarget::Account(address) => *address,
        WireTarget::Component(name) => match registry.get(name) {
            Some(address) => address,
            None => return unresolved(name),
        },
    };

    if let Some(pre) = &edge.precondition {
        let Some(subject) = registry.get(&pre.component) else {
            return unresolved(&pre.component);
        };
        match precondition::check(pre, subject, chain).await {
            Ok(PreconditionStatus::Met) => {}
            Ok(PreconditionStatus::Unmet { reason }) => {
                let detail = match &pre.hint {
                    Some(hint) => format!("precondition unmet: {}; {}", reason, hint),
                    None => format!("precondition unmet: {}", reason),
                };
                return StepResult::skipped(StepKind::Wire, &label, detail);
            }
            Err(e) => {
                return StepResult::failed(
                    StepKind::Wire,
                    &label,
                    format!("precondition check failed: {}", e),
                );
            }
        }
    }

    // Optional idempotence probe: a target already holding the address
    // (wired manually, or by a run whose report was lost) is a success.
    if let Some(getter) = &edge.check {
        match chain.view(from, getter, &[]).await {
            Ok(current) if current == abi::address_word(to) => {
                return StepResult::wired(&label, "target already holds the address");
            }
            Ok(_) => {}
            Err(e) => {
                // The probe is best-effort; the setter call will fail
                // on its own if the node is actually unreachable.
                tracing::debug!(edge = %label, error = %e, "Wiring probe failed, attempting setter");
            }
        }
    }

    tracing::info!(edge = %label, from = %from, to = %to, "Wiring edge");
    match chain
        .send(from, &edge.method, &[ArgValue::Address(to)], env.sender)
        .await
    {
        Ok(()) => StepResult::wired(&label, format!("{} now set to {}", edge.method, to)),
        Err(e) => StepResult::failed(StepKind::Wire, &label, e.to_string()),
    }
}
