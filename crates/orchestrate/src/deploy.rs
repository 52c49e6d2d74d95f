//! The deploy phase: instantiate every component in dependency order.
//!
//! Steps run strictly sequentially because each step's constructor
//! arguments may depend on the previous step's resolved address. A
//! failed deploy poisons its transitive dependents (they are skipped
//! with the blocking component named) while independent branches keep
//! going, so a single run surfaces as much diagnostic information as
//! possible.

use std::collections::BTreeSet;

use alloy_core::primitives::U256;
use anyhow::{Context, Result};

use crate::chain::ChainClient;
use crate::env::Environment;
use crate::error::{InsufficientFunds, UnresolvedDependency};
use crate::graph;
use crate::manifest::{ArgSpec, ArgValue, ComponentDescriptor, Manifest};
use crate::registry::AddressRegistry;
use crate::report::{PhaseOutcome, RunReport, StepKind, StepResult};

/// Execute the deploy phase.
///
/// The registry and report are persisted after every step, so an
/// aborted run leaves resumable state. Configuration errors (cycles)
/// and deploy-phase unresolved dependencies are fatal and abort the
/// whole run; per-step chain failures are isolated.
pub async fn run_deploy_phase<C: ChainClient>(
    manifest: &Manifest,
    env: &Environment,
    chain: &C,
    registry: &mut AddressRegistry,
    report: &mut RunReport,
) -> Result<PhaseOutcome> {
    let order = graph::deploy_order(manifest)?;
    tracing::info!(
        network = %env.network,
        components = order.len(),
        order = ?order,
        "Starting deploy phase"
    );

    let mut outcome = PhaseOutcome::default();
    // Components that failed or were skipped because of a failure;
    // anything referencing them is skipped in turn.
    let mut poisoned: BTreeSet<String> = BTreeSet::new();

    for name in &order {
        let descriptor = manifest
            .component(name)
            .context("deploy order names a component missing from the manifest")?;

        let step = deploy_one(descriptor, env, chain, registry, &mut poisoned).await?;
        outcome.tally(step.status);
        report.push(step);

        // Durably record this step before the next one begins.
        registry.save(&env.registry_path())?;
        report.save(&env.report_path())?;
    }

    tracing::info!(
        succeeded = outcome.succeeded,
        skipped = outcome.skipped,
        failed = outcome.failed,
        "Deploy phase finished"
    );
    Ok(outcome)
}

async fn deploy_one<C: ChainClient>(
    descriptor: &ComponentDescriptor,
    env: &Environment,
    chain: &C,
    registry: &mut AddressRegistry,
    poisoned: &mut BTreeSet<String>,
) -> Result<StepResult> {
    let name = descriptor.name.as_str();

    if registry.contains(name) {
        return Ok(StepResult::skipped(
            StepKind::Deploy,
            name,
            "address already recorded from a previous run",
        ));
    }

    if let Some(blocker) = descriptor.refs().find(|r| poisoned.contains(*r)) {
        poisoned.insert(name.to_string());
        return Ok(StepResult::skipped(
            StepKind::Deploy,
            name,
            format!("dependency {} did not deploy", blocker),
        ));
    }

    // The topological order guarantees every referenced component was
    // already processed; a miss here means the phases were run out of
    // order and nothing downstream can be trusted.
    let mut resolved = Vec::with_capacity(descriptor.args.len());
    for arg in &descriptor.args {
        match arg {
            ArgSpec::Ref { component } => {
                let address = registry.get(component).ok_or_else(|| UnresolvedDependency {
                    component: component.clone(),
                })?;
                resolved.push(ArgValue::Address(address));
            }
            ArgSpec::Literal { value } => resolved.push(*value),
        }
    }

    let value = descriptor.requires_value.unwrap_or(U256::ZERO);
    if value > U256::ZERO {
        match chain.balance(env.sender).await {
            Ok(balance) if balance < value => {
                poisoned.insert(name.to_string());
                let cause = InsufficientFunds {
                    sender: env.sender,
                    required: value,
                    available: balance,
                };
                return Ok(StepResult::failed(StepKind::Deploy, name, cause.to_string()));
            }
            Ok(_) => {}
            Err(e) => {
                poisoned.insert(name.to_string());
                return Ok(StepResult::failed(
                    StepKind::Deploy,
                    name,
                    format!("balance pre-flight check failed: {}", e),
                ));
            }
        }
    }

    tracing::info!(component = name, value = %value, "Deploying component");
    match chain.deploy(name, &resolved, value, env.sender).await {
        Ok(address) => {
            registry
                .record(name, address)
                .context("registry rejected a freshly deployed component")?;
            Ok(StepResult::deployed(name, address))
        }
        Err(e) => {
            poisoned.insert(name.to_string());
            Ok(StepResult::failed(StepKind::Deploy, name, e.to_string()))
        }
    }
}
