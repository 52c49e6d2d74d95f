//! Error taxonomy for the orchestrator.
//!
//! Configuration-class errors abort a run before any step executes:
//! nothing downstream can be trusted once the descriptor set itself is
//! wrong. Chain-class errors are scoped to the step that hit them so
//! that independent steps still run and the report surfaces as much
//! diagnostic information as a single run can.

use std::path::PathBuf;

use alloy_core::primitives::{Address, U256};
use thiserror::Error;

/// A defect in the manifest or in persisted state derived from it.
///
/// These are operator errors that must be fixed in the descriptors;
/// they are never retried.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The constructor references form a cycle; no deploy order exists.
    #[error("component reference cycle: {}", participants.join(" -> "))]
    Cycle { participants: Vec<String> },

    /// A constructor argument, wiring edge, or precondition names a
    /// component that is not declared in the manifest.
    #[error("{component} references unknown component {reference}")]
    DanglingReference {
        component: String,
        reference: String,
    },

    /// Two descriptors share a name.
    #[error("duplicate component name: {0}")]
    DuplicateComponent(String),

    /// The persisted address registry was produced by a different
    /// manifest. Mixing addresses across descriptor sets is never safe.
    #[error(
        "recorded addresses in {} were deployed from a different manifest; \
         pass --redeploy to discard them",
        path.display()
    )]
    ManifestDrift { path: PathBuf },
}

/// A violation of the write-once address registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// A second deploy of a name that already holds an address.
    #[error("component {0} already has a recorded address")]
    AlreadyDeployed(String),

    /// The registry file on disk belongs to a different chain.
    #[error("registry was recorded against chain id {found}, expected {expected}")]
    ChainIdMismatch { expected: u64, found: u64 },
}

/// A failed call against the chain. Scoped to a single step.
#[derive(Debug, Error)]
pub enum ChainError {
    /// The node accepted the transaction but execution reverted.
    #[error("transaction reverted: {0}")]
    Reverted(String),

    /// No confirmation arrived within the call timeout. Never retried
    /// in-process; the operator re-runs the orchestrator instead.
    #[error("timed out after {0}s waiting for confirmation")]
    Timeout(u64),

    /// The RPC request itself could not be completed.
    #[error("rpc transport failure: {0}")]
    Transport(String),

    /// The build artifact for a component was missing or malformed.
    #[error("artifact error: {0}")]
    Artifact(String),
}

/// The sender cannot cover a component's construction capital. Caught
/// by a pre-flight balance check so the cause is unambiguous instead
/// of letting the deployment call fail on its own.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("insufficient funds: deployment requires {required} wei but {sender} holds {available}")]
pub struct InsufficientFunds {
    pub sender: Address,
    pub required: U256,
    pub available: U256,
}

/// A component address lookup failed where the phase ordering
/// guarantees it should not. Hitting this during the deploy phase is
/// an invariant violation (phases were run out of order) and is fatal.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("no recorded address for {component}; was the deploy phase run first?")]
pub struct UnresolvedDependency {
    pub component: String,
}
