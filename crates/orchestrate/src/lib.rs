//! wireup-orchestrate - deployment and address-wiring orchestration.
//!
//! This crate deploys a set of mutually dependent contracts in an
//! order derived from their constructor references, then runs a second
//! pass of explicit wiring edges that hand each component the
//! addresses of its peers. Both phases record every step in a
//! persisted run report and keep the address registry durable between
//! steps, so interrupted runs resume instead of restarting.

mod abi;
mod chain;
mod deploy;
mod env;
mod error;
mod graph;
mod manifest;
mod precondition;
mod registry;
mod report;
mod rpc;
mod wiring;

pub use chain::{ChainClient, EthRpcClient};
pub use deploy::run_deploy_phase;
pub use env::Environment;
pub use error::{ChainError, ConfigError, InsufficientFunds, RegistryError, UnresolvedDependency};
pub use graph::deploy_order;
pub use manifest::{
    ArgSpec, ArgValue, ComponentDescriptor, Manifest, Precondition, WireTarget, WiringEdge,
};
pub use precondition::{PreconditionStatus, check as check_precondition};
pub use registry::AddressRegistry;
pub use report::{PhaseOutcome, RunReport, StepKind, StepResult, StepStatus};
pub use wiring::run_wiring_phase;
