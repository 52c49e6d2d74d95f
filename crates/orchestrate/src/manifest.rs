//! The deployment manifest: component descriptors plus the wiring plan.
//!
//! The manifest is the declarative replacement for hand-sequenced
//! migration scripts. Deploy order is derived from constructor
//! references (see [`crate::graph`]); wiring edges execute in the
//! order they are declared, since post-deploy wiring has no natural
//! topological relationship to construction order.

use std::fmt;
use std::path::PathBuf;

use alloy_core::primitives::{Address, B256, U256};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::ConfigError;

/// A constructor or call argument value. Only static ABI words are
/// supported; the components this tool targets take addresses, role
/// identifiers, and amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgValue {
    Bool(bool),
    Address(Address),
    Word(B256),
    Uint(U256),
}

impl ArgValue {
    /// The Solidity type name, used to build call signatures.
    pub fn sol_type(&self) -> &'static str {
        match self {
            ArgValue::Bool(_) => "bool",
            ArgValue::Address(_) => "address",
            ArgValue::Word(_) => "bytes32",
            ArgValue::Uint(_) => "uint256",
        }
    }
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgValue::Bool(v) => write!(f, "{}", v),
            ArgValue::Address(v) => write!(f, "{}", v),
            ArgValue::Word(v) => write!(f, "{}", v),
            ArgValue::Uint(v) => write!(f, "{}", v),
        }
    }
}

/// One constructor argument slot: either another component's deployed
/// address, or a literal value passed through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgSpec {
    Ref {
        #[serde(rename = "ref")]
        component: String,
    },
    Literal { value: ArgValue },
}

/// Static description of one deployable component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentDescriptor {
    /// Unique component name; also the artifact file stem.
    pub name: String,
    /// Ordered constructor arguments.
    #[serde(default)]
    pub args: Vec<ArgSpec>,
    /// Capital that must accompany the deployment transaction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_value: Option<U256>,
}

impl ComponentDescriptor {
    /// Names of the components this descriptor references.
    pub fn refs(&self) -> impl Iterator<Item = &str> {
        self.args.iter().filter_map(|arg| match arg {
            ArgSpec::Ref { component } => Some(component.as_str()),
            ArgSpec::Literal { .. } => None,
        })
    }
}

/// The receiving end of a wiring edge: a deployed component looked up
/// in the registry, or a literal account address (e.g. an operator
/// account being appointed to a role).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireTarget {
    Account(Address),
    Component(String),
}

impl fmt::Display for WireTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireTarget::Account(addr) => write!(f, "{}", addr),
            WireTarget::Component(name) => write!(f, "{}", name),
        }
    }
}

/// A read-only invariant that must hold before a wiring edge is
/// attempted: `component.method(args)` must return `expect`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Precondition {
    /// Component whose state is inspected.
    pub component: String,
    /// View method to call.
    pub method: String,
    #[serde(default)]
    pub args: Vec<ArgValue>,
    /// Expected return value.
    pub expect: ArgValue,
    /// Actionable operator diagnostic emitted when the check is unmet,
    /// e.g. "grant the role to the account, then re-run".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

/// One directed wiring step: tell `from` the address of `to` by
/// calling `from.method(to_address)` after all deploys have settled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WiringEdge {
    /// Component whose state is mutated.
    pub from: String,
    /// Address injected into `from`.
    pub to: WireTarget,
    /// Setter method on `from`, taking a single address argument.
    pub method: String,
    /// Optional view method on `from` returning the currently wired
    /// address. When it already returns `to`, the setter is not
    /// re-invoked and the step counts as a success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precondition: Option<Precondition>,
}

impl WiringEdge {
    /// Stable identifier used to match this edge against persisted
    /// run reports across re-runs.
    pub fn label(&self) -> String {
        format!("{} -> {} via {}", self.from, self.to, self.method)
    }
}

/// The full declarative deployment: descriptor registry + wiring plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default, rename = "component")]
    pub components: Vec<ComponentDescriptor>,
    #[serde(default, rename = "wire")]
    pub wires: Vec<WiringEdge>,
}

impl Manifest {
    /// Load and parse a manifest from a TOML file.
    pub fn load_from_file(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest from {}", path.display()))?;
        let manifest: Self =
            toml::from_str(&content).context("Failed to parse manifest as TOML")?;
        tracing::debug!(
            path = %path.display(),
            components = manifest.components.len(),
            wires = manifest.wires.len(),
            "Manifest loaded"
        );
        Ok(manifest)
    }

    /// Look up a descriptor by name.
    pub fn component(&self, name: &str) -> Option<&ComponentDescriptor> {
        self.components.iter().find(|c| c.name == name)
    }

    /// Check referential integrity: unique names, and every reference
    /// (constructor args, wiring endpoints, precondition subjects)
    /// resolving to a declared component.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = std::collections::BTreeSet::new();
        for descriptor in &self.components {
            if !seen.insert(descriptor.name.as_str()) {
                return Err(ConfigError::DuplicateComponent(descriptor.name.clone()));
            }
        }

        let dangling = |owner: &str, reference: &str| ConfigError::DanglingReference {
            component: owner.to_string(),
            reference: reference.to_string(),
        };

        for descriptor in &self.components {
            for reference in descriptor.refs() {
                if !seen.contains(reference) {
                    return Err(dangling(&descriptor.name, reference));
                }
            }
        }

        for edge in &self.wires {
            if !seen.contains(edge.from.as_str()) {
                return Err(dangling(&edge.label(), &edge.from));
            }
            if let WireTarget::Component(name) = &edge.to {
                if !seen.contains(name.as_str()) {
                    return Err(dangling(&edge.label(), name));
                }
            }
            if let Some(pre) = &edge.precondition {
                if !seen.contains(pre.component.as_str()) {
                    return Err(dangling(&edge.label(), &pre.component));
                }
            }
        }

        Ok(())
    }

    /// Content fingerprint of the component descriptors, recorded
    /// alongside the address registry so a re-run against edited
    /// descriptors is detected instead of silently mixing address
    /// sets.
    ///
    /// Wiring edges are excluded: addresses are a function of the
    /// descriptors alone, and fixing a wiring edge must not invalidate
    /// a validly deployed registry.
    pub fn fingerprint(&self) -> Result<String> {
        #[derive(Serialize)]
        struct Descriptors<'a> {
            component: &'a [ComponentDescriptor],
        }

        let canonical = toml::to_string(&Descriptors {
            component: &self.components,
        })
        .context("Failed to serialize component descriptors for fingerprinting")?;
        let digest = Sha256::digest(canonical.as_bytes());
        Ok(hex::encode(digest))
    }
}
