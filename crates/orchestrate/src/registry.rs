//! The address registry: single source of truth for deployed
//! components.
//!
//! Write-once per name, persisted to JSON after every successful
//! deploy so an aborted run resumes instead of restarting. The file is
//! keyed by environment name and stamped with the manifest fingerprint
//! so stale address sets are refused rather than silently reused.

use std::collections::BTreeMap;
use std::path::Path;

use alloy_core::primitives::Address;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::env::Environment;
use crate::error::{ConfigError, RegistryError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressRegistry {
    /// Environment this registry belongs to.
    pub network: String,
    /// Chain the addresses live on.
    pub chain_id: u64,
    /// Fingerprint of the manifest the addresses were deployed from.
    pub manifest_fingerprint: String,
    addresses: BTreeMap<String, Address>,
}

impl AddressRegistry {
    pub fn new(network: impl Into<String>, chain_id: u64, manifest_fingerprint: String) -> Self {
        Self {
            network: network.into(),
            chain_id,
            manifest_fingerprint,
            addresses: BTreeMap::new(),
        }
    }

    /// Load the registry persisted for `env`, or start an empty one.
    ///
    /// `redeploy` discards any persisted state and starts over.
    /// Without it, a persisted registry whose manifest fingerprint or
    /// chain id no longer matches is refused: addresses recorded for a
    /// different descriptor set or chain must never be mixed in.
    pub fn load_or_create(
        env: &Environment,
        manifest_fingerprint: &str,
        redeploy: bool,
    ) -> Result<Self> {
        let path = env.registry_path();
        let fresh = Self::new(&env.network, env.chain_id, manifest_fingerprint.to_string());

        if redeploy || !path.exists() {
            if redeploy && path.exists() {
                tracing::warn!(
                    path = %path.display(),
                    "Redeploy requested; discarding recorded addresses"
                );
            }
            return Ok(fresh);
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read registry from {}", path.display()))?;
        let registry: Self =
            serde_json::from_str(&content).context("Failed to parse registry file")?;

        if registry.chain_id != env.chain_id {
            return Err(RegistryError::ChainIdMismatch {
                expected: env.chain_id,
                found: registry.chain_id,
            }
            .into());
        }
        if registry.manifest_fingerprint != manifest_fingerprint {
            return Err(ConfigError::ManifestDrift { path }.into());
        }

        tracing::info!(
            path = %path.display(),
            recorded = registry.addresses.len(),
            "Resuming from recorded addresses"
        );
        Ok(registry)
    }

    /// Persist the registry. Called after every successful deploy so
    /// each step's effect is durable before the next step begins.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            serde_json::to_string_pretty(self).context("Failed to serialize registry")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write registry to {}", path.display()))?;
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Address> {
        self.addresses.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.addresses.contains_key(name)
    }

    /// Record a deployed address. Exactly one write per name: a second
    /// write is rejected and the registry is left unchanged.
    pub fn record(&mut self, name: &str, address: Address) -> Result<(), RegistryError> {
        if self.addresses.contains_key(name) {
            return Err(RegistryError::AlreadyDeployed(name.to_string()));
        }
        self.addresses.insert(name.to_string(), address);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Address)> {
        self.addresses.iter().map(|(name, addr)| (name.as_str(), *addr))
    }
}
