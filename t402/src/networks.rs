//! Registry mapping V1 network names to CAIP-2 chain identifiers.
//!
//! V1 messages name networks like `"base-sepolia"`; V2 uses CAIP-2
//! strings. Chain crates export `NetworkInfo` tables (`EVM_NETWORKS`,
//! `SOLANA_NETWORKS`) and applications assemble a [`NetworkRegistry`]
//! from them at startup.

use std::collections::HashMap;

use crate::chain::ChainId;

/// A known network: its V1 name and CAIP-2 components.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkInfo {
    /// V1 human-readable name (e.g., `"base-sepolia"`).
    pub name: &'static str,
    /// CAIP-2 namespace (e.g., `"eip155"`).
    pub namespace: &'static str,
    /// CAIP-2 reference (e.g., `"84532"`).
    pub reference: &'static str,
}

impl NetworkInfo {
    /// Returns the CAIP-2 chain ID for this network.
    #[must_use]
    pub fn chain_id(&self) -> ChainId {
        ChainId::new(self.namespace, self.reference)
    }
}

/// Bidirectional V1-name ↔ chain-id lookup table.
#[derive(Debug, Clone, Default)]
pub struct NetworkRegistry {
    by_name: HashMap<&'static str, ChainId>,
    by_chain_id: HashMap<ChainId, &'static str>,
}

impl NetworkRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry from a table of networks.
    #[must_use]
    pub fn from_networks(networks: &[NetworkInfo]) -> Self {
        let mut registry = Self::new();
        registry.register(networks);
        registry
    }

    /// Adds networks to this registry.
    pub fn register(&mut self, networks: &[NetworkInfo]) {
        for info in networks {
            self.by_name.insert(info.name, info.chain_id());
            self.by_chain_id.insert(info.chain_id(), info.name);
        }
    }

    /// Builder-style registration.
    #[must_use]
    pub fn with_networks(mut self, networks: &[NetworkInfo]) -> Self {
        self.register(networks);
        self
    }

    /// Looks up a chain ID by V1 network name.
    #[must_use]
    pub fn chain_id_by_name(&self, name: &str) -> Option<&ChainId> {
        self.by_name.get(name)
    }

    /// Looks up a V1 network name by chain ID.
    #[must_use]
    pub fn name_by_chain_id(&self, chain_id: &ChainId) -> Option<&'static str> {
        self.by_chain_id.get(chain_id).copied()
    }

    /// Returns the number of registered networks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// Returns `true` when no networks are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
