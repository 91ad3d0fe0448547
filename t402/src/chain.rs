//! CAIP-2 chain identifiers.
//!
//! A [`ChainId`] names a blockchain as `namespace:reference`, e.g.
//! `eip155:8453` (Base) or `solana:5eykt4UsFv8P8NJdTREpY1vzqKqZKvdp`
//! (Solana mainnet). The namespace prefix determines which settlement
//! mechanism family handles payments on that chain.

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use std::fmt;
use std::str::FromStr;

/// A CAIP-2 compliant blockchain identifier.
///
/// Serializes to and from a colon-separated string: `"eip155:8453"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChainId {
    namespace: String,
    reference: String,
}

impl ChainId {
    /// Creates a chain ID from namespace and reference components.
    pub fn new<N: Into<String>, R: Into<String>>(namespace: N, reference: R) -> Self {
        Self {
            namespace: namespace.into(),
            reference: reference.into(),
        }
    }

    /// Returns the namespace component (e.g., `"eip155"`).
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Returns the reference component (e.g., `"8453"`).
    #[must_use]
    pub fn reference(&self) -> &str {
        &self.reference
    }

    /// Returns the wildcard pattern covering this chain's family
    /// (e.g., `"eip155:*"`).
    #[must_use]
    pub fn family_pattern(&self) -> String {
        format!("{}:*", self.namespace)
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.reference)
    }
}

impl From<ChainId> for String {
    fn from(value: ChainId) -> Self {
        value.to_string()
    }
}

/// Error returned when parsing an invalid chain ID string.
///
/// A valid chain ID is `namespace:reference` with both parts non-empty.
#[derive(Debug, thiserror::Error)]
#[error("invalid chain id format: {0}")]
pub struct ChainIdFormatError(String);

impl FromStr for ChainId {
    type Err = ChainIdFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((namespace, reference)) if !namespace.is_empty() && !reference.is_empty() => {
                Ok(Self::new(namespace, reference))
            }
            _ => Err(ChainIdFormatError(s.into())),
        }
    }
}

impl Serialize for ChainId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ChainId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}
