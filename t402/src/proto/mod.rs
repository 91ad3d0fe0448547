//! Wire format types for the x402 protocol.
//!
//! Two protocol versions share this module:
//!
//! - **V2** ([`v2`]) — current format; CAIP-2 network identifiers, the
//!   fulfilled requirement embedded under `accepted` in the payload.
//! - **V1** ([`v1`]) — legacy format; human-readable network names,
//!   scheme/network carried at the payload top level.
//!
//! [`responses`] holds the facilitator answers (`VerifyResponse`,
//! `SettleResponse`, the capability catalog) and [`helpers`] the version
//! detection and pattern-matching utilities. All types serialize as
//! camelCase JSON; the version is announced by the `x402Version` field.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::str::FromStr;

pub mod helpers;
pub mod reason;
pub mod responses;
pub mod v1;
pub mod v2;

pub use reason::ErrorReason;
pub use responses::{SettleResponse, SupportedKind, SupportedResponse, VerifyResponse};
pub use v1::{PaymentPayloadV1, PaymentRequiredV1, PaymentRequirementsV1, SupportedResponseV1};
pub use v2::{
    PaymentPayload, PaymentRequired, PaymentRequirements, ResourceInfo, SettleRequest,
    VerifyRequest,
};

/// Current protocol version.
pub const X402_VERSION: u32 = 2;

/// Network identifier as carried on the wire.
///
/// V2 uses CAIP-2 strings (`"eip155:8453"`), V1 uses legacy names
/// (`"base-sepolia"`). Registries match these against exact values or
/// namespace wildcards (`"eip155:*"`).
pub type Network = String;

/// Protocol extension data attached to wire types.
///
/// Keys are extension names; values are extension-specific JSON.
pub type Extensions = HashMap<String, serde_json::Value>;

/// Errors raised when parsing x402 protocol messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The `x402Version` field is missing.
    #[error("missing x402Version field")]
    MissingVersion,

    /// The `x402Version` field has an unsupported value.
    #[error("invalid x402Version: {0}")]
    InvalidVersion(u64),

    /// A required field is missing.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// JSON deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A `u64` that serializes as a string.
///
/// JSON peers in JavaScript cannot represent all 64-bit integers, so
/// token amounts travel as decimal strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct U64String(u64);

impl U64String {
    /// Returns the inner value.
    #[must_use]
    pub const fn inner(&self) -> u64 {
        self.0
    }
}

impl From<u64> for U64String {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<U64String> for u64 {
    fn from(value: U64String) -> Self {
        value.0
    }
}

impl FromStr for U64String {
    type Err = <u64 as FromStr>::Err;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>().map(Self)
    }
}

impl std::fmt::Display for U64String {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for U64String {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for U64String {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse::<u64>().map(Self).map_err(serde::de::Error::custom)
    }
}
