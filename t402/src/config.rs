//! Configuration for protected resources.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::proto::Network;

/// Declares what a resource server charges for one endpoint.
///
/// The price is loose JSON: a money string (`"$1.50"`), a bare number,
/// or an `AssetAmount` object — resolved by the scheme server when the
/// requirements are built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceConfig {
    /// Payment scheme identifier (e.g., `"exact"`).
    pub scheme: String,

    /// Recipient address.
    pub pay_to: String,

    /// Declared price.
    pub price: Value,

    /// Network to charge on.
    pub network: Network,

    /// Payment validity window in seconds; defaults to 300.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_timeout_seconds: Option<u64>,
}
