//! V2 (current) wire format types.
//!
//! V2 identifies chains by CAIP-2 strings and embeds the fulfilled
//! requirement in the payment payload under `accepted`, so verifiers can
//! check structural agreement between what the server offered and what
//! the client signed.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Network;

/// Describes the resource being paid for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceInfo {
    /// Resource URL.
    pub url: String,

    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// MIME type of the resource.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// One acceptable way to pay for a resource.
///
/// # JSON
///
/// ```json
/// {
///   "scheme": "exact",
///   "network": "eip155:8453",
///   "asset": "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913",
///   "amount": "1000000",
///   "payTo": "0x...",
///   "maxTimeoutSeconds": 300,
///   "extra": {}
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequirements {
    /// Payment scheme identifier (e.g., `"exact"`).
    pub scheme: String,

    /// CAIP-2 network identifier.
    pub network: Network,

    /// Asset address or mint (e.g., a USDC contract address).
    pub asset: String,

    /// Amount in the asset's smallest unit, as a decimal string. Never a
    /// float.
    pub amount: String,

    /// Recipient address.
    pub pay_to: String,

    /// Maximum payment validity window in seconds.
    pub max_timeout_seconds: u64,

    /// Scheme-specific data (EIP-712 domain, fee payer, ...).
    #[serde(default = "empty_object")]
    pub extra: Value,
}

impl PaymentRequirements {
    /// Returns `extra` unless it is null or empty.
    #[must_use]
    pub fn extra(&self) -> Option<&Value> {
        match &self.extra {
            Value::Null => None,
            v => Some(v),
        }
    }
}

/// The HTTP 402 challenge body: every acceptable payment option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequired {
    /// Protocol version, always 2.
    #[serde(default = "default_version")]
    pub x402_version: u32,

    /// Error message when re-challenging after a failed payment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// The protected resource.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<ResourceInfo>,

    /// Acceptable payment options. The client must pick exactly one.
    pub accepts: Vec<PaymentRequirements>,

    /// Extension declarations keyed by extension name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Value>,
}

/// A signed payment attempt produced by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPayload {
    /// Protocol version, always 2.
    #[serde(default = "default_version")]
    pub x402_version: u32,

    /// Scheme-specific inner payload (authorization + signature for EVM,
    /// serialized transaction for SVM).
    pub payload: Value,

    /// The requirement this payload fulfills, copied structurally from
    /// the challenge's `accepts` list.
    pub accepted: PaymentRequirements,

    /// The resource, echoed from the challenge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<ResourceInfo>,

    /// Extension data, echoed from the challenge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Value>,
}

impl PaymentPayload {
    /// Returns the payment scheme of the fulfilled requirement.
    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.accepted.scheme
    }

    /// Returns the network of the fulfilled requirement.
    #[must_use]
    pub fn network(&self) -> &str {
        &self.accepted.network
    }
}

/// Body of a facilitator `POST /verify` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    /// The payment payload to verify.
    pub payment_payload: PaymentPayload,

    /// The requirements to verify against.
    pub payment_requirements: PaymentRequirements,
}

/// Body of a facilitator `POST /settle` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettleRequest {
    /// The payment payload to settle.
    pub payment_payload: PaymentPayload,

    /// The requirements it was verified against.
    pub payment_requirements: PaymentRequirements,
}

const fn default_version() -> u32 {
    2
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requirements_camel_case() {
        let req = PaymentRequirements {
            scheme: "exact".into(),
            network: "eip155:8453".into(),
            asset: "0xAsset".into(),
            amount: "1000000".into(),
            pay_to: "0xRecipient".into(),
            max_timeout_seconds: 300,
            extra: serde_json::json!({}),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["payTo"], "0xRecipient");
        assert_eq!(json["maxTimeoutSeconds"], 300);
    }

    #[test]
    fn test_payload_defaults_version() {
        let json = serde_json::json!({
            "payload": {},
            "accepted": {
                "scheme": "exact",
                "network": "eip155:1",
                "asset": "0xA",
                "amount": "1",
                "payTo": "0xB",
                "maxTimeoutSeconds": 60
            }
        });
        let payload: PaymentPayload = serde_json::from_value(json).unwrap();
        assert_eq!(payload.x402_version, 2);
        assert_eq!(payload.scheme(), "exact");
        assert_eq!(payload.network(), "eip155:1");
    }
}
