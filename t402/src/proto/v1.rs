//! V1 (legacy) wire format types.
//!
//! V1 predates CAIP-2 adoption: networks are human-readable names
//! (`"base-sepolia"`), the amount field is `maxAmountRequired`, resource
//! metadata sits inline on the requirements, and the payment payload
//! carries `scheme`/`network` at the top level instead of an `accepted`
//! requirement.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Network;

/// One acceptable way to pay, V1 format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequirementsV1 {
    /// Payment scheme identifier (e.g., `"exact"`).
    pub scheme: String,

    /// Legacy network name (e.g., `"base-sepolia"`).
    pub network: Network,

    /// Maximum amount in smallest units, as a decimal string.
    pub max_amount_required: String,

    /// Resource URL (inline in V1).
    pub resource: String,

    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// MIME type of the resource.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    /// Recipient address.
    pub pay_to: String,

    /// Maximum payment validity window in seconds.
    pub max_timeout_seconds: u64,

    /// Asset address or mint.
    pub asset: String,

    /// JSON schema describing the resource output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<Value>,

    /// Scheme-specific data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<Value>,
}

impl PaymentRequirementsV1 {
    /// Returns the required amount (V1 names it `maxAmountRequired`).
    #[must_use]
    pub fn amount(&self) -> &str {
        &self.max_amount_required
    }
}

/// The HTTP 402 challenge body, V1 format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequiredV1 {
    /// Protocol version, always 1.
    #[serde(default = "default_version")]
    pub x402_version: u32,

    /// Error message when re-challenging after a failed payment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Acceptable payment options.
    pub accepts: Vec<PaymentRequirementsV1>,
}

/// A signed payment attempt, V1 format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPayloadV1 {
    /// Protocol version, always 1.
    #[serde(default = "default_version")]
    pub x402_version: u32,

    /// Payment scheme (top-level in V1).
    pub scheme: String,

    /// Legacy network name (top-level in V1).
    pub network: Network,

    /// Scheme-specific inner payload.
    pub payload: Value,
}

/// Body of a facilitator `POST /verify-v1` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequestV1 {
    /// The payment payload to verify.
    pub payment_payload: PaymentPayloadV1,

    /// The requirements to verify against.
    pub payment_requirements: PaymentRequirementsV1,
}

/// Body of a facilitator `POST /settle-v1` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettleRequestV1 {
    /// The payment payload to settle.
    pub payment_payload: PaymentPayloadV1,

    /// The requirements it was verified against.
    pub payment_requirements: PaymentRequirementsV1,
}

/// V1 capability catalog — kinds only, no extensions or signers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportedResponseV1 {
    /// Supported payment kinds.
    pub kinds: Vec<super::SupportedKind>,
}

const fn default_version() -> u32 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_v1_requirements_field_names() {
        let json = serde_json::json!({
            "scheme": "exact",
            "network": "base-sepolia",
            "maxAmountRequired": "1000000",
            "resource": "/api/data",
            "payTo": "0xRecipient",
            "maxTimeoutSeconds": 300,
            "asset": "0xAsset"
        });
        let req: PaymentRequirementsV1 = serde_json::from_value(json).unwrap();
        assert_eq!(req.amount(), "1000000");
        assert_eq!(req.network, "base-sepolia");
    }
}
