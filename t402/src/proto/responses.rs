//! Facilitator response types.
//!
//! Verify and settle never raise for business failures: the outcome is a
//! response value with `is_valid`/`success` set to `false` and a stable
//! reason code. Exceptions are reserved for infrastructure failures
//! (unreachable RPC, unregistered schemes, malformed payloads).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::{serde_as, VecSkipError};

use super::reason::ErrorReason;
use super::Network;

/// Outcome of a payment verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    /// Whether the payment passed all checks.
    pub is_valid: bool,

    /// Machine-readable reason, set whenever `is_valid` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invalid_reason: Option<String>,

    /// Free-text detail; the only place raw error text may appear.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invalid_message: Option<String>,

    /// The payer's address, when identifiable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer: Option<String>,
}

impl VerifyResponse {
    /// A successful verification with the given payer.
    #[must_use]
    pub fn valid(payer: impl Into<String>) -> Self {
        Self {
            is_valid: true,
            invalid_reason: None,
            invalid_message: None,
            payer: Some(payer.into()),
        }
    }

    /// A failed verification.
    #[must_use]
    pub fn invalid(reason: ErrorReason, payer: Option<String>) -> Self {
        Self {
            is_valid: false,
            invalid_reason: Some(reason.as_str().to_owned()),
            invalid_message: None,
            payer,
        }
    }

    /// Attaches a free-text message to a failed verification.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.invalid_message = Some(message.into());
        self
    }
}

/// Outcome of a payment settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettleResponse {
    /// Whether the payment settled on-chain.
    pub success: bool,

    /// Machine-readable reason, set whenever `success` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<String>,

    /// Free-text detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// The payer's address, when identifiable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer: Option<String>,

    /// On-chain transaction identifier; empty on failure before
    /// submission, populated when a transaction was sent.
    pub transaction: String,

    /// Network where settlement was attempted.
    pub network: Network,
}

impl SettleResponse {
    /// A successful settlement.
    #[must_use]
    pub fn success(
        transaction: impl Into<String>,
        network: impl Into<String>,
        payer: impl Into<String>,
    ) -> Self {
        Self {
            success: true,
            error_reason: None,
            error_message: None,
            payer: Some(payer.into()),
            transaction: transaction.into(),
            network: network.into(),
        }
    }

    /// A failed settlement.
    #[must_use]
    pub fn error(reason: ErrorReason, network: impl Into<String>) -> Self {
        Self {
            success: false,
            error_reason: Some(reason.as_str().to_owned()),
            error_message: None,
            payer: None,
            transaction: String::new(),
            network: network.into(),
        }
    }

    /// A failed settlement echoing a verification failure's reason string.
    #[must_use]
    pub fn error_raw(reason: impl Into<String>, network: impl Into<String>) -> Self {
        Self {
            success: false,
            error_reason: Some(reason.into()),
            error_message: None,
            payer: None,
            transaction: String::new(),
            network: network.into(),
        }
    }

    /// Attaches a free-text message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    /// Attaches the payer address.
    #[must_use]
    pub fn with_payer(mut self, payer: impl Into<String>) -> Self {
        self.payer = Some(payer.into());
        self
    }

    /// Attaches a transaction id (e.g., when a submitted tx reverted).
    #[must_use]
    pub fn with_transaction(mut self, transaction: impl Into<String>) -> Self {
        self.transaction = transaction.into();
        self
    }
}

/// One (version, scheme, network) combination a facilitator can handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportedKind {
    /// Protocol version for this kind (1 or 2).
    pub x402_version: u32,

    /// Payment scheme identifier (e.g., `"exact"`).
    pub scheme: String,

    /// Network identifier.
    pub network: Network,

    /// Mechanism-specific data (e.g., `{"feePayer": ...}` for SVM).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<Value>,
}

/// The facilitator's capability catalog, built once at startup.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportedResponse {
    /// Supported payment kinds. Unrecognized entries from newer
    /// facilitators are skipped rather than failing the whole catalog.
    #[serde_as(as = "VecSkipError<_>")]
    pub kinds: Vec<SupportedKind>,

    /// Supported extension keys (e.g., `["bazaar"]`).
    #[serde(default)]
    pub extensions: Vec<String>,

    /// Signer addresses keyed by CAIP family pattern, e.g.
    /// `{"eip155:*": ["0xFacilitator"]}`.
    #[serde(default)]
    pub signers: HashMap<String, Vec<String>>,
}

impl SupportedResponse {
    /// Creates a catalog from its parts.
    #[must_use]
    pub const fn new(
        kinds: Vec<SupportedKind>,
        extensions: Vec<String>,
        signers: HashMap<String, Vec<String>>,
    ) -> Self {
        Self {
            kinds,
            extensions,
            signers,
        }
    }

    /// Finds signer addresses for a network, checking the exact key first
    /// and then the namespace wildcard.
    #[must_use]
    pub fn signers_for_network(&self, network: &str) -> Vec<&str> {
        let mut result = Vec::new();
        if let Some(addrs) = self.signers.get(network) {
            result.extend(addrs.iter().map(String::as_str));
        }
        if let Some(namespace) = network.split(':').next() {
            let wildcard = format!("{namespace}:*");
            if wildcard != network
                && let Some(addrs) = self.signers.get(&wildcard)
            {
                result.extend(addrs.iter().map(String::as_str));
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_response_wire_shape() {
        let ok = VerifyResponse::valid("0xPayer");
        let json = serde_json::to_value(&ok).unwrap();
        assert_eq!(json["isValid"], true);
        assert!(json.get("invalidReason").is_none());

        let bad = VerifyResponse::invalid(ErrorReason::InsufficientAmount, None);
        let json = serde_json::to_value(&bad).unwrap();
        assert_eq!(json["isValid"], false);
        assert_eq!(json["invalidReason"], "insufficient_amount");
    }

    #[test]
    fn test_settle_response_wire_shape() {
        let ok = SettleResponse::success("0xtx", "eip155:8453", "0xPayer");
        let json = serde_json::to_value(&ok).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["transaction"], "0xtx");

        let bad = SettleResponse::error(ErrorReason::TransactionFailed, "eip155:8453");
        let json = serde_json::to_value(&bad).unwrap();
        assert_eq!(json["errorReason"], "transaction_failed");
        assert_eq!(json["transaction"], "");
    }

    #[test]
    fn test_signers_for_network_wildcard() {
        let mut signers = HashMap::new();
        signers.insert("eip155:*".to_owned(), vec!["0xA".to_owned()]);
        signers.insert("eip155:8453".to_owned(), vec!["0xB".to_owned()]);
        let supported = SupportedResponse::new(Vec::new(), Vec::new(), signers);

        let found = supported.signers_for_network("eip155:8453");
        assert!(found.contains(&"0xA"));
        assert!(found.contains(&"0xB"));
        assert_eq!(supported.signers_for_network("solana:x").len(), 0);
    }
}
