//! Per-role scheme traits.
//!
//! A *scheme* is a named payment mechanism (e.g., `"exact"`)
//! parameterized by chain family. Each role consumes a different slice
//! of it:
//!
//! - [`SchemeClient`] — produces the signed inner payload
//! - [`SchemeServer`] — resolves prices and enriches requirements
//! - [`SchemeFacilitator`] — verifies and settles payments
//!
//! V1 (legacy) variants exist for the client and facilitator roles,
//! typed over the V1 wire structs. Implementations are registered with
//! the role cores against networks or wildcard patterns; dispatch is
//! first-match in registration order.

use serde_json::Value;
use std::future::Future;
use std::pin::Pin;

use crate::money::AssetAmount;
use crate::proto::{
    PaymentPayload, PaymentPayloadV1, PaymentRequirements, PaymentRequirementsV1, SettleResponse,
    SupportedKind, VerifyResponse,
};

/// Boxed future used at dyn-trait seams.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Boxed error used at scheme boundaries.
pub type SchemeError = Box<dyn std::error::Error + Send + Sync>;

/// The canonical `"exact"` scheme name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExactScheme;

impl ExactScheme {
    /// The wire string: `"exact"`.
    pub const NAME: &'static str = "exact";
}

impl std::fmt::Display for ExactScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(Self::NAME)
    }
}

impl AsRef<str> for ExactScheme {
    fn as_ref(&self) -> &str {
        Self::NAME
    }
}

/// Client-side mechanism: creates the scheme-specific inner payload.
///
/// The returned value is the raw `payload` field; the client core wraps
/// it into the version-appropriate envelope.
pub trait SchemeClient: Send + Sync {
    /// Payment scheme identifier (e.g., `"exact"`).
    fn scheme(&self) -> &str;

    /// Produces the signed inner payload for the selected requirement.
    fn create_payment_payload<'a>(
        &'a self,
        requirements: &'a PaymentRequirements,
    ) -> BoxFuture<'a, Result<Value, SchemeError>>;
}

/// Legacy client-side mechanism over V1 requirements.
pub trait SchemeClientV1: Send + Sync {
    /// Payment scheme identifier.
    fn scheme(&self) -> &str;

    /// Produces the signed inner payload for the selected V1 requirement.
    fn create_payment_payload<'a>(
        &'a self,
        requirements: &'a PaymentRequirementsV1,
    ) -> BoxFuture<'a, Result<Value, SchemeError>>;
}

/// Server-side mechanism: price resolution and requirement enrichment.
///
/// Does not verify or settle — that is delegated to a facilitator.
pub trait SchemeServer: Send + Sync {
    /// Payment scheme identifier.
    fn scheme(&self) -> &str;

    /// Resolves a declared price into an atomic-unit [`AssetAmount`].
    ///
    /// # Errors
    ///
    /// Returns an error if the price cannot be parsed or the network has
    /// no default asset.
    fn parse_price(&self, price: &Value, network: &str) -> Result<AssetAmount, SchemeError>;

    /// Fills scheme-specific defaults into freshly built requirements.
    ///
    /// EVM adds the default asset address and EIP-712 domain; SVM copies
    /// the facilitator's fee payer out of the capability catalog.
    fn enhance_payment_requirements(
        &self,
        requirements: PaymentRequirements,
        supported_kind: &SupportedKind,
        extensions: &[String],
    ) -> PaymentRequirements;
}

/// Facilitator-side mechanism: verification and settlement.
///
/// Business failures are response values, never errors; the methods are
/// infallible at the type level and report trouble through reason codes.
pub trait SchemeFacilitator: Send + Sync {
    /// Payment scheme identifier.
    fn scheme(&self) -> &str;

    /// CAIP family pattern this mechanism serves (e.g., `"eip155:*"`).
    fn caip_family(&self) -> &str;

    /// Mechanism-specific data for the capability catalog
    /// (e.g., `{"feePayer": ...}` for SVM).
    fn get_extra(&self, network: &str) -> Option<Value> {
        let _ = network;
        None
    }

    /// Signer addresses this mechanism controls on the given network.
    fn get_signers(&self, network: &str) -> Vec<String>;

    /// Verifies a payment payload against requirements.
    fn verify<'a>(
        &'a self,
        payload: &'a PaymentPayload,
        requirements: &'a PaymentRequirements,
    ) -> BoxFuture<'a, VerifyResponse>;

    /// Settles a verified payment on-chain.
    fn settle<'a>(
        &'a self,
        payload: &'a PaymentPayload,
        requirements: &'a PaymentRequirements,
    ) -> BoxFuture<'a, SettleResponse>;
}

/// Legacy facilitator-side mechanism over V1 wire types.
pub trait SchemeFacilitatorV1: Send + Sync {
    /// Payment scheme identifier.
    fn scheme(&self) -> &str;

    /// CAIP family pattern this mechanism serves.
    fn caip_family(&self) -> &str;

    /// Mechanism-specific data for the capability catalog.
    fn get_extra(&self, network: &str) -> Option<Value> {
        let _ = network;
        None
    }

    /// Signer addresses this mechanism controls on the given network.
    fn get_signers(&self, network: &str) -> Vec<String>;

    /// Verifies a V1 payment payload against requirements.
    fn verify<'a>(
        &'a self,
        payload: &'a PaymentPayloadV1,
        requirements: &'a PaymentRequirementsV1,
    ) -> BoxFuture<'a, VerifyResponse>;

    /// Settles a verified V1 payment on-chain.
    fn settle<'a>(
        &'a self,
        payload: &'a PaymentPayloadV1,
        requirements: &'a PaymentRequirementsV1,
    ) -> BoxFuture<'a, SettleResponse>;
}
