//! Lifecycle hook contexts and results.
//!
//! Hooks observe and steer the three hook points of every operation:
//! before (may abort), after (observe only), and on-failure (may
//! recover). Contexts carry version-tagged views so one hook works
//! across V1 and V2 traffic. The execution order and semantics live in
//! [`crate::pipeline`]; the role cores drive it.

use crate::proto::helpers::{PaymentPayloadEnum, PaymentRequiredEnum, PaymentRequirementsEnum};
use crate::proto::{SettleResponse, VerifyResponse};
use crate::scheme::BoxFuture;

pub use crate::pipeline::AbortResult;

/// Hook run before verification; `Some` aborts.
pub type BeforeVerifyHook =
    Box<dyn Fn(&VerifyContext) -> BoxFuture<'_, Option<AbortResult>> + Send + Sync>;

/// Hook run after successful verification.
pub type AfterVerifyHook = Box<dyn Fn(&VerifyResultContext) -> BoxFuture<'_, ()> + Send + Sync>;

/// Hook run when verification fails; `Some` recovers.
pub type OnVerifyFailureHook = Box<
    dyn Fn(&VerifyFailureContext) -> BoxFuture<'_, Option<RecoveredVerifyResult>> + Send + Sync,
>;

/// Hook run before settlement; `Some` aborts.
pub type BeforeSettleHook =
    Box<dyn Fn(&SettleContext) -> BoxFuture<'_, Option<AbortResult>> + Send + Sync>;

/// Hook run after successful settlement.
pub type AfterSettleHook = Box<dyn Fn(&SettleResultContext) -> BoxFuture<'_, ()> + Send + Sync>;

/// Hook run when settlement fails; `Some` recovers.
pub type OnSettleFailureHook = Box<
    dyn Fn(&SettleFailureContext) -> BoxFuture<'_, Option<RecoveredSettleResult>> + Send + Sync,
>;

/// Context for client before-payment-creation hooks.
#[derive(Debug, Clone)]
pub struct PaymentCreationContext {
    /// The 402 challenge being answered.
    pub payment_required: PaymentRequiredEnum,
    /// The requirement chosen by policies and selector.
    pub selected_requirements: PaymentRequirementsEnum,
}

/// Context for client after-payment-creation hooks.
#[derive(Debug, Clone)]
pub struct PaymentCreatedContext {
    /// The 402 challenge being answered.
    pub payment_required: PaymentRequiredEnum,
    /// The requirement that was fulfilled.
    pub selected_requirements: PaymentRequirementsEnum,
    /// The signed payload that was produced.
    pub payment_payload: PaymentPayloadEnum,
}

/// Context for client payment-creation failure hooks.
#[derive(Debug, Clone)]
pub struct PaymentCreationFailureContext {
    /// The 402 challenge being answered.
    pub payment_required: PaymentRequiredEnum,
    /// The requirement whose fulfillment failed.
    pub selected_requirements: PaymentRequirementsEnum,
    /// Description of the failure.
    pub error: String,
}

/// Substitute payload supplied by a recovering client failure hook.
#[derive(Debug, Clone)]
pub struct RecoveredPayloadResult {
    /// The payload to return instead of propagating the failure.
    pub payload: PaymentPayloadEnum,
}

/// Context for resource-server before/after verify hooks.
#[derive(Debug, Clone)]
pub struct VerifyContext {
    /// The payload being verified.
    pub payment_payload: PaymentPayloadEnum,
    /// The requirements it is verified against.
    pub requirements: PaymentRequirementsEnum,
}

/// Context for resource-server after-verify hooks.
#[derive(Debug, Clone)]
pub struct VerifyResultContext {
    /// The payload that was verified.
    pub payment_payload: PaymentPayloadEnum,
    /// The requirements it was verified against.
    pub requirements: PaymentRequirementsEnum,
    /// The verification outcome.
    pub result: VerifyResponse,
}

/// Context for resource-server verify failure hooks.
#[derive(Debug, Clone)]
pub struct VerifyFailureContext {
    /// The payload whose verification failed.
    pub payment_payload: PaymentPayloadEnum,
    /// The requirements it was verified against.
    pub requirements: PaymentRequirementsEnum,
    /// Reason code or error description.
    pub error: String,
}

/// Substitute result supplied by a recovering verify failure hook.
#[derive(Debug, Clone)]
pub struct RecoveredVerifyResult {
    /// The response to return instead.
    pub result: VerifyResponse,
}

/// Context for resource-server before-settle hooks.
#[derive(Debug, Clone)]
pub struct SettleContext {
    /// The payload being settled.
    pub payment_payload: PaymentPayloadEnum,
    /// The requirements it was verified against.
    pub requirements: PaymentRequirementsEnum,
}

/// Context for resource-server after-settle hooks.
#[derive(Debug, Clone)]
pub struct SettleResultContext {
    /// The payload that was settled.
    pub payment_payload: PaymentPayloadEnum,
    /// The requirements it was verified against.
    pub requirements: PaymentRequirementsEnum,
    /// The settlement outcome.
    pub result: SettleResponse,
}

/// Context for resource-server settle failure hooks.
#[derive(Debug, Clone)]
pub struct SettleFailureContext {
    /// The payload whose settlement failed.
    pub payment_payload: PaymentPayloadEnum,
    /// The requirements it was verified against.
    pub requirements: PaymentRequirementsEnum,
    /// Reason code or error description.
    pub error: String,
}

/// Substitute result supplied by a recovering settle failure hook.
#[derive(Debug, Clone)]
pub struct RecoveredSettleResult {
    /// The response to return instead.
    pub result: SettleResponse,
}
