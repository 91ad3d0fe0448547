//! The facilitator role: verify/settle routing and the capability
//! catalog.
//!
//! [`X402Facilitator`] is the trust anchor. Scheme mechanisms register
//! against sets of networks; incoming payloads are routed to the first
//! registration whose scheme matches and whose network set contains the
//! payload's network — exact membership first, then the registration's
//! derived wildcard pattern. Registration order is the documented
//! tie-break. `get_supported` aggregates one kind per registered
//! `(scheme, network)` pair plus a de-duplicated signer map keyed by
//! chain family.
//!
//! Registries are populated during startup and read-only afterward, so
//! concurrent verification requires no locking.

use std::collections::{HashMap, HashSet};

use crate::error::{PaymentAbortedError, SchemeNotFoundError};
use crate::hooks::{
    AfterSettleHook, AfterVerifyHook, BeforeSettleHook, BeforeVerifyHook, OnSettleFailureHook,
    OnVerifyFailureHook, SettleContext, SettleFailureContext, SettleResultContext, VerifyContext,
    VerifyFailureContext, VerifyResultContext,
};
use crate::pipeline::{self, Delivered, Invoked};
use crate::proto::helpers::{
    derive_network_pattern, matches_network_pattern, PaymentPayloadEnum, PaymentRequirementsEnum,
};
use crate::proto::{
    Network, PaymentPayload, PaymentPayloadV1, PaymentRequirements, PaymentRequirementsV1,
    SettleResponse, SupportedKind, SupportedResponse, VerifyResponse,
};
use crate::scheme::{SchemeError, SchemeFacilitator, SchemeFacilitatorV1};

/// One registered mechanism and the networks it serves.
struct Registration<T: ?Sized> {
    mechanism: Box<T>,
    networks: HashSet<Network>,
    pattern: Network,
}

impl<T: ?Sized> Registration<T> {
    fn covers(&self, network: &str) -> bool {
        self.networks.contains(network) || matches_network_pattern(network, &self.pattern)
    }
}

/// The facilitator role core.
pub struct X402Facilitator {
    schemes: Vec<Registration<dyn SchemeFacilitator>>,
    schemes_v1: Vec<Registration<dyn SchemeFacilitatorV1>>,
    extensions: Vec<String>,
    before_verify: Vec<BeforeVerifyHook>,
    after_verify: Vec<AfterVerifyHook>,
    on_verify_failure: Vec<OnVerifyFailureHook>,
    before_settle: Vec<BeforeSettleHook>,
    after_settle: Vec<AfterSettleHook>,
    on_settle_failure: Vec<OnSettleFailureHook>,
}

impl std::fmt::Debug for X402Facilitator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("X402Facilitator")
            .field("schemes", &self.schemes.len())
            .field("schemes_v1", &self.schemes_v1.len())
            .field("extensions", &self.extensions)
            .finish_non_exhaustive()
    }
}

impl Default for X402Facilitator {
    fn default() -> Self {
        Self::new()
    }
}

impl X402Facilitator {
    /// Creates an empty facilitator.
    #[must_use]
    pub fn new() -> Self {
        Self {
            schemes: Vec::new(),
            schemes_v1: Vec::new(),
            extensions: Vec::new(),
            before_verify: Vec::new(),
            after_verify: Vec::new(),
            on_verify_failure: Vec::new(),
            before_settle: Vec::new(),
            after_settle: Vec::new(),
            on_settle_failure: Vec::new(),
        }
    }

    /// Registers a V2 mechanism for one or more networks.
    pub fn register(
        &mut self,
        networks: Vec<Network>,
        mechanism: Box<dyn SchemeFacilitator>,
    ) -> &mut Self {
        let pattern = derive_network_pattern(&networks);
        self.schemes.push(Registration {
            mechanism,
            networks: networks.into_iter().collect(),
            pattern,
        });
        self
    }

    /// Registers a V1 mechanism for one or more networks.
    pub fn register_v1(
        &mut self,
        networks: Vec<Network>,
        mechanism: Box<dyn SchemeFacilitatorV1>,
    ) -> &mut Self {
        let pattern = derive_network_pattern(&networks);
        self.schemes_v1.push(Registration {
            mechanism,
            networks: networks.into_iter().collect(),
            pattern,
        });
        self
    }

    /// Registers an extension name (e.g., `"bazaar"`).
    pub fn register_extension(&mut self, extension: String) -> &mut Self {
        if !self.extensions.contains(&extension) {
            self.extensions.push(extension);
        }
        self
    }

    /// Registers a before-verify hook.
    pub fn on_before_verify(&mut self, hook: BeforeVerifyHook) -> &mut Self {
        self.before_verify.push(hook);
        self
    }

    /// Registers an after-verify hook.
    pub fn on_after_verify(&mut self, hook: AfterVerifyHook) -> &mut Self {
        self.after_verify.push(hook);
        self
    }

    /// Registers a verify failure hook.
    pub fn on_verify_failure(&mut self, hook: OnVerifyFailureHook) -> &mut Self {
        self.on_verify_failure.push(hook);
        self
    }

    /// Registers a before-settle hook.
    pub fn on_before_settle(&mut self, hook: BeforeSettleHook) -> &mut Self {
        self.before_settle.push(hook);
        self
    }

    /// Registers an after-settle hook.
    pub fn on_after_settle(&mut self, hook: AfterSettleHook) -> &mut Self {
        self.after_settle.push(hook);
        self
    }

    /// Registers a settle failure hook.
    pub fn on_settle_failure(&mut self, hook: OnSettleFailureHook) -> &mut Self {
        self.on_settle_failure.push(hook);
        self
    }

    /// Builds the capability catalog from all registrations.
    ///
    /// Call once at startup; the result is stable afterward.
    #[must_use]
    pub fn get_supported(&self) -> SupportedResponse {
        let mut kinds = Vec::new();
        let mut signers: HashMap<String, Vec<String>> = HashMap::new();

        for registration in &self.schemes {
            let mechanism = &registration.mechanism;
            for network in &registration.networks {
                kinds.push(SupportedKind {
                    x402_version: 2,
                    scheme: mechanism.scheme().to_owned(),
                    network: network.clone(),
                    extra: mechanism.get_extra(network),
                });
                collect_signers(
                    &mut signers,
                    mechanism.caip_family(),
                    mechanism.get_signers(network),
                );
            }
        }

        for registration in &self.schemes_v1 {
            let mechanism = &registration.mechanism;
            for network in &registration.networks {
                kinds.push(SupportedKind {
                    x402_version: 1,
                    scheme: mechanism.scheme().to_owned(),
                    network: network.clone(),
                    extra: mechanism.get_extra(network),
                });
                collect_signers(
                    &mut signers,
                    mechanism.caip_family(),
                    mechanism.get_signers(network),
                );
            }
        }

        SupportedResponse::new(kinds, self.extensions.clone(), signers)
    }

    /// Returns the registered extension names.
    #[must_use]
    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    fn find(&self, scheme: &str, network: &str) -> Option<&dyn SchemeFacilitator> {
        self.schemes
            .iter()
            .find(|r| r.mechanism.scheme() == scheme && r.covers(network))
            .map(|r| &*r.mechanism)
    }

    fn find_v1(&self, scheme: &str, network: &str) -> Option<&dyn SchemeFacilitatorV1> {
        self.schemes_v1
            .iter()
            .find(|r| r.mechanism.scheme() == scheme && r.covers(network))
            .map(|r| &*r.mechanism)
    }

    /// Verifies a V2 payment through the hook pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`SchemeNotFoundError`] (unrecovered) when no mechanism is
    /// registered for the payload's scheme/network, and
    /// [`PaymentAbortedError`] when a before-hook aborts. Business
    /// failures come back as invalid responses, not errors.
    pub async fn verify(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> Result<VerifyResponse, SchemeError> {
        let context = VerifyContext {
            payment_payload: PaymentPayloadEnum::V2(Box::new(payload.clone())),
            requirements: PaymentRequirementsEnum::V2(Box::new(requirements.clone())),
        };
        self.drive_verify(context, || {
            Box::pin(async move {
                match self.find(payload.scheme(), payload.network()) {
                    Some(mechanism) => {
                        classify_verify(mechanism.verify(payload, requirements).await)
                    }
                    None => Invoked::Hard(Box::new(SchemeNotFoundError::new(
                        payload.scheme(),
                        payload.network(),
                    )) as SchemeError),
                }
            })
        })
        .await
    }

    /// Verifies a V1 payment through the hook pipeline.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Self::verify`].
    pub async fn verify_v1(
        &self,
        payload: &PaymentPayloadV1,
        requirements: &PaymentRequirementsV1,
    ) -> Result<VerifyResponse, SchemeError> {
        let context = VerifyContext {
            payment_payload: PaymentPayloadEnum::V1(Box::new(payload.clone())),
            requirements: PaymentRequirementsEnum::V1(Box::new(requirements.clone())),
        };
        self.drive_verify(context, || {
            Box::pin(async move {
                match self.find_v1(&payload.scheme, &payload.network) {
                    Some(mechanism) => {
                        classify_verify(mechanism.verify(payload, requirements).await)
                    }
                    None => Invoked::Hard(Box::new(SchemeNotFoundError::new(
                        &payload.scheme,
                        &payload.network,
                    )) as SchemeError),
                }
            })
        })
        .await
    }

    /// Settles a V2 payment through the hook pipeline.
    ///
    /// Settlement is not idempotent: callers invoke it exactly once,
    /// after a successful verify and after serving the resource.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Self::verify`].
    pub async fn settle(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> Result<SettleResponse, SchemeError> {
        let context = SettleContext {
            payment_payload: PaymentPayloadEnum::V2(Box::new(payload.clone())),
            requirements: PaymentRequirementsEnum::V2(Box::new(requirements.clone())),
        };
        self.drive_settle(context, || {
            Box::pin(async move {
                match self.find(payload.scheme(), payload.network()) {
                    Some(mechanism) => {
                        classify_settle(mechanism.settle(payload, requirements).await)
                    }
                    None => Invoked::Hard(Box::new(SchemeNotFoundError::new(
                        payload.scheme(),
                        payload.network(),
                    )) as SchemeError),
                }
            })
        })
        .await
    }

    /// Settles a V1 payment through the hook pipeline.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Self::verify`].
    pub async fn settle_v1(
        &self,
        payload: &PaymentPayloadV1,
        requirements: &PaymentRequirementsV1,
    ) -> Result<SettleResponse, SchemeError> {
        let context = SettleContext {
            payment_payload: PaymentPayloadEnum::V1(Box::new(payload.clone())),
            requirements: PaymentRequirementsEnum::V1(Box::new(requirements.clone())),
        };
        self.drive_settle(context, || {
            Box::pin(async move {
                match self.find_v1(&payload.scheme, &payload.network) {
                    Some(mechanism) => {
                        classify_settle(mechanism.settle(payload, requirements).await)
                    }
                    None => Invoked::Hard(Box::new(SchemeNotFoundError::new(
                        &payload.scheme,
                        &payload.network,
                    )) as SchemeError),
                }
            })
        })
        .await
    }

    async fn drive_verify(
        &self,
        context: VerifyContext,
        invoke: impl AsyncFnOnce() -> Invoked<VerifyResponse, SchemeError>,
    ) -> Result<VerifyResponse, SchemeError> {
        let delivered = pipeline::drive_async(
            (
                self.before_verify.len(),
                self.after_verify.len(),
                self.on_verify_failure.len(),
            ),
            |i: usize| {
                let context = &context;
                Box::pin(async move { (self.before_verify[i])(context).await })
            },
            invoke,
            |i: usize, response: &VerifyResponse| {
                let context = &context;
                Box::pin(async move {
                    let result_context = VerifyResultContext {
                        payment_payload: context.payment_payload.clone(),
                        requirements: context.requirements.clone(),
                        result: response.clone(),
                    };
                    (self.after_verify[i])(&result_context).await;
                })
            },
            |i: usize, error: &str| {
                let context = &context;
                Box::pin(async move {
                    let failure = VerifyFailureContext {
                        payment_payload: context.payment_payload.clone(),
                        requirements: context.requirements.clone(),
                        error: error.to_owned(),
                    };
                    (self.on_verify_failure[i])(&failure).await.map(|r| r.result)
                })
            },
        )
        .await;

        match delivered {
            Delivered::Value(response) => Ok(response),
            Delivered::Aborted(abort) => Err(Box::new(PaymentAbortedError::new(abort.reason))),
            Delivered::Error(error) => Err(error),
        }
    }

    async fn drive_settle(
        &self,
        context: SettleContext,
        invoke: impl AsyncFnOnce() -> Invoked<SettleResponse, SchemeError>,
    ) -> Result<SettleResponse, SchemeError> {
        let delivered = pipeline::drive_async(
            (
                self.before_settle.len(),
                self.after_settle.len(),
                self.on_settle_failure.len(),
            ),
            |i: usize| {
                let context = &context;
                Box::pin(async move { (self.before_settle[i])(context).await })
            },
            invoke,
            |i: usize, response: &SettleResponse| {
                let context = &context;
                Box::pin(async move {
                    let result_context = SettleResultContext {
                        payment_payload: context.payment_payload.clone(),
                        requirements: context.requirements.clone(),
                        result: response.clone(),
                    };
                    (self.after_settle[i])(&result_context).await;
                })
            },
            |i: usize, error: &str| {
                let context = &context;
                Box::pin(async move {
                    let failure = SettleFailureContext {
                        payment_payload: context.payment_payload.clone(),
                        requirements: context.requirements.clone(),
                        error: error.to_owned(),
                    };
                    (self.on_settle_failure[i])(&failure).await.map(|r| r.result)
                })
            },
        )
        .await;

        match delivered {
            Delivered::Value(response) => Ok(response),
            Delivered::Aborted(abort) => Err(Box::new(PaymentAbortedError::new(abort.reason))),
            Delivered::Error(error) => Err(error),
        }
    }
}

fn classify_verify(response: VerifyResponse) -> Invoked<VerifyResponse, SchemeError> {
    if response.is_valid {
        Invoked::Success(response)
    } else {
        let reason = response.invalid_reason.clone().unwrap_or_default();
        Invoked::Soft(response, reason)
    }
}

fn classify_settle(response: SettleResponse) -> Invoked<SettleResponse, SchemeError> {
    if response.success {
        Invoked::Success(response)
    } else {
        let reason = response.error_reason.clone().unwrap_or_default();
        Invoked::Soft(response, reason)
    }
}

fn collect_signers(
    signers: &mut HashMap<String, Vec<String>>,
    family: &str,
    addresses: Vec<String>,
) {
    let entry = signers.entry(family.to_owned()).or_default();
    for address in addresses {
        if !entry.contains(&address) {
            entry.push(address);
        }
    }
}
