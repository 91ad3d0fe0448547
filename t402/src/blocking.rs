//! Synchronous shells over the role cores.
//!
//! Each role's lifecycle logic lives in the pure pipeline machine; this
//! module drives it without an async runtime. The blocking types accept
//! only synchronous hooks and backends — the trait signatures have no
//! futures in them — so mixing an async component into a blocking role
//! is a compile error rather than a runtime type check.

use std::collections::{HashMap, HashSet};

use serde_json::Value;

use crate::config::ResourceConfig;
use crate::error::{
    InitializationError, NoMatchingRequirementsError, PaymentAbortedError, SchemeNotFoundError,
};
use crate::hooks::{
    AbortResult, PaymentCreatedContext, PaymentCreationContext, PaymentCreationFailureContext,
    RecoveredPayloadResult, RecoveredSettleResult, RecoveredVerifyResult, SettleContext,
    SettleFailureContext, SettleResultContext, VerifyContext, VerifyFailureContext,
    VerifyResultContext,
};
use crate::money::AssetAmount;
use crate::pipeline::{self, Delivered, Invoked};
use crate::proto::helpers::{
    derive_network_pattern, find_by_network, matches_network_pattern, PaymentPayloadEnum,
    PaymentRequiredEnum, PaymentRequirementsEnum,
};
use crate::proto::{
    Network, PaymentPayload, PaymentPayloadV1, PaymentRequired, PaymentRequiredV1,
    PaymentRequirements, PaymentRequirementsV1, SettleResponse, SupportedKind, SupportedResponse,
    VerifyResponse,
};
use crate::scheme::{SchemeError, SchemeServer};

/// Synchronous client-side mechanism.
pub trait SyncSchemeClient: Send + Sync {
    /// Payment scheme identifier.
    fn scheme(&self) -> &str;

    /// Produces the signed inner payload for the selected requirement.
    ///
    /// # Errors
    ///
    /// Returns an error if signing fails.
    fn create_payment_payload(
        &self,
        requirements: &PaymentRequirements,
    ) -> Result<Value, SchemeError>;
}

/// Synchronous legacy client-side mechanism.
pub trait SyncSchemeClientV1: Send + Sync {
    /// Payment scheme identifier.
    fn scheme(&self) -> &str;

    /// Produces the signed inner payload for the selected V1 requirement.
    ///
    /// # Errors
    ///
    /// Returns an error if signing fails.
    fn create_payment_payload(
        &self,
        requirements: &PaymentRequirementsV1,
    ) -> Result<Value, SchemeError>;
}

/// Synchronous facilitator-side mechanism.
pub trait SyncSchemeFacilitator: Send + Sync {
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

    /// Verifies a payment payload against requirements.
    fn verify(&self, payload: &PaymentPayload, requirements: &PaymentRequirements)
        -> VerifyResponse;

    /// Settles a verified payment on-chain.
    fn settle(&self, payload: &PaymentPayload, requirements: &PaymentRequirements)
        -> SettleResponse;
}

/// Synchronous facilitator client for blocking resource servers.
pub trait SyncFacilitatorClient: Send + Sync {
    /// Verifies a payment.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure.
    fn verify(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> Result<VerifyResponse, SchemeError>;

    /// Settles a payment.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure.
    fn settle(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> Result<SettleResponse, SchemeError>;

    /// Fetches the facilitator's capability catalog.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure.
    fn get_supported(&self) -> Result<SupportedResponse, SchemeError>;
}

/// Sync hook aliases.
pub type SyncBeforePaymentCreationHook =
    Box<dyn Fn(&PaymentCreationContext) -> Option<AbortResult> + Send + Sync>;
/// Sync after-payment-creation hook.
pub type SyncAfterPaymentCreationHook = Box<dyn Fn(&PaymentCreatedContext) + Send + Sync>;
/// Sync payment-creation failure hook.
pub type SyncOnPaymentCreationFailureHook =
    Box<dyn Fn(&PaymentCreationFailureContext) -> Option<RecoveredPayloadResult> + Send + Sync>;
/// Sync before-verify hook.
pub type SyncBeforeVerifyHook = Box<dyn Fn(&VerifyContext) -> Option<AbortResult> + Send + Sync>;
/// Sync after-verify hook.
pub type SyncAfterVerifyHook = Box<dyn Fn(&VerifyResultContext) + Send + Sync>;
/// Sync verify failure hook.
pub type SyncOnVerifyFailureHook =
    Box<dyn Fn(&VerifyFailureContext) -> Option<RecoveredVerifyResult> + Send + Sync>;
/// Sync before-settle hook.
pub type SyncBeforeSettleHook = Box<dyn Fn(&SettleContext) -> Option<AbortResult> + Send + Sync>;
/// Sync after-settle hook.
pub type SyncAfterSettleHook = Box<dyn Fn(&SettleResultContext) + Send + Sync>;
/// Sync settle failure hook.
pub type SyncOnSettleFailureHook =
    Box<dyn Fn(&SettleFailureContext) -> Option<RecoveredSettleResult> + Send + Sync>;

/// Blocking x402 client.
pub struct BlockingX402Client {
    schemes: HashMap<Network, HashMap<String, Box<dyn SyncSchemeClient>>>,
    schemes_v1: HashMap<Network, HashMap<String, Box<dyn SyncSchemeClientV1>>>,
    policies: Vec<crate::client::PaymentPolicy>,
    selector: crate::client::PaymentRequirementsSelector,
    before_hooks: Vec<SyncBeforePaymentCreationHook>,
    after_hooks: Vec<SyncAfterPaymentCreationHook>,
    failure_hooks: Vec<SyncOnPaymentCreationFailureHook>,
}

impl std::fmt::Debug for BlockingX402Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockingX402Client")
            .field("networks", &self.schemes.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Default for BlockingX402Client {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockingX402Client {
    /// Creates a blocking client with the default first-of-list selector.
    #[must_use]
    pub fn new() -> Self {
        Self {
            schemes: HashMap::new(),
            schemes_v1: HashMap::new(),
            policies: Vec::new(),
            selector: Box::new(|_version, _candidates| 0),
            before_hooks: Vec::new(),
            after_hooks: Vec::new(),
            failure_hooks: Vec::new(),
        }
    }

    /// Registers a V2 sync scheme client.
    pub fn register(&mut self, network: Network, client: Box<dyn SyncSchemeClient>) -> &mut Self {
        let scheme = client.scheme().to_owned();
        self.schemes.entry(network).or_default().insert(scheme, client);
        self
    }

    /// Registers a V1 sync scheme client.
    pub fn register_v1(
        &mut self,
        network: Network,
        client: Box<dyn SyncSchemeClientV1>,
    ) -> &mut Self {
        let scheme = client.scheme().to_owned();
        self.schemes_v1
            .entry(network)
            .or_default()
            .insert(scheme, client);
        self
    }

    /// Appends a requirement policy.
    pub fn register_policy(&mut self, policy: crate::client::PaymentPolicy) -> &mut Self {
        self.policies.push(policy);
        self
    }

    /// Registers a before-payment-creation hook.
    pub fn on_before_payment_creation(&mut self, hook: SyncBeforePaymentCreationHook) -> &mut Self {
        self.before_hooks.push(hook);
        self
    }

    /// Registers an after-payment-creation hook.
    pub fn on_after_payment_creation(&mut self, hook: SyncAfterPaymentCreationHook) -> &mut Self {
        self.after_hooks.push(hook);
        self
    }

    /// Registers a payment-creation failure hook.
    pub fn on_payment_creation_failure(
        &mut self,
        hook: SyncOnPaymentCreationFailureHook,
    ) -> &mut Self {
        self.failure_hooks.push(hook);
        self
    }

    /// Creates a V2 payment payload for a 402 challenge.
    ///
    /// # Errors
    ///
    /// Same failure modes as the async client.
    pub fn create_payment_payload(
        &self,
        payment_required: &PaymentRequired,
    ) -> Result<PaymentPayload, SchemeError> {
        let selected = self.select_requirements(&payment_required.accepts)?;

        let context = PaymentCreationContext {
            payment_required: PaymentRequiredEnum::V2(Box::new(payment_required.clone())),
            selected_requirements: PaymentRequirementsEnum::V2(Box::new(selected.clone())),
        };

        let delivered = pipeline::drive_blocking(
            (
                self.before_hooks.len(),
                self.after_hooks.len(),
                self.failure_hooks.len(),
            ),
            |i| (self.before_hooks[i])(&context),
            || match self.do_create(payment_required, &selected) {
                Ok(payload) => Invoked::Success(payload),
                Err(error) => Invoked::Hard(error),
            },
            |i, payload: &PaymentPayload| {
                let created = PaymentCreatedContext {
                    payment_required: context.payment_required.clone(),
                    selected_requirements: context.selected_requirements.clone(),
                    payment_payload: PaymentPayloadEnum::V2(Box::new(payload.clone())),
                };
                (self.after_hooks[i])(&created);
            },
            |i, error: &str| {
                let failure = PaymentCreationFailureContext {
                    payment_required: context.payment_required.clone(),
                    selected_requirements: context.selected_requirements.clone(),
                    error: error.to_owned(),
                };
                match (self.failure_hooks[i])(&failure) {
                    Some(RecoveredPayloadResult {
                        payload: PaymentPayloadEnum::V2(payload),
                    }) => Some(*payload),
                    Some(_) | None => None,
                }
            },
        );

        match delivered {
            Delivered::Value(payload) => Ok(payload),
            Delivered::Aborted(abort) => Err(Box::new(PaymentAbortedError::new(abort.reason))),
            Delivered::Error(error) => Err(error),
        }
    }

    /// Creates a V1 payment payload for a legacy 402 challenge.
    ///
    /// # Errors
    ///
    /// Same failure modes as the async client.
    pub fn create_payment_payload_v1(
        &self,
        payment_required: &PaymentRequiredV1,
    ) -> Result<PaymentPayloadV1, SchemeError> {
        let selected = self.select_requirements_v1(&payment_required.accepts)?;

        let context = PaymentCreationContext {
            payment_required: PaymentRequiredEnum::V1(Box::new(payment_required.clone())),
            selected_requirements: PaymentRequirementsEnum::V1(Box::new(selected.clone())),
        };

        let delivered = pipeline::drive_blocking(
            (
                self.before_hooks.len(),
                self.after_hooks.len(),
                self.failure_hooks.len(),
            ),
            |i| (self.before_hooks[i])(&context),
            || {
                let result = find_by_network(&self.schemes_v1, &selected.network)
                    .and_then(|schemes| schemes.get(&selected.scheme))
                    .ok_or_else(|| {
                        Box::new(SchemeNotFoundError::new(&selected.scheme, &selected.network))
                            as SchemeError
                    })
                    .and_then(|client| client.create_payment_payload(&selected));
                match result {
                    Ok(inner) => Invoked::Success(PaymentPayloadV1 {
                        x402_version: 1,
                        scheme: selected.scheme.clone(),
                        network: selected.network.clone(),
                        payload: inner,
                    }),
                    Err(error) => Invoked::Hard(error),
                }
            },
            |i, payload: &PaymentPayloadV1| {
                let created = PaymentCreatedContext {
                    payment_required: context.payment_required.clone(),
                    selected_requirements: context.selected_requirements.clone(),
                    payment_payload: PaymentPayloadEnum::V1(Box::new(payload.clone())),
                };
                (self.after_hooks[i])(&created);
            },
            |i, error: &str| {
                let failure = PaymentCreationFailureContext {
                    payment_required: context.payment_required.clone(),
                    selected_requirements: context.selected_requirements.clone(),
                    error: error.to_owned(),
                };
                match (self.failure_hooks[i])(&failure) {
                    Some(RecoveredPayloadResult {
                        payload: PaymentPayloadEnum::V1(payload),
                    }) => Some(*payload),
                    Some(_) | None => None,
                }
            },
        );

        match delivered {
            Delivered::Value(payload) => Ok(payload),
            Delivered::Aborted(abort) => Err(Box::new(PaymentAbortedError::new(abort.reason))),
            Delivered::Error(error) => Err(error),
        }
    }

    fn select_requirements(
        &self,
        requirements: &[PaymentRequirements],
    ) -> Result<PaymentRequirements, NoMatchingRequirementsError> {
        let candidates: Vec<PaymentRequirementsEnum> = requirements
            .iter()
            .filter(|req| {
                find_by_network(&self.schemes, &req.network)
                    .is_some_and(|schemes| schemes.contains_key(&req.scheme))
            })
            .cloned()
            .map(|r| PaymentRequirementsEnum::V2(Box::new(r)))
            .collect();

        match apply_policies(&self.policies, &self.selector, 2, candidates)? {
            PaymentRequirementsEnum::V2(selected) => Ok(*selected),
            PaymentRequirementsEnum::V1(_) => Err(NoMatchingRequirementsError::new(
                "policy returned a V1 requirement for a V2 challenge",
            )),
        }
    }

    fn select_requirements_v1(
        &self,
        requirements: &[PaymentRequirementsV1],
    ) -> Result<PaymentRequirementsV1, NoMatchingRequirementsError> {
        let candidates: Vec<PaymentRequirementsEnum> = requirements
            .iter()
            .filter(|req| {
                find_by_network(&self.schemes_v1, &req.network)
                    .is_some_and(|schemes| schemes.contains_key(&req.scheme))
            })
            .cloned()
            .map(|r| PaymentRequirementsEnum::V1(Box::new(r)))
            .collect();

        match apply_policies(&self.policies, &self.selector, 1, candidates)? {
            PaymentRequirementsEnum::V1(selected) => Ok(*selected),
            PaymentRequirementsEnum::V2(_) => Err(NoMatchingRequirementsError::new(
                "policy returned a V2 requirement for a V1 challenge",
            )),
        }
    }

    fn do_create(
        &self,
        payment_required: &PaymentRequired,
        selected: &PaymentRequirements,
    ) -> Result<PaymentPayload, SchemeError> {
        let client = find_by_network(&self.schemes, &selected.network)
            .and_then(|schemes| schemes.get(&selected.scheme))
            .ok_or_else(|| SchemeNotFoundError::new(&selected.scheme, &selected.network))?;

        let inner = client.create_payment_payload(selected)?;

        Ok(PaymentPayload {
            x402_version: 2,
            payload: inner,
            accepted: selected.clone(),
            resource: payment_required.resource.clone(),
            extensions: payment_required.extensions.clone(),
        })
    }
}

fn apply_policies(
    policies: &[crate::client::PaymentPolicy],
    selector: &crate::client::PaymentRequirementsSelector,
    version: u32,
    candidates: Vec<PaymentRequirementsEnum>,
) -> Result<PaymentRequirementsEnum, NoMatchingRequirementsError> {
    if candidates.is_empty() {
        return Err(NoMatchingRequirementsError::new(
            "no payment requirements match registered schemes",
        ));
    }

    let mut filtered = candidates;
    for policy in policies {
        filtered = policy(version, filtered);
        if filtered.is_empty() {
            return Err(NoMatchingRequirementsError::new(
                "all requirements filtered out by policies",
            ));
        }
    }

    let index = selector(version, &filtered);
    filtered
        .into_iter()
        .nth(index)
        .ok_or_else(|| NoMatchingRequirementsError::new("selector returned an invalid index"))
}

struct SyncRegistration {
    mechanism: Box<dyn SyncSchemeFacilitator>,
    networks: HashSet<Network>,
    pattern: Network,
}

/// Blocking x402 facilitator.
pub struct BlockingX402Facilitator {
    schemes: Vec<SyncRegistration>,
    extensions: Vec<String>,
    before_verify: Vec<SyncBeforeVerifyHook>,
    after_verify: Vec<SyncAfterVerifyHook>,
    on_verify_failure: Vec<SyncOnVerifyFailureHook>,
    before_settle: Vec<SyncBeforeSettleHook>,
    after_settle: Vec<SyncAfterSettleHook>,
    on_settle_failure: Vec<SyncOnSettleFailureHook>,
}

impl std::fmt::Debug for BlockingX402Facilitator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockingX402Facilitator")
            .field("schemes", &self.schemes.len())
            .finish_non_exhaustive()
    }
}

impl Default for BlockingX402Facilitator {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockingX402Facilitator {
    /// Creates an empty blocking facilitator.
    #[must_use]
    pub fn new() -> Self {
        Self {
            schemes: Vec::new(),
            extensions: Vec::new(),
            before_verify: Vec::new(),
            after_verify: Vec::new(),
            on_verify_failure: Vec::new(),
            before_settle: Vec::new(),
            after_settle: Vec::new(),
            on_settle_failure: Vec::new(),
        }
    }

    /// Registers a sync mechanism for one or more networks.
    pub fn register(
        &mut self,
        networks: Vec<Network>,
        mechanism: Box<dyn SyncSchemeFacilitator>,
    ) -> &mut Self {
        let pattern = derive_network_pattern(&networks);
        self.schemes.push(SyncRegistration {
            mechanism,
            networks: networks.into_iter().collect(),
            pattern,
        });
        self
    }

    /// Registers an extension name.
    pub fn register_extension(&mut self, extension: String) -> &mut Self {
        if !self.extensions.contains(&extension) {
            self.extensions.push(extension);
        }
        self
    }

    /// Registers a before-verify hook.
    pub fn on_before_verify(&mut self, hook: SyncBeforeVerifyHook) -> &mut Self {
        self.before_verify.push(hook);
        self
    }

    /// Registers an after-verify hook.
    pub fn on_after_verify(&mut self, hook: SyncAfterVerifyHook) -> &mut Self {
        self.after_verify.push(hook);
        self
    }

    /// Registers a verify failure hook.
    pub fn on_verify_failure(&mut self, hook: SyncOnVerifyFailureHook) -> &mut Self {
        self.on_verify_failure.push(hook);
        self
    }

    /// Registers a before-settle hook.
    pub fn on_before_settle(&mut self, hook: SyncBeforeSettleHook) -> &mut Self {
        self.before_settle.push(hook);
        self
    }

    /// Registers an after-settle hook.
    pub fn on_after_settle(&mut self, hook: SyncAfterSettleHook) -> &mut Self {
        self.after_settle.push(hook);
        self
    }

    /// Registers a settle failure hook.
    pub fn on_settle_failure(&mut self, hook: SyncOnSettleFailureHook) -> &mut Self {
        self.on_settle_failure.push(hook);
        self
    }

    /// Builds the capability catalog from all registrations.
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
                let entry = signers.entry(mechanism.caip_family().to_owned()).or_default();
                for address in mechanism.get_signers(network) {
                    if !entry.contains(&address) {
                        entry.push(address);
                    }
                }
            }
        }

        SupportedResponse::new(kinds, self.extensions.clone(), signers)
    }

    /// Verifies a payment through the hook pipeline.
    ///
    /// # Errors
    ///
    /// Same failure modes as the async facilitator.
    pub fn verify(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> Result<VerifyResponse, SchemeError> {
        let context = VerifyContext {
            payment_payload: PaymentPayloadEnum::V2(Box::new(payload.clone())),
            requirements: PaymentRequirementsEnum::V2(Box::new(requirements.clone())),
        };

        let delivered = pipeline::drive_blocking(
            (
                self.before_verify.len(),
                self.after_verify.len(),
                self.on_verify_failure.len(),
            ),
            |i| (self.before_verify[i])(&context),
            || match self.find(payload.scheme(), payload.network()) {
                Some(mechanism) => {
                    let response = mechanism.verify(payload, requirements);
                    if response.is_valid {
                        Invoked::Success(response)
                    } else {
                        let reason = response.invalid_reason.clone().unwrap_or_default();
                        Invoked::Soft(response, reason)
                    }
                }
                None => Invoked::Hard(Box::new(SchemeNotFoundError::new(
                    payload.scheme(),
                    payload.network(),
                )) as SchemeError),
            },
            |i, response: &VerifyResponse| {
                let result_context = VerifyResultContext {
                    payment_payload: context.payment_payload.clone(),
                    requirements: context.requirements.clone(),
                    result: response.clone(),
                };
                (self.after_verify[i])(&result_context);
            },
            |i, error: &str| {
                let failure = VerifyFailureContext {
                    payment_payload: context.payment_payload.clone(),
                    requirements: context.requirements.clone(),
                    error: error.to_owned(),
                };
                (self.on_verify_failure[i])(&failure).map(|r| r.result)
            },
        );

        match delivered {
            Delivered::Value(response) => Ok(response),
            Delivered::Aborted(abort) => Err(Box::new(PaymentAbortedError::new(abort.reason))),
            Delivered::Error(error) => Err(error),
        }
    }

    /// Settles a payment through the hook pipeline.
    ///
    /// # Errors
    ///
    /// Same failure modes as the async facilitator.
    pub fn settle(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> Result<SettleResponse, SchemeError> {
        let context = SettleContext {
            payment_payload: PaymentPayloadEnum::V2(Box::new(payload.clone())),
            requirements: PaymentRequirementsEnum::V2(Box::new(requirements.clone())),
        };

        let delivered = pipeline::drive_blocking(
            (
                self.before_settle.len(),
                self.after_settle.len(),
                self.on_settle_failure.len(),
            ),
            |i| (self.before_settle[i])(&context),
            || match self.find(payload.scheme(), payload.network()) {
                Some(mechanism) => {
                    let response = mechanism.settle(payload, requirements);
                    if response.success {
                        Invoked::Success(response)
                    } else {
                        let reason = response.error_reason.clone().unwrap_or_default();
                        Invoked::Soft(response, reason)
                    }
                }
                None => Invoked::Hard(Box::new(SchemeNotFoundError::new(
                    payload.scheme(),
                    payload.network(),
                )) as SchemeError),
            },
            |i, response: &SettleResponse| {
                let result_context = SettleResultContext {
                    payment_payload: context.payment_payload.clone(),
                    requirements: context.requirements.clone(),
                    result: response.clone(),
                };
                (self.after_settle[i])(&result_context);
            },
            |i, error: &str| {
                let failure = SettleFailureContext {
                    payment_payload: context.payment_payload.clone(),
                    requirements: context.requirements.clone(),
                    error: error.to_owned(),
                };
                (self.on_settle_failure[i])(&failure).map(|r| r.result)
            },
        );

        match delivered {
            Delivered::Value(response) => Ok(response),
            Delivered::Aborted(abort) => Err(Box::new(PaymentAbortedError::new(abort.reason))),
            Delivered::Error(error) => Err(error),
        }
    }

    fn find(&self, scheme: &str, network: &str) -> Option<&dyn SyncSchemeFacilitator> {
        self.schemes
            .iter()
            .find(|r| {
                r.mechanism.scheme() == scheme
                    && (r.networks.contains(network)
                        || matches_network_pattern(network, &r.pattern))
            })
            .map(|r| &*r.mechanism)
    }
}

/// Blocking resource server.
///
/// Mirrors [`crate::server::X402ResourceServer`] over synchronous
/// facilitator clients and hooks.
pub struct BlockingX402ResourceServer {
    facilitator_clients: Vec<Box<dyn SyncFacilitatorClient>>,
    schemes: HashMap<Network, HashMap<String, Box<dyn SchemeServer>>>,
    facilitator_routes: HashMap<Network, HashMap<String, usize>>,
    supported: HashMap<Network, HashMap<String, SupportedResponse>>,
    before_verify: Vec<SyncBeforeVerifyHook>,
    after_verify: Vec<SyncAfterVerifyHook>,
    on_verify_failure: Vec<SyncOnVerifyFailureHook>,
    before_settle: Vec<SyncBeforeSettleHook>,
    after_settle: Vec<SyncAfterSettleHook>,
    on_settle_failure: Vec<SyncOnSettleFailureHook>,
    initialized: bool,
}

impl std::fmt::Debug for BlockingX402ResourceServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockingX402ResourceServer")
            .field("facilitator_clients", &self.facilitator_clients.len())
            .field("initialized", &self.initialized)
            .finish_non_exhaustive()
    }
}

impl Default for BlockingX402ResourceServer {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockingX402ResourceServer {
    /// Creates a server with no facilitator clients.
    #[must_use]
    pub fn new() -> Self {
        Self {
            facilitator_clients: Vec::new(),
            schemes: HashMap::new(),
            facilitator_routes: HashMap::new(),
            supported: HashMap::new(),
            before_verify: Vec::new(),
            after_verify: Vec::new(),
            on_verify_failure: Vec::new(),
            before_settle: Vec::new(),
            after_settle: Vec::new(),
            on_settle_failure: Vec::new(),
            initialized: false,
        }
    }

    /// Creates a server with a single facilitator client.
    #[must_use]
    pub fn with_facilitator(client: Box<dyn SyncFacilitatorClient>) -> Self {
        let mut server = Self::new();
        server.facilitator_clients.push(client);
        server
    }

    /// Registers a scheme server for a network or wildcard pattern.
    pub fn register(&mut self, network: Network, server: Box<dyn SchemeServer>) -> &mut Self {
        let scheme = server.scheme().to_owned();
        self.schemes.entry(network).or_default().insert(scheme, server);
        self
    }

    /// Registers a before-verify hook.
    pub fn on_before_verify(&mut self, hook: SyncBeforeVerifyHook) -> &mut Self {
        self.before_verify.push(hook);
        self
    }

    /// Registers an after-verify hook.
    pub fn on_after_verify(&mut self, hook: SyncAfterVerifyHook) -> &mut Self {
        self.after_verify.push(hook);
        self
    }

    /// Registers a verify failure hook.
    pub fn on_verify_failure(&mut self, hook: SyncOnVerifyFailureHook) -> &mut Self {
        self.on_verify_failure.push(hook);
        self
    }

    /// Registers a before-settle hook.
    pub fn on_before_settle(&mut self, hook: SyncBeforeSettleHook) -> &mut Self {
        self.before_settle.push(hook);
        self
    }

    /// Registers an after-settle hook.
    pub fn on_after_settle(&mut self, hook: SyncAfterSettleHook) -> &mut Self {
        self.after_settle.push(hook);
        self
    }

    /// Registers a settle failure hook.
    pub fn on_settle_failure(&mut self, hook: SyncOnSettleFailureHook) -> &mut Self {
        self.on_settle_failure.push(hook);
        self
    }

    /// Fetches capability catalogs and validates configured routes.
    ///
    /// # Errors
    ///
    /// Same failure modes as the async server's `initialize`.
    pub fn initialize(&mut self) -> Result<(), SchemeError> {
        for (index, client) in self.facilitator_clients.iter().enumerate() {
            let supported = client.get_supported()?;
            for kind in &supported.kinds {
                self.facilitator_routes
                    .entry(kind.network.clone())
                    .or_default()
                    .entry(kind.scheme.clone())
                    .or_insert(index);
                self.supported
                    .entry(kind.network.clone())
                    .or_default()
                    .entry(kind.scheme.clone())
                    .or_insert_with(|| supported.clone());
            }
        }

        let mut missing = Vec::new();
        for (network, schemes) in &self.schemes {
            for scheme in schemes.keys() {
                let supported = self
                    .facilitator_routes
                    .get(network)
                    .is_some_and(|s| s.contains_key(scheme))
                    || self.facilitator_routes.iter().any(|(remote, s)| {
                        s.contains_key(scheme)
                            && (matches_network_pattern(remote, network)
                                || matches_network_pattern(network, remote))
                    });
                if !supported {
                    missing.push(format!(
                        "no facilitator supports scheme '{scheme}' on network '{network}'"
                    ));
                }
            }
        }
        if !missing.is_empty() {
            missing.sort();
            return Err(Box::new(InitializationError::new(missing)));
        }

        self.initialized = true;
        Ok(())
    }

    /// Builds the payment requirements for a protected resource.
    ///
    /// # Errors
    ///
    /// Same failure modes as the async server.
    pub fn build_payment_requirements(
        &self,
        config: &ResourceConfig,
    ) -> Result<Vec<PaymentRequirements>, SchemeError> {
        if !self.initialized {
            return Err("resource server not initialized; call initialize() first".into());
        }

        let server = find_by_network(&self.schemes, &config.network)
            .and_then(|schemes| schemes.get(&config.scheme))
            .ok_or_else(|| SchemeNotFoundError::new(&config.scheme, &config.network))?;

        let supported_kind = self
            .supported
            .get(&config.network)
            .and_then(|schemes| schemes.get(&config.scheme))
            .and_then(|supported| {
                supported
                    .kinds
                    .iter()
                    .find(|k| k.x402_version == 2 && k.scheme == config.scheme)
            })
            .ok_or_else(|| SchemeNotFoundError::new(&config.scheme, &config.network))?;

        let AssetAmount {
            amount,
            asset,
            extra,
        } = server.parse_price(&config.price, &config.network)?;

        let base = PaymentRequirements {
            scheme: config.scheme.clone(),
            network: config.network.clone(),
            asset,
            amount,
            pay_to: config.pay_to.clone(),
            max_timeout_seconds: config.max_timeout_seconds.unwrap_or(300),
            extra: extra.unwrap_or_else(|| Value::Object(serde_json::Map::new())),
        };

        Ok(vec![server.enhance_payment_requirements(base, supported_kind, &[])])
    }

    /// Verifies a payment via the routed sync facilitator client.
    ///
    /// # Errors
    ///
    /// Same failure modes as the async server.
    pub fn verify_payment(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> Result<VerifyResponse, SchemeError> {
        if !self.initialized {
            return Err("resource server not initialized; call initialize() first".into());
        }

        let context = VerifyContext {
            payment_payload: PaymentPayloadEnum::V2(Box::new(payload.clone())),
            requirements: PaymentRequirementsEnum::V2(Box::new(requirements.clone())),
        };

        let delivered = pipeline::drive_blocking(
            (
                self.before_verify.len(),
                self.after_verify.len(),
                self.on_verify_failure.len(),
            ),
            |i| (self.before_verify[i])(&context),
            || {
                let client = match self.route(payload.scheme(), payload.network()) {
                    Ok(client) => client,
                    Err(error) => return Invoked::Hard(error),
                };
                match client.verify(payload, requirements) {
                    Ok(response) if response.is_valid => Invoked::Success(response),
                    Ok(response) => {
                        let reason = response.invalid_reason.clone().unwrap_or_default();
                        Invoked::Soft(response, reason)
                    }
                    Err(error) => Invoked::Hard(error),
                }
            },
            |i, response: &VerifyResponse| {
                let result_context = VerifyResultContext {
                    payment_payload: context.payment_payload.clone(),
                    requirements: context.requirements.clone(),
                    result: response.clone(),
                };
                (self.after_verify[i])(&result_context);
            },
            |i, error: &str| {
                let failure = VerifyFailureContext {
                    payment_payload: context.payment_payload.clone(),
                    requirements: context.requirements.clone(),
                    error: error.to_owned(),
                };
                (self.on_verify_failure[i])(&failure).map(|r| r.result)
            },
        );

        match delivered {
            Delivered::Value(response) => Ok(response),
            Delivered::Aborted(abort) => Err(Box::new(PaymentAbortedError::new(abort.reason))),
            Delivered::Error(error) => Err(error),
        }
    }

    /// Settles a payment via the routed sync facilitator client.
    ///
    /// # Errors
    ///
    /// Same failure modes as the async server.
    pub fn settle_payment(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> Result<SettleResponse, SchemeError> {
        if !self.initialized {
            return Err("resource server not initialized; call initialize() first".into());
        }

        let context = SettleContext {
            payment_payload: PaymentPayloadEnum::V2(Box::new(payload.clone())),
            requirements: PaymentRequirementsEnum::V2(Box::new(requirements.clone())),
        };

        let delivered = pipeline::drive_blocking(
            (
                self.before_settle.len(),
                self.after_settle.len(),
                self.on_settle_failure.len(),
            ),
            |i| (self.before_settle[i])(&context),
            || {
                let client = match self.route(payload.scheme(), payload.network()) {
                    Ok(client) => client,
                    Err(error) => return Invoked::Hard(error),
                };
                match client.settle(payload, requirements) {
                    Ok(response) if response.success => Invoked::Success(response),
                    Ok(response) => {
                        let reason = response.error_reason.clone().unwrap_or_default();
                        Invoked::Soft(response, reason)
                    }
                    Err(error) => Invoked::Hard(error),
                }
            },
            |i, response: &SettleResponse| {
                let result_context = SettleResultContext {
                    payment_payload: context.payment_payload.clone(),
                    requirements: context.requirements.clone(),
                    result: response.clone(),
                };
                (self.after_settle[i])(&result_context);
            },
            |i, error: &str| {
                let failure = SettleFailureContext {
                    payment_payload: context.payment_payload.clone(),
                    requirements: context.requirements.clone(),
                    error: error.to_owned(),
                };
                (self.on_settle_failure[i])(&failure).map(|r| r.result)
            },
        );

        match delivered {
            Delivered::Value(response) => Ok(response),
            Delivered::Aborted(abort) => Err(Box::new(PaymentAbortedError::new(abort.reason))),
            Delivered::Error(error) => Err(error),
        }
    }

    fn route(&self, scheme: &str, network: &str) -> Result<&dyn SyncFacilitatorClient, SchemeError> {
        let index = self
            .facilitator_routes
            .get(network)
            .and_then(|schemes| schemes.get(scheme))
            .or_else(|| {
                self.facilitator_routes.iter().find_map(|(remote, schemes)| {
                    if matches_network_pattern(network, remote) {
                        schemes.get(scheme)
                    } else {
                        None
                    }
                })
            })
            .copied()
            .ok_or_else(|| SchemeNotFoundError::new(scheme, network))?;

        self.facilitator_clients
            .get(index)
            .map(AsRef::as_ref)
            .ok_or_else(|| Box::new(SchemeNotFoundError::new(scheme, network)) as SchemeError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::ErrorReason;

    struct StubSyncMechanism;

    impl SyncSchemeFacilitator for StubSyncMechanism {
        fn scheme(&self) -> &str {
            "exact"
        }

        fn caip_family(&self) -> &str {
            "eip155:*"
        }

        fn get_signers(&self, _network: &str) -> Vec<String> {
            vec!["0xSigner".into()]
        }

        fn verify(
            &self,
            _payload: &PaymentPayload,
            _requirements: &PaymentRequirements,
        ) -> VerifyResponse {
            VerifyResponse::invalid(ErrorReason::InsufficientBalance, Some("0xPayer".into()))
        }

        fn settle(
            &self,
            payload: &PaymentPayload,
            _requirements: &PaymentRequirements,
        ) -> SettleResponse {
            SettleResponse::success("0xtx", payload.network().to_owned(), "0xPayer")
        }
    }

    fn payload() -> (PaymentPayload, PaymentRequirements) {
        let requirements = PaymentRequirements {
            scheme: "exact".into(),
            network: "eip155:8453".into(),
            asset: "0xAsset".into(),
            amount: "1000000".into(),
            pay_to: "0xRecipient".into(),
            max_timeout_seconds: 300,
            extra: serde_json::json!({}),
        };
        let payload = PaymentPayload {
            x402_version: 2,
            payload: serde_json::json!({}),
            accepted: requirements.clone(),
            resource: None,
            extensions: None,
        };
        (payload, requirements)
    }

    #[test]
    fn test_blocking_facilitator_verify_without_runtime() {
        let mut facilitator = BlockingX402Facilitator::new();
        facilitator.register(vec!["eip155:8453".into()], Box::new(StubSyncMechanism));

        let (payload, requirements) = payload();
        let response = facilitator.verify(&payload, &requirements).unwrap();
        assert!(!response.is_valid);
        assert_eq!(
            response.invalid_reason.as_deref(),
            Some("insufficient_balance")
        );
    }

    #[test]
    fn test_blocking_facilitator_sync_hooks() {
        let mut facilitator = BlockingX402Facilitator::new();
        facilitator.register(vec!["eip155:8453".into()], Box::new(StubSyncMechanism));
        facilitator.on_verify_failure(Box::new(|_ctx| {
            Some(RecoveredVerifyResult {
                result: VerifyResponse::valid("0xRecovered"),
            })
        }));

        let (payload, requirements) = payload();
        let response = facilitator.verify(&payload, &requirements).unwrap();
        assert!(response.is_valid);
    }
}
