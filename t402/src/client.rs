//! The client role: requirement selection and payload creation.
//!
//! Given a 402 challenge, [`X402Client`] filters the offered
//! requirements down to those a registered scheme client can fulfill,
//! runs the survivors through the ordered policy list, lets the selector
//! pick exactly one, and asks the matching scheme client for a signed
//! inner payload, wrapped into the version-appropriate envelope. The
//! whole operation runs inside the hook pipeline.

use std::collections::HashMap;

use crate::error::{NoMatchingRequirementsError, PaymentAbortedError, SchemeNotFoundError};
use crate::hooks::{
    AbortResult, PaymentCreatedContext, PaymentCreationContext, PaymentCreationFailureContext,
    RecoveredPayloadResult,
};
use crate::pipeline::{self, Delivered, Invoked};
use crate::proto::helpers::{
    find_by_network, PaymentPayloadEnum, PaymentRequiredEnum, PaymentRequirementsEnum,
};
use crate::proto::{
    Network, PaymentPayload, PaymentPayloadV1, PaymentRequired, PaymentRequiredV1,
    PaymentRequirements, PaymentRequirementsV1,
};
use crate::scheme::{BoxFuture, SchemeClient, SchemeClientV1, SchemeError};

/// Pure transform over the candidate requirement list.
///
/// Receives the protocol version and the current candidates; returns the
/// filtered or reordered list. An empty return fails selection.
pub type PaymentPolicy =
    Box<dyn Fn(u32, Vec<PaymentRequirementsEnum>) -> Vec<PaymentRequirementsEnum> + Send + Sync>;

/// Picks the index of the final requirement from the filtered list.
pub type PaymentRequirementsSelector =
    Box<dyn Fn(u32, &[PaymentRequirementsEnum]) -> usize + Send + Sync>;

/// Hook run before payload creation; `Some` aborts.
pub type BeforePaymentCreationHook =
    Box<dyn Fn(&PaymentCreationContext) -> BoxFuture<'_, Option<AbortResult>> + Send + Sync>;

/// Hook run after successful payload creation.
pub type AfterPaymentCreationHook =
    Box<dyn Fn(&PaymentCreatedContext) -> BoxFuture<'_, ()> + Send + Sync>;

/// Hook run when payload creation fails; `Some` recovers.
pub type OnPaymentCreationFailureHook = Box<
    dyn Fn(&PaymentCreationFailureContext) -> BoxFuture<'_, Option<RecoveredPayloadResult>>
        + Send
        + Sync,
>;

/// Policy that moves requirements on the given network to the front.
#[must_use]
pub fn prefer_network(network: Network) -> PaymentPolicy {
    Box::new(move |_version, candidates| {
        let (preferred, others): (Vec<_>, Vec<_>) = candidates
            .into_iter()
            .partition(|r| r.network() == network);
        preferred.into_iter().chain(others).collect()
    })
}

/// Policy that moves requirements with the given scheme to the front.
#[must_use]
pub fn prefer_scheme(scheme: String) -> PaymentPolicy {
    Box::new(move |_version, candidates| {
        let (preferred, others): (Vec<_>, Vec<_>) =
            candidates.into_iter().partition(|r| r.scheme() == scheme);
        preferred.into_iter().chain(others).collect()
    })
}

/// Policy that drops requirements above the given atomic amount.
#[must_use]
pub fn max_amount(limit: u128) -> PaymentPolicy {
    Box::new(move |_version, candidates| {
        candidates
            .into_iter()
            .filter(|r| r.amount().parse::<u128>().is_ok_and(|amount| amount <= limit))
            .collect()
    })
}

/// Default selector: the first requirement of the filtered list.
const fn first_of_list(_version: u32, _candidates: &[PaymentRequirementsEnum]) -> usize {
    0
}

/// Async x402 client with scheme registration, policies, and hooks.
pub struct X402Client {
    schemes: HashMap<Network, HashMap<String, Box<dyn SchemeClient>>>,
    schemes_v1: HashMap<Network, HashMap<String, Box<dyn SchemeClientV1>>>,
    policies: Vec<PaymentPolicy>,
    selector: PaymentRequirementsSelector,
    before_hooks: Vec<BeforePaymentCreationHook>,
    after_hooks: Vec<AfterPaymentCreationHook>,
    failure_hooks: Vec<OnPaymentCreationFailureHook>,
}

impl std::fmt::Debug for X402Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("X402Client")
            .field("networks", &self.schemes.keys().collect::<Vec<_>>())
            .field("networks_v1", &self.schemes_v1.keys().collect::<Vec<_>>())
            .field("policies", &self.policies.len())
            .finish_non_exhaustive()
    }
}

impl Default for X402Client {
    fn default() -> Self {
        Self::new()
    }
}

impl X402Client {
    /// Creates a client with the default first-of-list selector.
    #[must_use]
    pub fn new() -> Self {
        Self {
            schemes: HashMap::new(),
            schemes_v1: HashMap::new(),
            policies: Vec::new(),
            selector: Box::new(first_of_list),
            before_hooks: Vec::new(),
            after_hooks: Vec::new(),
            failure_hooks: Vec::new(),
        }
    }

    /// Creates a client with a custom selector.
    #[must_use]
    pub fn with_selector(selector: PaymentRequirementsSelector) -> Self {
        Self {
            selector,
            ..Self::new()
        }
    }

    /// Registers a V2 scheme client for a network or wildcard pattern.
    pub fn register(&mut self, network: Network, client: Box<dyn SchemeClient>) -> &mut Self {
        let scheme = client.scheme().to_owned();
        self.schemes.entry(network).or_default().insert(scheme, client);
        self
    }

    /// Registers a V1 scheme client for a network or wildcard pattern.
    pub fn register_v1(&mut self, network: Network, client: Box<dyn SchemeClientV1>) -> &mut Self {
        let scheme = client.scheme().to_owned();
        self.schemes_v1
            .entry(network)
            .or_default()
            .insert(scheme, client);
        self
    }

    /// Appends a requirement policy; policies run in registration order.
    pub fn register_policy(&mut self, policy: PaymentPolicy) -> &mut Self {
        self.policies.push(policy);
        self
    }

    /// Registers a before-payment-creation hook.
    pub fn on_before_payment_creation(&mut self, hook: BeforePaymentCreationHook) -> &mut Self {
        self.before_hooks.push(hook);
        self
    }

    /// Registers an after-payment-creation hook.
    pub fn on_after_payment_creation(&mut self, hook: AfterPaymentCreationHook) -> &mut Self {
        self.after_hooks.push(hook);
        self
    }

    /// Registers a payment-creation failure hook.
    pub fn on_payment_creation_failure(&mut self, hook: OnPaymentCreationFailureHook) -> &mut Self {
        self.failure_hooks.push(hook);
        self
    }

    /// Selects one V2 requirement via filtering, policies, and selector.
    ///
    /// # Errors
    ///
    /// Returns [`NoMatchingRequirementsError`] when nothing survives.
    pub fn select_requirements(
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

        match self.apply_policies(2, candidates)? {
            PaymentRequirementsEnum::V2(selected) => Ok(*selected),
            PaymentRequirementsEnum::V1(_) => Err(NoMatchingRequirementsError::new(
                "policy returned a V1 requirement for a V2 challenge",
            )),
        }
    }

    /// Selects one V1 requirement via filtering, policies, and selector.
    ///
    /// # Errors
    ///
    /// Returns [`NoMatchingRequirementsError`] when nothing survives.
    pub fn select_requirements_v1(
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

        match self.apply_policies(1, candidates)? {
            PaymentRequirementsEnum::V1(selected) => Ok(*selected),
            PaymentRequirementsEnum::V2(_) => Err(NoMatchingRequirementsError::new(
                "policy returned a V2 requirement for a V1 challenge",
            )),
        }
    }

    fn apply_policies(
        &self,
        version: u32,
        candidates: Vec<PaymentRequirementsEnum>,
    ) -> Result<PaymentRequirementsEnum, NoMatchingRequirementsError> {
        if candidates.is_empty() {
            return Err(NoMatchingRequirementsError::new(
                "no payment requirements match registered schemes",
            ));
        }

        let mut filtered = candidates;
        for policy in &self.policies {
            filtered = policy(version, filtered);
            if filtered.is_empty() {
                return Err(NoMatchingRequirementsError::new(
                    "all requirements filtered out by policies",
                ));
            }
        }

        let index = (self.selector)(version, &filtered);
        filtered.into_iter().nth(index).ok_or_else(|| {
            NoMatchingRequirementsError::new("selector returned an invalid index")
        })
    }

    /// Creates a V2 payment payload for a 402 challenge.
    ///
    /// # Errors
    ///
    /// Returns [`NoMatchingRequirementsError`] when selection fails,
    /// [`PaymentAbortedError`] when a before-hook aborts, and the scheme
    /// client's error when payload creation fails unrecovered.
    pub async fn create_payment_payload(
        &self,
        payment_required: &PaymentRequired,
    ) -> Result<PaymentPayload, SchemeError> {
        let selected = self.select_requirements(&payment_required.accepts)?;

        let context = PaymentCreationContext {
            payment_required: PaymentRequiredEnum::V2(Box::new(payment_required.clone())),
            selected_requirements: PaymentRequirementsEnum::V2(Box::new(selected.clone())),
        };

        let delivered = pipeline::drive_async(
            (
                self.before_hooks.len(),
                self.after_hooks.len(),
                self.failure_hooks.len(),
            ),
            |i: usize| {
                let context = &context;
                Box::pin(async move { (self.before_hooks[i])(context).await })
            },
            || {
                Box::pin(async move {
                    match self.do_create(payment_required, &selected).await {
                        Ok(payload) => Invoked::Success(payload),
                        Err(error) => Invoked::Hard(error),
                    }
                })
            },
            |i: usize, payload: &PaymentPayload| {
                let context = &context;
                Box::pin(async move {
                    let created = PaymentCreatedContext {
                        payment_required: context.payment_required.clone(),
                        selected_requirements: context.selected_requirements.clone(),
                        payment_payload: PaymentPayloadEnum::V2(Box::new(payload.clone())),
                    };
                    (self.after_hooks[i])(&created).await;
                })
            },
            |i: usize, error: &str| {
                let context = &context;
                Box::pin(async move {
                    let failure = PaymentCreationFailureContext {
                        payment_required: context.payment_required.clone(),
                        selected_requirements: context.selected_requirements.clone(),
                        error: error.to_owned(),
                    };
                    match (self.failure_hooks[i])(&failure).await {
                        Some(RecoveredPayloadResult {
                            payload: PaymentPayloadEnum::V2(payload),
                        }) => Some(*payload),
                        // A V1 recovery cannot answer a V2 challenge.
                        Some(_) | None => None,
                    }
                })
            },
        )
        .await;

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
    /// Same failure modes as [`Self::create_payment_payload`].
    pub async fn create_payment_payload_v1(
        &self,
        payment_required: &PaymentRequiredV1,
    ) -> Result<PaymentPayloadV1, SchemeError> {
        let selected = self.select_requirements_v1(&payment_required.accepts)?;

        let context = PaymentCreationContext {
            payment_required: PaymentRequiredEnum::V1(Box::new(payment_required.clone())),
            selected_requirements: PaymentRequirementsEnum::V1(Box::new(selected.clone())),
        };

        let delivered = pipeline::drive_async(
            (
                self.before_hooks.len(),
                self.after_hooks.len(),
                self.failure_hooks.len(),
            ),
            |i: usize| {
                let context = &context;
                Box::pin(async move { (self.before_hooks[i])(context).await })
            },
            || {
                Box::pin(async move {
                    match self.do_create_v1(&selected).await {
                        Ok(payload) => Invoked::Success(payload),
                        Err(error) => Invoked::Hard(error),
                    }
                })
            },
            |i: usize, payload: &PaymentPayloadV1| {
                let context = &context;
                Box::pin(async move {
                    let created = PaymentCreatedContext {
                        payment_required: context.payment_required.clone(),
                        selected_requirements: context.selected_requirements.clone(),
                        payment_payload: PaymentPayloadEnum::V1(Box::new(payload.clone())),
                    };
                    (self.after_hooks[i])(&created).await;
                })
            },
            |i: usize, error: &str| {
                let context = &context;
                Box::pin(async move {
                    let failure = PaymentCreationFailureContext {
                        payment_required: context.payment_required.clone(),
                        selected_requirements: context.selected_requirements.clone(),
                        error: error.to_owned(),
                    };
                    match (self.failure_hooks[i])(&failure).await {
                        Some(RecoveredPayloadResult {
                            payload: PaymentPayloadEnum::V1(payload),
                        }) => Some(*payload),
                        Some(_) | None => None,
                    }
                })
            },
        )
        .await;

        match delivered {
            Delivered::Value(payload) => Ok(payload),
            Delivered::Aborted(abort) => Err(Box::new(PaymentAbortedError::new(abort.reason))),
            Delivered::Error(error) => Err(error),
        }
    }

    async fn do_create(
        &self,
        payment_required: &PaymentRequired,
        selected: &PaymentRequirements,
    ) -> Result<PaymentPayload, SchemeError> {
        let schemes = find_by_network(&self.schemes, &selected.network)
            .ok_or_else(|| SchemeNotFoundError::new(&selected.scheme, &selected.network))?;
        let client = schemes
            .get(&selected.scheme)
            .ok_or_else(|| SchemeNotFoundError::new(&selected.scheme, &selected.network))?;

        let inner = client.create_payment_payload(selected).await?;

        Ok(PaymentPayload {
            x402_version: 2,
            payload: inner,
            accepted: selected.clone(),
            resource: payment_required.resource.clone(),
            extensions: payment_required.extensions.clone(),
        })
    }

    async fn do_create_v1(
        &self,
        selected: &PaymentRequirementsV1,
    ) -> Result<PaymentPayloadV1, SchemeError> {
        let schemes = find_by_network(&self.schemes_v1, &selected.network)
            .ok_or_else(|| SchemeNotFoundError::new(&selected.scheme, &selected.network))?;
        let client = schemes
            .get(&selected.scheme)
            .ok_or_else(|| SchemeNotFoundError::new(&selected.scheme, &selected.network))?;

        let inner = client.create_payment_payload(selected).await?;

        Ok(PaymentPayloadV1 {
            x402_version: 1,
            scheme: selected.scheme.clone(),
            network: selected.network.clone(),
            payload: inner,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    struct StubClient {
        fail: bool,
    }

    impl SchemeClient for StubClient {
        fn scheme(&self) -> &str {
            "exact"
        }

        fn create_payment_payload<'a>(
            &'a self,
            _requirements: &'a PaymentRequirements,
        ) -> BoxFuture<'a, Result<Value, SchemeError>> {
            Box::pin(async move {
                if self.fail {
                    Err("signer unavailable".into())
                } else {
                    Ok(serde_json::json!({"signature": "0xsigned"}))
                }
            })
        }
    }

    fn requirements_on(network: &str) -> PaymentRequirements {
        PaymentRequirements {
            scheme: "exact".into(),
            network: network.into(),
            asset: "0xAsset".into(),
            amount: "1000000".into(),
            pay_to: "0xRecipient".into(),
            max_timeout_seconds: 300,
            extra: serde_json::json!({}),
        }
    }

    fn challenge(networks: &[&str]) -> PaymentRequired {
        PaymentRequired {
            x402_version: 2,
            error: None,
            resource: None,
            accepts: networks.iter().map(|n| requirements_on(n)).collect(),
            extensions: None,
        }
    }

    #[test]
    fn test_prefer_network_policy_with_default_selector() {
        let mut client = X402Client::new();
        client.register("eip155:*".into(), Box::new(StubClient { fail: false }));
        client.register_policy(prefer_network("eip155:2".into()));

        let selected = client
            .select_requirements(&challenge(&["eip155:1", "eip155:2", "eip155:3"]).accepts)
            .unwrap();
        assert_eq!(selected.network, "eip155:2");
    }

    #[test]
    fn test_no_matching_schemes() {
        let client = X402Client::new();
        let err = client.select_requirements(&challenge(&["eip155:1"]).accepts);
        assert!(err.is_err());
    }

    #[test]
    fn test_policy_filtering_to_empty_fails() {
        let mut client = X402Client::new();
        client.register("eip155:*".into(), Box::new(StubClient { fail: false }));
        client.register_policy(max_amount(10));
        let err = client.select_requirements(&challenge(&["eip155:1"]).accepts);
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn test_create_payment_payload_wraps_inner() {
        let mut client = X402Client::new();
        client.register("eip155:*".into(), Box::new(StubClient { fail: false }));

        let payload = client
            .create_payment_payload(&challenge(&["eip155:8453"]))
            .await
            .unwrap();
        assert_eq!(payload.x402_version, 2);
        assert_eq!(payload.accepted.network, "eip155:8453");
        assert_eq!(payload.payload["signature"], "0xsigned");
    }

    #[tokio::test]
    async fn test_before_hook_abort_is_signaled() {
        let mut client = X402Client::new();
        client.register("eip155:*".into(), Box::new(StubClient { fail: false }));
        client.on_before_payment_creation(Box::new(|_ctx| {
            Box::pin(async { Some(AbortResult::new("budget exhausted")) })
        }));

        let err = client
            .create_payment_payload(&challenge(&["eip155:8453"]))
            .await
            .unwrap_err();
        let aborted = err.downcast_ref::<PaymentAbortedError>().unwrap();
        assert_eq!(aborted.reason, "budget exhausted");
    }

    #[tokio::test]
    async fn test_failure_hook_recovers() {
        let mut client = X402Client::new();
        client.register("eip155:*".into(), Box::new(StubClient { fail: true }));
        client.on_payment_creation_failure(Box::new(|ctx| {
            let selected = match &ctx.selected_requirements {
                PaymentRequirementsEnum::V2(r) => (**r).clone(),
                PaymentRequirementsEnum::V1(_) => unreachable!(),
            };
            Box::pin(async move {
                Some(RecoveredPayloadResult {
                    payload: PaymentPayloadEnum::V2(Box::new(PaymentPayload {
                        x402_version: 2,
                        payload: serde_json::json!({"recovered": true}),
                        accepted: selected,
                        resource: None,
                        extensions: None,
                    })),
                })
            })
        }));

        let payload = client
            .create_payment_payload(&challenge(&["eip155:8453"]))
            .await
            .unwrap();
        assert_eq!(payload.payload["recovered"], true);
    }
}
