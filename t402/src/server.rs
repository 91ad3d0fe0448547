//! The resource-server role: requirement building and verify/settle
//! delegation.
//!
//! [`X402ResourceServer`] owns the server side of the 402 handshake. It
//! builds requirement sets from declared prices (resolving loose money
//! through the scheme's parser chain), and delegates verification and
//! settlement to one of its facilitator clients, routed by the payload's
//! scheme and network. [`X402ResourceServer::initialize`] fetches every
//! facilitator's capability catalog up front and fails fast — with one
//! error per missing combination — when a registered route has no remote
//! support.

use std::collections::HashMap;

use serde_json::Value;

use crate::config::ResourceConfig;
use crate::error::{InitializationError, PaymentAbortedError, SchemeNotFoundError};
use crate::hooks::{
    AfterSettleHook, AfterVerifyHook, BeforeSettleHook, BeforeVerifyHook, OnSettleFailureHook,
    OnVerifyFailureHook, SettleContext, SettleFailureContext, SettleResultContext, VerifyContext,
    VerifyFailureContext, VerifyResultContext,
};
use crate::money::AssetAmount;
use crate::pipeline::{self, Delivered, Invoked};
use crate::proto::helpers::{
    find_by_network, matches_network_pattern, PaymentPayloadEnum, PaymentRequirementsEnum,
};
use crate::proto::{
    Network, PaymentPayload, PaymentRequired, PaymentRequirements, ResourceInfo, SettleResponse,
    SupportedKind, SupportedResponse, VerifyResponse,
};
use crate::scheme::{BoxFuture, SchemeError, SchemeServer};

/// Async client for a (usually remote) facilitator.
///
/// The primary implementation speaks HTTP; an in-process adapter over
/// [`crate::facilitator::X402Facilitator`] works for single-binary
/// deployments.
pub trait FacilitatorClient: Send + Sync {
    /// Verifies a payment.
    fn verify<'a>(
        &'a self,
        payload: &'a PaymentPayload,
        requirements: &'a PaymentRequirements,
    ) -> BoxFuture<'a, Result<VerifyResponse, SchemeError>>;

    /// Settles a payment.
    fn settle<'a>(
        &'a self,
        payload: &'a PaymentPayload,
        requirements: &'a PaymentRequirements,
    ) -> BoxFuture<'a, Result<SettleResponse, SchemeError>>;

    /// Fetches the facilitator's capability catalog.
    fn get_supported(&self) -> BoxFuture<'_, Result<SupportedResponse, SchemeError>>;
}

/// Transport-level enrichment seam for extension declarations.
///
/// Extensions (e.g., discovery catalogs) may need request context that
/// only the HTTP layer has; implementations receive the declaration from
/// the route config plus an opaque transport context and return the
/// enriched declaration.
pub trait ResourceServerExtension: Send + Sync {
    /// Unique extension key (e.g., `"bazaar"`).
    fn key(&self) -> &str;

    /// Enriches one extension declaration.
    fn enrich_declaration(&self, declaration: Value, transport_context: &Value) -> Value;
}

/// The resource-server role core.
pub struct X402ResourceServer {
    facilitator_clients: Vec<Box<dyn FacilitatorClient>>,
    schemes: HashMap<Network, HashMap<String, Box<dyn SchemeServer>>>,
    facilitator_routes: HashMap<Network, HashMap<String, usize>>,
    supported: HashMap<Network, HashMap<String, SupportedResponse>>,
    extensions: HashMap<String, Box<dyn ResourceServerExtension>>,
    before_verify: Vec<BeforeVerifyHook>,
    after_verify: Vec<AfterVerifyHook>,
    on_verify_failure: Vec<OnVerifyFailureHook>,
    before_settle: Vec<BeforeSettleHook>,
    after_settle: Vec<AfterSettleHook>,
    on_settle_failure: Vec<OnSettleFailureHook>,
    initialized: bool,
}

impl std::fmt::Debug for X402ResourceServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("X402ResourceServer")
            .field("facilitator_clients", &self.facilitator_clients.len())
            .field("networks", &self.schemes.keys().collect::<Vec<_>>())
            .field("initialized", &self.initialized)
            .finish_non_exhaustive()
    }
}

impl Default for X402ResourceServer {
    fn default() -> Self {
        Self::new()
    }
}

impl X402ResourceServer {
    /// Creates a server with no facilitator clients.
    #[must_use]
    pub fn new() -> Self {
        Self {
            facilitator_clients: Vec::new(),
            schemes: HashMap::new(),
            facilitator_routes: HashMap::new(),
            supported: HashMap::new(),
            extensions: HashMap::new(),
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
    pub fn with_facilitator(client: Box<dyn FacilitatorClient>) -> Self {
        let mut server = Self::new();
        server.facilitator_clients.push(client);
        server
    }

    /// Adds a facilitator client.
    pub fn add_facilitator(&mut self, client: Box<dyn FacilitatorClient>) -> &mut Self {
        self.facilitator_clients.push(client);
        self
    }

    /// Registers a scheme server for a network or wildcard pattern.
    pub fn register(&mut self, network: Network, server: Box<dyn SchemeServer>) -> &mut Self {
        let scheme = server.scheme().to_owned();
        self.schemes.entry(network).or_default().insert(scheme, server);
        self
    }

    /// Registers a transport-level extension.
    pub fn register_extension(&mut self, extension: Box<dyn ResourceServerExtension>) -> &mut Self {
        self.extensions.insert(extension.key().to_owned(), extension);
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

    /// Fetches every facilitator's capability catalog and validates the
    /// configured routes.
    ///
    /// Must be called before building requirements or verifying. Each
    /// `(network, scheme)` supported remotely is routed to the first
    /// facilitator that advertises it. Every locally registered scheme
    /// must find remote support; the gaps are collected and reported
    /// together.
    ///
    /// # Errors
    ///
    /// Returns the facilitator client's error if a catalog fetch fails,
    /// or [`InitializationError`] listing every unsupported route.
    pub async fn initialize(&mut self) -> Result<(), SchemeError> {
        for (index, client) in self.facilitator_clients.iter().enumerate() {
            let supported = client.get_supported().await?;
            tracing::debug!(
                facilitator = index,
                kinds = supported.kinds.len(),
                "fetched facilitator capability catalog"
            );

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
                if !self.has_remote_support(network, scheme) {
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
        tracing::info!(
            routes = self.facilitator_routes.len(),
            "resource server initialized"
        );
        Ok(())
    }

    /// Returns whether [`Self::initialize`] has completed.
    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Checks whether a scheme is registered for a network, considering
    /// wildcard registrations.
    #[must_use]
    pub fn has_registered_scheme(&self, network: &str, scheme: &str) -> bool {
        find_by_network(&self.schemes, network).is_some_and(|schemes| schemes.contains_key(scheme))
    }

    /// Builds the payment requirements for a protected resource.
    ///
    /// Resolves the declared price through the scheme server, then lets
    /// the scheme fill its defaults (asset address, EIP-712 domain, fee
    /// payer) from the facilitator's supported kind.
    ///
    /// # Errors
    ///
    /// Returns an error when the server is not initialized, no scheme
    /// server or supported kind matches, or price parsing fails.
    pub fn build_payment_requirements(
        &self,
        config: &ResourceConfig,
    ) -> Result<Vec<PaymentRequirements>, SchemeError> {
        if !self.initialized {
            return Err("resource server not initialized; call initialize() first".into());
        }

        let schemes = find_by_network(&self.schemes, &config.network)
            .ok_or_else(|| SchemeNotFoundError::new(&config.scheme, &config.network))?;
        let server = schemes
            .get(&config.scheme)
            .ok_or_else(|| SchemeNotFoundError::new(&config.scheme, &config.network))?;

        let supported_kind = self
            .find_supported_kind(2, &config.network, &config.scheme)
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

        let extension_keys: Vec<String> = self.extensions.keys().cloned().collect();
        let enhanced = server.enhance_payment_requirements(base, supported_kind, &extension_keys);

        Ok(vec![enhanced])
    }

    /// Assembles a 402 challenge from built requirements.
    #[must_use]
    pub const fn create_payment_required(
        &self,
        requirements: Vec<PaymentRequirements>,
        resource: Option<ResourceInfo>,
        error: Option<String>,
        extensions: Option<Value>,
    ) -> PaymentRequired {
        PaymentRequired {
            x402_version: 2,
            error,
            resource,
            accepts: requirements,
            extensions,
        }
    }

    /// Enriches extension declarations through the registered
    /// [`ResourceServerExtension`]s.
    #[must_use]
    pub fn enrich_extensions(&self, declarations: &Value, transport_context: &Value) -> Value {
        let Some(object) = declarations.as_object() else {
            return declarations.clone();
        };

        let mut result = object.clone();
        for (key, declaration) in object {
            if let Some(extension) = self.extensions.get(key) {
                result.insert(
                    key.clone(),
                    extension.enrich_declaration(declaration.clone(), transport_context),
                );
            }
        }
        Value::Object(result)
    }

    /// Finds the offered requirement a payload structurally fulfills.
    #[must_use]
    pub fn find_matching_requirements<'a>(
        &self,
        available: &'a [PaymentRequirements],
        payload: &PaymentPayload,
    ) -> Option<&'a PaymentRequirements> {
        available.iter().find(|req| {
            payload.accepted.scheme == req.scheme
                && payload.accepted.network == req.network
                && payload.accepted.amount == req.amount
                && payload.accepted.asset == req.asset
                && payload.accepted.pay_to == req.pay_to
        })
    }

    /// Verifies a payment via the routed facilitator client, inside the
    /// hook pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error when the server is not initialized, no
    /// facilitator is routed, a before-hook aborts, or the facilitator
    /// call fails unrecovered.
    pub async fn verify_payment(
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

        let delivered = pipeline::drive_async(
            (
                self.before_verify.len(),
                self.after_verify.len(),
                self.on_verify_failure.len(),
            ),
            async |i| (self.before_verify[i])(&context).await,
            async || {
                let client = match self.route(payload.scheme(), payload.network()) {
                    Ok(client) => client,
                    Err(error) => return Invoked::Hard(error),
                };
                match client.verify(payload, requirements).await {
                    Ok(response) if response.is_valid => Invoked::Success(response),
                    Ok(response) => {
                        let reason = response.invalid_reason.clone().unwrap_or_default();
                        Invoked::Soft(response, reason)
                    }
                    Err(error) => Invoked::Hard(error),
                }
            },
            async |i, response: &VerifyResponse| {
                let result_context = VerifyResultContext {
                    payment_payload: context.payment_payload.clone(),
                    requirements: context.requirements.clone(),
                    result: response.clone(),
                };
                (self.after_verify[i])(&result_context).await;
            },
            async |i, error: &str| {
                let failure = VerifyFailureContext {
                    payment_payload: context.payment_payload.clone(),
                    requirements: context.requirements.clone(),
                    error: error.to_owned(),
                };
                (self.on_verify_failure[i])(&failure).await.map(|r| r.result)
            },
        )
        .await;

        match delivered {
            Delivered::Value(response) => Ok(response),
            Delivered::Aborted(abort) => Err(Box::new(PaymentAbortedError::new(abort.reason))),
            Delivered::Error(error) => Err(error),
        }
    }

    /// Settles a payment via the routed facilitator client, inside the
    /// hook pipeline.
    ///
    /// Call exactly once, after a successful verify and after serving
    /// the protected resource — settlement is not idempotent.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Self::verify_payment`].
    pub async fn settle_payment(
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

        let delivered = pipeline::drive_async(
            (
                self.before_settle.len(),
                self.after_settle.len(),
                self.on_settle_failure.len(),
            ),
            async |i| (self.before_settle[i])(&context).await,
            async || {
                let client = match self.route(payload.scheme(), payload.network()) {
                    Ok(client) => client,
                    Err(error) => return Invoked::Hard(error),
                };
                match client.settle(payload, requirements).await {
                    Ok(response) if response.success => Invoked::Success(response),
                    Ok(response) => {
                        let reason = response.error_reason.clone().unwrap_or_default();
                        Invoked::Soft(response, reason)
                    }
                    Err(error) => Invoked::Hard(error),
                }
            },
            async |i, response: &SettleResponse| {
                let result_context = SettleResultContext {
                    payment_payload: context.payment_payload.clone(),
                    requirements: context.requirements.clone(),
                    result: response.clone(),
                };
                (self.after_settle[i])(&result_context).await;
            },
            async |i, error: &str| {
                let failure = SettleFailureContext {
                    payment_payload: context.payment_payload.clone(),
                    requirements: context.requirements.clone(),
                    error: error.to_owned(),
                };
                (self.on_settle_failure[i])(&failure).await.map(|r| r.result)
            },
        )
        .await;

        match delivered {
            Delivered::Value(response) => Ok(response),
            Delivered::Aborted(abort) => Err(Box::new(PaymentAbortedError::new(abort.reason))),
            Delivered::Error(error) => Err(error),
        }
    }

    fn has_remote_support(&self, network: &str, scheme: &str) -> bool {
        if self
            .facilitator_routes
            .get(network)
            .is_some_and(|schemes| schemes.contains_key(scheme))
        {
            return true;
        }
        // A locally registered wildcard is satisfied by any remote
        // network under the same namespace, and vice versa.
        self.facilitator_routes.iter().any(|(remote, schemes)| {
            schemes.contains_key(scheme)
                && (matches_network_pattern(remote, network)
                    || matches_network_pattern(network, remote))
        })
    }

    fn find_supported_kind(
        &self,
        version: u32,
        network: &str,
        scheme: &str,
    ) -> Option<&SupportedKind> {
        // Exact stored network first, then a wildcard-stored catalog.
        let stored = self
            .supported
            .get(network)
            .or_else(|| {
                let namespace = network.split(':').next().unwrap_or("");
                self.supported.get(&format!("{namespace}:*"))
            })
            .and_then(|schemes| schemes.get(scheme));

        if let Some(supported) = stored {
            let kind = supported.kinds.iter().find(|k| {
                k.x402_version == version
                    && k.scheme == scheme
                    && (k.network == network || matches_network_pattern(network, &k.network))
            });
            if kind.is_some() {
                return kind;
            }
        }

        // Fall back to scanning every stored catalog for a wildcard kind.
        self.supported.values().find_map(|schemes| {
            schemes.get(scheme).and_then(|supported| {
                supported.kinds.iter().find(|k| {
                    k.x402_version == version
                        && k.scheme == scheme
                        && k.network.ends_with(":*")
                        && matches_network_pattern(network, &k.network)
                })
            })
        })
    }

    fn route(&self, scheme: &str, network: &str) -> Result<&dyn FacilitatorClient, SchemeError> {
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
            .ok_or_else(|| {
                Box::new(SchemeNotFoundError::new(scheme, network)) as SchemeError
            })
    }
}
