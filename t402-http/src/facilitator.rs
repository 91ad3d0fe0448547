//! Reqwest client for a remote facilitator's REST surface.
//!
//! Speaks the protocol's three endpoints: `POST /verify` and
//! `POST /settle` with a `{x402Version, paymentPayload,
//! paymentRequirements}` body, and `GET /supported` for the capability
//! catalog. Implements [`t402::server::FacilitatorClient`] so a
//! resource server can delegate to a hosted facilitator, with optional
//! per-endpoint authentication headers.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::Serialize;
use t402::proto::{
    PaymentPayload, PaymentRequirements, SettleResponse, SupportedResponse, VerifyResponse,
};
use t402::scheme::{BoxFuture, SchemeError};
use t402::server::FacilitatorClient;

use crate::constants::DEFAULT_FACILITATOR_URL;
use crate::error::HttpError;

/// Per-endpoint authentication headers.
#[derive(Debug, Clone, Default)]
pub struct AuthHeaders {
    /// Headers for verify requests.
    pub verify: HeaderMap,
    /// Headers for settle requests.
    pub settle: HeaderMap,
    /// Headers for supported requests.
    pub supported: HeaderMap,
}

/// Supplies authentication headers for facilitator endpoints.
pub trait AuthProvider: Send + Sync {
    /// Returns the headers to attach to each endpoint.
    fn auth_headers(&self) -> AuthHeaders;
}

/// [`AuthProvider`] sending the same static headers everywhere.
#[derive(Debug, Clone)]
pub struct StaticAuthProvider {
    headers: HeaderMap,
}

impl StaticAuthProvider {
    /// Creates a provider from a header map.
    #[must_use]
    pub fn new(headers: HeaderMap) -> Self {
        Self { headers }
    }

    /// Creates a provider sending `Authorization: Bearer <token>`.
    ///
    /// # Panics
    ///
    /// Panics if the token contains invalid header characters.
    #[must_use]
    pub fn bearer(token: &str) -> Self {
        let mut headers = HeaderMap::new();
        let value = HeaderValue::from_str(&format!("Bearer {token}")).expect("valid bearer token");
        headers.insert(reqwest::header::AUTHORIZATION, value);
        Self { headers }
    }
}

impl AuthProvider for StaticAuthProvider {
    fn auth_headers(&self) -> AuthHeaders {
        AuthHeaders {
            verify: self.headers.clone(),
            settle: self.headers.clone(),
            supported: self.headers.clone(),
        }
    }
}

/// Configuration for [`HttpFacilitatorClient`].
pub struct FacilitatorConfig {
    /// Base URL without trailing slash.
    pub url: String,
    /// Request timeout.
    pub timeout: Duration,
    /// Optional authentication provider.
    pub auth_provider: Option<Box<dyn AuthProvider>>,
    /// Optional pre-built reqwest client.
    pub http_client: Option<reqwest::Client>,
}

impl std::fmt::Debug for FacilitatorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FacilitatorConfig")
            .field("url", &self.url)
            .field("timeout", &self.timeout)
            .field("has_auth_provider", &self.auth_provider.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for FacilitatorConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_FACILITATOR_URL.to_owned(),
            timeout: Duration::from_secs(30),
            auth_provider: None,
            http_client: None,
        }
    }
}

impl FacilitatorConfig {
    /// Creates a config pointing at the given facilitator URL.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the authentication provider.
    #[must_use]
    pub fn with_auth(mut self, provider: impl AuthProvider + 'static) -> Self {
        self.auth_provider = Some(Box::new(provider));
        self
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FacilitatorRequestBody<'a> {
    x402_version: u32,
    payment_payload: &'a serde_json::Value,
    payment_requirements: &'a serde_json::Value,
}

/// HTTP client for a remote facilitator.
pub struct HttpFacilitatorClient {
    url: String,
    auth_provider: Option<Box<dyn AuthProvider>>,
    client: reqwest::Client,
}

impl std::fmt::Debug for HttpFacilitatorClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpFacilitatorClient")
            .field("url", &self.url)
            .field("has_auth_provider", &self.auth_provider.is_some())
            .finish_non_exhaustive()
    }
}

impl HttpFacilitatorClient {
    /// Builds the client from its configuration.
    ///
    /// # Panics
    ///
    /// Panics if the underlying reqwest client cannot be constructed.
    #[must_use]
    pub fn new(config: FacilitatorConfig) -> Self {
        let client = config.http_client.unwrap_or_else(|| {
            reqwest::Client::builder()
                .timeout(config.timeout)
                .build()
                .expect("reqwest client")
        });
        Self {
            url: config.url.trim_end_matches('/').to_owned(),
            auth_provider: config.auth_provider,
            client,
        }
    }

    /// Returns the configured base URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    fn headers_for(&self, pick: impl Fn(AuthHeaders) -> HeaderMap) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(provider) = &self.auth_provider {
            headers.extend(pick(provider.auth_headers()));
        }
        headers
    }

    async fn post_payment(
        &self,
        endpoint: &str,
        headers: HeaderMap,
        version: u32,
        payload: &serde_json::Value,
        requirements: &serde_json::Value,
    ) -> Result<serde_json::Value, HttpError> {
        let body = FacilitatorRequestBody {
            x402_version: version,
            payment_payload: payload,
            payment_requirements: requirements,
        };
        let response = self
            .client
            .post(format!("{}/{endpoint}", self.url))
            .headers(headers)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(HttpError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }

    /// Verifies a payment given raw JSON values, detecting the protocol
    /// version from the payload.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError`] on transport, status, or parse failure.
    pub async fn verify_json(
        &self,
        payload: &serde_json::Value,
        requirements: &serde_json::Value,
    ) -> Result<VerifyResponse, HttpError> {
        let version = t402::proto::helpers::detect_version(payload)?;
        let value = self
            .post_payment(
                "verify",
                self.headers_for(|h| h.verify),
                version,
                payload,
                requirements,
            )
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Settles a payment given raw JSON values, detecting the protocol
    /// version from the payload.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError`] on transport, status, or parse failure.
    pub async fn settle_json(
        &self,
        payload: &serde_json::Value,
        requirements: &serde_json::Value,
    ) -> Result<SettleResponse, HttpError> {
        let version = t402::proto::helpers::detect_version(payload)?;
        let value = self
            .post_payment(
                "settle",
                self.headers_for(|h| h.settle),
                version,
                payload,
                requirements,
            )
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Fetches the facilitator's capability catalog.
    ///
    /// # Errors
    ///
    /// Returns [`HttpError`] on transport, status, or parse failure.
    pub async fn supported(&self) -> Result<SupportedResponse, HttpError> {
        let response = self
            .client
            .get(format!("{}/supported", self.url))
            .headers(self.headers_for(|h| h.supported))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(HttpError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }
}

impl FacilitatorClient for HttpFacilitatorClient {
    fn verify<'a>(
        &'a self,
        payload: &'a PaymentPayload,
        requirements: &'a PaymentRequirements,
    ) -> BoxFuture<'a, Result<VerifyResponse, SchemeError>> {
        Box::pin(async move {
            let payload = serde_json::to_value(payload)
                .map_err(|e| -> SchemeError { e.to_string().into() })?;
            let requirements = serde_json::to_value(requirements)
                .map_err(|e| -> SchemeError { e.to_string().into() })?;
            self.verify_json(&payload, &requirements)
                .await
                .map_err(|e| -> SchemeError { Box::new(e) })
        })
    }

    fn settle<'a>(
        &'a self,
        payload: &'a PaymentPayload,
        requirements: &'a PaymentRequirements,
    ) -> BoxFuture<'a, Result<SettleResponse, SchemeError>> {
        Box::pin(async move {
            let payload = serde_json::to_value(payload)
                .map_err(|e| -> SchemeError { e.to_string().into() })?;
            let requirements = serde_json::to_value(requirements)
                .map_err(|e| -> SchemeError { e.to_string().into() })?;
            self.settle_json(&payload, &requirements)
                .await
                .map_err(|e| -> SchemeError { Box::new(e) })
        })
    }

    fn get_supported(&self) -> BoxFuture<'_, Result<SupportedResponse, SchemeError>> {
        Box::pin(async move {
            self.supported()
                .await
                .map_err(|e| -> SchemeError { Box::new(e) })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn payment() -> (PaymentPayload, PaymentRequirements) {
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
            payload: serde_json::json!({"signature": "0xsig"}),
            accepted: requirements.clone(),
            resource: None,
            extensions: None,
        };
        (payload, requirements)
    }

    #[tokio::test]
    async fn test_verify_posts_protocol_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/verify"))
            .and(body_partial_json(serde_json::json!({"x402Version": 2})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "isValid": true,
                "payer": "0xPayer"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = HttpFacilitatorClient::new(FacilitatorConfig::new(server.uri()));
        let (payload, requirements) = payment();
        let response = FacilitatorClient::verify(&client, &payload, &requirements)
            .await
            .unwrap();
        assert!(response.is_valid);
        assert_eq!(response.payer.as_deref(), Some("0xPayer"));
    }

    #[tokio::test]
    async fn test_settle_and_supported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/settle"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "transaction": "0xtx",
                "network": "eip155:8453",
                "payer": "0xPayer"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/supported"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "kinds": [
                    {"x402Version": 2, "scheme": "exact", "network": "eip155:8453"}
                ],
                "signers": {"eip155:*": ["0xFacilitator"]}
            })))
            .mount(&server)
            .await;

        let client = HttpFacilitatorClient::new(FacilitatorConfig::new(server.uri()));
        let (payload, requirements) = payment();

        let settle = FacilitatorClient::settle(&client, &payload, &requirements)
            .await
            .unwrap();
        assert!(settle.success);
        assert_eq!(settle.transaction, "0xtx");

        let supported = FacilitatorClient::get_supported(&client).await.unwrap();
        assert_eq!(supported.kinds.len(), 1);
        assert_eq!(supported.signers["eip155:*"], vec!["0xFacilitator".to_owned()]);
    }

    #[tokio::test]
    async fn test_non_success_status_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/verify"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = HttpFacilitatorClient::new(FacilitatorConfig::new(server.uri()));
        let (payload, requirements) = payment();
        let err = FacilitatorClient::verify(&client, &payload, &requirements)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("500"));
    }
}
