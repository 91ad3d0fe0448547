//! Axum route handlers for the facilitator REST surface.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use t402::facilitator::X402Facilitator;
use t402::proto::v1::{SettleRequestV1, VerifyRequestV1};
use t402::proto::{SettleRequest, SettleResponse, SupportedResponse, VerifyRequest, VerifyResponse};

use crate::error::ServiceError;

/// Shared service state.
pub type FacilitatorState = Arc<X402Facilitator>;

/// `GET /supported` — the capability catalog.
pub async fn get_supported(State(facilitator): State<FacilitatorState>) -> Json<SupportedResponse> {
    Json(facilitator.get_supported())
}

/// `POST /verify` — verifies a V2 payment.
///
/// # Errors
///
/// Returns 404 when no mechanism is registered for the payload's
/// scheme/network, 403 on a hook abort.
pub async fn post_verify(
    State(facilitator): State<FacilitatorState>,
    Json(body): Json<VerifyRequest>,
) -> Result<Json<VerifyResponse>, ServiceError> {
    facilitator
        .verify(&body.payment_payload, &body.payment_requirements)
        .await
        .map(Json)
        .map_err(ServiceError::from_scheme)
}

/// `POST /settle` — settles a V2 payment.
///
/// # Errors
///
/// Same failure mapping as [`post_verify`].
pub async fn post_settle(
    State(facilitator): State<FacilitatorState>,
    Json(body): Json<SettleRequest>,
) -> Result<Json<SettleResponse>, ServiceError> {
    facilitator
        .settle(&body.payment_payload, &body.payment_requirements)
        .await
        .map(Json)
        .map_err(ServiceError::from_scheme)
}

/// `POST /verify-v1` — verifies a legacy V1 payment.
///
/// # Errors
///
/// Same failure mapping as [`post_verify`].
pub async fn post_verify_v1(
    State(facilitator): State<FacilitatorState>,
    Json(body): Json<VerifyRequestV1>,
) -> Result<Json<VerifyResponse>, ServiceError> {
    facilitator
        .verify_v1(&body.payment_payload, &body.payment_requirements)
        .await
        .map(Json)
        .map_err(ServiceError::from_scheme)
}

/// `POST /settle-v1` — settles a legacy V1 payment.
///
/// # Errors
///
/// Same failure mapping as [`post_verify`].
pub async fn post_settle_v1(
    State(facilitator): State<FacilitatorState>,
    Json(body): Json<SettleRequestV1>,
) -> Result<Json<SettleResponse>, ServiceError> {
    facilitator
        .settle_v1(&body.payment_payload, &body.payment_requirements)
        .await
        .map(Json)
        .map_err(ServiceError::from_scheme)
}

/// `GET /health` — liveness probe.
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Assembles the facilitator router.
pub fn facilitator_router(state: FacilitatorState) -> Router {
    Router::new()
        .route("/supported", get(get_supported))
        .route("/verify", post(post_verify))
        .route("/settle", post(post_settle))
        .route("/verify-v1", post(post_verify_v1))
        .route("/settle-v1", post(post_settle_v1))
        .route("/health", get(health))
        .with_state(state)
}
