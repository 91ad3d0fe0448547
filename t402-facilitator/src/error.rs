//! HTTP error mapping for the facilitator service.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use t402::error::{PaymentAbortedError, SchemeNotFoundError};
use t402::scheme::SchemeError;

/// A request that could not be served.
///
/// Routing failures map to 404, hook aborts to 403, and everything else
/// to 500. Raw error text only ever appears in the designated `message`
/// field of the JSON body.
#[derive(Debug)]
pub struct ServiceError {
    status: StatusCode,
    reason: &'static str,
    message: String,
}

impl ServiceError {
    /// Classifies a scheme-layer error.
    #[must_use]
    pub fn from_scheme(error: SchemeError) -> Self {
        if let Some(not_found) = error.downcast_ref::<SchemeNotFoundError>() {
            return Self {
                status: StatusCode::NOT_FOUND,
                reason: "scheme_not_found",
                message: not_found.to_string(),
            };
        }
        if let Some(aborted) = error.downcast_ref::<PaymentAbortedError>() {
            return Self {
                status: StatusCode::FORBIDDEN,
                reason: "payment_aborted",
                message: aborted.reason.clone(),
            };
        }
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            reason: "unexpected_error",
            message: error.to_string(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({
            "error": self.reason,
            "message": self.message,
        }));
        (self.status, body).into_response()
    }
}
