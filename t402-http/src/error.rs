//! Error type for the HTTP boundary.

use t402::proto::ProtocolError;

/// Errors from header codecs and facilitator HTTP calls.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// A header value was not valid base64.
    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// JSON (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The decoded message violated the protocol.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The HTTP request itself failed.
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),

    /// The facilitator answered with a non-success status.
    #[error("facilitator returned {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body text.
        body: String,
    },
}
