//! Base64-JSON codecs for the 402 handshake headers.
//!
//! A server challenges with `PAYMENT-REQUIRED` (V2) or a V1 body; the
//! client retries with `PAYMENT-SIGNATURE` (V2) or `X-PAYMENT` (V1);
//! successful settlement comes back in `PAYMENT-RESPONSE` /
//! `X-PAYMENT-RESPONSE`. Every value is standard base64 over camelCase
//! JSON. Decoders detect the protocol version from the `x402Version`
//! field, so one decoder serves both header generations.

use base64::prelude::*;
use t402::proto::helpers::{
    parse_payment_payload, parse_payment_required, PaymentPayloadEnum, PaymentRequiredEnum,
};
use t402::proto::{
    PaymentPayload, PaymentPayloadV1, PaymentRequired, PaymentRequiredV1, SettleResponse,
};

use crate::error::HttpError;

fn encode_json<T: serde::Serialize>(value: &T) -> Result<String, HttpError> {
    let json = serde_json::to_vec(value)?;
    Ok(BASE64_STANDARD.encode(json))
}

fn decode_json(header_value: &str) -> Result<serde_json::Value, HttpError> {
    let bytes = BASE64_STANDARD.decode(header_value.trim())?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Encodes a V2 challenge for the `PAYMENT-REQUIRED` header.
///
/// # Errors
///
/// Returns [`HttpError::Json`] if serialization fails.
pub fn encode_payment_required(required: &PaymentRequired) -> Result<String, HttpError> {
    encode_json(required)
}

/// Encodes a V1 challenge for the `PAYMENT-REQUIRED` header.
///
/// # Errors
///
/// Returns [`HttpError::Json`] if serialization fails.
pub fn encode_payment_required_v1(required: &PaymentRequiredV1) -> Result<String, HttpError> {
    encode_json(required)
}

/// Decodes a `PAYMENT-REQUIRED` header into a version-tagged challenge.
///
/// # Errors
///
/// Returns [`HttpError`] on base64, JSON, or protocol-version failure.
pub fn decode_payment_required(header_value: &str) -> Result<PaymentRequiredEnum, HttpError> {
    let value = decode_json(header_value)?;
    Ok(parse_payment_required(&value)?)
}

/// Encodes a V2 payload for the `PAYMENT-SIGNATURE` header.
///
/// # Errors
///
/// Returns [`HttpError::Json`] if serialization fails.
pub fn encode_payment_signature(payload: &PaymentPayload) -> Result<String, HttpError> {
    encode_json(payload)
}

/// Encodes a V1 payload for the legacy `X-PAYMENT` header.
///
/// # Errors
///
/// Returns [`HttpError::Json`] if serialization fails.
pub fn encode_x_payment(payload: &PaymentPayloadV1) -> Result<String, HttpError> {
    encode_json(payload)
}

/// Decodes a `PAYMENT-SIGNATURE` or `X-PAYMENT` header into a
/// version-tagged payload.
///
/// # Errors
///
/// Returns [`HttpError`] on base64, JSON, or protocol-version failure.
pub fn decode_payment_payload(header_value: &str) -> Result<PaymentPayloadEnum, HttpError> {
    let value = decode_json(header_value)?;
    Ok(parse_payment_payload(&value)?)
}

/// Encodes a settlement response for `PAYMENT-RESPONSE` /
/// `X-PAYMENT-RESPONSE`.
///
/// # Errors
///
/// Returns [`HttpError::Json`] if serialization fails.
pub fn encode_payment_response(response: &SettleResponse) -> Result<String, HttpError> {
    encode_json(response)
}

/// Decodes a `PAYMENT-RESPONSE` / `X-PAYMENT-RESPONSE` header.
///
/// # Errors
///
/// Returns [`HttpError`] on base64 or JSON failure.
pub fn decode_payment_response(header_value: &str) -> Result<SettleResponse, HttpError> {
    let bytes = BASE64_STANDARD.decode(header_value.trim())?;
    Ok(serde_json::from_slice(&bytes)?)
}
