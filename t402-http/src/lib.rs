//! HTTP boundary for the x402 payment protocol.
//!
//! Two concerns live here:
//!
//! - [`headers`] — the base64-JSON codecs for the 402 handshake headers
//!   (`PAYMENT-REQUIRED`, `PAYMENT-SIGNATURE`, `PAYMENT-RESPONSE`, and
//!   the legacy `X-PAYMENT` pair), with protocol-version detection.
//! - [`facilitator`] — [`facilitator::HttpFacilitatorClient`], the
//!   reqwest-based client for a remote facilitator's REST surface
//!   (`POST /verify`, `POST /settle`, `GET /supported`).

pub mod constants;
pub mod error;
pub mod facilitator;
pub mod headers;
