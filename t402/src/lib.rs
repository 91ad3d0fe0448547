//! Core of the x402 payment protocol: roles, wire types, and routing.
//!
//! The x402 protocol implements pay-per-request over HTTP 402. A resource
//! server answers an unpaid request with a set of payment requirements; a
//! client picks one, produces a signed payment payload, and retries; a
//! facilitator — the trust anchor — verifies the payload and settles it
//! on-chain after the resource has been served.
//!
//! This crate is chain-agnostic. Concrete settlement mechanisms live in
//! `t402-evm` (EIP-3009 meta-transactions) and `t402-svm` (SPL token
//! transfers) and plug in through the traits in [`scheme`].
//!
//! # Modules
//!
//! - [`proto`] — V1/V2 wire format types, responses, version helpers
//! - [`chain`] — CAIP-2 chain identifiers
//! - [`networks`] — V1 network-name ↔ chain-id registry
//! - [`money`] — human-readable price parsing
//! - [`scheme`] — per-role scheme traits and the `"exact"` scheme marker
//! - [`pipeline`] — the pure hook-pipeline state machine
//! - [`hooks`] — lifecycle hook contexts and results
//! - [`client`] — [`client::X402Client`], requirement selection and payload creation
//! - [`server`] — [`server::X402ResourceServer`], requirement building and delegation
//! - [`facilitator`] — [`facilitator::X402Facilitator`], verify/settle routing
//! - [`blocking`] — synchronous shells over the same role cores

pub mod blocking;
pub mod chain;
pub mod client;
pub mod config;
pub mod encoding;
pub mod error;
pub mod facilitator;
pub mod hooks;
pub mod money;
pub mod networks;
pub mod pipeline;
pub mod proto;
pub mod scheme;
pub mod server;
pub mod timestamp;

pub use proto::{
    PaymentPayload, PaymentPayloadV1, PaymentRequired, PaymentRequiredV1, PaymentRequirements,
    PaymentRequirementsV1, SettleResponse, SupportedKind, SupportedResponse, VerifyResponse,
};
