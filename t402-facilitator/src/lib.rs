//! The x402 facilitator HTTP service.
//!
//! Exposes a registered [`t402::facilitator::X402Facilitator`] over the
//! protocol's REST surface:
//!
//! - `GET /supported` — the capability catalog
//! - `POST /verify` / `POST /settle` — V2 operations
//! - `POST /verify-v1` / `POST /settle-v1` — legacy V1 operations
//!
//! [`local::LocalFacilitatorClient`] adapts an in-process facilitator to
//! the [`t402::server::FacilitatorClient`] trait for single-binary
//! deployments that skip HTTP entirely.

pub mod config;
pub mod error;
pub mod handlers;
pub mod local;
