//! The `"exact"` scheme on Solana.
//!
//! - [`types`] — wire types, program ids, ATA derivation
//! - [`transaction`] — transaction decoding and instruction parsing
//! - [`client`] — V2 and V1 transaction building and signing
//! - [`server`] — price resolution and fee-payer enrichment
//! - [`facilitator`] — validation, simulation, and settlement

pub mod client;
pub mod facilitator;
pub mod server;
pub mod transaction;
pub mod types;

pub use client::{ExactSvmClient, ExactSvmClientV1};
pub use facilitator::ExactSvmFacilitator;
pub use server::ExactSvmServer;
pub use types::{derive_ata, ExactSvmPayload, SupportedKindExtra};
