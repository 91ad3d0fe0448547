//! The `"exact"` scheme on EIP-155 chains.
//!
//! - [`types`] — EIP-3009 wire types and the EIP-712 struct
//! - [`erc6492`] — ERC-6492 signature wrapper parsing
//! - [`verify`] — universal signature verification
//! - [`client`] — V2 and V1 payload signing
//! - [`server`] — price resolution and requirement enrichment
//! - [`facilitator`] — verification and settlement

pub mod client;
pub mod erc6492;
pub mod facilitator;
pub mod server;
pub mod types;
pub mod verify;

pub use client::{ExactEvmClient, ExactEvmClientV1};
pub use facilitator::{ExactEvmConfig, ExactEvmFacilitator};
pub use server::ExactEvmServer;
pub use types::{Eip3009Authorization, Eip3009Payload, Eip712DomainExtra, TokenAmount};
