//! EVM settlement for the x402 payment protocol.
//!
//! Implements the `"exact"` scheme on EIP-155 chains via EIP-3009
//! `transferWithAuthorization` meta-transactions: the payer signs an
//! EIP-712 authorization off-chain and the facilitator submits it,
//! paying gas. Signature verification is universal — plain EOA
//! signatures, EIP-1271 contract wallets, and ERC-6492-wrapped
//! signatures from not-yet-deployed smart wallets are all accepted.
//!
//! # Modules
//!
//! - [`networks`] — known EIP-155 networks and their USDC deployments
//! - [`signer`] — the client and facilitator signer boundaries
//! - [`exact`] — the scheme implementation for all three roles

pub mod exact;
pub mod networks;
pub mod signer;
