//! Solana settlement for the x402 payment protocol.
//!
//! Implements the `"exact"` scheme on SVM chains via SPL
//! `TransferChecked` transactions co-signed by the facilitator: the
//! payer builds and signs a transfer whose fee payer is a
//! facilitator-controlled address, the facilitator validates the
//! transaction's fixed instruction shape, signs as fee payer, simulates
//! it with signature verification, and submits it at settlement time.
//!
//! # Modules
//!
//! - [`networks`] — known Solana networks and their USDC mints
//! - [`signer`] — client and facilitator signer boundaries
//! - [`exact`] — the scheme implementation for all three roles

pub mod exact;
pub mod networks;
pub mod signer;
