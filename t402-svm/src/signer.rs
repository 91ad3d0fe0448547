//! Signer boundaries for the SVM exact scheme.
//!
//! [`ClientSvmSigner`] is the payer's keypair; [`SvmChainReader`] gives
//! the client the two chain reads it needs (blockhash, mint info);
//! [`FacilitatorSvmSigner`] bundles the facilitator's fee-payer keys and
//! transaction lifecycle. Transactions cross these boundaries as base64
//! strings — the wire representation — so implementations stay free to
//! batch, proxy, or delegate to remote key services.

use solana_message::Hash;
use solana_pubkey::Pubkey;
use solana_signature::Signature;
use solana_signer::Signer;
use t402::scheme::{BoxFuture, SchemeError};

/// The payer's keypair: a public key plus message signing.
pub trait ClientSvmSigner: Send + Sync {
    /// The signing address.
    fn pubkey(&self) -> Pubkey;

    /// Signs serialized message bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying signer fails.
    fn sign_message(&self, message: &[u8]) -> Result<Signature, SchemeError>;
}

impl ClientSvmSigner for solana_keypair::Keypair {
    fn pubkey(&self) -> Pubkey {
        Signer::pubkey(self)
    }

    fn sign_message(&self, message: &[u8]) -> Result<Signature, SchemeError> {
        self.try_sign_message(message)
            .map_err(|e| -> SchemeError { e.to_string().into() })
    }
}

/// Mint metadata the client needs to build a `TransferChecked`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MintInfo {
    /// The mint's decimals.
    pub decimals: u8,
    /// Owning token program (Token or Token-2022).
    pub token_program: Pubkey,
}

/// Read-only chain access for transaction building.
pub trait SvmChainReader: Send + Sync {
    /// Fetches a recent blockhash.
    fn latest_blockhash<'a>(
        &'a self,
        network: &'a str,
    ) -> BoxFuture<'a, Result<Hash, SchemeError>>;

    /// Fetches a mint's decimals and owning token program.
    fn mint_info<'a>(
        &'a self,
        mint: &'a Pubkey,
        network: &'a str,
    ) -> BoxFuture<'a, Result<MintInfo, SchemeError>>;
}

/// The facilitator's fee-payer keys and transaction lifecycle.
pub trait FacilitatorSvmSigner: Send + Sync {
    /// Fee-payer addresses this facilitator controls, base58-encoded.
    fn addresses(&self) -> Vec<String>;

    /// Signs a base64 transaction with the given fee payer and returns
    /// the fully signed transaction, base64-encoded.
    fn sign_transaction<'a>(
        &'a self,
        transaction_b64: &'a str,
        fee_payer: &'a str,
        network: &'a str,
    ) -> BoxFuture<'a, Result<String, SchemeError>>;

    /// Simulates a signed transaction with signature verification
    /// enabled; errors if the simulation fails.
    fn simulate_transaction<'a>(
        &'a self,
        transaction_b64: &'a str,
        network: &'a str,
    ) -> BoxFuture<'a, Result<(), SchemeError>>;

    /// Submits a signed transaction with preflight skipped (it was
    /// already simulated during verification) and returns its signature.
    fn send_transaction<'a>(
        &'a self,
        transaction_b64: &'a str,
        network: &'a str,
    ) -> BoxFuture<'a, Result<String, SchemeError>>;

    /// Polls for confirmation of a submitted transaction until success,
    /// failure, or timeout.
    fn confirm_transaction<'a>(
        &'a self,
        signature: &'a str,
        network: &'a str,
    ) -> BoxFuture<'a, Result<(), SchemeError>>;
}
