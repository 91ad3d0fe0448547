//! Signer boundaries for the EVM exact scheme.
//!
//! The scheme never talks to a node or holds keys directly — it works
//! through these traits. [`ClientEvmSigner`] is the payer's wallet;
//! [`FacilitatorEvmSigner`] bundles the facilitator's read and write
//! access to the chain (code, balance, nonce state, EIP-1271 calls,
//! transaction submission).

use alloy_primitives::{Address, Bytes, FixedBytes, Signature, B256, U256};
use alloy_signer_local::PrivateKeySigner;
use t402::scheme::{BoxFuture, SchemeError};
use t402::timestamp::UnixTimestamp;

/// The payer's wallet: an address plus typed-data signing.
pub trait ClientEvmSigner: Send + Sync {
    /// The signing address.
    fn address(&self) -> Address;

    /// Signs a 32-byte EIP-712 digest.
    fn sign_typed_hash<'a>(&'a self, hash: B256)
        -> BoxFuture<'a, Result<Signature, SchemeError>>;
}

impl ClientEvmSigner for PrivateKeySigner {
    fn address(&self) -> Address {
        Self::address(self)
    }

    fn sign_typed_hash<'a>(
        &'a self,
        hash: B256,
    ) -> BoxFuture<'a, Result<Signature, SchemeError>> {
        Box::pin(async move {
            alloy_signer::Signer::sign_hash(self, &hash)
                .await
                .map_err(|e| -> SchemeError { e.to_string().into() })
        })
    }
}

/// A mined transaction's outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvmReceipt {
    /// Transaction hash.
    pub transaction_hash: String,
    /// Whether the on-chain status was success.
    pub success: bool,
}

/// An EIP-3009 authorization ready for on-chain submission.
#[derive(Debug, Clone)]
pub struct TransferAuthorization {
    /// Token contract to call.
    pub token: Address,
    /// Authorizing payer.
    pub from: Address,
    /// Recipient.
    pub to: Address,
    /// Transfer value in token units.
    pub value: U256,
    /// Window start (inclusive).
    pub valid_after: UnixTimestamp,
    /// Window end (exclusive).
    pub valid_before: UnixTimestamp,
    /// Unique 32-byte nonce.
    pub nonce: B256,
}

/// The facilitator's chain access: reads, writes, and its own keys.
///
/// Read failures are surfaced as errors; the verification flow decides
/// which of them are fatal.
pub trait FacilitatorEvmSigner: Send + Sync {
    /// Addresses this facilitator signs with.
    fn addresses(&self) -> Vec<String>;

    /// Fetches the contract bytecode at an address (empty if undeployed).
    fn get_code<'a>(&'a self, address: Address) -> BoxFuture<'a, Result<Bytes, SchemeError>>;

    /// Fetches the payer's token balance.
    fn get_balance<'a>(
        &'a self,
        owner: Address,
        token: Address,
    ) -> BoxFuture<'a, Result<U256, SchemeError>>;

    /// Checks `authorizationState(authorizer, nonce)` on the token.
    fn is_nonce_used<'a>(
        &'a self,
        authorizer: Address,
        nonce: B256,
        token: Address,
    ) -> BoxFuture<'a, Result<bool, SchemeError>>;

    /// Calls EIP-1271 `isValidSignature(bytes32,bytes)` on a wallet
    /// contract and returns the 4-byte result.
    fn eip1271_is_valid_signature<'a>(
        &'a self,
        wallet: Address,
        hash: B256,
        signature: Bytes,
    ) -> BoxFuture<'a, Result<FixedBytes<4>, SchemeError>>;

    /// Sends a raw transaction (used for ERC-6492 factory deployment).
    fn send_transaction<'a>(
        &'a self,
        to: Address,
        calldata: Bytes,
    ) -> BoxFuture<'a, Result<String, SchemeError>>;

    /// Submits `transferWithAuthorization` with the `(v, r, s)` overload.
    fn transfer_with_authorization_vrs<'a>(
        &'a self,
        authorization: TransferAuthorization,
        v: u8,
        r: B256,
        s: B256,
    ) -> BoxFuture<'a, Result<String, SchemeError>>;

    /// Submits `transferWithAuthorization` with the `(bytes)` overload.
    fn transfer_with_authorization_bytes<'a>(
        &'a self,
        authorization: TransferAuthorization,
        signature: Bytes,
    ) -> BoxFuture<'a, Result<String, SchemeError>>;

    /// Waits for a submitted transaction's receipt.
    fn wait_for_receipt<'a>(
        &'a self,
        transaction_hash: &'a str,
    ) -> BoxFuture<'a, Result<EvmReceipt, SchemeError>>;
}
