//! Machine-readable failure reason codes.
//!
//! Verification and settlement never raise for business failures — they
//! return responses carrying one of these codes plus an optional
//! free-text message. Codes are stable wire strings; clients branch on
//! them programmatically.

use serde::{Deserialize, Serialize};

/// Reason a payment failed verification or settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ErrorReason {
    /// The payment scheme is not supported by this mechanism.
    UnsupportedScheme,
    /// The payload's network does not match the requirements.
    NetworkMismatch,
    /// No configuration is known for the requested network.
    InvalidNetworkConfig,
    /// The asset could not be resolved on the requested network.
    InvalidAsset,
    /// The EIP-712 domain parameters are absent from `extra`.
    MissingEip712Domain,
    /// The recipient does not match `payTo`.
    RecipientMismatch,
    /// The authorized value is below the required amount.
    InsufficientAmount,
    /// `validBefore` leaves no settlement headroom.
    ValidBeforeExpired,
    /// `validAfter` is still in the future.
    ValidAfterInFuture,
    /// The authorization nonce was already consumed on-chain.
    NonceAlreadyUsed,
    /// The payer's on-chain balance cannot cover the value.
    InsufficientBalance,
    /// The signature did not verify.
    InvalidSignature,
    /// Signature verification itself errored (RPC, malformed wrapper).
    SignatureVerificationFailed,
    /// The smart wallet is undeployed and deployment is disabled.
    UndeployedSmartWallet,
    /// Deploying the smart wallet via its factory failed.
    SmartWalletDeploymentFailed,
    /// The settlement transaction failed on-chain.
    TransactionFailed,
    /// The scheme-specific payload is malformed.
    InvalidPayload,
    /// The serialized transaction could not be decoded.
    TransactionDecodeFailed,
    /// The transaction does not have 3–6 instructions.
    InvalidInstructionCount,
    /// The compute-unit-limit instruction is malformed.
    InvalidComputeLimit,
    /// The compute-unit-price instruction is malformed.
    InvalidComputePrice,
    /// The requested compute-unit price exceeds the facilitator cap.
    ComputePriceTooHigh,
    /// The third instruction is not an SPL `TransferChecked`.
    NoTransferInstruction,
    /// A trailing instruction targets a program outside the allowlist.
    UnknownExtraInstruction,
    /// The transferred mint does not match the required asset.
    MintMismatch,
    /// `extra.feePayer` is absent from the requirements.
    FeePayerMissing,
    /// The requested fee payer is not managed by this facilitator.
    FeePayerNotManaged,
    /// The transfer authority is a facilitator-controlled fee payer.
    FeePayerTransferring,
    /// On-chain simulation of the transaction failed.
    SimulationFailed,
    /// Something failed that no more specific code covers.
    UnexpectedError,
}

impl ErrorReason {
    /// Returns the stable `snake_case` wire string for this reason.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::UnsupportedScheme => "unsupported_scheme",
            Self::NetworkMismatch => "network_mismatch",
            Self::InvalidNetworkConfig => "invalid_network_config",
            Self::InvalidAsset => "invalid_asset",
            Self::MissingEip712Domain => "missing_eip712_domain",
            Self::RecipientMismatch => "recipient_mismatch",
            Self::InsufficientAmount => "insufficient_amount",
            Self::ValidBeforeExpired => "valid_before_expired",
            Self::ValidAfterInFuture => "valid_after_in_future",
            Self::NonceAlreadyUsed => "nonce_already_used",
            Self::InsufficientBalance => "insufficient_balance",
            Self::InvalidSignature => "invalid_signature",
            Self::SignatureVerificationFailed => "signature_verification_failed",
            Self::UndeployedSmartWallet => "undeployed_smart_wallet",
            Self::SmartWalletDeploymentFailed => "smart_wallet_deployment_failed",
            Self::TransactionFailed => "transaction_failed",
            Self::InvalidPayload => "invalid_payload",
            Self::TransactionDecodeFailed => "transaction_decode_failed",
            Self::InvalidInstructionCount => "invalid_instruction_count",
            Self::InvalidComputeLimit => "invalid_compute_limit",
            Self::InvalidComputePrice => "invalid_compute_price",
            Self::ComputePriceTooHigh => "compute_price_too_high",
            Self::NoTransferInstruction => "no_transfer_instruction",
            Self::UnknownExtraInstruction => "unknown_extra_instruction",
            Self::MintMismatch => "mint_mismatch",
            Self::FeePayerMissing => "fee_payer_missing",
            Self::FeePayerNotManaged => "fee_payer_not_managed",
            Self::FeePayerTransferring => "fee_payer_transferring",
            Self::SimulationFailed => "simulation_failed",
            Self::UnexpectedError => "unexpected_error",
        }
    }
}

impl std::fmt::Display for ErrorReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_matches_as_str() {
        for reason in [
            ErrorReason::InsufficientAmount,
            ErrorReason::NonceAlreadyUsed,
            ErrorReason::ValidBeforeExpired,
            ErrorReason::FeePayerTransferring,
            ErrorReason::SimulationFailed,
        ] {
            let json = serde_json::to_string(&reason).unwrap();
            assert_eq!(json, format!("\"{}\"", reason.as_str()));
        }
    }
}
