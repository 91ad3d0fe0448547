//! Wire types and program constants for the SVM exact scheme.

use serde::{Deserialize, Serialize};
use solana_pubkey::{pubkey, Pubkey};

/// The scheme-specific inner payload: one serialized transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExactSvmPayload {
    /// Base64-encoded serialized versioned transaction.
    pub transaction: String,
}

/// `extra` payload of an SVM supported kind: the fee payer the
/// facilitator selected for clients to build against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportedKindExtra {
    /// Fee-payer address, base58-encoded.
    pub fee_payer: String,
}

/// Associated Token Account program.
pub const ATA_PROGRAM_ID: Pubkey = pubkey!("ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL");

/// SPL Memo program.
pub const MEMO_PROGRAM_ID: Pubkey = pubkey!("MemoSq4gqABAXKb96qnH8TysNcWxMyWCqXgDLGmfcHr");

/// Lighthouse assertion program, injected by the Phantom wallet on
/// mainnet transactions.
pub const LIGHTHOUSE_PROGRAM_ID: Pubkey = pubkey!("L2TExMFKdjpN9kozasaurPirfHy9P8sbXoAN1qA3S95");

/// Cap on the requested compute-unit price, in micro-lamports.
pub const MAX_COMPUTE_UNIT_PRICE: u64 = 5_000_000;

/// Compute-unit limit clients request for a transfer.
pub const DEFAULT_COMPUTE_UNIT_LIMIT: u32 = 20_000;

/// Compute-unit price clients request, in micro-lamports.
pub const DEFAULT_COMPUTE_UNIT_PRICE: u64 = 1;

/// `SetComputeUnitLimit` leading discriminator byte.
pub const COMPUTE_LIMIT_DISCRIMINATOR: u8 = 2;

/// `SetComputeUnitPrice` leading discriminator byte.
pub const COMPUTE_PRICE_DISCRIMINATOR: u8 = 3;

/// SPL `TransferChecked` leading discriminator byte.
pub const TRANSFER_CHECKED_DISCRIMINATOR: u8 = 12;

/// Derives the associated token account for `(owner, mint)` under the
/// given token program.
#[must_use]
pub fn derive_ata(owner: &Pubkey, mint: &Pubkey, token_program: &Pubkey) -> Pubkey {
    let (ata, _) = Pubkey::find_program_address(
        &[owner.as_ref(), token_program.as_ref(), mint.as_ref()],
        &ATA_PROGRAM_ID,
    );
    ata
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_ata_is_deterministic() {
        let owner = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let first = derive_ata(&owner, &mint, &spl_token::ID);
        let second = derive_ata(&owner, &mint, &spl_token::ID);
        assert_eq!(first, second);
        // A different token program derives a different account.
        assert_ne!(first, derive_ata(&owner, &mint, &spl_token_2022::ID));
    }

    #[test]
    fn test_payload_wire_format() {
        let payload = ExactSvmPayload {
            transaction: "AQID".into(),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["transaction"], "AQID");

        let extra = SupportedKindExtra {
            fee_payer: "FeePayer111".into(),
        };
        let json = serde_json::to_value(&extra).unwrap();
        assert_eq!(json["feePayer"], "FeePayer111");
    }
}
