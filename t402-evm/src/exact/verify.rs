//! Universal signature verification.
//!
//! One entry point, [`verify_universal_signature`], accepts every
//! signature shape the scheme supports:
//!
//! 1. Parse the optional ERC-6492 wrapper.
//! 2. Bare 65-byte signature with no factory → verify as EOA directly,
//!    skipping the deployment lookup.
//! 3. Otherwise query the signer's bytecode. Undeployed with deployment
//!    data → accept as pending deployment (settlement deploys).
//!    Undeployed without it → fall back to EOA verification. Deployed →
//!    EIP-1271 `isValidSignature`, expecting the magic return value.

use alloy_primitives::{hex, Address, Bytes, FixedBytes, Signature, B256};
use t402::scheme::SchemeError;

use super::erc6492::{parse_erc6492_signature, Erc6492Signature};
use crate::signer::FacilitatorEvmSigner;

/// EIP-1271 `isValidSignature` success return value.
pub const EIP1271_MAGIC_VALUE: FixedBytes<4> = FixedBytes(hex!("1626ba7e"));

/// Verifies a 65-byte ECDSA signature by public-key recovery.
///
/// Accepts both `v ∈ {27, 28}` and `v ∈ {0, 1}` encodings. Returns
/// `false` for any malformed signature rather than erroring — a bad
/// signature is a business failure, not an infrastructure one.
#[must_use]
pub fn verify_eoa_signature(hash: B256, signature: &[u8], expected: Address) -> bool {
    if signature.len() != 65 {
        return false;
    }
    let Ok(parsed) = Signature::from_raw(signature) else {
        return false;
    };
    parsed
        .normalized_s()
        .recover_address_from_prehash(&hash)
        .is_ok_and(|recovered| recovered == expected)
}

/// Verifies a signature through EIP-1271 `isValidSignature`.
///
/// # Errors
///
/// Returns the signer's error if the contract call itself fails.
pub async fn verify_eip1271_signature<S: FacilitatorEvmSigner + ?Sized>(
    signer: &S,
    wallet: Address,
    hash: B256,
    signature: Bytes,
) -> Result<bool, SchemeError> {
    let magic = signer
        .eip1271_is_valid_signature(wallet, hash, signature)
        .await?;
    Ok(magic == EIP1271_MAGIC_VALUE)
}

/// Verifies a signature from any supported source.
///
/// Returns the verdict and the parsed wrapper (the caller needs the
/// deployment data again at settlement time).
///
/// # Errors
///
/// Returns an error when the wrapper is malformed or a required chain
/// lookup fails. A signature that simply does not verify is `Ok(false)`.
pub async fn verify_universal_signature<S: FacilitatorEvmSigner + ?Sized>(
    signer: &S,
    signer_address: Address,
    hash: B256,
    signature: &[u8],
    allow_undeployed: bool,
) -> Result<(bool, Erc6492Signature), SchemeError> {
    let parsed = parse_erc6492_signature(signature)?;

    // Bare ECDSA with no factory needs no chain state at all.
    if parsed.is_eoa() {
        let valid = verify_eoa_signature(hash, &parsed.inner_signature, signer_address);
        return Ok((valid, parsed));
    }

    let code = signer.get_code(signer_address).await?;
    let is_deployed = !code.is_empty();

    if !is_deployed {
        if parsed.has_deployment_info() {
            if !allow_undeployed {
                return Err("undeployed smart wallet not allowed".into());
            }
            // Deployment happens at settlement; the wrapper vouches for it.
            return Ok((true, parsed));
        }

        if parsed.inner_signature.len() == 65 {
            let valid = verify_eoa_signature(hash, &parsed.inner_signature, signer_address);
            return Ok((valid, parsed));
        }

        // No contract, no deployment data, not ECDSA: nothing to verify against.
        return Ok((false, parsed));
    }

    let valid = verify_eip1271_signature(
        signer,
        signer_address,
        hash,
        parsed.inner_signature.clone(),
    )
    .await?;
    Ok((valid, parsed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_signer_local::PrivateKeySigner;

    #[tokio::test]
    async fn test_verify_eoa_signature_recovers_signer() {
        let wallet = PrivateKeySigner::random();
        let hash = B256::repeat_byte(0x42);
        let signature = alloy_signer::Signer::sign_hash(&wallet, &hash).await.unwrap();

        assert!(verify_eoa_signature(
            hash,
            &signature.as_bytes(),
            wallet.address()
        ));
        assert!(!verify_eoa_signature(
            hash,
            &signature.as_bytes(),
            Address::repeat_byte(0x01)
        ));
    }

    #[test]
    fn test_verify_eoa_signature_rejects_wrong_length() {
        assert!(!verify_eoa_signature(
            B256::ZERO,
            &[0u8; 64],
            Address::ZERO
        ));
        assert!(!verify_eoa_signature(
            B256::ZERO,
            &[0u8; 66],
            Address::ZERO
        ));
    }
}
