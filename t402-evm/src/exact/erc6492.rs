//! ERC-6492 signature wrapper parsing.
//!
//! ERC-6492 lets a not-yet-deployed smart wallet produce verifiable
//! signatures: the wrapper carries the wallet factory and its deployment
//! calldata alongside the inner signature, terminated by a 32-byte magic
//! suffix. Parsing a non-wrapped signature is the identity: the bytes
//! come back unchanged as the inner signature with a zero factory.

use alloy_primitives::{hex, Address, Bytes};
use alloy_sol_types::SolValue;

use super::types::Sig6492;

/// The fixed 32-byte suffix defined by ERC-6492.
pub const ERC6492_MAGIC_SUFFIX: [u8; 32] =
    hex!("6492649264926492649264926492649264926492649264926492649264926492");

/// A signature with its ERC-6492 wrapper (if any) unpacked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Erc6492Signature {
    /// Wallet factory; zero for non-wrapped signatures.
    pub factory: Address,
    /// Factory calldata that deploys the wallet; empty when absent.
    pub factory_calldata: Bytes,
    /// The signature to verify against the wallet.
    pub inner_signature: Bytes,
}

impl Erc6492Signature {
    /// Whether the wrapper carries usable deployment data.
    #[must_use]
    pub fn has_deployment_info(&self) -> bool {
        self.factory != Address::ZERO && !self.factory_calldata.is_empty()
    }

    /// Whether this is a plain EOA signature: 65 bytes, no factory.
    #[must_use]
    pub fn is_eoa(&self) -> bool {
        self.factory == Address::ZERO && self.inner_signature.len() == 65
    }
}

/// Error decoding a malformed ERC-6492 wrapper.
#[derive(Debug, thiserror::Error)]
#[error("invalid ERC-6492 signature format: {0}")]
pub struct Erc6492FormatError(String);

/// Checks for the ERC-6492 magic suffix.
#[must_use]
pub fn is_erc6492_signature(signature: &[u8]) -> bool {
    signature.len() >= 32 && signature[signature.len() - 32..] == ERC6492_MAGIC_SUFFIX
}

/// Parses an optionally ERC-6492-wrapped signature.
///
/// Without the magic suffix this is the identity: the input becomes the
/// inner signature with a zero factory and empty calldata.
///
/// # Errors
///
/// Returns [`Erc6492FormatError`] if the suffix is present but the body
/// does not ABI-decode as `(address, bytes, bytes)`.
pub fn parse_erc6492_signature(signature: &[u8]) -> Result<Erc6492Signature, Erc6492FormatError> {
    if !is_erc6492_signature(signature) {
        return Ok(Erc6492Signature {
            factory: Address::ZERO,
            factory_calldata: Bytes::new(),
            inner_signature: Bytes::copy_from_slice(signature),
        });
    }

    let body = &signature[..signature.len() - 32];
    let decoded = Sig6492::abi_decode_params(body)
        .map_err(|e| Erc6492FormatError(e.to_string()))?;
    Ok(Erc6492Signature {
        factory: decoded.factory,
        factory_calldata: decoded.factoryCalldata,
        inner_signature: decoded.innerSig,
    })
}

/// Wraps an inner signature into the ERC-6492 envelope.
///
/// Used by smart-wallet clients; also handy for building test vectors.
#[must_use]
pub fn wrap_erc6492_signature(
    factory: Address,
    factory_calldata: Bytes,
    inner_signature: Bytes,
) -> Bytes {
    let body = Sig6492 {
        factory,
        factoryCalldata: factory_calldata,
        innerSig: inner_signature,
    };
    let mut wrapped = body.abi_encode_params();
    wrapped.extend_from_slice(&ERC6492_MAGIC_SUFFIX);
    wrapped.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    #[test]
    fn test_bare_signature_is_identity() {
        let bare = vec![0xAB; 65];
        let parsed = parse_erc6492_signature(&bare).unwrap();
        assert_eq!(parsed.factory, Address::ZERO);
        assert!(parsed.factory_calldata.is_empty());
        assert_eq!(parsed.inner_signature.as_ref(), bare.as_slice());
        assert!(parsed.is_eoa());
        assert!(!parsed.has_deployment_info());
    }

    #[test]
    fn test_wrap_then_parse_roundtrip() {
        let factory = address!("0x4444444444444444444444444444444444444444");
        let calldata = Bytes::from(vec![0x01, 0x02, 0x03]);
        let inner = Bytes::from(vec![0xCD; 65]);

        let wrapped = wrap_erc6492_signature(factory, calldata.clone(), inner.clone());
        assert!(is_erc6492_signature(&wrapped));

        let parsed = parse_erc6492_signature(&wrapped).unwrap();
        assert_eq!(parsed.factory, factory);
        assert_eq!(parsed.factory_calldata, calldata);
        assert_eq!(parsed.inner_signature, inner);
        assert!(parsed.has_deployment_info());
        assert!(!parsed.is_eoa());
    }

    #[test]
    fn test_magic_suffix_with_garbage_body_errors() {
        let mut bad = vec![0xFF; 7];
        bad.extend_from_slice(&ERC6492_MAGIC_SUFFIX);
        assert!(parse_erc6492_signature(&bad).is_err());
    }

    #[test]
    fn test_short_signature_is_not_wrapped() {
        let short = vec![0x01; 16];
        let parsed = parse_erc6492_signature(&short).unwrap();
        assert_eq!(parsed.inner_signature.as_ref(), short.as_slice());
    }
}
