//! Wire types for the EVM exact scheme.

use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_sol_types::{sol, Eip712Domain, SolStruct};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use t402::timestamp::UnixTimestamp;

/// A `U256` token amount that serializes as a decimal string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TokenAmount(pub U256);

impl From<U256> for TokenAmount {
    fn from(value: U256) -> Self {
        Self(value)
    }
}

impl From<TokenAmount> for U256 {
    fn from(value: TokenAmount) -> Self {
        value.0
    }
}

impl std::fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for TokenAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for TokenAmount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        U256::from_str_radix(&s, 10)
            .map(Self)
            .map_err(serde::de::Error::custom)
    }
}

/// The EIP-3009 authorization the payer signed.
///
/// # JSON
///
/// ```json
/// {
///   "from": "0x...",
///   "to": "0x...",
///   "value": "1000000",
///   "validAfter": "1700000000",
///   "validBefore": "1700000600",
///   "nonce": "0x..."
/// }
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Eip3009Authorization {
    /// Authorizing token owner.
    pub from: Address,
    /// Transfer recipient.
    pub to: Address,
    /// Transfer value in the token's smallest unit.
    pub value: TokenAmount,
    /// Not valid before this timestamp (inclusive).
    pub valid_after: UnixTimestamp,
    /// Expires at this timestamp (exclusive).
    pub valid_before: UnixTimestamp,
    /// Unique 32-byte replay-protection nonce.
    pub nonce: B256,
}

/// The scheme-specific inner payload: authorization plus signature.
///
/// The signature may be a bare 65-byte ECDSA signature, an EIP-1271
/// contract signature of arbitrary length, or an ERC-6492 wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Eip3009Payload {
    /// Signature over the EIP-712 hash of the authorization.
    pub signature: Bytes,
    /// The authorization that was signed.
    pub authorization: Eip3009Authorization,
}

/// EIP-712 domain parameters carried in `requirements.extra`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Eip712DomainExtra {
    /// Token domain `name`.
    pub name: String,
    /// Token domain `version`.
    pub version: String,
}

sol! {
    /// ERC-3009 `TransferWithAuthorization` as typed for EIP-712 signing.
    ///
    /// Field order must match the token contract's type hash.
    #[derive(Serialize, Deserialize)]
    struct TransferWithAuthorization {
        address from;
        address to;
        uint256 value;
        uint256 validAfter;
        uint256 validBefore;
        bytes32 nonce;
    }
}

sol! {
    /// ABI shape of the ERC-6492 wrapper body:
    /// `abi.encode(factory, factoryCalldata, innerSignature)`.
    #[derive(Debug)]
    struct Sig6492 {
        address factory;
        bytes factoryCalldata;
        bytes innerSig;
    }
}

/// Builds the EIP-712 domain for an EIP-3009 token.
#[must_use]
pub fn eip3009_domain(
    name: &str,
    version: &str,
    chain_id: u64,
    verifying_contract: Address,
) -> Eip712Domain {
    alloy_sol_types::eip712_domain! {
        name: name.to_owned(),
        version: version.to_owned(),
        chain_id: chain_id,
        verifying_contract: verifying_contract,
    }
}

/// Computes the EIP-712 signing hash of an authorization.
#[must_use]
pub fn authorization_signing_hash(
    authorization: &Eip3009Authorization,
    domain: &Eip712Domain,
) -> B256 {
    let typed = TransferWithAuthorization {
        from: authorization.from,
        to: authorization.to,
        value: authorization.value.into(),
        validAfter: U256::from(authorization.valid_after.as_secs()),
        validBefore: U256::from(authorization.valid_before.as_secs()),
        nonce: authorization.nonce,
    };
    typed.eip712_signing_hash(domain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    #[test]
    fn test_payload_wire_format() {
        let payload = Eip3009Payload {
            signature: Bytes::from(vec![0x12; 65]),
            authorization: Eip3009Authorization {
                from: address!("0x1111111111111111111111111111111111111111"),
                to: address!("0x2222222222222222222222222222222222222222"),
                value: TokenAmount(U256::from(1_000_000u64)),
                valid_after: UnixTimestamp::from_secs(100),
                valid_before: UnixTimestamp::from_secs(700),
                nonce: B256::ZERO,
            },
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["authorization"]["value"], "1000000");
        assert_eq!(json["authorization"]["validAfter"], "100");
        assert!(json["signature"].as_str().unwrap().starts_with("0x"));

        let back: Eip3009Payload = serde_json::from_value(json).unwrap();
        assert_eq!(back.authorization.value.0, U256::from(1_000_000u64));
    }

    #[test]
    fn test_signing_hash_depends_on_domain() {
        let authorization = Eip3009Authorization {
            from: address!("0x1111111111111111111111111111111111111111"),
            to: address!("0x2222222222222222222222222222222222222222"),
            value: TokenAmount(U256::from(1u64)),
            valid_after: UnixTimestamp::from_secs(0),
            valid_before: UnixTimestamp::from_secs(100),
            nonce: B256::ZERO,
        };
        let asset = address!("0x3333333333333333333333333333333333333333");
        let base = eip3009_domain("USD Coin", "2", 8453, asset);
        let sepolia = eip3009_domain("USDC", "2", 84532, asset);
        assert_ne!(
            authorization_signing_hash(&authorization, &base),
            authorization_signing_hash(&authorization, &sepolia)
        );
    }
}
