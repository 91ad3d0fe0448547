//! Version detection, payload parsing, and network pattern matching.
//!
//! The protocol version is announced in-band by the `x402Version` field;
//! these helpers detect it and parse the matching wire types into
//! version-tagged enums so call sites branch once, exhaustively, instead
//! of sniffing field shapes.

use serde_json::Value;
use std::collections::HashMap;

use super::v1::{PaymentPayloadV1, PaymentRequiredV1, PaymentRequirementsV1};
use super::v2::{PaymentPayload, PaymentRequired, PaymentRequirements};
use super::{Network, ProtocolError};

/// Extracts the `x402Version` field from JSON data.
///
/// # Errors
///
/// Returns [`ProtocolError::MissingVersion`] if the field is absent and
/// [`ProtocolError::InvalidVersion`] if it is not 1 or 2.
pub fn detect_version(data: &Value) -> Result<u32, ProtocolError> {
    let version = data
        .get("x402Version")
        .ok_or(ProtocolError::MissingVersion)?
        .as_u64()
        .ok_or(ProtocolError::InvalidVersion(0))?;
    match version {
        1 => Ok(1),
        2 => Ok(2),
        other => Err(ProtocolError::InvalidVersion(other)),
    }
}

/// Extracts the `x402Version` from raw JSON bytes.
///
/// # Errors
///
/// Returns [`ProtocolError`] on parse failure or invalid version.
pub fn detect_version_bytes(data: &[u8]) -> Result<u32, ProtocolError> {
    let parsed: Value = serde_json::from_slice(data)?;
    detect_version(&parsed)
}

/// Extracts scheme and network from a raw payment payload.
///
/// V1 carries both at the top level; V2 nests them under `accepted`.
///
/// # Errors
///
/// Returns [`ProtocolError::MissingField`] if either is absent.
pub fn scheme_and_network(version: u32, payload: &Value) -> Result<(String, String), ProtocolError> {
    let (scheme, network) = if version == 1 {
        (payload.get("scheme"), payload.get("network"))
    } else {
        let accepted = payload
            .get("accepted")
            .ok_or(ProtocolError::MissingField("accepted"))?;
        (accepted.get("scheme"), accepted.get("network"))
    };

    let scheme = scheme
        .and_then(Value::as_str)
        .ok_or(ProtocolError::MissingField("scheme"))?
        .to_owned();
    let network = network
        .and_then(Value::as_str)
        .ok_or(ProtocolError::MissingField("network"))?
        .to_owned();
    Ok((scheme, network))
}

/// Checks whether a payment payload structurally matches requirements.
///
/// V1 compares scheme and network; V2 additionally compares amount,
/// asset, and recipient.
#[must_use]
pub fn payload_matches_requirements(version: u32, payload: &Value, requirements: &Value) -> bool {
    if version == 1 {
        payload.get("scheme") == requirements.get("scheme")
            && payload.get("network") == requirements.get("network")
    } else {
        let Some(accepted) = payload.get("accepted") else {
            return false;
        };
        accepted.get("scheme") == requirements.get("scheme")
            && accepted.get("network") == requirements.get("network")
            && accepted.get("amount") == requirements.get("amount")
            && accepted.get("asset") == requirements.get("asset")
            && accepted.get("payTo") == requirements.get("payTo")
    }
}

/// Checks whether a network matches a pattern.
///
/// Patterns ending in `*` match any network sharing the prefix; other
/// patterns require equality.
#[must_use]
pub fn matches_network_pattern(network: &str, pattern: &str) -> bool {
    pattern
        .strip_suffix('*')
        .map_or_else(|| pattern == network, |prefix| network.starts_with(prefix))
}

/// Derives a common pattern from a set of networks.
///
/// When every network shares one namespace, the namespace wildcard covers
/// them; otherwise the first network stands alone.
///
/// # Panics
///
/// Panics if `networks` is empty.
#[must_use]
pub fn derive_network_pattern(networks: &[Network]) -> Network {
    assert!(!networks.is_empty(), "at least one network required");

    let namespaces: std::collections::HashSet<&str> = networks
        .iter()
        .filter_map(|n| n.split(':').next())
        .collect();
    if namespaces.len() == 1 {
        let namespace = namespaces.into_iter().next().expect("non-empty set");
        format!("{namespace}:*")
    } else {
        networks[0].clone()
    }
}

/// Looks up a registration map by network, exact match first, then
/// wildcard patterns in iteration order.
#[must_use]
pub fn find_by_network<'a, T, S: std::hash::BuildHasher>(
    registrations: &'a HashMap<Network, T, S>,
    network: &str,
) -> Option<&'a T> {
    if let Some(found) = registrations.get(network) {
        return Some(found);
    }
    registrations
        .iter()
        .find(|(pattern, _)| matches_network_pattern(network, pattern))
        .map(|(_, found)| found)
}

/// A 402 challenge, tagged by protocol version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentRequiredEnum {
    /// Legacy V1 format.
    V1(Box<PaymentRequiredV1>),
    /// Current V2 format.
    V2(Box<PaymentRequired>),
}

/// A payment payload, tagged by protocol version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentPayloadEnum {
    /// Legacy V1 format.
    V1(Box<PaymentPayloadV1>),
    /// Current V2 format.
    V2(Box<PaymentPayload>),
}

impl PaymentPayloadEnum {
    /// Returns the protocol version.
    #[must_use]
    pub const fn version(&self) -> u32 {
        match self {
            Self::V1(_) => 1,
            Self::V2(_) => 2,
        }
    }

    /// Returns the payment scheme.
    #[must_use]
    pub fn scheme(&self) -> &str {
        match self {
            Self::V1(p) => &p.scheme,
            Self::V2(p) => p.scheme(),
        }
    }

    /// Returns the network.
    #[must_use]
    pub fn network(&self) -> &str {
        match self {
            Self::V1(p) => &p.network,
            Self::V2(p) => p.network(),
        }
    }
}

/// Payment requirements, tagged by protocol version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentRequirementsEnum {
    /// Legacy V1 format.
    V1(Box<PaymentRequirementsV1>),
    /// Current V2 format.
    V2(Box<PaymentRequirements>),
}

impl PaymentRequirementsEnum {
    /// Returns the payment scheme.
    #[must_use]
    pub fn scheme(&self) -> &str {
        match self {
            Self::V1(r) => &r.scheme,
            Self::V2(r) => &r.scheme,
        }
    }

    /// Returns the network.
    #[must_use]
    pub fn network(&self) -> &str {
        match self {
            Self::V1(r) => &r.network,
            Self::V2(r) => &r.network,
        }
    }

    /// Returns the required amount in smallest units.
    #[must_use]
    pub fn amount(&self) -> &str {
        match self {
            Self::V1(r) => r.amount(),
            Self::V2(r) => &r.amount,
        }
    }
}

/// Parses a 402 challenge, auto-detecting the version.
///
/// # Errors
///
/// Returns [`ProtocolError`] on parse failure or unsupported version.
pub fn parse_payment_required(data: &Value) -> Result<PaymentRequiredEnum, ProtocolError> {
    match detect_version(data)? {
        1 => Ok(PaymentRequiredEnum::V1(Box::new(serde_json::from_value(
            data.clone(),
        )?))),
        _ => Ok(PaymentRequiredEnum::V2(Box::new(serde_json::from_value(
            data.clone(),
        )?))),
    }
}

/// Parses a payment payload, auto-detecting the version.
///
/// # Errors
///
/// Returns [`ProtocolError`] on parse failure or unsupported version.
pub fn parse_payment_payload(data: &Value) -> Result<PaymentPayloadEnum, ProtocolError> {
    match detect_version(data)? {
        1 => Ok(PaymentPayloadEnum::V1(Box::new(serde_json::from_value(
            data.clone(),
        )?))),
        _ => Ok(PaymentPayloadEnum::V2(Box::new(serde_json::from_value(
            data.clone(),
        )?))),
    }
}

/// Parses payment requirements for a known version.
///
/// Requirements carry no `x402Version` of their own — the version comes
/// from the accompanying payload.
///
/// # Errors
///
/// Returns [`ProtocolError`] on parse failure or unsupported version.
pub fn parse_payment_requirements(
    version: u32,
    data: &Value,
) -> Result<PaymentRequirementsEnum, ProtocolError> {
    match version {
        1 => Ok(PaymentRequirementsEnum::V1(Box::new(
            serde_json::from_value(data.clone())?,
        ))),
        2 => Ok(PaymentRequirementsEnum::V2(Box::new(
            serde_json::from_value(data.clone())?,
        ))),
        other => Err(ProtocolError::InvalidVersion(u64::from(other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_version() {
        assert_eq!(detect_version(&serde_json::json!({"x402Version": 1})).unwrap(), 1);
        assert_eq!(detect_version(&serde_json::json!({"x402Version": 2})).unwrap(), 2);
        assert!(detect_version(&serde_json::json!({"x402Version": 3})).is_err());
        assert!(detect_version(&serde_json::json!({})).is_err());
    }

    #[test]
    fn test_matches_network_pattern() {
        assert!(matches_network_pattern("eip155:8453", "eip155:*"));
        assert!(matches_network_pattern("eip155:8453", "eip155:8453"));
        assert!(!matches_network_pattern("solana:abc", "eip155:*"));
        assert!(!matches_network_pattern("eip155:8453", "eip155:1"));
    }

    #[test]
    fn test_derive_network_pattern_single_namespace() {
        let networks = vec!["eip155:1".to_owned(), "eip155:8453".to_owned()];
        assert_eq!(derive_network_pattern(&networks), "eip155:*");
    }

    #[test]
    fn test_derive_network_pattern_mixed_namespaces() {
        let networks = vec!["eip155:1".to_owned(), "solana:x".to_owned()];
        assert_eq!(derive_network_pattern(&networks), "eip155:1");
    }

    #[test]
    fn test_find_by_network_prefers_exact() {
        let mut map = HashMap::new();
        map.insert("eip155:*".to_owned(), "wildcard");
        map.insert("eip155:8453".to_owned(), "exact");
        assert_eq!(find_by_network(&map, "eip155:8453"), Some(&"exact"));
        assert_eq!(find_by_network(&map, "eip155:1"), Some(&"wildcard"));
        assert_eq!(find_by_network(&map, "solana:x"), None);
    }

    #[test]
    fn test_scheme_and_network_by_version() {
        let v1 = serde_json::json!({"scheme": "exact", "network": "base", "payload": {}});
        assert_eq!(
            scheme_and_network(1, &v1).unwrap(),
            ("exact".to_owned(), "base".to_owned())
        );

        let v2 = serde_json::json!({"accepted": {"scheme": "exact", "network": "eip155:8453"}});
        assert_eq!(
            scheme_and_network(2, &v2).unwrap(),
            ("exact".to_owned(), "eip155:8453".to_owned())
        );
    }
}
