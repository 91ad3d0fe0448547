//! Human-readable price parsing.
//!
//! Resource servers declare prices either as an explicit [`AssetAmount`]
//! (atomic units plus asset address) or as loose "money": `"$1.50"`,
//! `"1.50 USDC"`, `1.5`, `2`. Money is parsed to a [`Decimal`] — never a
//! float — and converted to atomic units by the owning scheme, which
//! knows the asset's decimals.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

/// An amount owed, denominated in an asset's smallest unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetAmount {
    /// Amount in atomic units, as a decimal string.
    pub amount: String,

    /// Asset address or mint.
    pub asset: String,

    /// Scheme-specific extra data to merge into requirements.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<Value>,
}

/// Error parsing a declared price.
#[derive(Debug, thiserror::Error)]
pub enum MoneyError {
    /// The money string could not be parsed as a decimal amount.
    #[error("unparseable money value: {0}")]
    Unparseable(String),

    /// An explicit `AssetAmount` was declared without an asset address.
    #[error("asset address required for AssetAmount on {0}")]
    MissingAsset(String),

    /// The price JSON is neither money nor an `AssetAmount`.
    #[error("price must be a money string, a number, or an AssetAmount object")]
    UnsupportedShape,
}

/// A declared price, before scheme-specific resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Price {
    /// Loose money to be converted into the chain's default stablecoin.
    Money(Decimal),
    /// An explicit amount in a specific asset.
    Asset(AssetAmount),
}

impl Price {
    /// Parses a price declaration from its JSON form.
    ///
    /// Accepts a string (`"$1.50"`, `"1.50 USDC"`), a number, or an
    /// object with `amount`/`asset` fields.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError`] if the value fits none of those shapes, or
    /// an `AssetAmount` lacks its asset address.
    pub fn from_json(value: &Value, network: &str) -> Result<Self, MoneyError> {
        match value {
            Value::String(s) => parse_money(s).map(Self::Money),
            Value::Number(n) => Decimal::from_str(&n.to_string())
                .map(Self::Money)
                .map_err(|_| MoneyError::Unparseable(n.to_string())),
            Value::Object(fields) if fields.contains_key("amount") => {
                let amount: AssetAmount = serde_json::from_value(value.clone())
                    .map_err(|_| MoneyError::UnsupportedShape)?;
                if amount.asset.is_empty() {
                    return Err(MoneyError::MissingAsset(network.to_owned()));
                }
                Ok(Self::Asset(amount))
            }
            _ => Err(MoneyError::UnsupportedShape),
        }
    }
}

/// Parses a money string to a decimal amount.
///
/// Strips a leading `$` and a trailing `USD`/`USDC` marker.
///
/// # Errors
///
/// Returns [`MoneyError::Unparseable`] if no decimal remains.
pub fn parse_money(money: &str) -> Result<Decimal, MoneyError> {
    let mut clean = money.trim().trim_start_matches('$').trim();
    for suffix in ["USDC", "usdc", "USD", "usd"] {
        if let Some(stripped) = clean.strip_suffix(suffix) {
            clean = stripped.trim();
            break;
        }
    }
    Decimal::from_str(clean).map_err(|_| MoneyError::Unparseable(money.to_owned()))
}

/// Converts a decimal money amount to atomic units for an asset with the
/// given number of decimals, truncating sub-atomic precision.
#[must_use]
pub fn to_atomic_units(amount: Decimal, decimals: u32) -> String {
    let scaled = amount * Decimal::from(10u64.pow(decimals));
    scaled.trunc().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_money_variants() {
        assert_eq!(parse_money("$1.50").unwrap(), Decimal::new(150, 2));
        assert_eq!(parse_money("1.50 USDC").unwrap(), Decimal::new(150, 2));
        assert_eq!(parse_money("2").unwrap(), Decimal::from(2));
        assert_eq!(parse_money(" $0.01 usd ").unwrap(), Decimal::new(1, 2));
    }

    #[test]
    fn test_parse_money_rejects_garbage() {
        assert!(parse_money("one dollar").is_err());
        assert!(parse_money("").is_err());
    }

    #[test]
    fn test_to_atomic_units() {
        assert_eq!(to_atomic_units(Decimal::new(150, 2), 6), "1500000");
        assert_eq!(to_atomic_units(Decimal::from(1), 6), "1000000");
        // Sub-atomic precision truncates.
        assert_eq!(to_atomic_units(Decimal::new(1, 8), 6), "0");
    }

    #[test]
    fn test_price_from_json() {
        let money = Price::from_json(&serde_json::json!("$1.50"), "eip155:1").unwrap();
        assert_eq!(money, Price::Money(Decimal::new(150, 2)));

        let number = Price::from_json(&serde_json::json!(1.5), "eip155:1").unwrap();
        assert_eq!(number, Price::Money(Decimal::new(15, 1)));

        let asset = Price::from_json(
            &serde_json::json!({"amount": "1000000", "asset": "0xA"}),
            "eip155:1",
        )
        .unwrap();
        assert!(matches!(asset, Price::Asset(a) if a.amount == "1000000"));
    }

    #[test]
    fn test_price_requires_asset_address() {
        let err = Price::from_json(&serde_json::json!({"amount": "1"}), "eip155:1");
        assert!(matches!(err, Err(MoneyError::MissingAsset(_))));
    }
}
