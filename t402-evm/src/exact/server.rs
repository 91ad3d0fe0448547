//! Server-side price resolution for the EVM exact scheme.

use rust_decimal::Decimal;
use serde_json::Value;
use t402::money::{parse_money, to_atomic_units, AssetAmount, Price};
use t402::proto::{PaymentRequirements, SupportedKind};
use t402::scheme::{SchemeError, SchemeServer};

use crate::networks::network_config;

/// Custom money parser: decimal amount + network → asset amount, or
/// `None` to pass to the next parser in the chain.
pub type MoneyParser = Box<dyn Fn(Decimal, &str) -> Option<AssetAmount> + Send + Sync>;

/// V2 server-side mechanism for the EVM exact scheme.
///
/// Resolves declared prices into atomic USDC amounts (or whatever a
/// registered custom parser decides) and fills EIP-712 domain defaults
/// into the requirements.
pub struct ExactEvmServer {
    money_parsers: Vec<MoneyParser>,
}

impl std::fmt::Debug for ExactEvmServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExactEvmServer")
            .field("money_parsers", &self.money_parsers.len())
            .finish()
    }
}

impl Default for ExactEvmServer {
    fn default() -> Self {
        Self::new()
    }
}

impl ExactEvmServer {
    /// Creates a server scheme with no custom money parsers.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            money_parsers: Vec::new(),
        }
    }

    /// Appends a custom money parser. Parsers run in registration order;
    /// the default USDC conversion is the final fallback.
    pub fn register_money_parser(&mut self, parser: MoneyParser) -> &mut Self {
        self.money_parsers.push(parser);
        self
    }

    fn default_money_conversion(
        &self,
        amount: Decimal,
        network: &str,
    ) -> Result<AssetAmount, SchemeError> {
        let config = network_config(network)
            .ok_or_else(|| format!("no default asset configured for network {network}"))?;
        let asset = config.default_asset;
        Ok(AssetAmount {
            amount: to_atomic_units(amount, asset.decimals),
            asset: asset.address.to_string(),
            extra: Some(serde_json::json!({
                "name": asset.eip712.name,
                "version": asset.eip712.version,
            })),
        })
    }
}

impl SchemeServer for ExactEvmServer {
    fn scheme(&self) -> &str {
        t402::scheme::ExactScheme::NAME
    }

    fn parse_price(&self, price: &Value, network: &str) -> Result<AssetAmount, SchemeError> {
        match Price::from_json(price, network)? {
            Price::Asset(amount) => Ok(amount),
            Price::Money(decimal) => {
                for parser in &self.money_parsers {
                    if let Some(amount) = parser(decimal, network) {
                        return Ok(amount);
                    }
                }
                self.default_money_conversion(decimal, network)
            }
        }
    }

    fn enhance_payment_requirements(
        &self,
        mut requirements: PaymentRequirements,
        _supported_kind: &SupportedKind,
        _extensions: &[String],
    ) -> PaymentRequirements {
        let config = network_config(&requirements.network);

        if requirements.asset.is_empty()
            && let Some(config) = config
        {
            requirements.asset = config.default_asset.address.to_string();
        }

        // A custom parser may hand back a decimal-form amount; normalize
        // to atomic units using the asset's decimals.
        if requirements.amount.contains('.')
            && let Some(config) = config
            && let Ok(decimal) = parse_money(&requirements.amount)
        {
            requirements.amount = to_atomic_units(decimal, config.default_asset.decimals);
        }

        if !requirements.extra.is_object() {
            requirements.extra = Value::Object(serde_json::Map::new());
        }
        if let Some(object) = requirements.extra.as_object_mut()
            && let Some(config) = config
        {
            object
                .entry("name")
                .or_insert_with(|| Value::String(config.default_asset.eip712.name.to_owned()));
            object
                .entry("version")
                .or_insert_with(|| Value::String(config.default_asset.eip712.version.to_owned()));
        }

        requirements
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind() -> SupportedKind {
        SupportedKind {
            x402_version: 2,
            scheme: "exact".into(),
            network: "eip155:8453".into(),
            extra: None,
        }
    }

    #[test]
    fn test_parse_price_money_to_usdc() {
        let server = ExactEvmServer::new();
        let amount = server
            .parse_price(&serde_json::json!("$1.50"), "eip155:8453")
            .unwrap();
        assert_eq!(amount.amount, "1500000");
        assert_eq!(amount.asset, "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913");
    }

    #[test]
    fn test_parse_price_asset_amount_passthrough() {
        let server = ExactEvmServer::new();
        let amount = server
            .parse_price(
                &serde_json::json!({"amount": "42", "asset": "0xCustomToken"}),
                "eip155:8453",
            )
            .unwrap();
        assert_eq!(amount.amount, "42");
        assert_eq!(amount.asset, "0xCustomToken");
    }

    #[test]
    fn test_custom_parser_takes_precedence() {
        let mut server = ExactEvmServer::new();
        server.register_money_parser(Box::new(|amount, _network| {
            Some(AssetAmount {
                amount: (amount * Decimal::from(100)).trunc().to_string(),
                asset: "0xCents".into(),
                extra: None,
            })
        }));
        let amount = server
            .parse_price(&serde_json::json!("2.50"), "eip155:8453")
            .unwrap();
        assert_eq!(amount.amount, "250");
        assert_eq!(amount.asset, "0xCents");
    }

    #[test]
    fn test_enhance_fills_domain_and_asset() {
        let server = ExactEvmServer::new();
        let base = PaymentRequirements {
            scheme: "exact".into(),
            network: "eip155:8453".into(),
            asset: String::new(),
            amount: "1000000".into(),
            pay_to: "0xRecipient".into(),
            max_timeout_seconds: 300,
            extra: serde_json::json!({}),
        };
        let enhanced = server.enhance_payment_requirements(base, &kind(), &[]);
        assert_eq!(enhanced.asset, "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913");
        assert_eq!(enhanced.extra["name"], "USD Coin");
        assert_eq!(enhanced.extra["version"], "2");
    }

    #[test]
    fn test_enhance_keeps_existing_domain() {
        let server = ExactEvmServer::new();
        let base = PaymentRequirements {
            scheme: "exact".into(),
            network: "eip155:8453".into(),
            asset: "0xToken".into(),
            amount: "1".into(),
            pay_to: "0xRecipient".into(),
            max_timeout_seconds: 300,
            extra: serde_json::json!({"name": "MyToken", "version": "1"}),
        };
        let enhanced = server.enhance_payment_requirements(base, &kind(), &[]);
        assert_eq!(enhanced.extra["name"], "MyToken");
        assert_eq!(enhanced.extra["version"], "1");
    }
}
