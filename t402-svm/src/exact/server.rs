//! Server-side price resolution for the SVM exact scheme.

use rust_decimal::Decimal;
use serde_json::Value;
use t402::money::{to_atomic_units, AssetAmount, Price};
use t402::proto::{PaymentRequirements, SupportedKind};
use t402::scheme::{SchemeError, SchemeServer};

use crate::networks::network_config;

/// Custom money parser: decimal amount + network → asset amount, or
/// `None` to pass to the next parser in the chain.
pub type MoneyParser = Box<dyn Fn(Decimal, &str) -> Option<AssetAmount> + Send + Sync>;

/// V2 server-side mechanism for the SVM exact scheme.
///
/// Resolves declared prices into atomic USDC amounts and copies the
/// facilitator-selected fee payer from the capability catalog into the
/// requirements so clients can build against it.
pub struct ExactSvmServer {
    money_parsers: Vec<MoneyParser>,
}

impl std::fmt::Debug for ExactSvmServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExactSvmServer")
            .field("money_parsers", &self.money_parsers.len())
            .finish()
    }
}

impl Default for ExactSvmServer {
    fn default() -> Self {
        Self::new()
    }
}

impl ExactSvmServer {
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
        Ok(AssetAmount {
            amount: to_atomic_units(amount, config.default_decimals),
            asset: config.default_mint.to_string(),
            extra: None,
        })
    }
}

impl SchemeServer for ExactSvmServer {
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
        supported_kind: &SupportedKind,
        _extensions: &[String],
    ) -> PaymentRequirements {
        if requirements.asset.is_empty()
            && let Some(config) = network_config(&requirements.network)
        {
            requirements.asset = config.default_mint.to_string();
        }

        // The facilitator advertises which of its addresses pays fees;
        // carry it into the requirements for the client to build against.
        if !requirements.extra.is_object() {
            requirements.extra = Value::Object(serde_json::Map::new());
        }
        if let Some(object) = requirements.extra.as_object_mut()
            && !object.contains_key("feePayer")
            && let Some(fee_payer) = supported_kind
                .extra
                .as_ref()
                .and_then(|extra| extra.get("feePayer"))
        {
            object.insert("feePayer".into(), fee_payer.clone());
        }

        requirements
    }
}
