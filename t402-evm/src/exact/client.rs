//! Client-side payload signing for the EVM exact scheme.
//!
//! Builds an EIP-3009 authorization for the selected requirement, signs
//! its EIP-712 hash with the payer's wallet, and returns the inner
//! payload the client core wraps into the protocol envelope.
//!
//! The authorization window starts ten minutes in the past so the
//! payment is immediately valid despite clock drift, and ends
//! `max_timeout_seconds` from now. The nonce is 32 random bytes.

use alloy_primitives::{Address, B256};
use rand::Rng;
use serde_json::Value;
use t402::proto::{PaymentRequirements, PaymentRequirementsV1};
use t402::scheme::{BoxFuture, SchemeClient, SchemeClientV1, SchemeError};
use t402::timestamp::UnixTimestamp;

use super::types::{
    authorization_signing_hash, eip3009_domain, Eip3009Authorization, Eip3009Payload,
    Eip712DomainExtra, TokenAmount,
};
use crate::networks::{chain_id_of, network_config};
use crate::signer::ClientEvmSigner;

/// Backdate applied to `validAfter` to absorb clock drift.
const VALID_AFTER_BACKDATE_SECS: u64 = 10 * 60;

struct SigningInputs {
    chain_id: u64,
    asset: Address,
    pay_to: Address,
    value: TokenAmount,
    max_timeout_seconds: u64,
    domain: Eip712DomainExtra,
}

impl SigningInputs {
    fn from_v2(requirements: &PaymentRequirements) -> Result<Self, SchemeError> {
        let chain_id = chain_id_of(&requirements.network)
            .ok_or_else(|| format!("not an EIP-155 network: {}", requirements.network))?;
        Self::build(
            chain_id,
            &requirements.network,
            &requirements.asset,
            &requirements.pay_to,
            &requirements.amount,
            requirements.max_timeout_seconds,
            requirements.extra(),
        )
    }

    fn from_v1(requirements: &PaymentRequirementsV1) -> Result<Self, SchemeError> {
        let chain_id = chain_id_of(&requirements.network)
            .ok_or_else(|| format!("unknown network name: {}", requirements.network))?;
        Self::build(
            chain_id,
            &requirements.network,
            &requirements.asset,
            &requirements.pay_to,
            &requirements.max_amount_required,
            requirements.max_timeout_seconds,
            requirements.extra.as_ref(),
        )
    }

    fn build(
        chain_id: u64,
        network: &str,
        asset: &str,
        pay_to: &str,
        amount: &str,
        max_timeout_seconds: u64,
        extra: Option<&Value>,
    ) -> Result<Self, SchemeError> {
        let asset: Address = asset
            .parse()
            .map_err(|_| format!("invalid asset address: {asset}"))?;
        let pay_to: Address = pay_to
            .parse()
            .map_err(|_| format!("invalid payTo address: {pay_to}"))?;
        let value: TokenAmount = serde_json::from_value(Value::String(amount.to_owned()))
            .map_err(|_| format!("invalid amount: {amount}"))?;

        // Domain comes from extra when the server provided it, else from
        // the known-network table.
        let domain = extra
            .and_then(|v| serde_json::from_value::<Eip712DomainExtra>(v.clone()).ok())
            .or_else(|| {
                network_config(network).map(|config| Eip712DomainExtra {
                    name: config.default_asset.eip712.name.to_owned(),
                    version: config.default_asset.eip712.version.to_owned(),
                })
            })
            .ok_or_else(|| {
                format!("missing EIP-712 domain parameters for asset on {network}")
            })?;

        Ok(Self {
            chain_id,
            asset,
            pay_to,
            value,
            max_timeout_seconds,
            domain,
        })
    }
}

async fn sign_authorization<S: ClientEvmSigner>(
    signer: &S,
    inputs: SigningInputs,
) -> Result<Value, SchemeError> {
    let now = UnixTimestamp::now();
    let nonce: [u8; 32] = rand::rng().random();

    let authorization = Eip3009Authorization {
        from: signer.address(),
        to: inputs.pay_to,
        value: inputs.value,
        valid_after: now - VALID_AFTER_BACKDATE_SECS,
        valid_before: now + inputs.max_timeout_seconds,
        nonce: B256::from(nonce),
    };

    let domain = eip3009_domain(
        &inputs.domain.name,
        &inputs.domain.version,
        inputs.chain_id,
        inputs.asset,
    );
    let hash = authorization_signing_hash(&authorization, &domain);
    let signature = signer.sign_typed_hash(hash).await?;

    let payload = Eip3009Payload {
        signature: signature.as_bytes().into(),
        authorization,
    };
    Ok(serde_json::to_value(payload)?)
}

/// V2 client-side mechanism for the EVM exact scheme.
pub struct ExactEvmClient<S> {
    signer: S,
}

impl<S> std::fmt::Debug for ExactEvmClient<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExactEvmClient").finish_non_exhaustive()
    }
}

impl<S> ExactEvmClient<S> {
    /// Creates the client around a payer wallet.
    pub const fn new(signer: S) -> Self {
        Self { signer }
    }
}

impl<S: ClientEvmSigner> SchemeClient for ExactEvmClient<S> {
    fn scheme(&self) -> &str {
        t402::scheme::ExactScheme::NAME
    }

    fn create_payment_payload<'a>(
        &'a self,
        requirements: &'a PaymentRequirements,
    ) -> BoxFuture<'a, Result<Value, SchemeError>> {
        Box::pin(async move {
            let inputs = SigningInputs::from_v2(requirements)?;
            sign_authorization(&self.signer, inputs).await
        })
    }
}

/// V1 (legacy) client-side mechanism for the EVM exact scheme.
pub struct ExactEvmClientV1<S> {
    signer: S,
}

impl<S> std::fmt::Debug for ExactEvmClientV1<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExactEvmClientV1").finish_non_exhaustive()
    }
}

impl<S> ExactEvmClientV1<S> {
    /// Creates the client around a payer wallet.
    pub const fn new(signer: S) -> Self {
        Self { signer }
    }
}

impl<S: ClientEvmSigner> SchemeClientV1 for ExactEvmClientV1<S> {
    fn scheme(&self) -> &str {
        t402::scheme::ExactScheme::NAME
    }

    fn create_payment_payload<'a>(
        &'a self,
        requirements: &'a PaymentRequirementsV1,
    ) -> BoxFuture<'a, Result<Value, SchemeError>> {
        Box::pin(async move {
            let inputs = SigningInputs::from_v1(requirements)?;
            sign_authorization(&self.signer, inputs).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exact::verify::verify_eoa_signature;
    use alloy_signer_local::PrivateKeySigner;

    fn requirements() -> PaymentRequirements {
        PaymentRequirements {
            scheme: "exact".into(),
            network: "eip155:84532".into(),
            asset: "0x036CbD53842c5426634e7929541eC2318f3dCF7e".into(),
            amount: "1000000".into(),
            pay_to: "0x1111111111111111111111111111111111111111".into(),
            max_timeout_seconds: 600,
            extra: serde_json::json!({"name": "USDC", "version": "2"}),
        }
    }

    #[tokio::test]
    async fn test_signed_payload_verifies_against_wallet() {
        let wallet = PrivateKeySigner::random();
        let address = wallet.address();
        let client = ExactEvmClient::new(wallet);

        let value = SchemeClient::create_payment_payload(&client, &requirements())
            .await
            .unwrap();
        let payload: Eip3009Payload = serde_json::from_value(value).unwrap();

        assert_eq!(payload.authorization.from, address);
        assert_eq!(payload.authorization.value.0, alloy_primitives::U256::from(1_000_000u64));

        let now = UnixTimestamp::now();
        assert!(payload.authorization.valid_after < now);
        assert!(payload.authorization.valid_before > now + 500);

        let domain = eip3009_domain(
            "USDC",
            "2",
            84532,
            requirements().asset.parse().unwrap(),
        );
        let hash = authorization_signing_hash(&payload.authorization, &domain);
        assert!(verify_eoa_signature(hash, &payload.signature, address));
    }

    #[tokio::test]
    async fn test_rejects_non_evm_network() {
        let client = ExactEvmClient::new(PrivateKeySigner::random());
        let mut bad = requirements();
        bad.network = "solana:mainnet".into();
        assert!(SchemeClient::create_payment_payload(&client, &bad)
            .await
            .is_err());
    }
}
