//! Facilitator-side verification and settlement for the EVM exact
//! scheme.
//!
//! Verification runs a fixed sequence of checks, each short-circuiting
//! with its own reason code: scheme and network agreement, resolvable
//! network and asset, EIP-712 domain presence, recipient and amount
//! matching, the timing window (6 s settlement headroom before
//! `validBefore`), nonce freshness, payer balance, and finally the
//! universal signature check. The nonce and balance lookups are
//! best-effort: an RPC failure skips the check and verification
//! continues.
//!
//! Settlement re-runs verification, deploys a counterfactual wallet
//! through its ERC-6492 factory when enabled, then submits
//! `transferWithAuthorization` — the `(v, r, s)` overload for bare
//! ECDSA signatures, the `(bytes)` overload otherwise — and requires a
//! successful receipt.

use alloy_primitives::{Address, B256, U256};
use serde_json::Value;
use t402::proto::{
    ErrorReason, PaymentPayload, PaymentPayloadV1, PaymentRequirements, PaymentRequirementsV1,
    SettleResponse, VerifyResponse,
};
use t402::scheme::{
    BoxFuture, ExactScheme, SchemeError, SchemeFacilitator, SchemeFacilitatorV1,
};
use t402::timestamp::UnixTimestamp;

use super::types::{
    authorization_signing_hash, eip3009_domain, Eip3009Payload, Eip712DomainExtra,
};
use super::verify::verify_universal_signature;
use crate::networks::chain_id_of;
use crate::signer::{FacilitatorEvmSigner, TransferAuthorization};

/// Settlement headroom required before `validBefore`.
const VALID_BEFORE_HEADROOM_SECS: u64 = 6;

/// Facilitator configuration for the EVM exact scheme.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactEvmConfig {
    /// Deploy ERC-4337 wallets through their ERC-6492 factory during
    /// settlement. Off by default: an undeployed wallet then fails
    /// settlement with `undeployed_smart_wallet`.
    pub deploy_erc4337_with_eip6492: bool,
}

/// The borrowed fields both protocol versions feed into verification.
struct PaymentFacts<'a> {
    scheme: &'a str,
    payload_network: &'a str,
    network: &'a str,
    asset: &'a str,
    pay_to: &'a str,
    amount: &'a str,
    extra: Option<&'a Value>,
    inner: &'a Value,
}

impl<'a> PaymentFacts<'a> {
    fn from_v2(payload: &'a PaymentPayload, requirements: &'a PaymentRequirements) -> Self {
        Self {
            scheme: payload.scheme(),
            payload_network: payload.network(),
            network: &requirements.network,
            asset: &requirements.asset,
            pay_to: &requirements.pay_to,
            amount: &requirements.amount,
            extra: requirements.extra(),
            inner: &payload.payload,
        }
    }

    fn from_v1(payload: &'a PaymentPayloadV1, requirements: &'a PaymentRequirementsV1) -> Self {
        Self {
            scheme: &payload.scheme,
            payload_network: &payload.network,
            network: &requirements.network,
            asset: &requirements.asset,
            pay_to: &requirements.pay_to,
            amount: &requirements.max_amount_required,
            extra: requirements.extra.as_ref(),
            inner: &payload.payload,
        }
    }
}

/// Facilitator-side mechanism for the EVM exact scheme.
pub struct ExactEvmFacilitator<S> {
    signer: S,
    config: ExactEvmConfig,
}

impl<S> std::fmt::Debug for ExactEvmFacilitator<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExactEvmFacilitator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<S> ExactEvmFacilitator<S> {
    /// Creates a facilitator with default configuration.
    pub fn new(signer: S) -> Self {
        Self {
            signer,
            config: ExactEvmConfig::default(),
        }
    }

    /// Creates a facilitator with explicit configuration.
    pub const fn with_config(signer: S, config: ExactEvmConfig) -> Self {
        Self { signer, config }
    }
}

impl<S: FacilitatorEvmSigner> ExactEvmFacilitator<S> {
    async fn verify_facts(&self, facts: &PaymentFacts<'_>) -> VerifyResponse {
        let Ok(evm_payload) = serde_json::from_value::<Eip3009Payload>(facts.inner.clone())
        else {
            return VerifyResponse::invalid(ErrorReason::InvalidPayload, None);
        };
        let payer = evm_payload.authorization.from.to_string();

        if facts.scheme != ExactScheme::NAME {
            return VerifyResponse::invalid(ErrorReason::UnsupportedScheme, Some(payer));
        }
        if facts.payload_network != facts.network {
            return VerifyResponse::invalid(ErrorReason::NetworkMismatch, Some(payer));
        }

        let Some(chain_id) = chain_id_of(facts.network) else {
            return VerifyResponse::invalid(ErrorReason::InvalidNetworkConfig, Some(payer));
        };
        let Ok(asset) = facts.asset.parse::<Address>() else {
            return VerifyResponse::invalid(ErrorReason::InvalidAsset, Some(payer));
        };

        let Some(domain_extra) = facts
            .extra
            .and_then(|v| serde_json::from_value::<Eip712DomainExtra>(v.clone()).ok())
        else {
            return VerifyResponse::invalid(ErrorReason::MissingEip712Domain, Some(payer));
        };

        let authorization = &evm_payload.authorization;
        let recipient_matches = facts
            .pay_to
            .parse::<Address>()
            .is_ok_and(|expected| expected == authorization.to);
        if !recipient_matches {
            return VerifyResponse::invalid(ErrorReason::RecipientMismatch, Some(payer));
        }

        let required = U256::from_str_radix(facts.amount, 10).unwrap_or(U256::MAX);
        if authorization.value.0 < required {
            return VerifyResponse::invalid(ErrorReason::InsufficientAmount, Some(payer));
        }

        let now = UnixTimestamp::now();
        if authorization.valid_before < now + VALID_BEFORE_HEADROOM_SECS {
            return VerifyResponse::invalid(ErrorReason::ValidBeforeExpired, Some(payer));
        }
        if authorization.valid_after > now {
            return VerifyResponse::invalid(ErrorReason::ValidAfterInFuture, Some(payer));
        }

        // Nonce and balance are read over RPC; a lookup failure skips the
        // check rather than failing the payment.
        match self
            .signer
            .is_nonce_used(authorization.from, authorization.nonce, asset)
            .await
        {
            Ok(true) => {
                return VerifyResponse::invalid(ErrorReason::NonceAlreadyUsed, Some(payer));
            }
            Ok(false) => {}
            Err(error) => {
                tracing::debug!(%error, "nonce state lookup failed, continuing");
            }
        }

        match self.signer.get_balance(authorization.from, asset).await {
            Ok(balance) if balance < authorization.value.0 => {
                return VerifyResponse::invalid(ErrorReason::InsufficientBalance, Some(payer));
            }
            Ok(_) => {}
            Err(error) => {
                tracing::debug!(%error, "balance lookup failed, continuing");
            }
        }

        if evm_payload.signature.is_empty() {
            return VerifyResponse::invalid(ErrorReason::InvalidSignature, Some(payer));
        }

        let domain = eip3009_domain(&domain_extra.name, &domain_extra.version, chain_id, asset);
        let hash = authorization_signing_hash(authorization, &domain);

        match verify_universal_signature(
            &self.signer,
            authorization.from,
            hash,
            &evm_payload.signature,
            true,
        )
        .await
        {
            Ok((true, _)) => VerifyResponse::valid(payer),
            Ok((false, _)) => {
                VerifyResponse::invalid(ErrorReason::InvalidSignature, Some(payer))
            }
            Err(error) => {
                VerifyResponse::invalid(ErrorReason::SignatureVerificationFailed, Some(payer))
                    .with_message(error.to_string())
            }
        }
    }

    async fn settle_facts(&self, facts: &PaymentFacts<'_>) -> SettleResponse {
        let network = facts.payload_network.to_owned();

        let verified = self.verify_facts(facts).await;
        if !verified.is_valid {
            let mut response = SettleResponse::error_raw(
                verified.invalid_reason.unwrap_or_default(),
                network,
            );
            if let Some(payer) = verified.payer {
                response = response.with_payer(payer);
            }
            return response;
        }

        // Verification succeeded, so the payload parses and the facts are
        // consistent; re-derive what settlement needs.
        let Ok(evm_payload) = serde_json::from_value::<Eip3009Payload>(facts.inner.clone())
        else {
            return SettleResponse::error(ErrorReason::InvalidPayload, network);
        };
        let authorization = evm_payload.authorization;
        let payer = authorization.from;
        let Ok(asset) = facts.asset.parse::<Address>() else {
            return SettleResponse::error(ErrorReason::InvalidAsset, network)
                .with_payer(payer.to_string());
        };

        let parsed_signature = match super::erc6492::parse_erc6492_signature(&evm_payload.signature)
        {
            Ok(parsed) => parsed,
            Err(error) => {
                return SettleResponse::error(ErrorReason::InvalidSignature, network)
                    .with_message(error.to_string())
                    .with_payer(payer.to_string());
            }
        };

        if parsed_signature.has_deployment_info() {
            match self.signer.get_code(payer).await {
                Ok(code) if code.is_empty() => {
                    if self.config.deploy_erc4337_with_eip6492 {
                        if let Err(error) = self.deploy_smart_wallet(&parsed_signature).await {
                            return SettleResponse::error(
                                ErrorReason::SmartWalletDeploymentFailed,
                                network,
                            )
                            .with_message(error.to_string())
                            .with_payer(payer.to_string());
                        }
                    } else {
                        return SettleResponse::error(
                            ErrorReason::UndeployedSmartWallet,
                            network,
                        )
                        .with_payer(payer.to_string());
                    }
                }
                Ok(_) => {}
                Err(error) => {
                    return SettleResponse::error(ErrorReason::TransactionFailed, network)
                        .with_message(error.to_string())
                        .with_payer(payer.to_string());
                }
            }
        }

        let transfer = TransferAuthorization {
            token: asset,
            from: authorization.from,
            to: authorization.to,
            value: authorization.value.into(),
            valid_after: authorization.valid_after,
            valid_before: authorization.valid_before,
            nonce: authorization.nonce,
        };

        let inner = &parsed_signature.inner_signature;
        let submission = if inner.len() == 65 {
            let v = inner[64];
            let r = B256::from_slice(&inner[..32]);
            let s = B256::from_slice(&inner[32..64]);
            self.signer
                .transfer_with_authorization_vrs(transfer, v, r, s)
                .await
        } else {
            self.signer
                .transfer_with_authorization_bytes(transfer, inner.clone())
                .await
        };

        let transaction_hash = match submission {
            Ok(hash) => hash,
            Err(error) => {
                return SettleResponse::error(ErrorReason::TransactionFailed, network)
                    .with_message(error.to_string())
                    .with_payer(payer.to_string());
            }
        };

        match self.signer.wait_for_receipt(&transaction_hash).await {
            Ok(receipt) if receipt.success => {
                tracing::info!(tx = %receipt.transaction_hash, "transferWithAuthorization settled");
                SettleResponse::success(receipt.transaction_hash, network, payer.to_string())
            }
            Ok(receipt) => {
                tracing::warn!(tx = %receipt.transaction_hash, "transferWithAuthorization reverted");
                SettleResponse::error(ErrorReason::TransactionFailed, network)
                    .with_transaction(receipt.transaction_hash)
                    .with_payer(payer.to_string())
            }
            Err(error) => SettleResponse::error(ErrorReason::TransactionFailed, network)
                .with_message(error.to_string())
                .with_transaction(transaction_hash)
                .with_payer(payer.to_string()),
        }
    }

    async fn deploy_smart_wallet(
        &self,
        signature: &super::erc6492::Erc6492Signature,
    ) -> Result<(), SchemeError> {
        let transaction_hash = self
            .signer
            .send_transaction(signature.factory, signature.factory_calldata.clone())
            .await?;
        let receipt = self.signer.wait_for_receipt(&transaction_hash).await?;
        if receipt.success {
            Ok(())
        } else {
            Err(format!("factory deployment reverted in {transaction_hash}").into())
        }
    }
}

impl<S: FacilitatorEvmSigner> SchemeFacilitator for ExactEvmFacilitator<S> {
    fn scheme(&self) -> &str {
        ExactScheme::NAME
    }

    fn caip_family(&self) -> &str {
        "eip155:*"
    }

    fn get_signers(&self, _network: &str) -> Vec<String> {
        self.signer.addresses()
    }

    fn verify<'a>(
        &'a self,
        payload: &'a PaymentPayload,
        requirements: &'a PaymentRequirements,
    ) -> BoxFuture<'a, VerifyResponse> {
        Box::pin(async move {
            self.verify_facts(&PaymentFacts::from_v2(payload, requirements))
                .await
        })
    }

    fn settle<'a>(
        &'a self,
        payload: &'a PaymentPayload,
        requirements: &'a PaymentRequirements,
    ) -> BoxFuture<'a, SettleResponse> {
        Box::pin(async move {
            self.settle_facts(&PaymentFacts::from_v2(payload, requirements))
                .await
        })
    }
}

impl<S: FacilitatorEvmSigner> SchemeFacilitatorV1 for ExactEvmFacilitator<S> {
    fn scheme(&self) -> &str {
        ExactScheme::NAME
    }

    fn caip_family(&self) -> &str {
        "eip155:*"
    }

    fn get_signers(&self, _network: &str) -> Vec<String> {
        self.signer.addresses()
    }

    fn verify<'a>(
        &'a self,
        payload: &'a PaymentPayloadV1,
        requirements: &'a PaymentRequirementsV1,
    ) -> BoxFuture<'a, VerifyResponse> {
        Box::pin(async move {
            self.verify_facts(&PaymentFacts::from_v1(payload, requirements))
                .await
        })
    }

    fn settle<'a>(
        &'a self,
        payload: &'a PaymentPayloadV1,
        requirements: &'a PaymentRequirementsV1,
    ) -> BoxFuture<'a, SettleResponse> {
        Box::pin(async move {
            self.settle_facts(&PaymentFacts::from_v1(payload, requirements))
                .await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exact::erc6492::wrap_erc6492_signature;
    use crate::exact::types::{Eip3009Authorization, TokenAmount};
    use alloy_primitives::{address, Bytes, FixedBytes};
    use alloy_signer_local::PrivateKeySigner;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    const PAY_TO: Address = address!("0x1111111111111111111111111111111111111111");
    const ASSET: &str = "0x036CbD53842c5426634e7929541eC2318f3dCF7e";
    const NETWORK: &str = "eip155:84532";

    struct MockEvmSigner {
        balances: HashMap<Address, U256>,
        default_balance: U256,
        used_nonces: HashSet<B256>,
        deployed_code: HashMap<Address, Bytes>,
        fail_nonce_lookup: bool,
        fail_balance_lookup: bool,
        receipt_success: bool,
        submitted: Mutex<Vec<String>>,
    }

    impl Default for MockEvmSigner {
        fn default() -> Self {
            Self {
                balances: HashMap::new(),
                default_balance: U256::from(10_000_000u64),
                used_nonces: HashSet::new(),
                deployed_code: HashMap::new(),
                fail_nonce_lookup: false,
                fail_balance_lookup: false,
                receipt_success: true,
                submitted: Mutex::new(Vec::new()),
            }
        }
    }

    impl FacilitatorEvmSigner for MockEvmSigner {
        fn addresses(&self) -> Vec<String> {
            vec!["0xFacilitator00000000000000000000000000000001".into()]
        }

        fn get_code<'a>(
            &'a self,
            address: Address,
        ) -> BoxFuture<'a, Result<Bytes, SchemeError>> {
            Box::pin(async move {
                Ok(self.deployed_code.get(&address).cloned().unwrap_or_default())
            })
        }

        fn get_balance<'a>(
            &'a self,
            owner: Address,
            _token: Address,
        ) -> BoxFuture<'a, Result<U256, SchemeError>> {
            Box::pin(async move {
                if self.fail_balance_lookup {
                    return Err("rpc unreachable".into());
                }
                Ok(self.balances.get(&owner).copied().unwrap_or(self.default_balance))
            })
        }

        fn is_nonce_used<'a>(
            &'a self,
            _authorizer: Address,
            nonce: B256,
            _token: Address,
        ) -> BoxFuture<'a, Result<bool, SchemeError>> {
            Box::pin(async move {
                if self.fail_nonce_lookup {
                    return Err("rpc unreachable".into());
                }
                Ok(self.used_nonces.contains(&nonce))
            })
        }

        fn eip1271_is_valid_signature<'a>(
            &'a self,
            _wallet: Address,
            _hash: B256,
            _signature: Bytes,
        ) -> BoxFuture<'a, Result<FixedBytes<4>, SchemeError>> {
            Box::pin(async move { Ok(FixedBytes([0u8; 4])) })
        }

        fn send_transaction<'a>(
            &'a self,
            _to: Address,
            _calldata: Bytes,
        ) -> BoxFuture<'a, Result<String, SchemeError>> {
            Box::pin(async move {
                self.submitted.lock().unwrap().push("deploy".into());
                Ok("0xdeploytx".into())
            })
        }

        fn transfer_with_authorization_vrs<'a>(
            &'a self,
            _authorization: TransferAuthorization,
            _v: u8,
            _r: B256,
            _s: B256,
        ) -> BoxFuture<'a, Result<String, SchemeError>> {
            Box::pin(async move {
                self.submitted.lock().unwrap().push("vrs".into());
                Ok("0xsettletx".into())
            })
        }

        fn transfer_with_authorization_bytes<'a>(
            &'a self,
            _authorization: TransferAuthorization,
            _signature: Bytes,
        ) -> BoxFuture<'a, Result<String, SchemeError>> {
            Box::pin(async move {
                self.submitted.lock().unwrap().push("bytes".into());
                Ok("0xsettletx".into())
            })
        }

        fn wait_for_receipt<'a>(
            &'a self,
            transaction_hash: &'a str,
        ) -> BoxFuture<'a, Result<crate::signer::EvmReceipt, SchemeError>> {
            Box::pin(async move {
                Ok(crate::signer::EvmReceipt {
                    transaction_hash: transaction_hash.to_owned(),
                    success: self.receipt_success,
                })
            })
        }
    }

    fn requirements(amount: &str) -> PaymentRequirements {
        PaymentRequirements {
            scheme: "exact".into(),
            network: NETWORK.into(),
            asset: ASSET.into(),
            amount: amount.into(),
            pay_to: PAY_TO.to_string(),
            max_timeout_seconds: 600,
            extra: serde_json::json!({"name": "USDC", "version": "2"}),
        }
    }

    async fn signed_payload(
        wallet: &PrivateKeySigner,
        requirements: &PaymentRequirements,
        value: u64,
        valid_after: UnixTimestamp,
        valid_before: UnixTimestamp,
        nonce: B256,
    ) -> PaymentPayload {
        let authorization = Eip3009Authorization {
            from: wallet.address(),
            to: PAY_TO,
            value: TokenAmount(U256::from(value)),
            valid_after,
            valid_before,
            nonce,
        };
        let domain = eip3009_domain("USDC", "2", 84532, ASSET.parse().unwrap());
        let hash = authorization_signing_hash(&authorization, &domain);
        let signature = alloy_signer::Signer::sign_hash(wallet, &hash).await.unwrap();

        PaymentPayload {
            x402_version: 2,
            payload: serde_json::to_value(Eip3009Payload {
                signature: signature.as_bytes().into(),
                authorization,
            })
            .unwrap(),
            accepted: requirements.clone(),
            resource: None,
            extensions: None,
        }
    }

    fn window() -> (UnixTimestamp, UnixTimestamp) {
        let now = UnixTimestamp::now();
        (now - 10, now + 600)
    }

    #[tokio::test]
    async fn test_verify_valid_payment() {
        let wallet = PrivateKeySigner::random();
        let facilitator = ExactEvmFacilitator::new(MockEvmSigner::default());
        let requirements = requirements("1000000");
        let (after, before) = window();
        let payload =
            signed_payload(&wallet, &requirements, 1_000_000, after, before, B256::ZERO).await;

        let response =
            SchemeFacilitator::verify(&facilitator, &payload, &requirements).await;
        assert!(response.is_valid, "reason: {:?}", response.invalid_reason);
        assert_eq!(response.payer.as_deref(), Some(wallet.address().to_string().as_str()));
    }

    #[tokio::test]
    async fn test_amount_boundary() {
        let wallet = PrivateKeySigner::random();
        let facilitator = ExactEvmFacilitator::new(MockEvmSigner::default());
        let requirements = requirements("1000000");
        let (after, before) = window();

        let short =
            signed_payload(&wallet, &requirements, 999_999, after, before, B256::ZERO).await;
        let response = SchemeFacilitator::verify(&facilitator, &short, &requirements).await;
        assert!(!response.is_valid);
        assert_eq!(response.invalid_reason.as_deref(), Some("insufficient_amount"));

        let exact =
            signed_payload(&wallet, &requirements, 1_000_000, after, before, B256::ZERO).await;
        let response = SchemeFacilitator::verify(&facilitator, &exact, &requirements).await;
        assert!(response.is_valid);
    }

    #[tokio::test]
    async fn test_timing_boundary() {
        let wallet = PrivateKeySigner::random();
        let facilitator = ExactEvmFacilitator::new(MockEvmSigner::default());
        let requirements = requirements("1000000");
        let now = UnixTimestamp::now();

        let expiring =
            signed_payload(&wallet, &requirements, 1_000_000, now - 10, now + 5, B256::ZERO)
                .await;
        let response = SchemeFacilitator::verify(&facilitator, &expiring, &requirements).await;
        assert!(!response.is_valid);
        assert_eq!(
            response.invalid_reason.as_deref(),
            Some("valid_before_expired")
        );

        let headroom =
            signed_payload(&wallet, &requirements, 1_000_000, now - 10, now + 6, B256::ZERO)
                .await;
        let response = SchemeFacilitator::verify(&facilitator, &headroom, &requirements).await;
        assert!(response.is_valid, "reason: {:?}", response.invalid_reason);
    }

    #[tokio::test]
    async fn test_valid_after_in_future() {
        let wallet = PrivateKeySigner::random();
        let facilitator = ExactEvmFacilitator::new(MockEvmSigner::default());
        let requirements = requirements("1000000");
        let now = UnixTimestamp::now();

        let early =
            signed_payload(&wallet, &requirements, 1_000_000, now + 60, now + 600, B256::ZERO)
                .await;
        let response = SchemeFacilitator::verify(&facilitator, &early, &requirements).await;
        assert_eq!(
            response.invalid_reason.as_deref(),
            Some("valid_after_in_future")
        );
    }

    #[tokio::test]
    async fn test_recipient_mismatch() {
        let wallet = PrivateKeySigner::random();
        let facilitator = ExactEvmFacilitator::new(MockEvmSigner::default());
        let mut tampered = requirements("1000000");
        let (after, before) = window();
        let payload =
            signed_payload(&wallet, &tampered, 1_000_000, after, before, B256::ZERO).await;

        tampered.pay_to = "0x2222222222222222222222222222222222222222".into();
        let payload = PaymentPayload {
            accepted: tampered.clone(),
            ..payload
        };
        let response = SchemeFacilitator::verify(&facilitator, &payload, &tampered).await;
        assert_eq!(response.invalid_reason.as_deref(), Some("recipient_mismatch"));
    }

    #[tokio::test]
    async fn test_nonce_already_used() {
        let wallet = PrivateKeySigner::random();
        let nonce = B256::repeat_byte(0x07);
        let signer = MockEvmSigner {
            used_nonces: HashSet::from([nonce]),
            ..MockEvmSigner::default()
        };
        let facilitator = ExactEvmFacilitator::new(signer);
        let requirements = requirements("1000000");
        let (after, before) = window();
        let payload = signed_payload(&wallet, &requirements, 1_000_000, after, before, nonce).await;

        let response = SchemeFacilitator::verify(&facilitator, &payload, &requirements).await;
        assert_eq!(response.invalid_reason.as_deref(), Some("nonce_already_used"));
    }

    #[tokio::test]
    async fn test_lookup_failures_are_non_fatal() {
        let wallet = PrivateKeySigner::random();
        let signer = MockEvmSigner {
            fail_nonce_lookup: true,
            fail_balance_lookup: true,
            ..MockEvmSigner::default()
        };
        let facilitator = ExactEvmFacilitator::new(signer);
        let requirements = requirements("1000000");
        let (after, before) = window();
        let payload =
            signed_payload(&wallet, &requirements, 1_000_000, after, before, B256::ZERO).await;

        let response = SchemeFacilitator::verify(&facilitator, &payload, &requirements).await;
        assert!(response.is_valid, "reason: {:?}", response.invalid_reason);
    }

    #[tokio::test]
    async fn test_insufficient_balance() {
        let wallet = PrivateKeySigner::random();
        let signer = MockEvmSigner {
            balances: HashMap::from([(wallet.address(), U256::from(1u64))]),
            ..MockEvmSigner::default()
        };
        let facilitator = ExactEvmFacilitator::new(signer);
        let requirements = requirements("1000000");
        let (after, before) = window();
        let payload =
            signed_payload(&wallet, &requirements, 1_000_000, after, before, B256::ZERO).await;

        let response = SchemeFacilitator::verify(&facilitator, &payload, &requirements).await;
        assert_eq!(
            response.invalid_reason.as_deref(),
            Some("insufficient_balance")
        );
    }

    #[tokio::test]
    async fn test_signature_from_wrong_wallet() {
        let wallet = PrivateKeySigner::random();
        let facilitator = ExactEvmFacilitator::new(MockEvmSigner::default());
        let requirements = requirements("1000000");
        let (after, before) = window();
        let mut payload =
            signed_payload(&wallet, &requirements, 1_000_000, after, before, B256::ZERO).await;

        // Claim the authorization came from a different address.
        payload.payload["authorization"]["from"] =
            serde_json::json!("0x9999999999999999999999999999999999999999");
        let response = SchemeFacilitator::verify(&facilitator, &payload, &requirements).await;
        assert!(!response.is_valid);
        assert_eq!(response.invalid_reason.as_deref(), Some("invalid_signature"));
    }

    #[tokio::test]
    async fn test_settle_success() {
        let wallet = PrivateKeySigner::random();
        let facilitator = ExactEvmFacilitator::new(MockEvmSigner::default());
        let requirements = requirements("1000000");
        let (after, before) = window();
        let payload =
            signed_payload(&wallet, &requirements, 1_000_000, after, before, B256::ZERO).await;

        let response = SchemeFacilitator::settle(&facilitator, &payload, &requirements).await;
        assert!(response.success, "reason: {:?}", response.error_reason);
        assert_eq!(response.transaction, "0xsettletx");
        assert_eq!(response.network, NETWORK);
        // ECDSA signatures settle through the (v, r, s) overload.
        assert_eq!(
            *facilitator.signer.submitted.lock().unwrap(),
            vec!["vrs".to_owned()]
        );
    }

    #[tokio::test]
    async fn test_settle_reverted_transaction() {
        let wallet = PrivateKeySigner::random();
        let signer = MockEvmSigner {
            receipt_success: false,
            ..MockEvmSigner::default()
        };
        let facilitator = ExactEvmFacilitator::new(signer);
        let requirements = requirements("1000000");
        let (after, before) = window();
        let payload =
            signed_payload(&wallet, &requirements, 1_000_000, after, before, B256::ZERO).await;

        let response = SchemeFacilitator::settle(&facilitator, &payload, &requirements).await;
        assert!(!response.success);
        assert_eq!(response.error_reason.as_deref(), Some("transaction_failed"));
        assert_eq!(response.transaction, "0xsettletx");
    }

    #[tokio::test]
    async fn test_settle_undeployed_smart_wallet_without_deploy() {
        let wallet = PrivateKeySigner::random();
        let facilitator = ExactEvmFacilitator::new(MockEvmSigner::default());
        let requirements = requirements("1000000");
        let (after, before) = window();
        let mut payload =
            signed_payload(&wallet, &requirements, 1_000_000, after, before, B256::ZERO).await;

        // Wrap the valid ECDSA signature as a counterfactual-wallet
        // signature with deployment data; the wallet has no code.
        let inner: Bytes = serde_json::from_value(payload.payload["signature"].clone()).unwrap();
        let wrapped = wrap_erc6492_signature(
            address!("0x4444444444444444444444444444444444444444"),
            Bytes::from(vec![0x01]),
            inner,
        );
        payload.payload["signature"] = serde_json::to_value(&wrapped).unwrap();

        let response = SchemeFacilitator::settle(&facilitator, &payload, &requirements).await;
        assert!(!response.success);
        assert_eq!(
            response.error_reason.as_deref(),
            Some("undeployed_smart_wallet")
        );
    }
}
