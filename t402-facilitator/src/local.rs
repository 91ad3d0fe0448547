//! In-process facilitator adapter.
//!
//! Single-binary deployments can run the facilitator next to the
//! resource server and skip HTTP: [`LocalFacilitatorClient`] exposes an
//! [`X402Facilitator`] through the [`FacilitatorClient`] trait the
//! resource server delegates to.

use std::sync::Arc;

use t402::facilitator::X402Facilitator;
use t402::proto::{
    PaymentPayload, PaymentRequirements, SettleResponse, SupportedResponse, VerifyResponse,
};
use t402::scheme::{BoxFuture, SchemeError};
use t402::server::FacilitatorClient;

/// Adapts an in-process [`X402Facilitator`] to [`FacilitatorClient`].
#[derive(Debug, Clone)]
pub struct LocalFacilitatorClient {
    facilitator: Arc<X402Facilitator>,
}

impl LocalFacilitatorClient {
    /// Wraps a shared facilitator.
    #[must_use]
    pub fn new(facilitator: Arc<X402Facilitator>) -> Self {
        Self { facilitator }
    }
}

impl FacilitatorClient for LocalFacilitatorClient {
    fn verify<'a>(
        &'a self,
        payload: &'a PaymentPayload,
        requirements: &'a PaymentRequirements,
    ) -> BoxFuture<'a, Result<VerifyResponse, SchemeError>> {
        Box::pin(async move { self.facilitator.verify(payload, requirements).await })
    }

    fn settle<'a>(
        &'a self,
        payload: &'a PaymentPayload,
        requirements: &'a PaymentRequirements,
    ) -> BoxFuture<'a, Result<SettleResponse, SchemeError>> {
        Box::pin(async move { self.facilitator.settle(payload, requirements).await })
    }

    fn get_supported(&self) -> BoxFuture<'_, Result<SupportedResponse, SchemeError>> {
        Box::pin(async move { Ok(self.facilitator.get_supported()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, Bytes, FixedBytes, B256, U256};
    use alloy_signer_local::PrivateKeySigner;
    use t402::client::X402Client;
    use t402::config::ResourceConfig;
    use t402::server::X402ResourceServer;
    use t402_evm::exact::{ExactEvmClient, ExactEvmFacilitator, ExactEvmServer};
    use t402_evm::signer::{EvmReceipt, FacilitatorEvmSigner, TransferAuthorization};

    struct HappyEvmSigner;

    impl FacilitatorEvmSigner for HappyEvmSigner {
        fn addresses(&self) -> Vec<String> {
            vec!["0xFacilitator00000000000000000000000000000001".into()]
        }

        fn get_code<'a>(
            &'a self,
            _address: Address,
        ) -> BoxFuture<'a, Result<Bytes, SchemeError>> {
            Box::pin(async { Ok(Bytes::new()) })
        }

        fn get_balance<'a>(
            &'a self,
            _owner: Address,
            _token: Address,
        ) -> BoxFuture<'a, Result<U256, SchemeError>> {
            Box::pin(async { Ok(U256::from(100_000_000u64)) })
        }

        fn is_nonce_used<'a>(
            &'a self,
            _authorizer: Address,
            _nonce: B256,
            _token: Address,
        ) -> BoxFuture<'a, Result<bool, SchemeError>> {
            Box::pin(async { Ok(false) })
        }

        fn eip1271_is_valid_signature<'a>(
            &'a self,
            _wallet: Address,
            _hash: B256,
            _signature: Bytes,
        ) -> BoxFuture<'a, Result<FixedBytes<4>, SchemeError>> {
            Box::pin(async { Ok(FixedBytes([0u8; 4])) })
        }

        fn send_transaction<'a>(
            &'a self,
            _to: Address,
            _calldata: Bytes,
        ) -> BoxFuture<'a, Result<String, SchemeError>> {
            Box::pin(async { Ok("0xdeploy".into()) })
        }

        fn transfer_with_authorization_vrs<'a>(
            &'a self,
            _authorization: TransferAuthorization,
            _v: u8,
            _r: B256,
            _s: B256,
        ) -> BoxFuture<'a, Result<String, SchemeError>> {
            Box::pin(async { Ok("0xe2e5e771ement".into()) })
        }

        fn transfer_with_authorization_bytes<'a>(
            &'a self,
            _authorization: TransferAuthorization,
            _signature: Bytes,
        ) -> BoxFuture<'a, Result<String, SchemeError>> {
            Box::pin(async { Ok("0xe2e5e771ement".into()) })
        }

        fn wait_for_receipt<'a>(
            &'a self,
            transaction_hash: &'a str,
        ) -> BoxFuture<'a, Result<EvmReceipt, SchemeError>> {
            Box::pin(async move {
                Ok(EvmReceipt {
                    transaction_hash: transaction_hash.to_owned(),
                    success: true,
                })
            })
        }
    }

    const USDC: &str = "0x036CbD53842c5426634e7929541eC2318f3dCF7e";
    const PAY_TO: &str = "0xabcabcabcabcabcabcabcabcabcabcabcabcabc0";

    // Full handshake on eip155:84532: server builds requirements, client
    // signs, facilitator verifies and settles through the local adapter.
    #[tokio::test]
    async fn test_end_to_end_payment_flow() {
        let mut facilitator = X402Facilitator::new();
        facilitator.register(
            vec!["eip155:84532".into()],
            Box::new(ExactEvmFacilitator::new(HappyEvmSigner)),
        );
        let facilitator = Arc::new(facilitator);

        let mut server = X402ResourceServer::with_facilitator(Box::new(
            LocalFacilitatorClient::new(Arc::clone(&facilitator)),
        ));
        server.register("eip155:84532".into(), Box::new(ExactEvmServer::new()));
        server.initialize().await.unwrap();

        let requirements = server
            .build_payment_requirements(&ResourceConfig {
                scheme: "exact".into(),
                pay_to: PAY_TO.into(),
                price: serde_json::json!({"amount": "1000000", "asset": USDC}),
                network: "eip155:84532".into(),
                max_timeout_seconds: Some(600),
            })
            .unwrap();
        assert_eq!(requirements[0].amount, "1000000");
        let challenge = server.create_payment_required(requirements.clone(), None, None, None);

        let wallet = PrivateKeySigner::random();
        let payer = wallet.address().to_string();
        let mut client = X402Client::new();
        client.register("eip155:*".into(), Box::new(ExactEvmClient::new(wallet)));
        let payload = client.create_payment_payload(&challenge).await.unwrap();

        let matched = server
            .find_matching_requirements(&requirements, &payload)
            .expect("payload fulfills the offered requirement");

        let verified = server.verify_payment(&payload, matched).await.unwrap();
        assert!(verified.is_valid, "reason: {:?}", verified.invalid_reason);
        assert_eq!(verified.payer.as_deref(), Some(payer.as_str()));

        let settled = server.settle_payment(&payload, matched).await.unwrap();
        assert!(settled.success, "reason: {:?}", settled.error_reason);
        assert!(!settled.transaction.is_empty());
        assert_eq!(settled.network, "eip155:84532");
    }
}
