//! Facilitator-side validation, simulation, and settlement for the SVM
//! exact scheme.
//!
//! A submitted transaction must decode as a versioned transaction with
//! 3–6 instructions in a fixed shape: `[SetComputeUnitLimit,
//! SetComputeUnitPrice, TransferChecked, ≤3 × (Lighthouse | Memo)]`.
//! The instruction count is rejected before any instruction is
//! inspected. The transfer authority must not be a fee payer this
//! facilitator controls — otherwise a malicious client could trick the
//! facilitator into authorizing its own funds away. After the static
//! checks pass, the facilitator co-signs as fee payer and simulates the
//! transaction with signature verification enabled; settlement re-signs,
//! submits with preflight skipped, and polls for confirmation.

use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::Value;
use solana_compute_budget_interface::ID as COMPUTE_BUDGET_PROGRAM_ID;
use solana_pubkey::Pubkey;
use t402::proto::{
    ErrorReason, PaymentPayload, PaymentPayloadV1, PaymentRequirements, PaymentRequirementsV1,
    SettleResponse, VerifyResponse,
};
use t402::scheme::{
    BoxFuture, ExactScheme, SchemeFacilitator, SchemeFacilitatorV1,
};

use super::transaction::{decode_transaction, parse_transfer_checked, program_id_at};
use super::types::{
    derive_ata, ExactSvmPayload, SupportedKindExtra, COMPUTE_LIMIT_DISCRIMINATOR,
    COMPUTE_PRICE_DISCRIMINATOR, LIGHTHOUSE_PROGRAM_ID, MAX_COMPUTE_UNIT_PRICE, MEMO_PROGRAM_ID,
};
use crate::signer::FacilitatorSvmSigner;

/// The borrowed fields both protocol versions feed into verification.
struct PaymentFacts<'a> {
    scheme: &'a str,
    requirements_scheme: &'a str,
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
            requirements_scheme: &requirements.scheme,
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
            requirements_scheme: &requirements.scheme,
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

/// Facilitator-side mechanism for the SVM exact scheme.
pub struct ExactSvmFacilitator<S> {
    signer: S,
    fee_payer_cursor: AtomicUsize,
}

impl<S> std::fmt::Debug for ExactSvmFacilitator<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExactSvmFacilitator").finish_non_exhaustive()
    }
}

impl<S> ExactSvmFacilitator<S> {
    /// Creates a facilitator around the given signer.
    pub const fn new(signer: S) -> Self {
        Self {
            signer,
            fee_payer_cursor: AtomicUsize::new(0),
        }
    }
}

impl<S: FacilitatorSvmSigner> ExactSvmFacilitator<S> {
    async fn verify_facts(&self, facts: &PaymentFacts<'_>) -> VerifyResponse {
        if facts.scheme != ExactScheme::NAME || facts.requirements_scheme != ExactScheme::NAME {
            return VerifyResponse::invalid(ErrorReason::UnsupportedScheme, None);
        }
        if facts.payload_network != facts.network {
            return VerifyResponse::invalid(ErrorReason::NetworkMismatch, None);
        }

        let Some(fee_payer) = facts
            .extra
            .and_then(|v| serde_json::from_value::<SupportedKindExtra>(v.clone()).ok())
            .map(|extra| extra.fee_payer)
        else {
            return VerifyResponse::invalid(ErrorReason::FeePayerMissing, None);
        };

        let managed = self.signer.addresses();
        if !managed.contains(&fee_payer) {
            return VerifyResponse::invalid(ErrorReason::FeePayerNotManaged, None);
        }

        let Ok(svm_payload) = serde_json::from_value::<ExactSvmPayload>(facts.inner.clone())
        else {
            return VerifyResponse::invalid(ErrorReason::InvalidPayload, None);
        };
        let Ok(transaction) = decode_transaction(&svm_payload.transaction) else {
            return VerifyResponse::invalid(ErrorReason::TransactionDecodeFailed, None);
        };

        // The count gate comes before any instruction is inspected.
        let instruction_count = transaction.message.instructions().len();
        if !(3..=6).contains(&instruction_count) {
            return VerifyResponse::invalid(ErrorReason::InvalidInstructionCount, None);
        }

        let limit_data = transaction.message.instructions()[0].data.as_slice();
        if program_id_at(&transaction, 0).ok() != Some(COMPUTE_BUDGET_PROGRAM_ID)
            || limit_data.first().copied() != Some(COMPUTE_LIMIT_DISCRIMINATOR)
            || limit_data.len() != 5
        {
            return VerifyResponse::invalid(ErrorReason::InvalidComputeLimit, None);
        }

        let price_data = transaction.message.instructions()[1].data.as_slice();
        if program_id_at(&transaction, 1).ok() != Some(COMPUTE_BUDGET_PROGRAM_ID)
            || price_data.first().copied() != Some(COMPUTE_PRICE_DISCRIMINATOR)
            || price_data.len() != 9
        {
            return VerifyResponse::invalid(ErrorReason::InvalidComputePrice, None);
        }
        let mut price_bytes = [0u8; 8];
        price_bytes.copy_from_slice(&price_data[1..9]);
        if u64::from_le_bytes(price_bytes) > MAX_COMPUTE_UNIT_PRICE {
            return VerifyResponse::invalid(ErrorReason::ComputePriceTooHigh, None);
        }

        let Ok(transfer) = parse_transfer_checked(&transaction, 2) else {
            return VerifyResponse::invalid(ErrorReason::NoTransferInstruction, None);
        };
        let payer = transfer.authority.to_string();

        for index in 3..instruction_count {
            let program = program_id_at(&transaction, index).ok();
            if program != Some(LIGHTHOUSE_PROGRAM_ID) && program != Some(MEMO_PROGRAM_ID) {
                return VerifyResponse::invalid(
                    ErrorReason::UnknownExtraInstruction,
                    Some(payer),
                )
                .with_message(format!("instruction {index} targets an unexpected program"));
            }
        }

        if managed.contains(&payer) {
            return VerifyResponse::invalid(ErrorReason::FeePayerTransferring, Some(payer));
        }

        let mint_matches = facts
            .asset
            .parse::<Pubkey>()
            .is_ok_and(|mint| mint == transfer.mint);
        if !mint_matches {
            return VerifyResponse::invalid(ErrorReason::MintMismatch, Some(payer));
        }

        let expected_destination = facts
            .pay_to
            .parse::<Pubkey>()
            .map(|owner| derive_ata(&owner, &transfer.mint, &transfer.token_program));
        if expected_destination.ok() != Some(transfer.destination) {
            return VerifyResponse::invalid(ErrorReason::RecipientMismatch, Some(payer));
        }

        let required: u64 = facts.amount.parse().unwrap_or(u64::MAX);
        if transfer.amount < required {
            return VerifyResponse::invalid(ErrorReason::InsufficientAmount, Some(payer));
        }

        // Co-sign as fee payer and prove the transaction would succeed.
        let simulated = async {
            let signed = self
                .signer
                .sign_transaction(&svm_payload.transaction, &fee_payer, facts.network)
                .await?;
            self.signer
                .simulate_transaction(&signed, facts.network)
                .await
        }
        .await;

        match simulated {
            Ok(()) => VerifyResponse::valid(payer),
            Err(error) => VerifyResponse::invalid(ErrorReason::SimulationFailed, Some(payer))
                .with_message(error.to_string()),
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
        let payer = verified.payer.unwrap_or_default();

        // Verification guarantees the payload parses and extra carries a
        // managed fee payer.
        let Ok(svm_payload) = serde_json::from_value::<ExactSvmPayload>(facts.inner.clone())
        else {
            return SettleResponse::error(ErrorReason::InvalidPayload, network);
        };
        let fee_payer = facts
            .extra
            .and_then(|v| serde_json::from_value::<SupportedKindExtra>(v.clone()).ok())
            .map(|extra| extra.fee_payer)
            .unwrap_or_default();

        let settled = async {
            let signed = self
                .signer
                .sign_transaction(&svm_payload.transaction, &fee_payer, facts.network)
                .await?;
            let signature = self.signer.send_transaction(&signed, facts.network).await?;
            self.signer
                .confirm_transaction(&signature, facts.network)
                .await?;
            Ok::<String, t402::scheme::SchemeError>(signature)
        }
        .await;

        match settled {
            Ok(signature) => {
                tracing::info!(tx = %signature, "SPL transfer settled");
                SettleResponse::success(signature, network, payer)
            }
            Err(error) => SettleResponse::error(ErrorReason::TransactionFailed, network)
                .with_message(error.to_string())
                .with_payer(payer),
        }
    }

    fn next_fee_payer(&self) -> Option<String> {
        let addresses = self.signer.addresses();
        if addresses.is_empty() {
            return None;
        }
        let index = self.fee_payer_cursor.fetch_add(1, Ordering::Relaxed) % addresses.len();
        addresses.into_iter().nth(index)
    }
}

impl<S: FacilitatorSvmSigner> SchemeFacilitator for ExactSvmFacilitator<S> {
    fn scheme(&self) -> &str {
        ExactScheme::NAME
    }

    fn caip_family(&self) -> &str {
        "solana:*"
    }

    fn get_extra(&self, _network: &str) -> Option<Value> {
        // Rotating over the managed addresses spreads fee-payer load.
        let fee_payer = self.next_fee_payer()?;
        serde_json::to_value(SupportedKindExtra { fee_payer }).ok()
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

impl<S: FacilitatorSvmSigner> SchemeFacilitatorV1 for ExactSvmFacilitator<S> {
    fn scheme(&self) -> &str {
        ExactScheme::NAME
    }

    fn caip_family(&self) -> &str {
        "solana:*"
    }

    fn get_extra(&self, _network: &str) -> Option<Value> {
        let fee_payer = self.next_fee_payer()?;
        serde_json::to_value(SupportedKindExtra { fee_payer }).ok()
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
    use crate::exact::transaction::encode_transaction;
    use solana_compute_budget_interface::ComputeBudgetInstruction;
    use solana_message::{v0::Message as MessageV0, Hash, VersionedMessage};
    use solana_signature::Signature;
    use solana_transaction::versioned::VersionedTransaction;
    use solana_transaction::Instruction;
    use std::sync::Mutex;
    use t402::scheme::SchemeError;

    struct MockSvmSigner {
        fee_payer: Pubkey,
        simulate_ok: bool,
        simulated: Mutex<u32>,
        sent: Mutex<Vec<String>>,
    }

    impl MockSvmSigner {
        fn new() -> Self {
            Self {
                fee_payer: Pubkey::new_unique(),
                simulate_ok: true,
                simulated: Mutex::new(0),
                sent: Mutex::new(Vec::new()),
            }
        }
    }

    impl FacilitatorSvmSigner for MockSvmSigner {
        fn addresses(&self) -> Vec<String> {
            vec![self.fee_payer.to_string()]
        }

        fn sign_transaction<'a>(
            &'a self,
            transaction_b64: &'a str,
            _fee_payer: &'a str,
            _network: &'a str,
        ) -> BoxFuture<'a, Result<String, SchemeError>> {
            Box::pin(async move { Ok(transaction_b64.to_owned()) })
        }

        fn simulate_transaction<'a>(
            &'a self,
            _transaction_b64: &'a str,
            _network: &'a str,
        ) -> BoxFuture<'a, Result<(), SchemeError>> {
            Box::pin(async move {
                *self.simulated.lock().unwrap() += 1;
                if self.simulate_ok {
                    Ok(())
                } else {
                    Err("program failed: custom error".into())
                }
            })
        }

        fn send_transaction<'a>(
            &'a self,
            transaction_b64: &'a str,
            _network: &'a str,
        ) -> BoxFuture<'a, Result<String, SchemeError>> {
            Box::pin(async move {
                self.sent.lock().unwrap().push(transaction_b64.to_owned());
                Ok("5ettlementSignature".into())
            })
        }

        fn confirm_transaction<'a>(
            &'a self,
            _signature: &'a str,
            _network: &'a str,
        ) -> BoxFuture<'a, Result<(), SchemeError>> {
            Box::pin(async move { Ok(()) })
        }
    }

    const NETWORK: &str = "solana:EtWTRABZaYq6iMfeYKouRu166VU2xqa1";

    struct Scenario {
        mint: Pubkey,
        pay_to: Pubkey,
        authority: Pubkey,
    }

    impl Scenario {
        fn new() -> Self {
            Self {
                mint: Pubkey::new_unique(),
                pay_to: Pubkey::new_unique(),
                authority: Pubkey::new_unique(),
            }
        }

        fn transfer_instruction(&self, amount: u64) -> Instruction {
            let source = derive_ata(&self.authority, &self.mint, &spl_token::ID);
            let destination = derive_ata(&self.pay_to, &self.mint, &spl_token::ID);
            spl_token::instruction::transfer_checked(
                &spl_token::ID,
                &source,
                &self.mint,
                &destination,
                &self.authority,
                &[],
                amount,
                6,
            )
            .unwrap()
        }

        fn transaction(&self, fee_payer: Pubkey, instructions: &[Instruction]) -> String {
            let message =
                MessageV0::try_compile(&fee_payer, instructions, &[], Hash::new_unique()).unwrap();
            let message = VersionedMessage::V0(message);
            let required = message.header().num_required_signatures as usize;
            let transaction = VersionedTransaction {
                signatures: vec![Signature::default(); required],
                message,
            };
            encode_transaction(&transaction).unwrap()
        }

        fn standard_instructions(&self, amount: u64) -> Vec<Instruction> {
            vec![
                ComputeBudgetInstruction::set_compute_unit_limit(20_000),
                ComputeBudgetInstruction::set_compute_unit_price(1),
                self.transfer_instruction(amount),
            ]
        }

        fn payment(
            &self,
            fee_payer: &Pubkey,
            transaction_b64: String,
            amount: &str,
        ) -> (PaymentPayload, PaymentRequirements) {
            let requirements = PaymentRequirements {
                scheme: "exact".into(),
                network: NETWORK.into(),
                asset: self.mint.to_string(),
                amount: amount.into(),
                pay_to: self.pay_to.to_string(),
                max_timeout_seconds: 300,
                extra: serde_json::json!({"feePayer": fee_payer.to_string()}),
            };
            let payload = PaymentPayload {
                x402_version: 2,
                payload: serde_json::json!({"transaction": transaction_b64}),
                accepted: requirements.clone(),
                resource: None,
                extensions: None,
            };
            (payload, requirements)
        }
    }

    #[tokio::test]
    async fn test_verify_valid_transfer() {
        let signer = MockSvmSigner::new();
        let fee_payer = signer.fee_payer;
        let facilitator = ExactSvmFacilitator::new(signer);
        let scenario = Scenario::new();

        let tx = scenario.transaction(fee_payer, &scenario.standard_instructions(1_000_000));
        let (payload, requirements) = scenario.payment(&fee_payer, tx, "1000000");

        let response = SchemeFacilitator::verify(&facilitator, &payload, &requirements).await;
        assert!(response.is_valid, "reason: {:?}", response.invalid_reason);
        assert_eq!(response.payer.as_deref(), Some(scenario.authority.to_string().as_str()));
        assert_eq!(*facilitator.signer.simulated.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_seven_instructions_rejected_before_inspection() {
        let signer = MockSvmSigner::new();
        let fee_payer = signer.fee_payer;
        let facilitator = ExactSvmFacilitator::new(signer);
        let scenario = Scenario::new();

        let mut instructions = scenario.standard_instructions(1_000_000);
        for _ in 0..4 {
            instructions.push(Instruction::new_with_bytes(
                MEMO_PROGRAM_ID,
                b"pad",
                Vec::new(),
            ));
        }
        assert_eq!(instructions.len(), 7);
        let tx = scenario.transaction(fee_payer, &instructions);
        let (payload, requirements) = scenario.payment(&fee_payer, tx, "1000000");

        let response = SchemeFacilitator::verify(&facilitator, &payload, &requirements).await;
        assert_eq!(
            response.invalid_reason.as_deref(),
            Some("invalid_instruction_count")
        );
        // Rejected before any instruction (or simulation) was touched.
        assert_eq!(*facilitator.signer.simulated.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_fee_payer_transferring_rejected() {
        let signer = MockSvmSigner::new();
        let fee_payer = signer.fee_payer;
        let facilitator = ExactSvmFacilitator::new(signer);
        let mut scenario = Scenario::new();
        // The transfer authority is the facilitator's own fee payer.
        scenario.authority = fee_payer;

        let tx = scenario.transaction(fee_payer, &scenario.standard_instructions(1_000_000));
        let (payload, requirements) = scenario.payment(&fee_payer, tx, "1000000");

        let response = SchemeFacilitator::verify(&facilitator, &payload, &requirements).await;
        assert_eq!(
            response.invalid_reason.as_deref(),
            Some("fee_payer_transferring")
        );
    }

    #[tokio::test]
    async fn test_unmanaged_fee_payer_rejected() {
        let facilitator = ExactSvmFacilitator::new(MockSvmSigner::new());
        let scenario = Scenario::new();
        let foreign = Pubkey::new_unique();

        let tx = scenario.transaction(foreign, &scenario.standard_instructions(1_000_000));
        let (payload, requirements) = scenario.payment(&foreign, tx, "1000000");

        let response = SchemeFacilitator::verify(&facilitator, &payload, &requirements).await;
        assert_eq!(
            response.invalid_reason.as_deref(),
            Some("fee_payer_not_managed")
        );
    }

    #[tokio::test]
    async fn test_mint_mismatch() {
        let signer = MockSvmSigner::new();
        let fee_payer = signer.fee_payer;
        let facilitator = ExactSvmFacilitator::new(signer);
        let scenario = Scenario::new();

        let tx = scenario.transaction(fee_payer, &scenario.standard_instructions(1_000_000));
        let (payload, mut requirements) = scenario.payment(&fee_payer, tx, "1000000");
        requirements.asset = Pubkey::new_unique().to_string();
        let payload = PaymentPayload {
            accepted: requirements.clone(),
            ..payload
        };

        let response = SchemeFacilitator::verify(&facilitator, &payload, &requirements).await;
        assert_eq!(response.invalid_reason.as_deref(), Some("mint_mismatch"));
    }

    #[tokio::test]
    async fn test_destination_must_be_recipient_ata() {
        let signer = MockSvmSigner::new();
        let fee_payer = signer.fee_payer;
        let facilitator = ExactSvmFacilitator::new(signer);
        let scenario = Scenario::new();

        let tx = scenario.transaction(fee_payer, &scenario.standard_instructions(1_000_000));
        let (payload, mut requirements) = scenario.payment(&fee_payer, tx, "1000000");
        // Point payTo elsewhere: the transfer's destination ATA no longer matches.
        requirements.pay_to = Pubkey::new_unique().to_string();
        let payload = PaymentPayload {
            accepted: requirements.clone(),
            ..payload
        };

        let response = SchemeFacilitator::verify(&facilitator, &payload, &requirements).await;
        assert_eq!(
            response.invalid_reason.as_deref(),
            Some("recipient_mismatch")
        );
    }

    #[tokio::test]
    async fn test_amount_below_required() {
        let signer = MockSvmSigner::new();
        let fee_payer = signer.fee_payer;
        let facilitator = ExactSvmFacilitator::new(signer);
        let scenario = Scenario::new();

        let tx = scenario.transaction(fee_payer, &scenario.standard_instructions(999_999));
        let (payload, requirements) = scenario.payment(&fee_payer, tx, "1000000");

        let response = SchemeFacilitator::verify(&facilitator, &payload, &requirements).await;
        assert_eq!(
            response.invalid_reason.as_deref(),
            Some("insufficient_amount")
        );
    }

    #[tokio::test]
    async fn test_compute_price_above_cap() {
        let signer = MockSvmSigner::new();
        let fee_payer = signer.fee_payer;
        let facilitator = ExactSvmFacilitator::new(signer);
        let scenario = Scenario::new();

        let instructions = vec![
            ComputeBudgetInstruction::set_compute_unit_limit(20_000),
            ComputeBudgetInstruction::set_compute_unit_price(MAX_COMPUTE_UNIT_PRICE + 1),
            scenario.transfer_instruction(1_000_000),
        ];
        let tx = scenario.transaction(fee_payer, &instructions);
        let (payload, requirements) = scenario.payment(&fee_payer, tx, "1000000");

        let response = SchemeFacilitator::verify(&facilitator, &payload, &requirements).await;
        assert_eq!(
            response.invalid_reason.as_deref(),
            Some("compute_price_too_high")
        );
    }

    #[tokio::test]
    async fn test_unknown_trailing_instruction() {
        let signer = MockSvmSigner::new();
        let fee_payer = signer.fee_payer;
        let facilitator = ExactSvmFacilitator::new(signer);
        let scenario = Scenario::new();

        let mut instructions = scenario.standard_instructions(1_000_000);
        instructions.push(Instruction::new_with_bytes(
            Pubkey::new_unique(),
            b"sneaky",
            Vec::new(),
        ));
        let tx = scenario.transaction(fee_payer, &instructions);
        let (payload, requirements) = scenario.payment(&fee_payer, tx, "1000000");

        let response = SchemeFacilitator::verify(&facilitator, &payload, &requirements).await;
        assert_eq!(
            response.invalid_reason.as_deref(),
            Some("unknown_extra_instruction")
        );
    }

    #[tokio::test]
    async fn test_simulation_failure() {
        let signer = MockSvmSigner {
            simulate_ok: false,
            ..MockSvmSigner::new()
        };
        let fee_payer = signer.fee_payer;
        let facilitator = ExactSvmFacilitator::new(signer);
        let scenario = Scenario::new();

        let tx = scenario.transaction(fee_payer, &scenario.standard_instructions(1_000_000));
        let (payload, requirements) = scenario.payment(&fee_payer, tx, "1000000");

        let response = SchemeFacilitator::verify(&facilitator, &payload, &requirements).await;
        assert_eq!(response.invalid_reason.as_deref(), Some("simulation_failed"));
        assert!(response.invalid_message.is_some());
    }

    #[tokio::test]
    async fn test_settle_success() {
        let signer = MockSvmSigner::new();
        let fee_payer = signer.fee_payer;
        let facilitator = ExactSvmFacilitator::new(signer);
        let scenario = Scenario::new();

        let tx = scenario.transaction(fee_payer, &scenario.standard_instructions(1_000_000));
        let (payload, requirements) = scenario.payment(&fee_payer, tx, "1000000");

        let response = SchemeFacilitator::settle(&facilitator, &payload, &requirements).await;
        assert!(response.success, "reason: {:?}", response.error_reason);
        assert_eq!(response.transaction, "5ettlementSignature");
        assert_eq!(facilitator.signer.sent.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_get_extra_rotates_fee_payers() {
        struct TwoKeys;
        impl FacilitatorSvmSigner for TwoKeys {
            fn addresses(&self) -> Vec<String> {
                vec!["Alpha".into(), "Beta".into()]
            }
            fn sign_transaction<'a>(
                &'a self,
                _t: &'a str,
                _f: &'a str,
                _n: &'a str,
            ) -> BoxFuture<'a, Result<String, SchemeError>> {
                Box::pin(async { Ok(String::new()) })
            }
            fn simulate_transaction<'a>(
                &'a self,
                _t: &'a str,
                _n: &'a str,
            ) -> BoxFuture<'a, Result<(), SchemeError>> {
                Box::pin(async { Ok(()) })
            }
            fn send_transaction<'a>(
                &'a self,
                _t: &'a str,
                _n: &'a str,
            ) -> BoxFuture<'a, Result<String, SchemeError>> {
                Box::pin(async { Ok(String::new()) })
            }
            fn confirm_transaction<'a>(
                &'a self,
                _s: &'a str,
                _n: &'a str,
            ) -> BoxFuture<'a, Result<(), SchemeError>> {
                Box::pin(async { Ok(()) })
            }
        }

        let facilitator = ExactSvmFacilitator::new(TwoKeys);
        let first = SchemeFacilitator::get_extra(&facilitator, "solana:x").unwrap();
        let second = SchemeFacilitator::get_extra(&facilitator, "solana:x").unwrap();
        assert_ne!(first["feePayer"], second["feePayer"]);
    }
}
