//! Client-side transaction building for the SVM exact scheme.
//!
//! Builds the fixed instruction shape the facilitator expects —
//! `[SetComputeUnitLimit, SetComputeUnitPrice, TransferChecked, Memo]`
//! (the memo carries a random nonce so otherwise-identical transfers
//! stay distinct) — and signs it.
//!
//! The two protocol versions sign differently. The V2 client compiles
//! the message against the facilitator's fee payer and fills only its
//! own signature slot, leaving a placeholder in the fee-payer slot for
//! the facilitator to co-sign. The V1 client pays its own fees and signs
//! as sole signer.

use rand::Rng;
use serde_json::Value;
use solana_compute_budget_interface::ComputeBudgetInstruction;
use solana_message::{v0::Message as MessageV0, VersionedMessage};
use solana_pubkey::Pubkey;
use solana_signature::Signature;
use solana_transaction::versioned::VersionedTransaction;
use solana_transaction::Instruction;
use t402::proto::{PaymentRequirements, PaymentRequirementsV1};
use t402::scheme::{BoxFuture, SchemeClient, SchemeClientV1, SchemeError};

use super::transaction::encode_transaction;
use super::types::{
    derive_ata, ExactSvmPayload, SupportedKindExtra, DEFAULT_COMPUTE_UNIT_LIMIT,
    DEFAULT_COMPUTE_UNIT_PRICE, MEMO_PROGRAM_ID,
};
use crate::signer::{ClientSvmSigner, SvmChainReader};

struct TransferInputs {
    mint: Pubkey,
    pay_to: Pubkey,
    amount: u64,
    fee_payer: Option<Pubkey>,
    network: String,
}

impl TransferInputs {
    fn from_v2(requirements: &PaymentRequirements) -> Result<Self, SchemeError> {
        let fee_payer = requirements
            .extra()
            .and_then(|v| serde_json::from_value::<SupportedKindExtra>(v.clone()).ok())
            .ok_or("missing feePayer in requirements extra")?
            .fee_payer
            .parse::<Pubkey>()
            .map_err(|e| format!("invalid feePayer address: {e}"))?;
        Ok(Self {
            mint: parse_pubkey("asset", &requirements.asset)?,
            pay_to: parse_pubkey("payTo", &requirements.pay_to)?,
            amount: parse_amount(&requirements.amount)?,
            fee_payer: Some(fee_payer),
            network: requirements.network.clone(),
        })
    }

    fn from_v1(requirements: &PaymentRequirementsV1) -> Result<Self, SchemeError> {
        Ok(Self {
            mint: parse_pubkey("asset", &requirements.asset)?,
            pay_to: parse_pubkey("payTo", &requirements.pay_to)?,
            amount: parse_amount(&requirements.max_amount_required)?,
            fee_payer: None,
            network: requirements.network.clone(),
        })
    }
}

fn parse_pubkey(field: &str, value: &str) -> Result<Pubkey, SchemeError> {
    value
        .parse()
        .map_err(|e| format!("invalid {field} address: {e}").into())
}

fn parse_amount(value: &str) -> Result<u64, SchemeError> {
    value
        .parse()
        .map_err(|_| format!("invalid amount: {value}").into())
}

async fn build_signed_transaction<S, R>(
    signer: &S,
    reader: &R,
    inputs: TransferInputs,
) -> Result<Value, SchemeError>
where
    S: ClientSvmSigner,
    R: SvmChainReader,
{
    let payer_pubkey = signer.pubkey();
    let fee_payer = inputs.fee_payer.unwrap_or(payer_pubkey);

    let mint_info = reader.mint_info(&inputs.mint, &inputs.network).await?;
    let source = derive_ata(&payer_pubkey, &inputs.mint, &mint_info.token_program);
    let destination = derive_ata(&inputs.pay_to, &inputs.mint, &mint_info.token_program);

    let transfer = if mint_info.token_program == spl_token_2022::ID {
        spl_token_2022::instruction::transfer_checked(
            &mint_info.token_program,
            &source,
            &inputs.mint,
            &destination,
            &payer_pubkey,
            &[],
            inputs.amount,
            mint_info.decimals,
        )
        .map_err(|e| -> SchemeError { e.to_string().into() })?
    } else {
        spl_token::instruction::transfer_checked(
            &mint_info.token_program,
            &source,
            &inputs.mint,
            &destination,
            &payer_pubkey,
            &[],
            inputs.amount,
            mint_info.decimals,
        )
        .map_err(|e| -> SchemeError { e.to_string().into() })?
    };

    let nonce: [u8; 16] = rand::rng().random();
    let instructions = [
        ComputeBudgetInstruction::set_compute_unit_limit(DEFAULT_COMPUTE_UNIT_LIMIT),
        ComputeBudgetInstruction::set_compute_unit_price(DEFAULT_COMPUTE_UNIT_PRICE),
        transfer,
        Instruction::new_with_bytes(MEMO_PROGRAM_ID, &nonce, Vec::new()),
    ];

    let blockhash = reader.latest_blockhash(&inputs.network).await?;
    let message = MessageV0::try_compile(&fee_payer, &instructions, &[], blockhash)
        .map_err(|e| -> SchemeError { e.to_string().into() })?;
    let message = VersionedMessage::V0(message);

    let signature = signer.sign_message(&message.serialize())?;

    let required = message.header().num_required_signatures as usize;
    let position = message.static_account_keys()[..required]
        .iter()
        .position(|key| *key == payer_pubkey)
        .ok_or("signer is not a required signer of the compiled message")?;

    let mut signatures = vec![Signature::default(); required];
    signatures[position] = signature;

    let transaction = VersionedTransaction {
        signatures,
        message,
    };
    let payload = ExactSvmPayload {
        transaction: encode_transaction(&transaction)?,
    };
    Ok(serde_json::to_value(payload)?)
}

/// V2 client-side mechanism for the SVM exact scheme.
pub struct ExactSvmClient<S, R> {
    signer: S,
    reader: R,
}

impl<S, R> std::fmt::Debug for ExactSvmClient<S, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExactSvmClient").finish_non_exhaustive()
    }
}

impl<S, R> ExactSvmClient<S, R> {
    /// Creates the client around a payer keypair and a chain reader.
    pub const fn new(signer: S, reader: R) -> Self {
        Self { signer, reader }
    }
}

impl<S, R> SchemeClient for ExactSvmClient<S, R>
where
    S: ClientSvmSigner,
    R: SvmChainReader,
{
    fn scheme(&self) -> &str {
        t402::scheme::ExactScheme::NAME
    }

    fn create_payment_payload<'a>(
        &'a self,
        requirements: &'a PaymentRequirements,
    ) -> BoxFuture<'a, Result<Value, SchemeError>> {
        Box::pin(async move {
            let inputs = TransferInputs::from_v2(requirements)?;
            build_signed_transaction(&self.signer, &self.reader, inputs).await
        })
    }
}

/// V1 (legacy) client-side mechanism for the SVM exact scheme.
///
/// Self-signs as sole signer and fee payer, unlike the V2 client which
/// leaves the fee-payer slot for the facilitator.
pub struct ExactSvmClientV1<S, R> {
    signer: S,
    reader: R,
}

impl<S, R> std::fmt::Debug for ExactSvmClientV1<S, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExactSvmClientV1").finish_non_exhaustive()
    }
}

impl<S, R> ExactSvmClientV1<S, R> {
    /// Creates the client around a payer keypair and a chain reader.
    pub const fn new(signer: S, reader: R) -> Self {
        Self { signer, reader }
    }
}

impl<S, R> SchemeClientV1 for ExactSvmClientV1<S, R>
where
    S: ClientSvmSigner,
    R: SvmChainReader,
{
    fn scheme(&self) -> &str {
        t402::scheme::ExactScheme::NAME
    }

    fn create_payment_payload<'a>(
        &'a self,
        requirements: &'a PaymentRequirementsV1,
    ) -> BoxFuture<'a, Result<Value, SchemeError>> {
        Box::pin(async move {
            let inputs = TransferInputs::from_v1(requirements)?;
            build_signed_transaction(&self.signer, &self.reader, inputs).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exact::transaction::{decode_transaction, parse_transfer_checked};
    use crate::signer::MintInfo;
    use solana_keypair::Keypair;
    use solana_message::Hash;

    struct StaticReader;

    impl SvmChainReader for StaticReader {
        fn latest_blockhash<'a>(
            &'a self,
            _network: &'a str,
        ) -> BoxFuture<'a, Result<Hash, SchemeError>> {
            Box::pin(async { Ok(Hash::new_unique()) })
        }

        fn mint_info<'a>(
            &'a self,
            _mint: &'a Pubkey,
            _network: &'a str,
        ) -> BoxFuture<'a, Result<MintInfo, SchemeError>> {
            Box::pin(async {
                Ok(MintInfo {
                    decimals: 6,
                    token_program: spl_token::ID,
                })
            })
        }
    }

    fn requirements(fee_payer: &Pubkey) -> PaymentRequirements {
        PaymentRequirements {
            scheme: "exact".into(),
            network: "solana:EtWTRABZaYq6iMfeYKouRu166VU2xqa1".into(),
            asset: "4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU".into(),
            amount: "1000000".into(),
            pay_to: Pubkey::new_unique().to_string(),
            max_timeout_seconds: 300,
            extra: serde_json::json!({"feePayer": fee_payer.to_string()}),
        }
    }

    #[tokio::test]
    async fn test_v2_leaves_fee_payer_slot_unsigned() {
        let keypair = Keypair::new();
        let payer = ClientSvmSigner::pubkey(&keypair);
        let fee_payer = Pubkey::new_unique();
        let client = ExactSvmClient::new(keypair, StaticReader);

        let value = SchemeClient::create_payment_payload(&client, &requirements(&fee_payer))
            .await
            .unwrap();
        let payload: ExactSvmPayload = serde_json::from_value(value).unwrap();
        let transaction = decode_transaction(&payload.transaction).unwrap();

        // Two required signers: the fee payer (slot 0, placeholder) and
        // the transfer authority.
        assert_eq!(transaction.signatures.len(), 2);
        assert_eq!(transaction.signatures[0], Signature::default());
        assert_ne!(transaction.signatures[1], Signature::default());
        assert_eq!(transaction.message.static_account_keys()[0], fee_payer);

        let transfer = parse_transfer_checked(&transaction, 2).unwrap();
        assert_eq!(transfer.authority, payer);
        assert_eq!(transfer.amount, 1_000_000);
        assert_eq!(transaction.message.instructions().len(), 4);
    }

    #[tokio::test]
    async fn test_v2_requires_fee_payer() {
        let client = ExactSvmClient::new(Keypair::new(), StaticReader);
        let mut missing = requirements(&Pubkey::new_unique());
        missing.extra = serde_json::json!({});
        assert!(
            SchemeClient::create_payment_payload(&client, &missing)
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_v1_self_signs_as_sole_signer() {
        let keypair = Keypair::new();
        let payer = ClientSvmSigner::pubkey(&keypair);
        let client = ExactSvmClientV1::new(keypair, StaticReader);

        let v1_requirements = PaymentRequirementsV1 {
            scheme: "exact".into(),
            network: "solana-devnet".into(),
            max_amount_required: "500".into(),
            resource: "/api/data".into(),
            description: None,
            mime_type: None,
            pay_to: Pubkey::new_unique().to_string(),
            max_timeout_seconds: 300,
            asset: "4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU".into(),
            output_schema: None,
            extra: None,
        };

        let value = SchemeClientV1::create_payment_payload(&client, &v1_requirements)
            .await
            .unwrap();
        let payload: ExactSvmPayload = serde_json::from_value(value).unwrap();
        let transaction = decode_transaction(&payload.transaction).unwrap();

        // The client is both fee payer and authority: one fully signed slot.
        assert_eq!(transaction.signatures.len(), 1);
        assert_ne!(transaction.signatures[0], Signature::default());
        assert_eq!(transaction.message.static_account_keys()[0], payer);
    }
}
