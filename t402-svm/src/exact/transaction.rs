//! Transaction decoding and instruction parsing.

use solana_pubkey::Pubkey;
use solana_transaction::versioned::VersionedTransaction;
use t402::encoding::Base64Bytes;

use super::types::TRANSFER_CHECKED_DISCRIMINATOR;

/// Error decoding or inspecting a serialized transaction.
#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    /// The base64 text or bincode bytes did not decode.
    #[error("cannot decode transaction: {0}")]
    Decode(String),
    /// No instruction exists at the given index.
    #[error("no instruction at index {0}")]
    NoInstruction(usize),
    /// An instruction references an account index outside the table.
    #[error("no account at index {0}")]
    NoAccount(u8),
    /// The instruction is not a well-formed SPL `TransferChecked`.
    #[error("not a TransferChecked instruction")]
    NotTransferChecked,
}

/// Decodes a base64-encoded versioned transaction.
///
/// # Errors
///
/// Returns [`TransactionError::Decode`] on malformed input.
pub fn decode_transaction(transaction_b64: &str) -> Result<VersionedTransaction, TransactionError> {
    let bytes = Base64Bytes::from(transaction_b64.as_bytes())
        .decode()
        .map_err(|e| TransactionError::Decode(e.to_string()))?;
    bincode::deserialize(&bytes).map_err(|e| TransactionError::Decode(e.to_string()))
}

/// Encodes a versioned transaction as base64.
///
/// # Errors
///
/// Returns [`TransactionError::Decode`] if serialization fails.
pub fn encode_transaction(transaction: &VersionedTransaction) -> Result<String, TransactionError> {
    let bytes =
        bincode::serialize(transaction).map_err(|e| TransactionError::Decode(e.to_string()))?;
    Ok(Base64Bytes::encode(bytes).to_string())
}

/// Returns the program id of the instruction at `index`.
///
/// # Errors
///
/// Returns [`TransactionError::NoInstruction`] when out of bounds.
pub fn program_id_at(
    transaction: &VersionedTransaction,
    index: usize,
) -> Result<Pubkey, TransactionError> {
    let instruction = transaction
        .message
        .instructions()
        .get(index)
        .ok_or(TransactionError::NoInstruction(index))?;
    Ok(*instruction.program_id(transaction.message.static_account_keys()))
}

/// Returns the raw data of the instruction at `index`.
///
/// # Errors
///
/// Returns [`TransactionError::NoInstruction`] when out of bounds.
pub fn instruction_data_at(
    transaction: &VersionedTransaction,
    index: usize,
) -> Result<&[u8], TransactionError> {
    transaction
        .message
        .instructions()
        .get(index)
        .map(|instruction| instruction.data.as_slice())
        .ok_or(TransactionError::NoInstruction(index))
}

/// A parsed SPL `TransferChecked` instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferChecked {
    /// Transfer amount in base units.
    pub amount: u64,
    /// Source token account.
    pub source: Pubkey,
    /// Token mint.
    pub mint: Pubkey,
    /// Destination token account.
    pub destination: Pubkey,
    /// Transfer authority (the payer's wallet).
    pub authority: Pubkey,
    /// Owning token program.
    pub token_program: Pubkey,
}

/// Parses the instruction at `index` as an SPL `TransferChecked`.
///
/// Both Token and Token-2022 share the instruction layout:
/// `[discriminator = 12, amount: u64 LE, decimals: u8]` over accounts
/// `[source, mint, destination, authority, ...]`.
///
/// # Errors
///
/// Returns [`TransactionError`] when the instruction is absent, targets
/// a different program, or does not parse.
pub fn parse_transfer_checked(
    transaction: &VersionedTransaction,
    index: usize,
) -> Result<TransferChecked, TransactionError> {
    let instruction = transaction
        .message
        .instructions()
        .get(index)
        .ok_or(TransactionError::NoInstruction(index))?;
    let account_keys = transaction.message.static_account_keys();
    let token_program = *instruction.program_id(account_keys);

    if token_program != spl_token::ID && token_program != spl_token_2022::ID {
        return Err(TransactionError::NotTransferChecked);
    }

    let data = instruction.data.as_slice();
    if data.len() < 10 || data[0] != TRANSFER_CHECKED_DISCRIMINATOR {
        return Err(TransactionError::NotTransferChecked);
    }
    let mut amount_bytes = [0u8; 8];
    amount_bytes.copy_from_slice(&data[1..9]);
    let amount = u64::from_le_bytes(amount_bytes);

    if instruction.accounts.len() < 4 {
        return Err(TransactionError::NotTransferChecked);
    }
    let account_at = |position: usize| -> Result<Pubkey, TransactionError> {
        let table_index = instruction.accounts[position];
        account_keys
            .get(table_index as usize)
            .copied()
            .ok_or(TransactionError::NoAccount(table_index))
    };

    Ok(TransferChecked {
        amount,
        source: account_at(0)?,
        mint: account_at(1)?,
        destination: account_at(2)?,
        authority: account_at(3)?,
        token_program,
    })
}
