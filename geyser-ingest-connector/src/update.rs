//! # Update Envelopes
//!
//! The connector-side representation of the messages delivered by the upstream
//! subscription. The transport converts every upstream message into exactly one
//! [`UpdateEnvelope`] variant (or drops it, for keep-alive traffic), so the rest of
//! the pipeline never inspects raw protobuf types.

use solana_sdk::pubkey::Pubkey;

/// One message delivered by the upstream subscription, tagged by update kind.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateEnvelope {
    Transaction(TransactionUpdate),
    Account(AccountUpdate),
    Slot(SlotUpdate),
    Block(BlockUpdate),
}

impl UpdateEnvelope {
    /// A short label for the update kind, used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            UpdateEnvelope::Transaction(_) => "transaction",
            UpdateEnvelope::Account(_) => "account",
            UpdateEnvelope::Slot(_) => "slot",
            UpdateEnvelope::Block(_) => "block",
        }
    }
}

/// A confirmed transaction as observed on the stream.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TransactionUpdate {
    /// Base-58 transaction signature.
    pub signature: String,
    pub slot: u64,
    /// Block time in epoch seconds, when the upstream provides one.
    pub block_time: Option<i64>,
    pub success: bool,
    /// Serialized transaction error, present only for failed transactions.
    pub error: Option<String>,
    pub fee: Option<u64>,
    pub compute_units_used: Option<u64>,
    /// Static account keys followed by any addresses loaded from lookup tables.
    pub accounts: Vec<Pubkey>,
    pub instructions: Vec<Instruction>,
    pub log_messages: Vec<String>,
}

/// A compiled top-level instruction with its program id already resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub program_id: Pubkey,
    /// Indices into [`TransactionUpdate::accounts`].
    pub accounts: Vec<u8>,
    pub data: Vec<u8>,
}

impl TransactionUpdate {
    /// Resolves the `position`-th account of `instruction` against the transaction's
    /// account list. Returns `None` when either index is out of range.
    pub fn instruction_account(&self, instruction: &Instruction, position: usize) -> Option<&Pubkey> {
        let index = *instruction.accounts.get(position)?;
        self.accounts.get(usize::from(index))
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AccountUpdate {
    pub pubkey: Pubkey,
    pub owner: Pubkey,
    pub lamports: u64,
    pub data: Vec<u8>,
    pub executable: bool,
    pub rent_epoch: u64,
    pub slot: u64,
    pub is_startup: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SlotUpdate {
    pub slot: u64,
    pub parent: Option<u64>,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BlockUpdate {
    pub slot: u64,
    pub blockhash: String,
    pub block_height: Option<u64>,
    pub block_time: Option<i64>,
    pub parent_slot: u64,
    pub executed_transaction_count: u64,
}
