//! Persisted record shapes.
//!
//! Every record is keyed by its natural identifier: the transaction signature for
//! transaction-derived records and the account pubkey for account snapshots.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::update::{AccountUpdate, Instruction, TransactionUpdate};

/// Converts an epoch-seconds block time into an absolute UTC instant.
pub fn block_instant(block_time: Option<i64>) -> Option<DateTime<Utc>> {
    block_time.and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub signature: String,
    pub slot: u64,
    pub block_time: Option<DateTime<Utc>>,
    pub success: bool,
    pub fee: Option<u64>,
    pub compute_units_used: Option<u64>,
    pub accounts: Vec<String>,
    pub instructions: Vec<RawInstruction>,
}

/// An instruction stored verbatim, with its payload as base64 text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawInstruction {
    pub program_id: String,
    pub accounts: Vec<u8>,
    pub data: String,
}

/// A System Program transfer at or above the configured threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedTransfer {
    pub signature: String,
    pub from_pubkey: String,
    pub to_pubkey: String,
    pub lamports: u64,
    pub slot: u64,
    pub block_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoRecord {
    pub signature: String,
    /// Position of the memo among the transaction's memo instructions.
    pub index: u32,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedTransactionRecord {
    pub signature: String,
    pub slot: u64,
    pub error: String,
    pub logs: Vec<String>,
    pub accounts: Vec<String>,
    pub block_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub pubkey: String,
    pub owner: String,
    pub lamports: u64,
    /// Account data as base64 text; `None` for empty accounts.
    pub data: Option<String>,
    pub executable: bool,
    pub rent_epoch: u64,
    pub slot: u64,
}

impl From<&Instruction> for RawInstruction {
    fn from(ix: &Instruction) -> Self {
        Self {
            program_id: ix.program_id.to_string(),
            accounts: ix.accounts.clone(),
            data: BASE64.encode(&ix.data),
        }
    }
}

impl From<&TransactionUpdate> for TransactionRecord {
    fn from(tx: &TransactionUpdate) -> Self {
        Self {
            signature: tx.signature.clone(),
            slot: tx.slot,
            block_time: block_instant(tx.block_time),
            success: tx.success,
            fee: tx.fee,
            compute_units_used: tx.compute_units_used,
            accounts: tx.accounts.iter().map(ToString::to_string).collect(),
            instructions: tx.instructions.iter().map(RawInstruction::from).collect(),
        }
    }
}

impl FailedTransactionRecord {
    /// Builds the failure record for `tx`, or `None` when the transaction succeeded.
    pub fn from_update(tx: &TransactionUpdate) -> Option<Self> {
        if tx.success {
            return None;
        }
        Some(Self {
            signature: tx.signature.clone(),
            slot: tx.slot,
            error: tx.error.clone().unwrap_or_else(|| "Unknown error".to_string()),
            logs: tx.log_messages.clone(),
            accounts: tx.accounts.iter().map(ToString::to_string).collect(),
            block_time: block_instant(tx.block_time),
        })
    }
}

impl From<&AccountUpdate> for AccountSnapshot {
    fn from(account: &AccountUpdate) -> Self {
        Self {
            pubkey: account.pubkey.to_string(),
            owner: account.owner.to_string(),
            lamports: account.lamports,
            data: (!account.data.is_empty()).then(|| BASE64.encode(&account.data)),
            executable: account.executable,
            rent_epoch: account.rent_epoch,
            slot: account.slot,
        }
    }
}
