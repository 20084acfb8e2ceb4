use anyhow::Result;
use async_trait::async_trait;
use dashmap::{mapref::entry::Entry, DashMap};
use std::hash::Hash;

use crate::records::{
    AccountSnapshot, DecodedTransfer, FailedTransactionRecord, MemoRecord, TransactionRecord,
};

/// A trait defining the idempotent persistence gateway used by the dispatcher.
/// This allows for different database implementations.
///
/// Every operation is keyed by a natural identifier and must be safe to repeat:
/// issuing the same call twice never produces a second record. Implementations
/// serialize conflicting writes to the same key.
#[async_trait]
pub trait Store: Send + Sync {
    /// Stores the base transaction record if no record exists for its signature.
    /// An existing record is left untouched. Returns `true` if a record was created.
    async fn upsert_transaction(&self, record: &TransactionRecord) -> Result<bool>;

    /// Returns `true` if a transaction record exists for `signature`.
    async fn transaction_exists(&self, signature: &str) -> Result<bool>;

    /// Stores a large transfer keyed by its signature, create-or-noop.
    async fn upsert_large_transfer(&self, transfer: &DecodedTransfer) -> Result<bool>;

    /// Stores a memo keyed by its signature and position, create-or-noop.
    async fn create_memo(&self, memo: &MemoRecord) -> Result<bool>;

    /// Stores a failed transaction keyed by its signature, create-or-noop.
    async fn upsert_failed_transaction(&self, record: &FailedTransactionRecord) -> Result<bool>;

    /// Stores an account snapshot keyed by pubkey. The latest observation overwrites.
    async fn upsert_account(&self, snapshot: &AccountSnapshot) -> Result<()>;

    /// Flushes pending writes to durable storage.
    async fn flush(&self) -> Result<()>;
}

fn insert_if_absent<K: Eq + Hash, V>(map: &DashMap<K, V>, key: K, value: V) -> bool {
    match map.entry(key) {
        Entry::Occupied(_) => false,
        Entry::Vacant(slot) => {
            slot.insert(value);
            true
        }
    }
}

/// An in-memory `Store`, used for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    transactions: DashMap<String, TransactionRecord>,
    large_transfers: DashMap<String, DecodedTransfer>,
    memos: DashMap<(String, u32), MemoRecord>,
    failed: DashMap<String, FailedTransactionRecord>,
    accounts: DashMap<String, AccountSnapshot>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transaction(&self, signature: &str) -> Option<TransactionRecord> {
        self.transactions.get(signature).map(|r| r.value().clone())
    }

    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }

    pub fn large_transfer(&self, signature: &str) -> Option<DecodedTransfer> {
        self.large_transfers.get(signature).map(|r| r.value().clone())
    }

    /// Memos stored for `signature`, ordered by position.
    pub fn memos(&self, signature: &str) -> Vec<MemoRecord> {
        let mut memos: Vec<MemoRecord> = self
            .memos
            .iter()
            .filter(|entry| entry.key().0 == signature)
            .map(|entry| entry.value().clone())
            .collect();
        memos.sort_by_key(|memo| memo.index);
        memos
    }

    pub fn failed_transaction(&self, signature: &str) -> Option<FailedTransactionRecord> {
        self.failed.get(signature).map(|r| r.value().clone())
    }

    pub fn account(&self, pubkey: &str) -> Option<AccountSnapshot> {
        self.accounts.get(pubkey).map(|r| r.value().clone())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn upsert_transaction(&self, record: &TransactionRecord) -> Result<bool> {
        Ok(insert_if_absent(
            &self.transactions,
            record.signature.clone(),
            record.clone(),
        ))
    }

    async fn transaction_exists(&self, signature: &str) -> Result<bool> {
        Ok(self.transactions.contains_key(signature))
    }

    async fn upsert_large_transfer(&self, transfer: &DecodedTransfer) -> Result<bool> {
        Ok(insert_if_absent(
            &self.large_transfers,
            transfer.signature.clone(),
            transfer.clone(),
        ))
    }

    async fn create_memo(&self, memo: &MemoRecord) -> Result<bool> {
        Ok(insert_if_absent(
            &self.memos,
            (memo.signature.clone(), memo.index),
            memo.clone(),
        ))
    }

    async fn upsert_failed_transaction(&self, record: &FailedTransactionRecord) -> Result<bool> {
        Ok(insert_if_absent(
            &self.failed,
            record.signature.clone(),
            record.clone(),
        ))
    }

    async fn upsert_account(&self, snapshot: &AccountSnapshot) -> Result<()> {
        self.accounts.insert(snapshot.pubkey.clone(), snapshot.clone());
        Ok(())
    }

    async fn flush(&self) -> Result<()> {
        Ok(())
    }
}
