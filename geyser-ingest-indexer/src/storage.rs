//! Provides the `sled`-based implementation of the `Store` trait defined in the
//! `geyser-ingest-connector` library.
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use sled::Db;

use geyser_ingest_connector::{
    records::{
        AccountSnapshot, DecodedTransfer, FailedTransactionRecord, MemoRecord, TransactionRecord,
    },
    storage::Store,
};

use crate::error::IndexerError;

fn transaction_key(signature: &str) -> String {
    format!("tx::{}", signature)
}

fn transfer_key(signature: &str) -> String {
    format!("transfer::{}", signature)
}

fn memo_prefix(signature: &str) -> String {
    format!("memo::{}::", signature)
}

/// Zero-padded so that a prefix scan yields memos in position order.
fn memo_key(signature: &str, index: u32) -> String {
    format!("{}{:010}", memo_prefix(signature), index)
}

fn failed_key(signature: &str) -> String {
    format!("failed::{}", signature)
}

fn account_key(pubkey: &str) -> String {
    format!("account::{}", pubkey)
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, IndexerError> {
    Ok(bincode::serde::encode_to_vec(
        value,
        bincode::config::standard(),
    )?)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, IndexerError> {
    Ok(bincode::serde::decode_from_slice(bytes, bincode::config::standard())?.0)
}

/// A `sled`-backed implementation of the `Store` trait.
///
/// All records live in a single `sled` database under prefixed keys
/// (`tx::`, `transfer::`, `memo::`, `failed::`, `account::`). Create-or-noop writes
/// use `compare_and_swap` against an absent value, so concurrent writers of the
/// same key cannot produce a second record.
#[derive(Clone)]
pub struct SledStore {
    db: Db,
}

impl SledStore {
    /// Creates a new instance of `SledStore` over an open database.
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Opens (or creates) the database at `path`.
    pub fn open(path: &str) -> Result<Self> {
        let db = sled::open(path)
            .with_context(|| format!("Failed to open sled database at '{}'", path))?;
        Ok(Self::new(db))
    }

    /// Inserts `value` under `key` unless the key is already present.
    /// Returns `true` if the record was created.
    fn insert_if_absent<T: Serialize>(&self, key: &str, value: &T) -> Result<bool, IndexerError> {
        let bytes = encode(value)?;
        let swapped = self
            .db
            .compare_and_swap(key, None as Option<&[u8]>, Some(bytes))?;
        Ok(swapped.is_ok())
    }

    fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, IndexerError> {
        self.db
            .get(key)?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    pub fn transaction(&self, signature: &str) -> Result<Option<TransactionRecord>> {
        Ok(self.get(&transaction_key(signature))?)
    }

    pub fn transaction_count(&self) -> usize {
        self.db.scan_prefix("tx::").count()
    }

    pub fn large_transfer(&self, signature: &str) -> Result<Option<DecodedTransfer>> {
        Ok(self.get(&transfer_key(signature))?)
    }

    /// Memos stored for `signature`, ordered by position.
    pub fn memos(&self, signature: &str) -> Result<Vec<MemoRecord>> {
        self.db
            .scan_prefix(memo_prefix(signature))
            .values()
            .map(|bytes| Ok(decode(&bytes?)?))
            .collect()
    }

    pub fn failed_transaction(&self, signature: &str) -> Result<Option<FailedTransactionRecord>> {
        Ok(self.get(&failed_key(signature))?)
    }

    pub fn account(&self, pubkey: &str) -> Result<Option<AccountSnapshot>> {
        Ok(self.get(&account_key(pubkey))?)
    }
}

#[async_trait]
impl Store for SledStore {
    async fn upsert_transaction(&self, record: &TransactionRecord) -> Result<bool> {
        Ok(self.insert_if_absent(&transaction_key(&record.signature), record)?)
    }

    async fn transaction_exists(&self, signature: &str) -> Result<bool> {
        Ok(self.db.contains_key(transaction_key(signature))?)
    }

    async fn upsert_large_transfer(&self, transfer: &DecodedTransfer) -> Result<bool> {
        Ok(self.insert_if_absent(&transfer_key(&transfer.signature), transfer)?)
    }

    async fn create_memo(&self, memo: &MemoRecord) -> Result<bool> {
        Ok(self.insert_if_absent(&memo_key(&memo.signature, memo.index), memo)?)
    }

    async fn upsert_failed_transaction(&self, record: &FailedTransactionRecord) -> Result<bool> {
        Ok(self.insert_if_absent(&failed_key(&record.signature), record)?)
    }

    async fn upsert_account(&self, snapshot: &AccountSnapshot) -> Result<()> {
        self.db
            .insert(account_key(&snapshot.pubkey), encode(snapshot)?)
            .map_err(IndexerError::from)?;
        Ok(())
    }

    async fn flush(&self) -> Result<()> {
        self.db
            .flush_async()
            .await
            .context("Failed to flush sled database")?;
        Ok(())
    }
}
