//! # Update Dispatcher
//!
//! The `Dispatcher` turns each [`UpdateEnvelope`] delivered by the subscription
//! into persisted records.
//!
//! ## Failure policy
//! `handle` never returns an error. Every unit of work (the base transaction upsert,
//! each extraction step, the account upsert) runs independently, and its outcome is
//! passed through a single boundary function, [`contain`], which logs failures and
//! lets the stream continue. A failing step never prevents the remaining steps for
//! the same update, nor the processing of later updates. There is no retry queue:
//! a record whose write fails is lost for that delivery.
use crate::{
    classifier::{self, Classifier},
    config::ConnectorConfig,
    decoder::Decoded,
    records::{AccountSnapshot, FailedTransactionRecord, MemoRecord, TransactionRecord},
    registry::ProgramRegistry,
    storage::Store,
    update::{AccountUpdate, BlockUpdate, SlotUpdate, TransactionUpdate, UpdateEnvelope},
};
use anyhow::Result;
use std::{fmt, sync::Arc};

/// Identifies a unit of work inside the dispatcher, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Transaction,
    LargeTransfer,
    Memo,
    FailedTransaction,
    Account,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::Transaction => "transaction",
            Step::LargeTransfer => "large-transfer",
            Step::Memo => "memo",
            Step::FailedTransaction => "failed-transaction",
            Step::Account => "account",
        };
        f.write_str(name)
    }
}

/// The boundary policy for per-update failures: log and continue.
///
/// Returns `true` if the step succeeded.
fn contain(step: Step, key: &str, result: Result<()>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(step = %step, key = %key, "Error handling update: {:#}", e);
            false
        }
    }
}

fn short(value: &str) -> &str {
    value.get(..16).unwrap_or(value)
}

/// Routes update envelopes to their handlers and persists the derived records.
#[derive(Clone)]
pub struct Dispatcher {
    registry: ProgramRegistry,
    classifier: Classifier,
    store: Arc<dyn Store>,
}

impl Dispatcher {
    /// Creates a new `Dispatcher` with the known program layouts registered.
    pub fn new(config: &ConnectorConfig, store: Arc<dyn Store>) -> Self {
        Self::with_parts(
            ProgramRegistry::with_known_programs(),
            Classifier::from_config(&config.classifier),
            store,
        )
    }

    pub fn with_parts(
        registry: ProgramRegistry,
        classifier: Classifier,
        store: Arc<dyn Store>,
    ) -> Self {
        Self {
            registry,
            classifier,
            store,
        }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Handles one envelope. Errors are contained and logged, never returned.
    pub async fn handle(&self, envelope: UpdateEnvelope) {
        match envelope {
            UpdateEnvelope::Transaction(tx) => self.handle_transaction(&tx).await,
            UpdateEnvelope::Account(account) => {
                let key = account.pubkey.to_string();
                contain(Step::Account, &key, self.handle_account(&account).await);
            }
            UpdateEnvelope::Slot(slot) => self.handle_slot(&slot),
            UpdateEnvelope::Block(block) => self.handle_block(&block),
        }
    }

    async fn handle_transaction(&self, tx: &TransactionUpdate) {
        let key = tx.signature.as_str();

        contain(Step::Transaction, key, self.store_transaction(tx).await);
        contain(Step::LargeTransfer, key, self.store_large_transfers(tx).await);
        contain(Step::Memo, key, self.store_memos(tx).await);
        contain(Step::FailedTransaction, key, self.store_failed_transaction(tx).await);

        if self.classifier.is_defi_transaction(tx) {
            tracing::info!(signature = %key, slot = tx.slot, "DeFi transaction observed");
        }

        tracing::info!(
            slot = tx.slot,
            success = tx.success,
            fee = ?tx.fee,
            "Transaction processed: {}...",
            short(key)
        );
    }

    async fn store_transaction(&self, tx: &TransactionUpdate) -> Result<()> {
        let created = self
            .store
            .upsert_transaction(&TransactionRecord::from(tx))
            .await?;
        if !created {
            tracing::debug!(signature = %tx.signature, "Transaction already stored");
        }
        Ok(())
    }

    async fn store_large_transfers(&self, tx: &TransactionUpdate) -> Result<()> {
        if !self.classifier.is_large_transfer(tx) {
            return Ok(());
        }
        for transfer in self.classifier.large_transfers(tx) {
            self.store.upsert_large_transfer(&transfer).await?;
            tracing::info!(
                from = %transfer.from_pubkey,
                to = %transfer.to_pubkey,
                sol = classifier::lamports_to_sol(transfer.lamports),
                signature = %short(&transfer.signature),
                "Large transfer"
            );
        }
        Ok(())
    }

    async fn store_memos(&self, tx: &TransactionUpdate) -> Result<()> {
        let memos = classifier::extract_memos(tx);
        if memos.is_empty() || !self.store.transaction_exists(&tx.signature).await? {
            return Ok(());
        }
        for (index, content) in (0u32..).zip(memos) {
            let memo = MemoRecord {
                signature: tx.signature.clone(),
                index,
                content,
            };
            self.store.create_memo(&memo).await?;
            tracing::info!(
                signature = %short(&memo.signature),
                content = %memo.content,
                "Memo found"
            );
        }
        Ok(())
    }

    async fn store_failed_transaction(&self, tx: &TransactionUpdate) -> Result<()> {
        let Some(record) = FailedTransactionRecord::from_update(tx) else {
            return Ok(());
        };
        self.store.upsert_failed_transaction(&record).await?;
        tracing::warn!(
            error = %record.error,
            logs_count = record.logs.len(),
            "Failed transaction: {}...",
            short(&record.signature)
        );
        Ok(())
    }

    async fn handle_account(&self, account: &AccountUpdate) -> Result<()> {
        let snapshot = AccountSnapshot::from(account);
        self.store.upsert_account(&snapshot).await?;

        if let Some(Decoded::TokenAccount(layout)) =
            self.registry.decode(&account.owner, &account.data)
        {
            tracing::info!(
                pubkey = %snapshot.pubkey,
                mint = %layout.mint,
                owner = %layout.owner,
                amount = layout.amount,
                startup = account.is_startup,
                "Token account updated"
            );
        } else if account.is_startup {
            // Startup snapshots replay every matching account at once.
            tracing::debug!(
                owner = %short(&snapshot.owner),
                lamports = snapshot.lamports,
                "Startup account snapshot: {}...",
                short(&snapshot.pubkey)
            );
        } else {
            tracing::info!(
                owner = %short(&snapshot.owner),
                lamports = snapshot.lamports,
                "Account updated: {}...",
                short(&snapshot.pubkey)
            );
        }
        Ok(())
    }

    fn handle_slot(&self, slot: &SlotUpdate) {
        tracing::info!(
            slot = slot.slot,
            parent = ?slot.parent,
            status = %slot.status,
            "Slot update"
        );
    }

    fn handle_block(&self, block: &BlockUpdate) {
        tracing::info!(
            slot = block.slot,
            block_height = ?block.block_height,
            transactions = block.executed_transaction_count,
            "Block update: {}",
            block.blockhash
        );
    }
}
