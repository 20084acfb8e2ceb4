use anyhow::Result;
use chrono::{TimeZone, Utc};
use geyser_ingest_connector::{
    config::ConnectorConfig,
    decoder,
    dispatcher::Dispatcher,
    programs,
    records::{AccountSnapshot, DecodedTransfer, MemoRecord, TransactionRecord},
    storage::Store,
    update::{Instruction, TransactionUpdate, UpdateEnvelope},
    LAMPORTS_PER_SOL,
};
use geyser_ingest_indexer::storage::SledStore;
use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;
use tempfile::TempDir;

/// Test setup helper: A `SledStore` in a fresh temporary directory.
/// The directory must outlive the store.
fn temp_store() -> Result<(SledStore, TempDir)> {
    let dir = tempfile::tempdir()?;
    let store = SledStore::open(&dir.path().join("db").to_string_lossy())?;
    Ok((store, dir))
}

fn transaction_record(signature: &str, slot: u64) -> TransactionRecord {
    TransactionRecord {
        signature: signature.to_string(),
        slot,
        block_time: Some(Utc.timestamp_opt(1_700_000_000, 0).unwrap()),
        success: true,
        fee: Some(5000),
        compute_units_used: Some(150),
        accounts: vec![Pubkey::new_unique().to_string()],
        instructions: vec![],
    }
}

#[tokio::test]
async fn test_transaction_upsert_is_create_or_noop() -> Result<()> {
    let (store, _dir) = temp_store()?;

    assert!(!store.transaction_exists("sig-1").await?);
    assert!(store.upsert_transaction(&transaction_record("sig-1", 10)).await?);
    assert!(!store.upsert_transaction(&transaction_record("sig-1", 99)).await?);

    assert!(store.transaction_exists("sig-1").await?);
    assert_eq!(store.transaction_count(), 1);
    let stored = store.transaction("sig-1")?.expect("record stored");
    assert_eq!(stored.slot, 10);
    assert_eq!(stored.block_time.map(|t| t.timestamp()), Some(1_700_000_000));
    Ok(())
}

#[tokio::test]
async fn test_memos_keyed_by_signature_and_index() -> Result<()> {
    let (store, _dir) = temp_store()?;

    for index in [11u32, 2, 0] {
        let memo = MemoRecord {
            signature: "sig-memo".to_string(),
            index,
            content: format!("memo {index}"),
        };
        assert!(store.create_memo(&memo).await?);
        assert!(!store.create_memo(&memo).await?);
    }

    let memos = store.memos("sig-memo")?;
    let indices: Vec<u32> = memos.iter().map(|m| m.index).collect();
    assert_eq!(indices, vec![0, 2, 11]);
    assert!(store.memos("sig-other")?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_large_transfer_first_write_wins() -> Result<()> {
    let (store, _dir) = temp_store()?;
    let transfer = DecodedTransfer {
        signature: "sig-big".to_string(),
        from_pubkey: "from".to_string(),
        to_pubkey: "to".to_string(),
        lamports: 150 * LAMPORTS_PER_SOL,
        slot: 1,
        block_time: None,
    };

    assert!(store.upsert_large_transfer(&transfer).await?);
    let again = DecodedTransfer {
        lamports: 1,
        ..transfer.clone()
    };
    assert!(!store.upsert_large_transfer(&again).await?);

    assert_eq!(store.large_transfer("sig-big")?, Some(transfer));
    Ok(())
}

#[tokio::test]
async fn test_account_snapshot_overwrites() -> Result<()> {
    let (store, _dir) = temp_store()?;
    let mut snapshot = AccountSnapshot {
        pubkey: "acct".to_string(),
        owner: programs::TOKEN_PROGRAM.to_string(),
        lamports: 2_039_280,
        data: Some("AAAA".to_string()),
        executable: false,
        rent_epoch: 0,
        slot: 1,
    };
    store.upsert_account(&snapshot).await?;

    snapshot.slot = 2;
    snapshot.data = None;
    store.upsert_account(&snapshot).await?;

    assert_eq!(store.account("acct")?, Some(snapshot));
    Ok(())
}

#[tokio::test]
async fn test_records_survive_reopen() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("db").to_string_lossy().into_owned();

    {
        let store = SledStore::open(&path)?;
        store.upsert_transaction(&transaction_record("sig-durable", 7)).await?;
        store.flush().await?;
    }

    let reopened = SledStore::open(&path)?;
    assert!(reopened.transaction_exists("sig-durable").await?);
    Ok(())
}

#[tokio::test]
async fn test_dispatcher_redelivery_against_sled() -> Result<()> {
    let (store, _dir) = temp_store()?;
    let store = Arc::new(store);
    let dispatcher = Dispatcher::new(&ConnectorConfig::default(), store.clone());

    let from = Pubkey::new_unique();
    let to = Pubkey::new_unique();
    let tx = TransactionUpdate {
        signature: "sig-redelivered".to_string(),
        slot: 5,
        success: true,
        accounts: vec![from, to, programs::SYSTEM_PROGRAM, programs::MEMO_PROGRAM],
        instructions: vec![
            Instruction {
                program_id: programs::SYSTEM_PROGRAM,
                accounts: vec![0, 1],
                data: decoder::encode_system_transfer(250 * LAMPORTS_PER_SOL),
            },
            Instruction {
                program_id: programs::MEMO_PROGRAM,
                accounts: vec![],
                data: b"invoice 42".to_vec(),
            },
        ],
        ..Default::default()
    };

    dispatcher.handle(UpdateEnvelope::Transaction(tx.clone())).await;
    dispatcher.handle(UpdateEnvelope::Transaction(tx)).await;

    assert_eq!(store.transaction_count(), 1);
    assert_eq!(store.memos("sig-redelivered")?.len(), 1);
    let transfer = store.large_transfer("sig-redelivered")?.expect("transfer stored");
    assert_eq!(transfer.from_pubkey, from.to_string());
    assert_eq!(transfer.lamports, 250 * LAMPORTS_PER_SOL);
    Ok(())
}
