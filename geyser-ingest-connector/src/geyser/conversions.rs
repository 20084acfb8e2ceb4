//! Conversions between the Yellowstone protobuf types and the connector's own
//! filter and update types.

use crate::{
    config::Commitment,
    filters::{AccountFilter, BlockFilter, FilterSpec, Memcmp, TransactionFilter},
    update::{
        AccountUpdate, BlockUpdate, Instruction, SlotUpdate, TransactionUpdate, UpdateEnvelope,
    },
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use solana_sdk::{pubkey::Pubkey, signature::Signature, transaction::TransactionError};
use std::collections::HashMap;
use yellowstone_grpc_proto::prelude::{
    subscribe_request_filter_accounts_filter::Filter as AccountsFilterKind,
    subscribe_request_filter_accounts_filter_memcmp::Data as MemcmpData,
    subscribe_update::UpdateOneof, CommitmentLevel, SlotStatus, SubscribeRequest,
    SubscribeRequestFilterAccounts, SubscribeRequestFilterAccountsFilter,
    SubscribeRequestFilterAccountsFilterMemcmp, SubscribeRequestFilterBlocks,
    SubscribeRequestFilterSlots, SubscribeRequestFilterTransactions, SubscribeRequestPing,
    SubscribeUpdate, SubscribeUpdateAccount, SubscribeUpdateBlock, SubscribeUpdateSlot,
    SubscribeUpdateTransaction, TransactionError as ProtoTransactionError,
};

const KEEPALIVE_PING_ID: i32 = 1;

pub fn commitment_level(commitment: Commitment) -> CommitmentLevel {
    match commitment {
        Commitment::Processed => CommitmentLevel::Processed,
        Commitment::Confirmed => CommitmentLevel::Confirmed,
        Commitment::Finalized => CommitmentLevel::Finalized,
    }
}

// --- Requests ---

impl From<&TransactionFilter> for SubscribeRequestFilterTransactions {
    fn from(filter: &TransactionFilter) -> Self {
        Self {
            vote: filter.vote,
            failed: filter.failed,
            signature: filter.signature.clone(),
            account_include: filter.account_include.clone(),
            account_exclude: filter.account_exclude.clone(),
            account_required: filter.account_required.clone(),
            ..Default::default()
        }
    }
}

impl From<&Memcmp> for SubscribeRequestFilterAccountsFilter {
    fn from(memcmp: &Memcmp) -> Self {
        Self {
            filter: Some(AccountsFilterKind::Memcmp(
                SubscribeRequestFilterAccountsFilterMemcmp {
                    offset: memcmp.offset,
                    data: Some(MemcmpData::Base58(memcmp.base58.clone())),
                },
            )),
        }
    }
}

impl From<&AccountFilter> for SubscribeRequestFilterAccounts {
    fn from(filter: &AccountFilter) -> Self {
        let mut filters: Vec<SubscribeRequestFilterAccountsFilter> =
            filter.memcmp.iter().map(Into::into).collect();
        if let Some(size) = filter.datasize {
            filters.push(SubscribeRequestFilterAccountsFilter {
                filter: Some(AccountsFilterKind::Datasize(size)),
            });
        }
        Self {
            account: filter.account.clone(),
            owner: filter.owner.clone(),
            filters,
            ..Default::default()
        }
    }
}

impl From<&BlockFilter> for SubscribeRequestFilterBlocks {
    fn from(filter: &BlockFilter) -> Self {
        Self {
            account_include: filter.account_include.clone(),
            include_transactions: Some(filter.include_transactions),
            include_accounts: Some(filter.include_accounts),
            ..Default::default()
        }
    }
}

fn named<'a, F, T>(groups: impl IntoIterator<Item = (&'a String, &'a F)>) -> HashMap<String, T>
where
    F: 'a,
    T: From<&'a F>,
{
    groups
        .into_iter()
        .map(|(name, filter)| (name.clone(), T::from(filter)))
        .collect()
}

/// Builds the request written once at the start of every stream.
///
/// A commitment set on the filter takes precedence over `default_commitment`.
pub fn subscribe_request(filter: &FilterSpec, default_commitment: Commitment) -> SubscribeRequest {
    let commitment = filter.commitment.unwrap_or(default_commitment);
    SubscribeRequest {
        transactions: named(&filter.transactions),
        accounts: named(&filter.accounts),
        slots: filter
            .slots
            .iter()
            .map(|name| (name.clone(), SubscribeRequestFilterSlots::default()))
            .collect(),
        blocks: named(&filter.blocks),
        commitment: Some(commitment_level(commitment) as i32),
        ping: filter
            .ping
            .then_some(SubscribeRequestPing { id: KEEPALIVE_PING_ID }),
        ..Default::default()
    }
}

/// The reply to a server ping. It repeats the original filters so the server
/// keeps the same subscription in place.
pub fn keepalive_request(request: &SubscribeRequest) -> SubscribeRequest {
    SubscribeRequest {
        ping: Some(SubscribeRequestPing { id: KEEPALIVE_PING_ID }),
        ..request.clone()
    }
}

// --- Updates ---

/// Converts one upstream message. Keep-alive traffic and update kinds the
/// pipeline does not handle yield `None`.
pub fn envelope_from_update(update: SubscribeUpdate) -> Option<UpdateEnvelope> {
    match update.update_oneof? {
        UpdateOneof::Transaction(tx) => {
            let slot = tx.slot;
            match TransactionUpdate::try_from(tx) {
                Ok(tx) => Some(UpdateEnvelope::Transaction(tx)),
                Err(reason) => {
                    tracing::warn!(reason, slot, "Dropping malformed transaction update");
                    None
                }
            }
        }
        UpdateOneof::Account(account) => {
            let slot = account.slot;
            match AccountUpdate::try_from(account) {
                Ok(account) => Some(UpdateEnvelope::Account(account)),
                Err(reason) => {
                    tracing::warn!(reason, slot, "Dropping malformed account update");
                    None
                }
            }
        }
        UpdateOneof::Slot(slot) => Some(UpdateEnvelope::Slot(slot.into())),
        UpdateOneof::Block(block) => Some(UpdateEnvelope::Block(block.into())),
        _ => None,
    }
}

/// Decodes a 32-byte key. Malformed keys map to the default key so that
/// instruction account indices stay aligned.
fn pubkey_from_bytes(bytes: &[u8]) -> Pubkey {
    Pubkey::try_from(bytes).unwrap_or_default()
}

/// Renders the bincode-serialized transaction error carried in the status meta.
fn transaction_error_message(err: &ProtoTransactionError) -> String {
    match bincode::serde::decode_from_slice::<TransactionError, _>(
        &err.err,
        bincode::config::legacy(),
    ) {
        Ok((error, _)) => format!("{:?}", error),
        Err(_) => BASE64.encode(&err.err),
    }
}

impl TryFrom<SubscribeUpdateTransaction> for TransactionUpdate {
    type Error = &'static str;

    fn try_from(update: SubscribeUpdateTransaction) -> Result<Self, Self::Error> {
        let info = update.transaction.ok_or("missing transaction info")?;
        let signature = Signature::try_from(info.signature.as_slice())
            .map_err(|_| "malformed signature")?
            .to_string();
        let message = info
            .transaction
            .and_then(|tx| tx.message)
            .ok_or("missing transaction message")?;

        let mut accounts: Vec<Pubkey> = message
            .account_keys
            .iter()
            .map(|key| pubkey_from_bytes(key))
            .collect();

        let mut tx = TransactionUpdate {
            signature,
            slot: update.slot,
            // Transaction updates carry no block time.
            block_time: None,
            success: true,
            ..Default::default()
        };

        if let Some(meta) = info.meta {
            accounts.extend(meta.loaded_writable_addresses.iter().map(|k| pubkey_from_bytes(k)));
            accounts.extend(meta.loaded_readonly_addresses.iter().map(|k| pubkey_from_bytes(k)));
            tx.success = meta.err.is_none();
            tx.error = meta.err.as_ref().map(transaction_error_message);
            tx.fee = Some(meta.fee);
            tx.compute_units_used = meta.compute_units_consumed;
            tx.log_messages = meta.log_messages;
        }

        tx.instructions = message
            .instructions
            .into_iter()
            .filter_map(|ix| {
                let program_id = *accounts.get(usize::try_from(ix.program_id_index).ok()?)?;
                Some(Instruction {
                    program_id,
                    accounts: ix.accounts,
                    data: ix.data,
                })
            })
            .collect();
        tx.accounts = accounts;
        Ok(tx)
    }
}

impl TryFrom<SubscribeUpdateAccount> for AccountUpdate {
    type Error = &'static str;

    fn try_from(update: SubscribeUpdateAccount) -> Result<Self, Self::Error> {
        let account = update.account.ok_or("missing account info")?;
        Ok(AccountUpdate {
            pubkey: Pubkey::try_from(account.pubkey.as_slice()).map_err(|_| "malformed pubkey")?,
            owner: Pubkey::try_from(account.owner.as_slice()).map_err(|_| "malformed owner")?,
            lamports: account.lamports,
            data: account.data,
            executable: account.executable,
            rent_epoch: account.rent_epoch,
            slot: update.slot,
            is_startup: update.is_startup,
        })
    }
}

impl From<SubscribeUpdateSlot> for SlotUpdate {
    fn from(update: SubscribeUpdateSlot) -> Self {
        let status = SlotStatus::try_from(update.status)
            .map(|status| status.as_str_name().to_string())
            .unwrap_or_else(|_| update.status.to_string());
        SlotUpdate {
            slot: update.slot,
            parent: update.parent,
            status,
        }
    }
}

impl From<SubscribeUpdateBlock> for BlockUpdate {
    fn from(update: SubscribeUpdateBlock) -> Self {
        BlockUpdate {
            slot: update.slot,
            blockhash: update.blockhash,
            block_height: update.block_height.map(|h| h.block_height),
            block_time: update.block_time.map(|t| t.timestamp),
            parent_slot: update.parent_slot,
            executed_transaction_count: update.executed_transaction_count,
        }
    }
}
