//! # Program Layout Decoders
//!
//! Stateless decode functions for the binary layouts of well-known programs.
//! Every function here is total: malformed or undersized input yields `None`
//! (the explicit invalid marker) and never panics.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

/// The System Program instruction discriminant for `Transfer`.
pub const SYSTEM_TRANSFER_DISCRIMINANT: u32 = 2;
/// Minimum length of a System Program transfer instruction.
pub const SYSTEM_TRANSFER_LEN: usize = 12;
/// Minimum length of an SPL Token account.
pub const TOKEN_ACCOUNT_LEN: usize = 72;

/// A value produced by one of the registered decoders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    SystemTransfer { lamports: u64 },
    Memo(String),
    TokenAccount(TokenAccountLayout),
}

/// The leading fixed region of an SPL Token account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAccountLayout {
    /// Base-58 mint address.
    pub mint: String,
    /// Base-58 owner address.
    pub owner: String,
    /// Raw token amount in base units.
    pub amount: u64,
}

fn read_u32_le(data: &[u8], offset: usize) -> Option<u32> {
    let bytes = data.get(offset..offset + 4)?;
    Some(u32::from_le_bytes(bytes.try_into().ok()?))
}

fn read_u64_le(data: &[u8], offset: usize) -> Option<u64> {
    let bytes = data.get(offset..offset + 8)?;
    Some(u64::from_le_bytes(bytes.try_into().ok()?))
}

fn read_pubkey(data: &[u8], offset: usize) -> Option<Pubkey> {
    let bytes: [u8; 32] = data.get(offset..offset + 32)?.try_into().ok()?;
    Some(Pubkey::new_from_array(bytes))
}

/// Decodes a System Program instruction as a `Transfer`, returning the lamports moved.
///
/// Buffers shorter than 12 bytes and any other discriminant are not transfers.
pub fn decode_system_transfer(data: &[u8]) -> Option<u64> {
    if data.len() < SYSTEM_TRANSFER_LEN {
        return None;
    }
    if read_u32_le(data, 0)? != SYSTEM_TRANSFER_DISCRIMINANT {
        return None;
    }
    read_u64_le(data, 4)
}

/// Interprets a Memo Program payload as UTF-8 text. Any payload is accepted.
pub fn decode_memo(data: &[u8]) -> String {
    String::from_utf8_lossy(data).into_owned()
}

/// Decodes the mint, owner and amount of an SPL Token (or Token-2022) account.
pub fn decode_token_account(data: &[u8]) -> Option<TokenAccountLayout> {
    if data.len() < TOKEN_ACCOUNT_LEN {
        return None;
    }
    let mint = read_pubkey(data, 0)?;
    let owner = read_pubkey(data, 32)?;
    let amount = read_u64_le(data, 64)?;
    Some(TokenAccountLayout {
        mint: mint.to_string(),
        owner: owner.to_string(),
        amount,
    })
}

/// Same as [`decode_token_account`], for account data delivered as base64 text.
pub fn decode_token_account_base64(raw: &str) -> Option<TokenAccountLayout> {
    let bytes = BASE64.decode(raw.trim()).ok()?;
    decode_token_account(&bytes)
}

/// Encodes a System Program `Transfer` instruction payload.
pub fn encode_system_transfer(lamports: u64) -> Vec<u8> {
    let mut data = Vec::with_capacity(SYSTEM_TRANSFER_LEN);
    data.extend_from_slice(&SYSTEM_TRANSFER_DISCRIMINANT.to_le_bytes());
    data.extend_from_slice(&lamports.to_le_bytes());
    data
}
