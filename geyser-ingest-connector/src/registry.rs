//! Program registry for looking up decoders by program id.

use crate::{
    decoder::{self, Decoded},
    programs,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use solana_sdk::pubkey::Pubkey;
use std::collections::HashMap;

/// A decode function for one program's binary layout.
pub type DecodeFn = fn(&[u8]) -> Option<Decoded>;

/// Maps a program id to the decoder for that program's layout.
///
/// Lookup is by exact program id; unknown programs decode to `None`.
#[derive(Clone)]
pub struct ProgramRegistry {
    decoders: HashMap<Pubkey, DecodeFn>,
}

fn system_transfer(data: &[u8]) -> Option<Decoded> {
    decoder::decode_system_transfer(data).map(|lamports| Decoded::SystemTransfer { lamports })
}

fn memo(data: &[u8]) -> Option<Decoded> {
    Some(Decoded::Memo(decoder::decode_memo(data)))
}

fn token_account(data: &[u8]) -> Option<Decoded> {
    decoder::decode_token_account(data).map(Decoded::TokenAccount)
}

impl ProgramRegistry {
    /// Creates a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    /// Creates a registry with the System, Memo and SPL Token layouts registered.
    #[must_use]
    pub fn with_known_programs() -> Self {
        let mut registry = Self::new();
        registry.register(programs::SYSTEM_PROGRAM, system_transfer);
        registry.register(programs::MEMO_PROGRAM, memo);
        registry.register(programs::MEMO_PROGRAM_V1, memo);
        registry.register(programs::TOKEN_PROGRAM, token_account);
        registry.register(programs::TOKEN_2022_PROGRAM, token_account);
        registry
    }

    /// Registers (or replaces) the decoder for a program id.
    pub fn register(&mut self, program_id: Pubkey, decoder: DecodeFn) {
        self.decoders.insert(program_id, decoder);
    }

    pub fn contains(&self, program_id: &Pubkey) -> bool {
        self.decoders.contains_key(program_id)
    }

    /// Decodes `data` with the decoder registered for `program_id`.
    #[must_use]
    pub fn decode(&self, program_id: &Pubkey, data: &[u8]) -> Option<Decoded> {
        self.decoders.get(program_id).and_then(|decode| decode(data))
    }

    /// Decodes base64 text. Malformed base64 is treated as an invalid payload.
    #[must_use]
    pub fn decode_base64(&self, program_id: &Pubkey, raw: &str) -> Option<Decoded> {
        let decode = self.decoders.get(program_id)?;
        let bytes = BASE64.decode(raw.trim()).ok()?;
        decode(&bytes)
    }
}

impl Default for ProgramRegistry {
    fn default() -> Self {
        Self::with_known_programs()
    }
}
