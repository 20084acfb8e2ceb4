mod common;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use geyser_ingest_connector::{
    decoder::{self, Decoded},
    programs,
    registry::ProgramRegistry,
};
use solana_sdk::pubkey::Pubkey;

#[test]
fn test_system_transfer_decodes_lamports() {
    let data = decoder::encode_system_transfer(150_000_000_000);
    assert_eq!(data.len(), decoder::SYSTEM_TRANSFER_LEN);
    assert_eq!(decoder::decode_system_transfer(&data), Some(150_000_000_000));
}

#[test]
fn test_short_or_foreign_system_payloads_are_invalid() {
    for len in 0..decoder::SYSTEM_TRANSFER_LEN {
        let data = vec![2u8; len];
        assert_eq!(decoder::decode_system_transfer(&data), None, "length {len}");
    }

    // CreateAccount (discriminant 0) is not a transfer even when long enough.
    let mut create = vec![0u8; 52];
    create[4] = 1;
    assert_eq!(decoder::decode_system_transfer(&create), None);
}

#[test]
fn test_memo_accepts_any_payload() {
    assert_eq!(decoder::decode_memo(b"hello"), "hello");
    assert_eq!(decoder::decode_memo(b""), "");
    // Invalid UTF-8 is replaced rather than rejected.
    assert_eq!(decoder::decode_memo(&[0x68, 0xff, 0x69]), "h\u{fffd}i");
}

#[test]
fn test_token_account_layout() {
    let mint = Pubkey::new_unique();
    let owner = Pubkey::new_unique();
    let mut data = common::token_account_data(&mint, &owner, 1_000_000);
    // Trailing fields beyond the fixed region are ignored.
    data.resize(165, 0);

    let layout = decoder::decode_token_account(&data).unwrap();
    assert_eq!(layout.mint, mint.to_string());
    assert_eq!(layout.owner, owner.to_string());
    assert_eq!(layout.amount, 1_000_000);
}

#[test]
fn test_literal_token_account_bytes() {
    let mut data = vec![0x01u8; 32];
    data.extend_from_slice(&[0x02u8; 32]);
    data.extend_from_slice(&123u64.to_le_bytes());
    assert_eq!(data.len(), decoder::TOKEN_ACCOUNT_LEN);

    let layout = decoder::decode_token_account(&data).unwrap();
    assert_eq!(layout.mint, Pubkey::new_from_array([0x01; 32]).to_string());
    assert_eq!(layout.owner, Pubkey::new_from_array([0x02; 32]).to_string());
    assert_eq!(layout.amount, 123);
}

#[test]
fn test_short_token_payloads_are_invalid() {
    for len in 0..decoder::TOKEN_ACCOUNT_LEN {
        let data = vec![7u8; len];
        assert_eq!(decoder::decode_token_account(&data), None, "length {len}");
        let raw = BASE64.encode(&data);
        assert_eq!(decoder::decode_token_account_base64(&raw), None, "length {len}");
    }
}

#[test]
fn test_malformed_base64_is_invalid() {
    assert_eq!(decoder::decode_token_account_base64("not base64!!"), None);

    let registry = ProgramRegistry::with_known_programs();
    assert_eq!(
        registry.decode_base64(&programs::TOKEN_PROGRAM, "%%%"),
        None
    );
}

#[test]
fn test_registry_routes_by_program_id() {
    let registry = ProgramRegistry::with_known_programs();
    let transfer = decoder::encode_system_transfer(42);

    assert_eq!(
        registry.decode(&programs::SYSTEM_PROGRAM, &transfer),
        Some(Decoded::SystemTransfer { lamports: 42 })
    );
    assert_eq!(
        registry.decode(&programs::MEMO_PROGRAM_V1, b"gm"),
        Some(Decoded::Memo("gm".to_string()))
    );

    let unknown = Pubkey::new_unique();
    assert!(!registry.contains(&unknown));
    assert_eq!(registry.decode(&unknown, &transfer), None);
}

#[test]
fn test_registry_decodes_base64_token_account() {
    let mint = programs::USDC_MINT;
    let owner = Pubkey::new_unique();
    let raw = BASE64.encode(common::token_account_data(&mint, &owner, 5));

    let registry = ProgramRegistry::default();
    match registry.decode_base64(&programs::TOKEN_2022_PROGRAM, &raw) {
        Some(Decoded::TokenAccount(layout)) => {
            assert_eq!(layout.mint, mint.to_string());
            assert_eq!(layout.amount, 5);
        }
        other => panic!("expected a token account, got {:?}", other),
    }
}

#[test]
fn test_registered_decoder_replaces_default() {
    fn always_memo(_: &[u8]) -> Option<Decoded> {
        Some(Decoded::Memo("custom".to_string()))
    }

    let mut registry = ProgramRegistry::new();
    assert_eq!(registry.decode(&programs::SYSTEM_PROGRAM, &[]), None);

    registry.register(programs::SYSTEM_PROGRAM, always_memo);
    assert_eq!(
        registry.decode(&programs::SYSTEM_PROGRAM, &[]),
        Some(Decoded::Memo("custom".to_string()))
    );
}
