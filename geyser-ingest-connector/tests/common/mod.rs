#![allow(dead_code)]

use geyser_ingest_connector::{
    decoder,
    programs,
    update::{Instruction, TransactionUpdate},
    LAMPORTS_PER_SOL,
};
use solana_sdk::pubkey::Pubkey;

/// Test helper: A transaction whose account list is `[from, to, System Program, Memo]`.
pub struct TxBuilder {
    pub tx: TransactionUpdate,
    pub from: Pubkey,
    pub to: Pubkey,
}

impl TxBuilder {
    pub fn new(signature: &str) -> Self {
        let from = Pubkey::new_unique();
        let to = Pubkey::new_unique();
        let tx = TransactionUpdate {
            signature: signature.to_string(),
            slot: 250_000_000,
            success: true,
            fee: Some(5000),
            accounts: vec![from, to, programs::SYSTEM_PROGRAM, programs::MEMO_PROGRAM],
            ..Default::default()
        };
        Self { tx, from, to }
    }

    pub fn transfer_sol(self, sol: u64) -> Self {
        self.transfer_lamports(sol * LAMPORTS_PER_SOL)
    }

    pub fn transfer_lamports(mut self, lamports: u64) -> Self {
        self.tx.instructions.push(Instruction {
            program_id: programs::SYSTEM_PROGRAM,
            accounts: vec![0, 1],
            data: decoder::encode_system_transfer(lamports),
        });
        self
    }

    pub fn memo(mut self, text: &str) -> Self {
        self.tx.instructions.push(Instruction {
            program_id: programs::MEMO_PROGRAM,
            accounts: vec![],
            data: text.as_bytes().to_vec(),
        });
        self
    }

    pub fn invoke(mut self, program_id: Pubkey) -> Self {
        self.tx.instructions.push(Instruction {
            program_id,
            accounts: vec![0],
            data: vec![1, 2, 3],
        });
        self
    }

    pub fn failed(mut self, error: Option<&str>) -> Self {
        self.tx.success = false;
        self.tx.error = error.map(str::to_string);
        self.tx.log_messages = vec![
            "Program 11111111111111111111111111111111 invoke [1]".to_string(),
            "Transfer: insufficient lamports".to_string(),
        ];
        self
    }

    pub fn block_time(mut self, secs: i64) -> Self {
        self.tx.block_time = Some(secs);
        self
    }

    pub fn build(self) -> TransactionUpdate {
        self.tx
    }
}

/// Test helper: 72 bytes laid out as an SPL Token account (mint, owner, amount).
pub fn token_account_data(mint: &Pubkey, owner: &Pubkey, amount: u64) -> Vec<u8> {
    let mut data = Vec::with_capacity(72);
    data.extend_from_slice(mint.as_ref());
    data.extend_from_slice(owner.as_ref());
    data.extend_from_slice(&amount.to_le_bytes());
    data
}
