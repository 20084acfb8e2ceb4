//! # Transaction Classifier
//!
//! Pure predicates and extractors over an already-received [`TransactionUpdate`].
//! None of these functions can fail: instructions that do not decode, or that
//! reference accounts out of range, simply do not match.

use crate::{
    config::ClassifierConfig,
    decoder,
    programs,
    records::{block_instant, DecodedTransfer},
    update::{Instruction, TransactionUpdate},
    LAMPORTS_PER_SOL,
};
use solana_sdk::pubkey::Pubkey;
use std::{collections::HashSet, str::FromStr};

/// Lamports moved by `ix` if it is a System Program transfer.
fn transfer_lamports(ix: &Instruction) -> Option<u64> {
    if ix.program_id != programs::SYSTEM_PROGRAM {
        return None;
    }
    decoder::decode_system_transfer(&ix.data)
}

fn meets_threshold(lamports: u64, threshold_sol: u64) -> bool {
    lamports >= threshold_sol.saturating_mul(LAMPORTS_PER_SOL)
}

/// Returns `true` if any System Program transfer in `tx` moves at least
/// `threshold_sol` whole SOL. The comparison is inclusive.
pub fn is_large_transfer(tx: &TransactionUpdate, threshold_sol: u64) -> bool {
    tx.instructions
        .iter()
        .filter_map(transfer_lamports)
        .any(|lamports| meets_threshold(lamports, threshold_sol))
}

/// Returns the memo texts of `tx`, in instruction order.
pub fn extract_memos(tx: &TransactionUpdate) -> Vec<String> {
    tx.instructions
        .iter()
        .filter(|ix| programs::is_memo_program(&ix.program_id))
        .map(|ix| decoder::decode_memo(&ix.data))
        .collect()
}

/// Returns `true` if any instruction of `tx` targets one of `known_programs`.
pub fn is_defi_transaction(tx: &TransactionUpdate, known_programs: &HashSet<Pubkey>) -> bool {
    tx.instructions
        .iter()
        .any(|ix| known_programs.contains(&ix.program_id))
}

/// Returns the lamports of the first System Program transfer in `tx`.
pub fn extract_transfer_amount(tx: &TransactionUpdate) -> Option<u64> {
    tx.instructions.iter().find_map(transfer_lamports)
}

/// Returns every transfer in `tx` at or above `threshold_sol`, resolved to its
/// source and destination accounts. Unresolvable accounts render as empty strings.
pub fn large_transfers(tx: &TransactionUpdate, threshold_sol: u64) -> Vec<DecodedTransfer> {
    let block_time = block_instant(tx.block_time);
    tx.instructions
        .iter()
        .filter_map(|ix| {
            let lamports = transfer_lamports(ix)?;
            if !meets_threshold(lamports, threshold_sol) {
                return None;
            }
            let account = |position| {
                tx.instruction_account(ix, position)
                    .map(ToString::to_string)
                    .unwrap_or_default()
            };
            Some(DecodedTransfer {
                signature: tx.signature.clone(),
                from_pubkey: account(0),
                to_pubkey: account(1),
                lamports,
                slot: tx.slot,
                block_time,
            })
        })
        .collect()
}

/// Converts lamports into whole SOL for display.
pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL as f64
}

/// The classifier settings resolved into the forms the predicates take.
#[derive(Debug, Clone)]
pub struct Classifier {
    pub large_transfer_threshold_sol: u64,
    pub defi_programs: HashSet<Pubkey>,
}

impl Classifier {
    /// Builds a classifier from configuration. Program ids that fail to parse are
    /// skipped with a warning.
    pub fn from_config(config: &ClassifierConfig) -> Self {
        let defi_programs = config
            .defi_programs
            .iter()
            .filter_map(|id| match Pubkey::from_str(id) {
                Ok(pubkey) => Some(pubkey),
                Err(e) => {
                    tracing::warn!(program_id = %id, "Ignoring invalid DeFi program id: {}", e);
                    None
                }
            })
            .collect();
        Self {
            large_transfer_threshold_sol: config.large_transfer_threshold_sol,
            defi_programs,
        }
    }

    pub fn is_large_transfer(&self, tx: &TransactionUpdate) -> bool {
        is_large_transfer(tx, self.large_transfer_threshold_sol)
    }

    pub fn large_transfers(&self, tx: &TransactionUpdate) -> Vec<DecodedTransfer> {
        large_transfers(tx, self.large_transfer_threshold_sol)
    }

    pub fn is_defi_transaction(&self, tx: &TransactionUpdate) -> bool {
        is_defi_transaction(tx, &self.defi_programs)
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::from_config(&ClassifierConfig::default())
    }
}
