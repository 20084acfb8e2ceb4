//! # Subscription Filters
//!
//! A [`FilterSpec`] is the set of named inclusion/exclusion rules written once per
//! stream to select which updates the upstream service delivers. The transport
//! converts it into the protocol's `SubscribeRequest`.
//!
//! The [`Preset`] enum names the ready-made specifications the indexer exposes on
//! its command line. Several presets can be merged into a single specification.

use crate::{config::Commitment, programs};
use solana_sdk::pubkey::Pubkey;
use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
    str::FromStr,
};

/// Byte size of an SPL Token account.
const TOKEN_ACCOUNT_SIZE: u64 = 165;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSpec {
    pub transactions: BTreeMap<String, TransactionFilter>,
    pub accounts: BTreeMap<String, AccountFilter>,
    pub slots: BTreeSet<String>,
    pub blocks: BTreeMap<String, BlockFilter>,
    /// Overrides the configured commitment when set.
    pub commitment: Option<Commitment>,
    pub ping: bool,
}

/// A named transaction filter group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionFilter {
    pub vote: Option<bool>,
    pub failed: Option<bool>,
    pub signature: Option<String>,
    pub account_include: Vec<String>,
    pub account_exclude: Vec<String>,
    pub account_required: Vec<String>,
}

/// A named account filter group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountFilter {
    pub account: Vec<String>,
    pub owner: Vec<String>,
    pub memcmp: Vec<Memcmp>,
    pub datasize: Option<u64>,
}

/// Matches accounts whose data contains `base58` (decoded) at `offset`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Memcmp {
    pub offset: u64,
    pub base58: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockFilter {
    pub account_include: Vec<String>,
    pub include_transactions: bool,
    pub include_accounts: bool,
}

impl FilterSpec {
    /// Folds `other` into `self`. Groups with the same name are replaced by `other`'s.
    pub fn merge(mut self, other: FilterSpec) -> Self {
        self.transactions.extend(other.transactions);
        self.accounts.extend(other.accounts);
        self.slots.extend(other.slots);
        self.blocks.extend(other.blocks);
        self.commitment = other.commitment.or(self.commitment);
        self.ping |= other.ping;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
            && self.accounts.is_empty()
            && self.slots.is_empty()
            && self.blocks.is_empty()
            && !self.ping
    }

    fn with_transactions(name: &str, filter: TransactionFilter) -> Self {
        let mut spec = Self::default();
        spec.transactions.insert(name.to_string(), filter);
        spec
    }
}

fn ids(programs: &[Pubkey]) -> Vec<String> {
    programs.iter().map(ToString::to_string).collect()
}

/// Transactions that involve the System Program.
pub fn large_transfers() -> FilterSpec {
    let system = ids(&[programs::SYSTEM_PROGRAM]);
    FilterSpec::with_transactions(
        "large-transfers",
        TransactionFilter {
            vote: Some(false),
            failed: Some(false),
            account_include: system.clone(),
            account_required: system,
            ..Default::default()
        },
    )
}

pub fn memos() -> FilterSpec {
    FilterSpec::with_transactions(
        "memo-transactions",
        TransactionFilter {
            vote: Some(false),
            failed: Some(false),
            account_include: ids(&[programs::MEMO_PROGRAM]),
            ..Default::default()
        },
    )
}

pub fn failed_transactions() -> FilterSpec {
    FilterSpec::with_transactions(
        "failed-transactions",
        TransactionFilter {
            vote: Some(false),
            failed: Some(true),
            ..Default::default()
        },
    )
}

/// Transactions of, and accounts owned by, the default DeFi programs.
pub fn defi() -> FilterSpec {
    let defi = ids(&programs::DEFI_PROGRAMS);
    let mut spec = FilterSpec::with_transactions(
        "defi-transactions",
        TransactionFilter {
            vote: Some(false),
            failed: Some(false),
            account_include: defi.clone(),
            ..Default::default()
        },
    );
    spec.accounts.insert(
        "defi-accounts".to_string(),
        AccountFilter {
            owner: defi,
            ..Default::default()
        },
    );
    spec
}

/// SPL Token transactions and token accounts, optionally restricted to the given mints.
pub fn tokens(mints: &[Pubkey]) -> FilterSpec {
    let token_program = ids(&[programs::TOKEN_PROGRAM]);
    let mut spec = FilterSpec::default();

    if mints.is_empty() {
        spec.accounts.insert(
            "token-accounts".to_string(),
            AccountFilter {
                owner: token_program.clone(),
                ..Default::default()
            },
        );
    }
    for mint in mints {
        spec.accounts.insert(
            format!("token-accounts-{mint}"),
            AccountFilter {
                owner: token_program.clone(),
                memcmp: vec![Memcmp {
                    offset: 0,
                    base58: mint.to_string(),
                }],
                datasize: Some(TOKEN_ACCOUNT_SIZE),
                ..Default::default()
            },
        );
    }

    spec.transactions.insert(
        "token-transfers".to_string(),
        TransactionFilter {
            vote: Some(false),
            failed: Some(false),
            account_include: token_program,
            ..Default::default()
        },
    );
    spec
}

pub fn slots() -> FilterSpec {
    FilterSpec {
        slots: BTreeSet::from(["slots".to_string()]),
        ..Default::default()
    }
}

pub fn blocks() -> FilterSpec {
    let mut spec = FilterSpec::default();
    spec.blocks.insert("blocks".to_string(), BlockFilter::default());
    spec
}

/// A keep-alive only specification, used to test connectivity.
pub fn ping() -> FilterSpec {
    FilterSpec {
        ping: true,
        ..Default::default()
    }
}

/// Ready-made filter specifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    LargeTransfers,
    Memos,
    Failed,
    Defi,
    Tokens,
    Usdc,
    Usdt,
    Wsol,
    Slots,
    Blocks,
    Ping,
}

impl Preset {
    pub const ALL: [Preset; 11] = [
        Preset::LargeTransfers,
        Preset::Memos,
        Preset::Failed,
        Preset::Defi,
        Preset::Tokens,
        Preset::Usdc,
        Preset::Usdt,
        Preset::Wsol,
        Preset::Slots,
        Preset::Blocks,
        Preset::Ping,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Preset::LargeTransfers => "large-transfers",
            Preset::Memos => "memos",
            Preset::Failed => "failed",
            Preset::Defi => "defi",
            Preset::Tokens => "tokens",
            Preset::Usdc => "usdc",
            Preset::Usdt => "usdt",
            Preset::Wsol => "wsol",
            Preset::Slots => "slots",
            Preset::Blocks => "blocks",
            Preset::Ping => "ping",
        }
    }

    pub fn filter_spec(&self) -> FilterSpec {
        match self {
            Preset::LargeTransfers => large_transfers(),
            Preset::Memos => memos(),
            Preset::Failed => failed_transactions(),
            Preset::Defi => defi(),
            Preset::Tokens => tokens(&[]),
            Preset::Usdc => tokens(&[programs::USDC_MINT]),
            Preset::Usdt => tokens(&[programs::USDT_MINT]),
            Preset::Wsol => tokens(&[programs::WSOL_MINT]),
            Preset::Slots => slots(),
            Preset::Blocks => blocks(),
            Preset::Ping => ping(),
        }
    }

    /// Merges the specifications of several presets into one.
    pub fn combine(presets: &[Preset]) -> FilterSpec {
        presets
            .iter()
            .map(Preset::filter_spec)
            .fold(FilterSpec::default(), FilterSpec::merge)
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Preset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Preset::ALL
            .into_iter()
            .find(|preset| preset.name() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = Preset::ALL.iter().map(Preset::name).collect();
                format!("unknown subscription '{}', expected one of: {}", s, names.join(", "))
            })
    }
}
