use clap::{Parser, Subcommand};
use geyser_ingest_connector::filters::Preset;

/// The default subscriptions when none are given on the command line.
pub const DEFAULT_SUBSCRIPTIONS: [Preset; 3] =
    [Preset::LargeTransfers, Preset::Memos, Preset::Failed];

/// The main CLI structure for the Geyser ingest service.
#[derive(Parser, Debug)]
#[command(name = "geyser-ingest", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Defines the available subcommands for the application.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the ingest service.
    /// This opens the store and keeps the Geyser subscription alive until shutdown.
    Run(RunCmd),
    /// Check that the Geyser endpoint is reachable and the store can be opened.
    Check(CheckCmd),
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunCmd {
    /// Path to the configuration TOML file.
    /// If not provided, defaults and environment variables are used.
    #[arg(short, long)]
    pub config: Option<String>,

    /// Subscription preset to enable. Repeat to merge several presets.
    /// One of: large-transfers, memos, failed, defi, tokens, usdc, usdt, wsol,
    /// slots, blocks, ping.
    #[arg(short, long = "subscription", value_name = "PRESET")]
    pub subscriptions: Vec<Preset>,
}

impl RunCmd {
    /// The requested presets, or the defaults when none were given.
    pub fn presets(&self) -> Vec<Preset> {
        if self.subscriptions.is_empty() {
            DEFAULT_SUBSCRIPTIONS.to_vec()
        } else {
            self.subscriptions.clone()
        }
    }
}

/// Arguments for the `check` subcommand.
#[derive(Parser, Debug)]
pub struct CheckCmd {
    /// Path to the configuration TOML file.
    #[arg(short, long)]
    pub config: Option<String>,
}
