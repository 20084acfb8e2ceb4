use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::programs;

/// The top-level configuration for the `geyser-ingest-connector` library.
///
/// This struct aggregates the stream connection settings and the classifier
/// thresholds. It is typically deserialized from a configuration file and passed
/// to the `SubscriptionManager` and `Dispatcher` upon initialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ConnectorConfig {
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
}

/// Defines the connection settings for the Geyser gRPC endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct StreamConfig {
    /// The gRPC endpoint URL. Required; an empty value is rejected at startup.
    pub endpoint: String,
    /// Optional token sent as the `x-token` metadata header.
    pub x_token: Option<String>,
    /// Consecutive failures tolerated before the manager gives up.
    pub max_reconnect_attempts: u32,
    /// Fixed delay between a failure and the next connection attempt.
    pub reconnect_delay_ms: u64,
    pub connect_timeout_secs: u64,
    pub commitment: Commitment,
    pub max_decoding_message_size: usize,
}

/// Commitment level requested from the upstream service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    Processed,
    #[default]
    Confirmed,
    Finalized,
}

/// Thresholds and program sets used by the transaction classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ClassifierConfig {
    /// Minimum transfer size, in whole SOL, recorded as a large transfer.
    pub large_transfer_threshold_sol: u64,
    /// Base-58 program ids that mark a transaction as DeFi activity.
    pub defi_programs: Vec<String>,
}

impl StreamConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            x_token: None,
            max_reconnect_attempts: 5,
            reconnect_delay_ms: 5000,
            connect_timeout_secs: 10,
            commitment: Commitment::default(),
            max_decoding_message_size: 64 * 1024 * 1024,
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            large_transfer_threshold_sol: 100,
            defi_programs: programs::DEFI_PROGRAMS
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}
