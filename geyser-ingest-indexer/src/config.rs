use anyhow::{Context, Result};
use geyser_ingest_connector::config::ConnectorConfig;
use geyser_ingest_logger::LogConfig;
use serde::Deserialize;

use crate::error::IndexerError;

/// Plain environment variables honoured on top of the prefixed ones, paired with
/// the configuration key they override.
pub const LEGACY_ENV_OVERRIDES: [(&str, &str); 5] = [
    ("GRPC_ENDPOINT", "connector.stream.endpoint"),
    ("GRPC_TOKEN", "connector.stream.x-token"),
    ("MAX_RECONNECT_ATTEMPTS", "connector.stream.max-reconnect-attempts"),
    ("RECONNECT_DELAY_MS", "connector.stream.reconnect-delay-ms"),
    ("LOG_LEVEL", "indexer.log.level"),
];

/// The top-level configuration for the ingest service.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct IndexerConfig {
    #[serde(default)]
    pub connector: ConnectorConfig,
    #[serde(default)]
    pub indexer: IndexerSpecificConfig,
}

/// Contains settings that are unique to the indexer binary.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct IndexerSpecificConfig {
    pub db_path: String,
    pub storage: StorageBackend,
    /// Logging configuration.
    pub log: LogConfig,
}

/// Where persisted records are kept.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum StorageBackend {
    #[default]
    Sled,
    /// Records are kept in memory and lost on exit.
    Memory,
}

impl Default for IndexerSpecificConfig {
    fn default() -> Self {
        Self {
            db_path: "./geyser_ingest.db".to_string(),
            storage: StorageBackend::default(),
            log: LogConfig::default(),
        }
    }
}

impl IndexerConfig {
    /// Rejects configurations that cannot start the service.
    pub fn validate(&self) -> Result<(), IndexerError> {
        if self.connector.stream.endpoint.trim().is_empty() {
            return Err(IndexerError::MissingEndpoint);
        }
        Ok(())
    }
}

/// Loads the configuration from an optional TOML file and the environment.
///
/// Sources, lowest precedence first: built-in defaults, the file at `path`,
/// `GEYSER__*` variables (e.g. `GEYSER__INDEXER__DB_PATH=/data/ingest.db`, where
/// single underscores map to the kebab-case key), then the plain
/// variables listed in [`LEGACY_ENV_OVERRIDES`]. A `.env` file in the working
/// directory is read into the environment beforehand.
pub fn load_config(path: Option<&str>) -> Result<IndexerConfig> {
    dotenvy::dotenv().ok();

    let mut builder = config::Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(config::File::with_name(path));
    }
    builder = builder.add_source(
        config::Environment::with_prefix("GEYSER")
            .separator("__")
            .convert_case(config::Case::Kebab)
            .try_parsing(true),
    );
    for (var, key) in LEGACY_ENV_OVERRIDES {
        let value = std::env::var(var).ok().filter(|v| !v.trim().is_empty());
        builder = builder
            .set_override_option(key, value)
            .with_context(|| format!("Invalid override for '{}'", key))?;
    }

    let settings: IndexerConfig = builder
        .build()
        .context(format!(
            "Failed to build configuration from '{}'",
            path.unwrap_or("<environment>")
        ))?
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    Ok(settings)
}
