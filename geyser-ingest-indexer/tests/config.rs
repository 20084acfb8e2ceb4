use anyhow::Result;
use clap::Parser;
use geyser_ingest_connector::{config::Commitment, filters::Preset};
use geyser_ingest_indexer::{
    cli::{Cli, Commands, DEFAULT_SUBSCRIPTIONS},
    config::{load_config, IndexerConfig, StorageBackend},
    error::IndexerError,
};
use geyser_ingest_logger::{LogFormat, LogOutput};
use std::io::Write;

const CONFIG_TOML: &str = r#"
[connector.stream]
endpoint = "https://geyser.example.com:443"
x-token = "file-token"
max-reconnect-attempts = 3
reconnect-delay-ms = 250
commitment = "finalized"

[connector.classifier]
large-transfer-threshold-sol = 500

[indexer]
db-path = "/tmp/geyser-ingest-test.db"
storage = "memory"

[indexer.log]
level = "debug"
format = "json"
"#;

#[test]
fn test_defaults() {
    let config = IndexerConfig::default();
    let stream = &config.connector.stream;

    assert_eq!(stream.max_reconnect_attempts, 5);
    assert_eq!(stream.reconnect_delay_ms, 5000);
    assert_eq!(stream.commitment, Commitment::Confirmed);
    assert_eq!(config.connector.classifier.large_transfer_threshold_sol, 100);
    assert_eq!(config.indexer.storage, StorageBackend::Sled);
    assert_eq!(config.indexer.log.level, "info");
    assert_eq!(config.indexer.log.output, LogOutput::Stdout);
}

#[test]
fn test_missing_endpoint_is_rejected() {
    let config = IndexerConfig::default();
    assert!(matches!(config.validate(), Err(IndexerError::MissingEndpoint)));
}

/// File and environment layering share the process environment, so they are
/// exercised in a single test.
#[test]
fn test_file_then_environment() -> Result<()> {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile()?;
    file.write_all(CONFIG_TOML.as_bytes())?;
    let path = file.path().to_string_lossy().into_owned();

    let config = load_config(Some(&path))?;
    let stream = &config.connector.stream;
    assert_eq!(stream.endpoint, "https://geyser.example.com:443");
    assert_eq!(stream.x_token.as_deref(), Some("file-token"));
    assert_eq!(stream.max_reconnect_attempts, 3);
    assert_eq!(stream.reconnect_delay_ms, 250);
    assert_eq!(stream.commitment, Commitment::Finalized);
    // Unset keys keep their defaults.
    assert_eq!(stream.connect_timeout_secs, 10);
    assert_eq!(config.connector.classifier.large_transfer_threshold_sol, 500);
    assert_eq!(config.indexer.storage, StorageBackend::Memory);
    assert_eq!(config.indexer.log.format, LogFormat::Json);
    assert!(config.validate().is_ok());

    std::env::set_var("GRPC_ENDPOINT", "http://127.0.0.1:10000");
    std::env::set_var("MAX_RECONNECT_ATTEMPTS", "9");
    std::env::set_var("LOG_LEVEL", "warn");

    let config = load_config(Some(&path))?;

    std::env::remove_var("GRPC_ENDPOINT");
    std::env::remove_var("MAX_RECONNECT_ATTEMPTS");
    std::env::remove_var("LOG_LEVEL");

    assert_eq!(config.connector.stream.endpoint, "http://127.0.0.1:10000");
    assert_eq!(config.connector.stream.max_reconnect_attempts, 9);
    assert_eq!(config.connector.stream.x_token.as_deref(), Some("file-token"));
    assert_eq!(config.indexer.log.level, "warn");

    // Nested variables address the kebab-case keys.
    std::env::set_var("GEYSER__CONNECTOR__STREAM__MAX_RECONNECT_ATTEMPTS", "7");
    std::env::set_var("GEYSER__CONNECTOR__STREAM__X_TOKEN", "env-token");
    std::env::set_var("GEYSER__CONNECTOR__CLASSIFIER__LARGE_TRANSFER_THRESHOLD_SOL", "42");
    std::env::set_var("GEYSER__INDEXER__DB_PATH", "/data/ingest.db");

    let config = load_config(Some(&path))?;

    std::env::remove_var("GEYSER__CONNECTOR__STREAM__MAX_RECONNECT_ATTEMPTS");
    std::env::remove_var("GEYSER__CONNECTOR__STREAM__X_TOKEN");
    std::env::remove_var("GEYSER__CONNECTOR__CLASSIFIER__LARGE_TRANSFER_THRESHOLD_SOL");
    std::env::remove_var("GEYSER__INDEXER__DB_PATH");

    assert_eq!(config.connector.stream.max_reconnect_attempts, 7);
    assert_eq!(config.connector.stream.x_token.as_deref(), Some("env-token"));
    assert_eq!(config.connector.classifier.large_transfer_threshold_sol, 42);
    assert_eq!(config.indexer.db_path, "/data/ingest.db");
    // Untouched keys still come from the file.
    assert_eq!(config.connector.stream.reconnect_delay_ms, 250);
    Ok(())
}

#[test]
fn test_run_defaults_to_standard_subscriptions() {
    let cli = Cli::parse_from(["geyser-ingest", "run"]);
    let Commands::Run(run_cmd) = cli.command else {
        panic!("expected the run command");
    };
    assert!(run_cmd.config.is_none());
    assert_eq!(run_cmd.presets(), DEFAULT_SUBSCRIPTIONS.to_vec());
}

#[test]
fn test_run_accepts_repeated_subscriptions() {
    let cli = Cli::parse_from([
        "geyser-ingest",
        "run",
        "--config",
        "ingest.toml",
        "--subscription",
        "usdc",
        "-s",
        "slots",
    ]);
    let Commands::Run(run_cmd) = cli.command else {
        panic!("expected the run command");
    };
    assert_eq!(run_cmd.config.as_deref(), Some("ingest.toml"));
    assert_eq!(run_cmd.presets(), vec![Preset::Usdc, Preset::Slots]);
}

#[test]
fn test_unknown_subscription_is_rejected() {
    let result = Cli::try_parse_from(["geyser-ingest", "run", "--subscription", "nfts"]);
    assert!(result.is_err());
}
