pub mod cli;
pub mod config;
pub mod error;
pub mod storage;

use crate::{
    cli::{Cli, Commands},
    config::{load_config, IndexerConfig, StorageBackend},
    error::IndexerError,
    storage::SledStore,
};
use anyhow::{Context, Result};
use clap::Parser;
use geyser_ingest_connector::{
    dispatcher::Dispatcher,
    filters::Preset,
    geyser::GeyserSource,
    storage::{MemoryStore, Store},
    subscription::SubscriptionManager,
};
use std::sync::Arc;
use tokio::signal;

/// The main entry point for running the ingest application logic.
/// This function handles CLI parsing, configuration, logging, and service startup.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(run_cmd) => {
            let config = load_validated(run_cmd.config.as_deref())?;
            geyser_ingest_logger::init(&config.indexer.log)?;
            log_config(&config);
            run_indexer(config, &run_cmd.presets()).await
        }
        Commands::Check(check_cmd) => {
            let config = load_validated(check_cmd.config.as_deref())?;
            geyser_ingest_logger::init(&config.indexer.log)?;
            check(config).await
        }
    }
}

/// Loads the configuration and rejects it before any connection is attempted if
/// it cannot start the service.
fn load_validated(path: Option<&str>) -> Result<IndexerConfig> {
    match path {
        Some(path) => println!("Loading configuration from '{}'", path),
        None => println!("No config file provided, using defaults and environment."),
    }
    let config = load_config(path)?;
    config.validate()?;
    Ok(config)
}

fn log_config(config: &IndexerConfig) {
    let stream = &config.connector.stream;
    tracing::info!(
        endpoint = %stream.endpoint,
        authenticated = stream.x_token.is_some(),
        commitment = ?stream.commitment,
        max_reconnect_attempts = stream.max_reconnect_attempts,
        reconnect_delay_ms = stream.reconnect_delay_ms,
        storage = ?config.indexer.storage,
        db_path = %config.indexer.db_path,
        "Configuration loaded"
    );
}

/// Opens the configured store.
pub fn open_store(config: &IndexerConfig) -> Result<Arc<dyn Store>> {
    let store: Arc<dyn Store> = match config.indexer.storage {
        StorageBackend::Sled => Arc::new(SledStore::open(&config.indexer.db_path)?),
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage, records will not survive a restart");
            Arc::new(MemoryStore::new())
        }
    };
    Ok(store)
}

/// Runs the subscription until a shutdown signal arrives or reconnects are
/// exhausted, then flushes the store.
async fn run_indexer(config: IndexerConfig, presets: &[Preset]) -> Result<()> {
    let store = open_store(&config)?;
    let source = GeyserSource::new(&config.connector.stream)?;
    let dispatcher = Dispatcher::new(&config.connector, store.clone());
    let (manager, handle) = SubscriptionManager::new(source, dispatcher, &config.connector.stream);

    let names: Vec<&str> = presets.iter().map(Preset::name).collect();
    tracing::info!(subscriptions = ?names, "Starting Geyser ingest");

    let mut task = tokio::spawn(manager.run(Preset::combine(presets)));

    let outcome = tokio::select! {
        joined = &mut task => joined.context("Subscription task panicked")?,
        _ = shutdown_signal() => {
            tracing::info!("Received shutdown signal, initiating graceful shutdown...");
            handle.stop();
            task.await.context("Subscription task panicked")?
        }
    };

    store.flush().await?;
    tracing::info!("Store flushed, shutdown complete.");

    outcome.map_err(IndexerError::from)?;
    Ok(())
}

/// Connects once, reports what the endpoint says and verifies the store opens.
async fn check(config: IndexerConfig) -> Result<()> {
    let source = GeyserSource::new(&config.connector.stream)?;
    let info = source
        .check()
        .await
        .with_context(|| {
            format!(
                "Geyser endpoint '{}' is unreachable",
                config.connector.stream.endpoint
            )
        })?;
    tracing::info!(version = %info.version, slot = info.slot, "Geyser endpoint reachable");

    let store = open_store(&config)?;
    store.flush().await?;
    tracing::info!(storage = ?config.indexer.storage, "Store is accessible");
    Ok(())
}

/// Resolves on Ctrl+C, or on SIGTERM where supported.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to listen for Ctrl+C.");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to listen for SIGTERM.");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
