use geyser_ingest_connector::error::{StreamError, SubscriptionError};
use thiserror::Error;

/// Defines the primary error types for the ingest service.
#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("No Geyser endpoint configured: set GRPC_ENDPOINT or connector.stream.endpoint")]
    MissingEndpoint,

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),

    #[error(transparent)]
    Subscription(#[from] SubscriptionError),

    #[error("Storage error: {0}")]
    Storage(#[from] sled::Error),

    #[error("Serialization failed: {0}")]
    Serialization(#[from] bincode::error::EncodeError),

    #[error("Deserialization failed: {0}")]
    Deserialization(#[from] bincode::error::DecodeError),
}
