use thiserror::Error;
use tonic::Status;

/// Connection-class errors. Each one is recoverable by reconnecting.
#[derive(Error, Debug)]
pub enum StreamError {
    #[error("Invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("Invalid x-token metadata value")]
    InvalidToken,

    #[error("Transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    #[error("Stream returned gRPC status: {0}")]
    Status(#[from] Status),

    #[error("Failed to write subscribe request: the request stream is closed")]
    WriteFailed,

    #[error("Stream closed by remote endpoint")]
    Ended,

    #[error("{0}")]
    Other(String),
}

/// Terminal outcome of the subscription manager.
#[derive(Error, Debug)]
pub enum SubscriptionError {
    #[error("Max reconnection attempts reached ({attempts}); last error: {last_error}")]
    ReconnectsExhausted { attempts: u32, last_error: String },
}
