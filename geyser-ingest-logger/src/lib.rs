//! Tracing initialization shared by the `geyser-ingest` binaries.

mod logging;

pub use logging::{init, LogConfig, LogFormat, LogOutput};
