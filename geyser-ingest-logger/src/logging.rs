use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::{fs::OpenOptions, str::FromStr, sync::Arc};
use tracing::Level;
use tracing_subscriber::{
    filter::LevelFilter,
    fmt::{self, writer::MakeWriterExt},
    prelude::*,
    Registry,
};

/// Defines the format for log messages.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    Json,
    #[default]
    Plain,
}

/// Defines the destination for log output.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LogOutput {
    #[default]
    Stdout,
    File,
}

/// Logging configuration.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "kebab-case", default)]
pub struct LogConfig {
    /// Log level, e.g., "info", "debug", "trace".
    pub level: String,
    pub format: LogFormat,
    pub output: LogOutput,
    /// Path to the log file, required if output is "file".
    pub file_path: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Plain,
            output: LogOutput::Stdout,
            file_path: None,
        }
    }
}

impl LogConfig {
    /// The configured level. Unrecognized values fall back to `INFO`.
    pub fn level(&self) -> Level {
        Level::from_str(self.level.trim()).unwrap_or(Level::INFO)
    }
}

/// Installs the global tracing subscriber described by `config`.
///
/// Fails if file output is requested without a path, if the log file cannot be
/// opened, or if a global subscriber is already installed.
pub fn init(config: &LogConfig) -> Result<()> {
    let log_level = config.level();
    let subscriber = Registry::default().with(LevelFilter::from_level(log_level));

    let installed = match config.output {
        LogOutput::File => {
            let file_path = config
                .file_path
                .as_deref()
                .ok_or_else(|| anyhow!("Log output is 'file' but 'file_path' is not specified"))?;
            let log_file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(file_path)
                .with_context(|| format!("Failed to open log file '{}'", file_path))?;
            let file_writer = Arc::new(log_file).with_max_level(log_level);

            match config.format {
                LogFormat::Json => subscriber
                    .with(fmt::layer().with_writer(file_writer).json())
                    .try_init(),
                LogFormat::Plain => subscriber
                    .with(fmt::layer().with_writer(file_writer).with_ansi(false))
                    .try_init(),
            }
        }
        LogOutput::Stdout => {
            let stdout_writer = std::io::stdout.with_max_level(log_level);
            match config.format {
                LogFormat::Json => subscriber
                    .with(fmt::layer().with_writer(stdout_writer).json())
                    .try_init(),
                LogFormat::Plain => subscriber
                    .with(fmt::layer().with_writer(stdout_writer).pretty())
                    .try_init(),
            }
        }
    };
    installed.map_err(|e| anyhow!("Failed to install tracing subscriber: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_falls_back_to_info() {
        let config = LogConfig {
            level: "chatty".to_string(),
            ..Default::default()
        };
        assert_eq!(config.level(), Level::INFO);

        let config = LogConfig {
            level: "DEBUG".to_string(),
            ..Default::default()
        };
        assert_eq!(config.level(), Level::DEBUG);
    }

    #[test]
    fn file_output_requires_path() {
        let config = LogConfig {
            output: LogOutput::File,
            ..Default::default()
        };
        let err = init(&config).unwrap_err();
        assert!(err.to_string().contains("file_path"));
    }

    #[test]
    fn file_output_writes_to_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ingest.log");
        let config = LogConfig {
            output: LogOutput::File,
            format: LogFormat::Json,
            file_path: Some(path.to_string_lossy().into_owned()),
            ..Default::default()
        };
        init(&config).unwrap();
        tracing::info!("written");
        assert!(path.exists());
    }
}
