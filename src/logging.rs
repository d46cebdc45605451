//! Tracing subscriber setup.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use thiserror::Error;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

use crate::config::LogConfig;

/// Environment variable holding a filter directive, e.g. `pianoroll=debug`.
pub const LOG_ENV: &str = "PIANOROLL_LOG";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("cannot open log file {path}: {source}")]
    File {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid log filter: {0}")]
    Filter(String),
    #[error("logging already initialized")]
    AlreadyInitialized,
}

/// Where log lines go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    File(PathBuf),
    Stderr,
    Discard,
}

impl LogTarget {
    /// The configured file if any, otherwise stderr for headless commands
    /// and nothing for the full-screen UI.
    pub fn resolve(config: &LogConfig, interactive: bool) -> Self {
        match (&config.file, interactive) {
            (Some(path), _) => LogTarget::File(path.clone()),
            (None, true) => LogTarget::Discard,
            (None, false) => LogTarget::Stderr,
        }
    }
}

/// Filter from `PIANOROLL_LOG`, else `fallback`.
pub fn env_filter(fallback: &str) -> Result<EnvFilter, LoggingError> {
    match std::env::var(LOG_ENV) {
        Ok(directive) if !directive.trim().is_empty() => {
            EnvFilter::try_new(directive).map_err(|e| LoggingError::Filter(e.to_string()))
        }
        _ => EnvFilter::try_new(fallback).map_err(|e| LoggingError::Filter(e.to_string())),
    }
}

/// Install the global fmt subscriber.
pub fn init(config: &LogConfig, interactive: bool) -> Result<LogTarget, LoggingError> {
    let target = LogTarget::resolve(config, interactive);
    let filter = env_filter(&config.level)?;

    let writer = match &target {
        LogTarget::File(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|source| LoggingError::File {
                    path: path.clone(),
                    source,
                })?;
            BoxMakeWriter::new(Mutex::new(file))
        }
        LogTarget::Stderr => BoxMakeWriter::new(std::io::stderr),
        LogTarget::Discard => BoxMakeWriter::new(std::io::sink),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(target == LogTarget::Stderr)
        .with_target(false)
        .try_init()
        .map_err(|_| LoggingError::AlreadyInitialized)?;

    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_resolution() {
        let mut config = LogConfig::default();
        assert_eq!(LogTarget::resolve(&config, true), LogTarget::Discard);
        assert_eq!(LogTarget::resolve(&config, false), LogTarget::Stderr);

        config.file = Some(PathBuf::from("/tmp/pr.log"));
        assert_eq!(
            LogTarget::resolve(&config, true),
            LogTarget::File(PathBuf::from("/tmp/pr.log"))
        );
    }

    #[test]
    fn fallback_filter_parses() {
        assert!(EnvFilter::try_new("info").is_ok());
        assert!(EnvFilter::try_new("pianoroll=debug,warn").is_ok());
    }

    #[test]
    fn unopenable_file_is_reported() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = LogConfig {
            level: "info".to_string(),
            // A directory cannot be opened for appending.
            file: Some(dir.path().to_path_buf()),
        };
        assert!(matches!(
            init(&config, false),
            Err(LoggingError::File { .. })
        ));
    }
}
