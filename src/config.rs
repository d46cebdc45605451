//! Application configuration, loaded from ~/.pianoroll/config.yaml.
//!
//! Every field has a default, so a partial (or missing) file is fine.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::document::DEFAULT_BPM;
use crate::playback::{PlaybackError, SchedulerConfig};
use crate::session::DEFAULT_SNAP;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error("config YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Default config path (~/.pianoroll/config.yaml).
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".pianoroll").join("config.yaml"))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Tempo for new documents.
    pub bpm: f64,
    /// Initial snap quantum in beats (0 = off).
    pub snap: f64,
    pub grid: GridConfig,
    pub playback: PlaybackConfig,
    pub remote: RemoteConfig,
    pub log: LogConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bpm: DEFAULT_BPM,
            snap: DEFAULT_SNAP,
            grid: GridConfig::default(),
            playback: PlaybackConfig::default(),
            remote: RemoteConfig::default(),
            log: LogConfig::default(),
        }
    }
}

/// Grid scale in terminal cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Columns per beat.
    pub beat_width: f64,
    /// Rows per pitch.
    pub row_height: f64,
    /// Columns from a note's right edge that grab it for resizing.
    pub edge_margin: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            beat_width: 8.0,
            row_height: 1.0,
            edge_margin: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub tick_ms: u64,
    pub lookahead_ms: u64,
    pub end_margin_beats: f64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            tick_ms: 25,
            lookahead_ms: 150,
            end_margin_beats: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl RemoteConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter directive used when `PIANOROLL_LOG` is unset.
    pub level: String,
    /// Log file. Without one the TUI discards logs and headless commands
    /// write to stderr.
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl AppConfig {
    /// Load from the default path. A missing file (or home dir) gives defaults.
    pub fn load() -> Result<Self, ConfigError> {
        match default_config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load from `path`, falling back to defaults when it doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(&content)?)
    }

    /// Write to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_yaml::to_string(self)?)?;
        Ok(())
    }

    /// Validated scheduler timing.
    pub fn scheduler_config(&self) -> Result<SchedulerConfig, PlaybackError> {
        Ok(SchedulerConfig::new(
            Duration::from_millis(self.playback.tick_ms),
            Duration::from_millis(self.playback.lookahead_ms),
        )?
        .with_end_margin(self.playback.end_margin_beats))
    }
}
