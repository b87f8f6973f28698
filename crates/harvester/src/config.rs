//! Harvester configuration.
//!
//! Loaded once at startup from a JSON document. Any failure here is fatal.

use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::reconciler::DEFAULT_MAX_PAGES;
use crate::scheduler::DailySchedule;

/// File name of the watermark document inside `data_dir`.
pub const STATE_FILE: &str = "state.json";
/// File name of the append-only event log inside `data_dir`.
pub const EVENTS_FILE: &str = "events.jsonl";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Harvester configuration.
#[derive(Clone, Deserialize)]
pub struct HarvestConfig {
    /// REST API root, e.g. `https://gitee.com/api/v5`.
    pub api_base_url: String,
    /// Organization whose event feed is harvested.
    pub organization: String,
    /// Sent as the `access_token` query parameter.
    pub access_token: String,
    /// Page size (`limit` query parameter).
    pub limit: u32,
    /// Holds `state.json` and `events.jsonl`.
    pub data_dir: PathBuf,
    /// Holds the daily log files.
    pub log_dir: PathBuf,
    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Maximum pages fetched in one run.
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
    /// Local wall-clock time (`HH:MM`) of the daily run.
    #[serde(default = "default_schedule")]
    pub schedule: String,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_pages() -> usize {
    DEFAULT_MAX_PAGES
}

fn default_schedule() -> String {
    "01:00".to_string()
}

impl HarvestConfig {
    /// Read, parse and validate the config at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("api_base_url is empty".into()));
        }
        if self.organization.trim().is_empty() {
            return Err(ConfigError::Invalid("organization is empty".into()));
        }
        if self.limit == 0 {
            return Err(ConfigError::Invalid("limit must be at least 1".into()));
        }
        if self.max_pages == 0 {
            return Err(ConfigError::Invalid("max_pages must be at least 1".into()));
        }
        DailySchedule::parse(&self.schedule)
            .map_err(|e| ConfigError::Invalid(format!("schedule: {}", e)))?;
        Ok(())
    }

    pub fn state_path(&self) -> PathBuf {
        self.data_dir.join(STATE_FILE)
    }

    pub fn events_path(&self) -> PathBuf {
        self.data_dir.join(EVENTS_FILE)
    }

    /// `{api_base_url}/orgs/{organization}/events`, tolerant of a trailing slash on the base.
    pub fn events_url(&self) -> String {
        format!(
            "{}/orgs/{}/events",
            self.api_base_url.trim_end_matches('/'),
            self.organization
        )
    }
}

// Hand-written so the token never reaches a log line.
impl fmt::Debug for HarvestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HarvestConfig")
            .field("api_base_url", &self.api_base_url)
            .field("organization", &self.organization)
            .field("access_token", &"<redacted>")
            .field("limit", &self.limit)
            .field("data_dir", &self.data_dir)
            .field("log_dir", &self.log_dir)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_pages", &self.max_pages)
            .field("schedule", &self.schedule)
            .finish()
    }
}
