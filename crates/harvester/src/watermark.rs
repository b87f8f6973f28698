//! Watermark store: the id of the newest captured event, persisted as `state.json`.
//!
//! Read failures degrade to "no watermark" (first run). Write failures are logged and reported
//! to the caller; the next run then re-collects the same events.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("state file I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error("state file JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Persisted watermark document.
///
/// Only `last_event_id` is needed to resume. `last_update` is written as RFC 3339 but read
/// leniently: offset-less ISO-8601 is taken as local time, anything unparseable or missing
/// becomes `None` without rejecting the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Watermark {
    #[serde(default)]
    pub last_event_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub last_update: Option<DateTime<Utc>>,
}

impl Watermark {
    pub fn new(last_event_id: impl Into<String>) -> Self {
        Self {
            last_event_id: Some(last_event_id.into()),
            last_update: Some(Utc::now()),
        }
    }
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(Value::as_str).and_then(parse_timestamp))
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Some(t.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|t| t.with_timezone(&Utc))
}

/// File-backed watermark store.
#[derive(Debug, Clone)]
pub struct WatermarkStore {
    path: PathBuf,
}

impl WatermarkStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Last persisted event id. `None` when no state exists, when it is unreadable, or when
    /// the stored id is empty.
    pub fn load(&self) -> Option<String> {
        match self.try_load() {
            Ok(Some(w)) => w.last_event_id.filter(|id| !id.is_empty()),
            Ok(None) => None,
            Err(e) => {
                tracing::error!(path = %self.path.display(), reason = %e, "failed to load watermark, starting fresh");
                None
            }
        }
    }

    /// Raw read. `Ok(None)` when the file does not exist.
    pub fn try_load(&self) -> Result<Option<Watermark>, StoreError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }

    /// Record `last_event_id` with the current time. Returns whether it reached disk.
    pub fn save(&self, last_event_id: &str) -> bool {
        match self.try_save(&Watermark::new(last_event_id)) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(path = %self.path.display(), reason = %e, "failed to save watermark");
                false
            }
        }
    }

    /// Write via a sibling temp file and rename, so readers never see a torn document.
    pub fn try_save(&self, watermark: &Watermark) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let body = serde_json::to_string_pretty(watermark)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, body)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
