//! Event log sink: append-only JSON Lines file.
//!
//! One self-contained object per line, each stamped with its capture time. A failure part-way
//! leaves the lines already written in place; there is no rollback.

use crate::event::Event;
use chrono::Utc;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("event log I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error("event log JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Outcome of one [EventLog::append].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppendReport {
    /// Records written, in call order.
    pub written: usize,
    /// Set if the batch stopped early.
    pub failed: Option<String>,
}

impl AppendReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct EventLog {
    path: PathBuf,
}

impl EventLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `events` in the given order. Errors are logged, never returned.
    pub fn append<'a, I>(&self, events: I) -> AppendReport
    where
        I: IntoIterator<Item = &'a Event>,
    {
        let mut written = 0;
        match self.try_append(events, &mut written) {
            Ok(()) => {
                tracing::info!(count = written, path = %self.path.display(), "saved events");
                AppendReport {
                    written,
                    failed: None,
                }
            }
            Err(e) => {
                tracing::error!(written, path = %self.path.display(), reason = %e, "failed to save events");
                AppendReport {
                    written,
                    failed: Some(e.to_string()),
                }
            }
        }
    }

    /// `written` counts lines the file accepted before any error.
    fn try_append<'a, I>(&self, events: I, written: &mut usize) -> Result<(), SinkError>
    where
        I: IntoIterator<Item = &'a Event>,
    {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        write_lines(&mut file, events, written)?;
        file.sync_data()?;
        Ok(())
    }
}

/// One unbuffered `write_all` per record, so `written` never runs ahead of the writer.
fn write_lines<'a, W, I>(out: &mut W, events: I, written: &mut usize) -> Result<(), SinkError>
where
    W: Write,
    I: IntoIterator<Item = &'a Event>,
{
    for ev in events {
        let mut line = serde_json::to_string(&ev.stamped(Utc::now()))?;
        line.push('\n');
        out.write_all(line.as_bytes())?;
        *written += 1;
    }
    Ok(())
}
