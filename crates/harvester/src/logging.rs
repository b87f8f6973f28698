//! Logging setup: stderr plus a per-day file under `log_dir`.

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// `{log_dir}/harvest_YYYYMMDD.log` for `date`.
pub fn log_file_path(log_dir: &Path, date: NaiveDate) -> PathBuf {
    log_dir.join(format!("harvest_{}.log", date.format("%Y%m%d")))
}

/// Append-mode log file that switches to a new dated file when the local date changes,
/// so a long-lived `daily` process writes each run into that day's file.
pub struct DailyFile {
    dir: PathBuf,
    date: NaiveDate,
    file: File,
}

impl DailyFile {
    pub fn open(dir: impl Into<PathBuf>, date: NaiveDate) -> io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        let file = open_append(&log_file_path(&dir, date))?;
        Ok(Self { dir, date, file })
    }

    pub fn path(&self) -> PathBuf {
        log_file_path(&self.dir, self.date)
    }

    fn roll_to(&mut self, today: NaiveDate) -> io::Result<()> {
        if today != self.date {
            self.file.flush()?;
            self.file = open_append(&log_file_path(&self.dir, today))?;
            self.date = today;
        }
        Ok(())
    }
}

impl Write for DailyFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.roll_to(Local::now().date_naive())?;
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Install the global subscriber. `RUST_LOG` overrides the default `info` level.
/// Returns today's log file path; a second call leaves the first subscriber in place.
pub fn init(log_dir: &Path) -> Result<PathBuf> {
    let file = DailyFile::open(log_dir, Local::now().date_naive())
        .with_context(|| format!("open log file in {}", log_dir.display()))?;
    let path = file.path();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        .try_init();
    Ok(path)
}

/// Stderr-only subscriber for commands that run before a log dir is known.
pub fn init_stderr() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
