//! Daily scheduler: run a fresh harvest once a day at a fixed local time.
//!
//! Each run reloads the config and builds a new [Harvester], so edits to the config file apply
//! from the next run. A failed run is logged and the loop keeps waiting; Ctrl+C ends it.

use crate::config::HarvestConfig;
use crate::harvester::Harvester;
use anyhow::Result;
use chrono::{Duration as ChronoDuration, Local, NaiveDateTime, NaiveTime};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::time::{sleep, Duration};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("expected HH:MM, got {0:?}")]
    Format(String),
}

/// Fixed local wall-clock time of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySchedule {
    at: NaiveTime,
}

impl DailySchedule {
    pub fn new(at: NaiveTime) -> Self {
        Self { at }
    }

    /// Parse `HH:MM` (24-hour).
    pub fn parse(s: &str) -> Result<Self, ScheduleError> {
        NaiveTime::parse_from_str(s.trim(), "%H:%M")
            .map(Self::new)
            .map_err(|_| ScheduleError::Format(s.to_string()))
    }

    pub fn at(&self) -> NaiveTime {
        self.at
    }

    /// Next occurrence strictly after `now`.
    pub fn next_after(&self, now: NaiveDateTime) -> NaiveDateTime {
        let today = now.date().and_time(self.at);
        if today > now {
            today
        } else {
            today + ChronoDuration::days(1)
        }
    }

    /// Time to wait from `now` until the next occurrence.
    pub fn until_next(&self, now: NaiveDateTime) -> Duration {
        (self.next_after(now) - now)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }
}

/// Run the harvest daily until Ctrl+C. With `run_now`, one run happens immediately first.
pub async fn run_daily(config_path: impl Into<PathBuf>, schedule: DailySchedule, run_now: bool) -> Result<()> {
    let config_path = config_path.into();
    tracing::info!(at = %schedule.at().format("%H:%M"), "scheduler started, waiting for scheduled time");

    if run_now {
        run_job(&config_path).await;
    }

    loop {
        let wait = schedule.until_next(Local::now().naive_local());
        tracing::debug!(secs = wait.as_secs(), "sleeping until next run");
        tokio::select! {
            _ = sleep(wait) => run_job(&config_path).await,
            res = tokio::signal::ctrl_c() => {
                if let Err(e) = res {
                    tracing::warn!(reason = %e, "ctrl-c handler failed");
                }
                tracing::info!("scheduler stopped by user");
                return Ok(());
            }
        }
    }
}

async fn run_job(config_path: &Path) {
    if let Err(e) = run_job_inner(config_path).await {
        tracing::error!(error = ?e, "scheduled harvest failed");
    }
}

async fn run_job_inner(config_path: &Path) -> Result<()> {
    let config = HarvestConfig::load(config_path)?;
    let harvester = Harvester::from_config(&config)?;
    harvester.run().await?;
    Ok(())
}
