//! Run orchestrator: load watermark, reconcile, append oldest-first, advance watermark.
//!
//! The watermark only moves after the log append has been attempted, so an interrupted run
//! leaves it at its previous value and the next run re-collects (at-least-once into the log).

use crate::config::HarvestConfig;
use crate::fetcher::{HttpPageFetcher, PageFetcher};
use crate::reconciler::{Reconciler, StopReason};
use crate::sink::EventLog;
use crate::watermark::WatermarkStore;
use anyhow::{Context, Result};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("newest collected event has no id; watermark cannot advance")]
    MissingEventId,
}

/// What one run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub new_events: usize,
    pub pages_fetched: usize,
    pub stop: StopReason,
    /// Records written to the log this run.
    pub appended: usize,
    /// Watermark after the run (unchanged when nothing was new).
    pub watermark: Option<String>,
    /// Whether a new watermark was persisted this run.
    pub watermark_saved: bool,
}

/// Wires the watermark store, reconciler and event log for one deployment.
pub struct Harvester<F> {
    store: WatermarkStore,
    log: EventLog,
    reconciler: Reconciler<F>,
}

impl Harvester<HttpPageFetcher> {
    /// Harvester over the HTTP feed described by `config`.
    pub fn from_config(config: &HarvestConfig) -> Result<Self> {
        let fetcher = HttpPageFetcher::new(config).context("build HTTP client")?;
        Ok(Self::new(config, fetcher))
    }
}

impl<F: PageFetcher> Harvester<F> {
    pub fn new(config: &HarvestConfig, fetcher: F) -> Self {
        Self {
            store: WatermarkStore::new(config.state_path()),
            log: EventLog::new(config.events_path()),
            reconciler: Reconciler::new(fetcher, config.max_pages),
        }
    }

    pub fn store(&self) -> &WatermarkStore {
        &self.store
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn reconciler(&self) -> &Reconciler<F> {
        &self.reconciler
    }

    /// Execute one harvest. Only unexpected failures are returned; they are logged first.
    pub async fn run(&self) -> Result<RunSummary> {
        tracing::info!("harvest run starting");
        let result = self.run_inner().await;
        match &result {
            Ok(summary) => tracing::info!(
                new_events = summary.new_events,
                appended = summary.appended,
                pages = summary.pages_fetched,
                stop = %summary.stop,
                watermark = summary.watermark.as_deref().unwrap_or(""),
                "harvest run finished"
            ),
            Err(e) => tracing::error!(error = ?e, "harvest run failed"),
        }
        result
    }

    async fn run_inner(&self) -> Result<RunSummary> {
        let watermark = self.store.load();
        let found = self.reconciler.reconcile(watermark.as_deref()).await;

        if found.is_empty() {
            tracing::info!("no new events found");
            return Ok(RunSummary {
                new_events: 0,
                pages_fetched: found.pages_fetched,
                stop: found.stop,
                appended: 0,
                watermark,
                watermark_saved: false,
            });
        }
        tracing::info!(count = found.events.len(), "found new events");

        let report = self.log.append(found.chronological());
        if !report.is_complete() {
            tracing::warn!(
                written = report.written,
                intended = found.events.len(),
                "event log incomplete, advancing watermark anyway"
            );
        }

        let newest = found
            .newest()
            .and_then(|ev| ev.id())
            .ok_or(HarvestError::MissingEventId)
            .with_context(|| {
                format!(
                    "{} new events appended from {} page(s)",
                    report.written, found.pages_fetched
                )
            })?;
        let saved = self.store.save(&newest);
        if saved {
            tracing::info!(last_event_id = %newest, "updated watermark");
        }

        Ok(RunSummary {
            new_events: found.events.len(),
            pages_fetched: found.pages_fetched,
            stop: found.stop,
            appended: report.written,
            watermark: if saved { Some(newest) } else { watermark },
            watermark_saved: saved,
        })
    }
}
