//! Incremental harvester for an organization's activity-event feed.
//!
//! - **Reconciler**: walks the newest-first paginated feed and keeps only events newer than
//!   the stored watermark, bounded by a maximum page count.
//! - **Harvester**: one run end to end: load watermark, reconcile, append the new events
//!   oldest-first to `events.jsonl`, advance the watermark in `state.json`.
//! - **Scheduler**: repeats the run once a day at a fixed local time.

pub mod config;
pub mod event;
pub mod fetcher;
pub mod harvester;
pub mod logging;
pub mod reconciler;
pub mod scheduler;
pub mod sink;
pub mod watermark;

pub use config::{ConfigError, HarvestConfig};
pub use event::{Event, CAPTURED_AT_FIELD};
pub use fetcher::{FetchError, HttpPageFetcher, PageFetcher};
pub use harvester::{HarvestError, Harvester, RunSummary};
pub use reconciler::{Reconciler, Reconciliation, StopReason, DEFAULT_MAX_PAGES};
pub use scheduler::{run_daily, DailySchedule, ScheduleError};
pub use sink::{AppendReport, EventLog, SinkError};
pub use watermark::{StoreError, Watermark, WatermarkStore};
