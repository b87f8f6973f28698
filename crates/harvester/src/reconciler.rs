//! Incremental reconciler: decides which events in the newest-first feed are new.
//!
//! Walks pages from the head of the feed, anchoring each request on the oldest id of the
//! previous page, and collects events until the stored watermark turns up. The walk also ends
//! on an empty page or after `max_pages` requests, so a stale or absent watermark costs at
//! most `max_pages` pages of backfill rather than the whole history.
//!
//! Upstream ordering is trusted: an id is never looked for in pages already passed over, and
//! nothing is deduplicated beyond the watermark comparison.

use crate::event::Event;
use crate::fetcher::PageFetcher;
use std::fmt;

/// Default safety bound on pages per run.
pub const DEFAULT_MAX_PAGES: usize = 10;

/// Why pagination stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The first page was empty (feed empty or first fetch failed).
    FeedEmpty,
    /// The watermark id was found; everything from it onward is already harvested.
    WatermarkFound,
    /// A later page was empty (end of feed or fetch failure).
    EmptyPage,
    /// `max_pages` requests were made without finding the watermark.
    PageLimit,
    /// The oldest event of a page had no id, so no anchor for the next request.
    MissingAnchor,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StopReason::FeedEmpty => "feed_empty",
            StopReason::WatermarkFound => "watermark_found",
            StopReason::EmptyPage => "empty_page",
            StopReason::PageLimit => "page_limit",
            StopReason::MissingAnchor => "missing_anchor",
        };
        f.write_str(s)
    }
}

/// Result of one reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    /// New events, newest-first.
    pub events: Vec<Event>,
    /// Number of fetch calls made.
    pub pages_fetched: usize,
    pub stop: StopReason,
}

impl Reconciliation {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Oldest-first view, the order records are appended to the log.
    pub fn chronological(&self) -> impl Iterator<Item = &Event> {
        self.events.iter().rev()
    }

    /// The newest new event, whose id becomes the next watermark.
    pub fn newest(&self) -> Option<&Event> {
        self.events.first()
    }
}

/// Watermark-gated page walker over a [PageFetcher].
pub struct Reconciler<F> {
    fetcher: F,
    max_pages: usize,
}

impl<F: PageFetcher> Reconciler<F> {
    /// `max_pages` below 1 is raised to 1; the head page is always requested.
    pub fn new(fetcher: F, max_pages: usize) -> Self {
        Self {
            fetcher,
            max_pages: max_pages.max(1),
        }
    }

    pub fn max_pages(&self) -> usize {
        self.max_pages
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Collect events newer than `watermark`. An empty watermark counts as absent.
    pub async fn reconcile(&self, watermark: Option<&str>) -> Reconciliation {
        let watermark = watermark.filter(|w| !w.is_empty());
        match watermark {
            Some(w) => tracing::info!(watermark = w, "reconciling against stored watermark"),
            None => tracing::info!(max_pages = self.max_pages, "no watermark, collecting recent history"),
        }

        let mut events = Vec::new();
        let mut anchor: Option<String> = None;
        let mut pages_fetched = 0;

        let stop = loop {
            if pages_fetched >= self.max_pages {
                tracing::warn!(max_pages = self.max_pages, "page limit reached before watermark");
                break StopReason::PageLimit;
            }
            let page = self.fetcher.fetch(anchor.as_deref()).await;
            pages_fetched += 1;
            if page.is_empty() {
                break if pages_fetched == 1 {
                    StopReason::FeedEmpty
                } else {
                    StopReason::EmptyPage
                };
            }

            let oldest = page.last().and_then(Event::id);
            let mut found = false;
            for ev in page {
                if watermark.is_some_and(|w| ev.is(w)) {
                    found = true;
                    break;
                }
                events.push(ev);
            }
            if found {
                break StopReason::WatermarkFound;
            }
            match oldest {
                Some(id) => anchor = Some(id),
                None => {
                    tracing::warn!(page = pages_fetched, "oldest event on page has no id, cannot paginate further");
                    break StopReason::MissingAnchor;
                }
            }
        };

        tracing::debug!(new = events.len(), pages_fetched, %stop, "reconciliation done");
        Reconciliation {
            events,
            pages_fetched,
            stop,
        }
    }
}
