//! Common helpers for integration tests.
//! Some helpers are only used by specific test binaries; allow dead_code to avoid per-binary warnings.
#![allow(dead_code)]

use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::extract::{Path as UrlPath, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use harvester::{Event, HarvestConfig, PageFetcher};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

pub const ORG: &str = "acme";
pub const TOKEN: &str = "test-token";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("harvester=debug".parse().unwrap()))
        .with_test_writer()
        .try_init();
}

/// Config pointing at `base_url` with state under `data_dir`.
pub fn config(base_url: &str, data_dir: &Path, limit: u32, max_pages: usize) -> HarvestConfig {
    serde_json::from_value(json!({
        "api_base_url": base_url,
        "organization": ORG,
        "access_token": TOKEN,
        "limit": limit,
        "data_dir": data_dir,
        "log_dir": data_dir.join("logs"),
        "timeout_secs": 1,
        "max_pages": max_pages,
    }))
    .expect("test config")
}

/// Event object with a numeric id, shaped like a feed entry.
pub fn event_json(id: u64) -> Value {
    json!({
        "id": id,
        "type": "PushEvent",
        "actor": {"login": format!("user{}", id % 7)},
        "created_at": format!("2024-05-01T00:{:02}:00+08:00", id % 60),
    })
}

fn id_string(v: &Value) -> Option<String> {
    match v.get("id")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// In-process stand-in for `GET /orgs/{org}/events`.
///
/// Serves `events` newest-first, `limit` at a time, starting after `prev_id` when given.
#[derive(Clone, Default)]
pub struct FakeFeed {
    inner: Arc<Mutex<FeedState>>,
}

#[derive(Default)]
struct FeedState {
    events: Vec<Value>,
    requests: Vec<HashMap<String, String>>,
    fail_anchored: bool,
    body_override: Option<Value>,
    delay: Option<Duration>,
}

impl FakeFeed {
    /// Feed whose ids run from `newest` down to `oldest` inclusive.
    pub fn with_range(newest: u64, oldest: u64) -> Self {
        let feed = Self::default();
        feed.set_events((oldest..=newest).rev().map(event_json).collect());
        feed
    }

    pub fn set_events(&self, events: Vec<Value>) {
        self.inner.lock().unwrap().events = events;
    }

    /// Put newer events at the head of the feed.
    pub fn publish(&self, newest_first: Vec<Value>) {
        let mut state = self.inner.lock().unwrap();
        let mut events = newest_first;
        events.append(&mut state.events);
        state.events = events;
    }

    /// Answer every request that carries `prev_id` with a 500.
    pub fn fail_anchored(&self, on: bool) {
        self.inner.lock().unwrap().fail_anchored = on;
    }

    /// Respond with this body instead of a page.
    pub fn override_body(&self, body: Value) {
        self.inner.lock().unwrap().body_override = Some(body);
    }

    pub fn delay(&self, d: Duration) {
        self.inner.lock().unwrap().delay = Some(d);
    }

    /// Query strings of every request received so far.
    pub fn requests(&self) -> Vec<HashMap<String, String>> {
        self.inner.lock().unwrap().requests.clone()
    }

    /// Serve on an ephemeral localhost port; returns the base URL.
    pub async fn spawn(&self) -> Result<String> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .context("bind fake feed")?;
        let addr = listener.local_addr()?;
        let app = Router::new()
            .route("/orgs/{org}/events", get(events_handler))
            .with_state(self.clone());
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Ok(format!("http://{}", addr))
    }
}

async fn events_handler(
    UrlPath(org): UrlPath<String>,
    State(feed): State<FakeFeed>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let delay = {
        let mut state = feed.inner.lock().unwrap();
        state.requests.push(query.clone());
        state.delay
    };
    if let Some(d) = delay {
        tokio::time::sleep(d).await;
    }

    let state = feed.inner.lock().unwrap();
    if org != ORG {
        return (StatusCode::NOT_FOUND, "no such org").into_response();
    }
    if query.get("access_token").map(String::as_str) != Some(TOKEN) {
        return (StatusCode::UNAUTHORIZED, "bad token").into_response();
    }
    if let Some(body) = &state.body_override {
        return Json(body.clone()).into_response();
    }
    let anchor = query.get("prev_id");
    if anchor.is_some() && state.fail_anchored {
        return (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response();
    }
    let limit: usize = query.get("limit").and_then(|l| l.parse().ok()).unwrap_or(20);
    let start = match anchor {
        None => 0,
        Some(prev) => match state
            .events
            .iter()
            .position(|e| id_string(e).as_deref() == Some(prev.as_str()))
        {
            Some(pos) => pos + 1,
            None => state.events.len(),
        },
    };
    let page: Vec<Value> = state.events.iter().skip(start).take(limit).cloned().collect();
    Json(page).into_response()
}

/// Serves pre-scripted pages in call order and records each anchor.
pub struct ScriptedFetcher {
    pages: Vec<Vec<Event>>,
    anchors: Mutex<Vec<Option<String>>>,
}

impl ScriptedFetcher {
    pub fn new(pages: Vec<Vec<Value>>) -> Self {
        let pages = pages
            .into_iter()
            .map(|p| p.into_iter().filter_map(Event::from_value).collect())
            .collect();
        Self {
            pages,
            anchors: Mutex::new(Vec::new()),
        }
    }

    pub fn anchors(&self) -> Vec<Option<String>> {
        self.anchors.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn fetch(&self, anchor: Option<&str>) -> Vec<Event> {
        let mut anchors = self.anchors.lock().unwrap();
        let n = anchors.len();
        anchors.push(anchor.map(str::to_string));
        self.pages.get(n).cloned().unwrap_or_default()
    }
}

/// Parsed lines of an events.jsonl file.
pub fn read_log(path: &Path) -> Vec<Value> {
    match std::fs::read_to_string(path) {
        Ok(s) => s.lines().map(|l| serde_json::from_str(l).expect("log line")).collect(),
        Err(_) => Vec::new(),
    }
}

/// The `id` of each record, as u64.
pub fn log_ids(path: &Path) -> Vec<u64> {
    read_log(path)
        .iter()
        .map(|v| v["id"].as_u64().expect("numeric id"))
        .collect()
}
