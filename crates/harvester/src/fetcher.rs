//! Page fetcher: one bounded GET per page of the organization event feed.
//!
//! Pages are newest-first. With an anchor, the feed returns only events older than it.
//! Failures never reach the caller of [PageFetcher::fetch]; they become an empty page.

use crate::config::HarvestConfig;
use crate::event::Event;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error (status {status}): {body}")]
    Status { status: u16, body: String },
    #[error("decode error: {0}")]
    Decode(String),
}

/// Source of event pages.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// One page, newest-first, strictly older than `anchor` when given. Empty on failure.
    async fn fetch(&self, anchor: Option<&str>) -> Vec<Event>;
}

/// Fetcher for `GET {api_base_url}/orgs/{organization}/events`.
pub struct HttpPageFetcher {
    client: reqwest::Client,
    url: String,
    access_token: String,
    limit: u32,
}

impl HttpPageFetcher {
    pub fn new(config: &HarvestConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            url: config.events_url(),
            access_token: config.access_token.clone(),
            limit: config.limit,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Raw fetch; errors are returned rather than swallowed.
    pub async fn try_fetch(&self, anchor: Option<&str>) -> Result<Vec<Event>, FetchError> {
        let limit = self.limit.to_string();
        let mut query: Vec<(&str, &str)> = vec![
            ("access_token", self.access_token.as_str()),
            ("limit", limit.as_str()),
        ];
        if let Some(prev_id) = anchor.filter(|a| !a.is_empty()) {
            query.push(("prev_id", prev_id));
        }

        let resp = self.client.get(&self.url).query(&query).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let json: Value = resp.json().await?;
        let items = match json {
            Value::Array(items) => items,
            other => {
                return Err(FetchError::Decode(format!(
                    "expected JSON array, got {}",
                    json_kind(&other)
                )))
            }
        };
        let total = items.len();
        let events: Vec<Event> = items.into_iter().filter_map(Event::from_value).collect();
        if events.len() != total {
            tracing::warn!(skipped = total - events.len(), "page contained non-object entries");
        }
        Ok(events)
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, anchor: Option<&str>) -> Vec<Event> {
        tracing::info!(url = %self.url, prev_id = anchor.unwrap_or(""), "fetching events");
        match self.try_fetch(anchor).await {
            Ok(events) => {
                tracing::info!(count = events.len(), "fetched events");
                events
            }
            Err(e) => {
                tracing::error!(reason = %e, "failed to fetch events");
                Vec::new()
            }
        }
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_kind_names() {
        assert_eq!(json_kind(&json!({})), "object");
        assert_eq!(json_kind(&json!(null)), "null");
    }

    #[tokio::test]
    async fn unreachable_host_yields_empty_page() {
        // Port 9 on localhost (discard) is closed in practice; either way the request fails fast.
        let config: HarvestConfig = serde_json::from_value(json!({
            "api_base_url": "http://127.0.0.1:9",
            "organization": "acme",
            "access_token": "t",
            "limit": 5,
            "data_dir": "d",
            "log_dir": "l",
            "timeout_secs": 2
        }))
        .unwrap();
        let fetcher = HttpPageFetcher::new(&config).unwrap();
        assert_eq!(fetcher.url(), "http://127.0.0.1:9/orgs/acme/events");
        assert!(fetcher.fetch(None).await.is_empty());
    }
}
