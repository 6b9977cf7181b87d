//! API-backed fetch: HTTP GET + JSON path extraction.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use pricewatch_core::{ChatId, Messenger, PricewatchError, Result, TrackerConfig};

use crate::FetchStrategy;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Fetches a tracker's value from a public JSON API.
pub struct ApiFetcher {
    client: reqwest::Client,
    messenger: Arc<dyn Messenger>,
}

impl ApiFetcher {
    pub fn new(messenger: Arc<dyn Messenger>) -> Self {
        Self {
            client: reqwest::Client::new(),
            messenger,
        }
    }

    async fn fetch_json(&self, tracker: &TrackerConfig) -> Result<Value> {
        let response = self
            .client
            .get(&tracker.data_url)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| PricewatchError::Fetch(format!("GET {} failed: {e}", tracker.data_url)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PricewatchError::Fetch(format!(
                "GET {} returned {status}",
                tracker.data_url
            )));
        }

        response
            .json()
            .await
            .map_err(|e| PricewatchError::Extract(format!("invalid JSON response: {e}")))
    }
}

#[async_trait]
impl FetchStrategy for ApiFetcher {
    async fn execute(&self, tracker: &TrackerConfig, chat: ChatId) -> Result<String> {
        let body = self.fetch_json(tracker).await?;
        let value = extract_value(&body, &tracker.extraction_path)?;

        crate::notify_if_matched(self.messenger.as_ref(), tracker, chat, value).await?;

        Ok(format!("{value:.2}"))
    }
}

/// Walk a dot-separated path through a JSON document and coerce the leaf to
/// a number. Object keys and array indices are both valid segments; string
/// and number leaves coerce, every other type is an extraction error.
pub fn extract_value(document: &Value, path: &str) -> Result<f64> {
    let mut current = document;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment).ok_or_else(|| {
                PricewatchError::Extract(format!("path segment '{segment}' not found"))
            })?,
            Value::Array(items) => {
                let index: usize = segment.parse().map_err(|_| {
                    PricewatchError::Extract(format!(
                        "path segment '{segment}' is not an array index"
                    ))
                })?;
                items.get(index).ok_or_else(|| {
                    PricewatchError::Extract(format!("array index {index} out of bounds"))
                })?
            }
            _ => {
                return Err(PricewatchError::Extract(format!(
                    "path segment '{segment}' applied to a leaf value"
                )));
            }
        };
    }

    match current {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| PricewatchError::Extract("number is not representable as f64".into())),
        Value::String(s) => s
            .parse()
            .map_err(|_| PricewatchError::Extract(format!("string value '{s}' is not numeric"))),
        other => Err(PricewatchError::Extract(format!(
            "unsupported extracted value type: {other}"
        ))),
    }
}
