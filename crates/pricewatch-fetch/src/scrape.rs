//! Scrape-backed fetch: HTTP GET + CSS selector extraction.
//!
//! The extraction path of a scraper tracker is a CSS selector; the first
//! matching element's text is stripped down to digits and separators,
//! decimal commas are normalized to dots, and the remainder is parsed as a
//! number.

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use scraper::{Html, Selector};

use pricewatch_core::{ChatId, Messenger, PricewatchError, Result, TrackerConfig};

use crate::FetchStrategy;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

static NON_PRICE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^0-9.,]").expect("static pattern"));

/// Fetches a tracker's value by scraping a web page.
pub struct ScrapeFetcher {
    client: reqwest::Client,
    messenger: Arc<dyn Messenger>,
}

impl ScrapeFetcher {
    pub fn new(messenger: Arc<dyn Messenger>) -> Self {
        Self {
            client: reqwest::Client::new(),
            messenger,
        }
    }

    async fn fetch_page(&self, tracker: &TrackerConfig) -> Result<String> {
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
            .text()
            .await
            .map_err(|e| PricewatchError::Fetch(format!("reading response body: {e}")))
    }
}

#[async_trait]
impl FetchStrategy for ScrapeFetcher {
    async fn execute(&self, tracker: &TrackerConfig, chat: ChatId) -> Result<String> {
        let page = self.fetch_page(tracker).await?;
        // `Html` is not Send; extraction stays fully synchronous between awaits.
        let value = extract_price(&page, &tracker.extraction_path)?;

        crate::notify_if_matched(self.messenger.as_ref(), tracker, chat, value).await?;

        Ok(format!("{value:.2}"))
    }
}

/// Pull the first element matching `selector` out of `page` and parse its
/// text as a price.
pub fn extract_price(page: &str, selector: &str) -> Result<f64> {
    let selector = Selector::parse(selector)
        .map_err(|e| PricewatchError::Extract(format!("invalid CSS selector: {e}")))?;

    let document = Html::parse_document(page);
    let element = document
        .select(&selector)
        .next()
        .ok_or_else(|| PricewatchError::Extract("no element matched the selector".into()))?;

    let text: String = element.text().collect();
    parse_price_text(&text)
}

/// Normalize scraped text (`" 1 234,56 €"`) into a number.
fn parse_price_text(raw: &str) -> Result<f64> {
    let cleaned = NON_PRICE_CHARS.replace_all(raw.trim(), "").replace(',', ".");
    if cleaned.is_empty() {
        return Err(PricewatchError::Extract(format!(
            "no numeric content in scraped text '{}'",
            raw.trim()
        )));
    }

    cleaned.parse().map_err(|_| {
        PricewatchError::Extract(format!("failed to parse scraped price '{cleaned}'"))
    })
}
