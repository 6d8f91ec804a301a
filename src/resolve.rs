//! Turning an item id into a [`StoryRecord`].
//!
//! The JSON item API is asked first. When it has nothing for the id after all
//! retries (new items sometimes lag behind the stream), the rendered item page
//! is scraped for its title link instead.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, info, warn};
use unicode_normalization::UnicodeNormalization;
use url::Url;

use crate::config::Endpoints;
use crate::error::TransportError;
use crate::retry::{retrying_fetch, RetryPolicy};
use crate::shutdown::Shutdown;
use crate::story::{ItemId, Resolution, StoryRecord};
use crate::transport::HttpGet;

const ACCEPT_JSON: &str = "application/json";
const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

// Title link of an item page. Older markup puts the anchor straight inside
// `class="title"`, current markup wraps it in `class="titleline"`.
static RE_TITLE_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)class="title(?:line)?"><a href="(?P<url>[^"]*)"[^>]*>(?P<title>.*?)</a>"#).unwrap()
});
static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

#[derive(Debug, Deserialize)]
struct ItemPayload {
    title: Option<String>,
    url: Option<String>,
}

pub struct Resolver<H> {
    http: H,
    endpoints: Endpoints,
    retry: RetryPolicy,
    shutdown: Shutdown,
}

impl<H: HttpGet> Resolver<H> {
    pub fn new(http: H, endpoints: Endpoints, retry: RetryPolicy, shutdown: Shutdown) -> Self {
        Self {
            http,
            endpoints,
            retry,
            shutdown,
        }
    }

    /// Structured source first, scrape second, each with the retry policy.
    pub fn resolve(&self, id: ItemId, timestamp: i64) -> Resolution {
        if let Some(story) = retrying_fetch("item api", &self.retry, &self.shutdown, || {
            self.fetch_structured(id, timestamp)
        }) {
            return Resolution::Structured(story);
        }
        if self.shutdown.is_triggered() {
            return Resolution::Exhausted;
        }

        info!(id = %id, "item api has nothing, falling back to item page");
        if let Some(story) = retrying_fetch("item page", &self.retry, &self.shutdown, || {
            self.fetch_scraped(id, timestamp)
        }) {
            return Resolution::Scraped(story);
        }
        Resolution::Exhausted
    }

    /// One request to the JSON item API.
    pub fn fetch_structured(
        &self,
        id: ItemId,
        timestamp: i64,
    ) -> Result<Option<StoryRecord>, TransportError> {
        let url = self.endpoints.item_json(id);
        let resp = self.http.get(&url, ACCEPT_JSON)?;
        if !resp.is_success() {
            debug!(id = %id, status = resp.status, "item api returned non-success status");
            return Ok(None);
        }

        let body = resp.body.trim();
        if body.is_empty() {
            return Ok(None);
        }
        match serde_json::from_str::<Option<ItemPayload>>(body) {
            Ok(Some(item)) => Ok(Some(StoryRecord {
                id,
                title: item.title,
                url: item.url,
                time: timestamp,
            })),
            Ok(None) => Ok(None),
            Err(e) => {
                warn!(id = %id, error = %e, "item api returned undecodable body");
                Ok(None)
            }
        }
    }

    /// One request to the rendered item page.
    pub fn fetch_scraped(
        &self,
        id: ItemId,
        timestamp: i64,
    ) -> Result<Option<StoryRecord>, TransportError> {
        let page = self.endpoints.item_page(id);
        let resp = self.http.get(page.as_str(), ACCEPT_HTML)?;
        if !resp.is_success() {
            debug!(id = %id, status = resp.status, "item page returned non-success status");
            return Ok(None);
        }

        Ok(extract_title_link(&resp.body, &page).map(|(url, title)| StoryRecord {
            id,
            title: Some(title),
            url: Some(url),
            time: timestamp,
        }))
    }
}

/// First title link in an item page as `(url, title)`.
pub fn extract_title_link(html: &str, page: &Url) -> Option<(String, String)> {
    let caps = RE_TITLE_LINK.captures(html)?;
    let href = html_escape::decode_html_entities(&caps["url"]).to_string();
    let title = tidy_text(&caps["title"]);
    Some((absolutize(page, &href), title))
}

// Absolute hrefs are kept verbatim. Relative ones (text posts link to
// `item?id=…`) are resolved against the page.
fn absolutize(page: &Url, href: &str) -> String {
    match Url::parse(href) {
        Ok(_) => href.to_string(),
        Err(_) => page
            .join(href)
            .map(Into::into)
            .unwrap_or_else(|_| href.to_string()),
    }
}

fn tidy_text(raw: &str) -> String {
    let decoded = html_escape::decode_html_entities(raw);
    let normalized = decoded.nfkc().collect::<String>().replace('\u{00A0}', " ");
    RE_WHITESPACE.replace_all(&normalized, " ").trim().to_string()
}
