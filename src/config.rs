use std::time::Duration;

use url::Url;

use crate::dedup::CACHE_CAPACITY;
use crate::retry::RetryPolicy;
use crate::story::ItemId;

pub const API_BASE: &str = "https://hacker-news.firebaseio.com/v0";
pub const STREAM_URL: &str = "https://hacker-news.firebaseio.com/v0/newstories.json";
pub const ITEM_PAGE_URL: &str = "https://news.ycombinator.com/item";

/// Firebase sends a keep-alive roughly every 30 seconds.
pub const STREAM_READ_TIMEOUT: Duration = Duration::from_secs(35);
pub const RECONNECT_BACKOFF: Duration = STREAM_READ_TIMEOUT;
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Where items come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub stream: Url,
    pub api_base: Url,
    pub item_page: Url,
}

impl Endpoints {
    pub fn new(stream: &str, api_base: &str, item_page: &str) -> Result<Self, url::ParseError> {
        Ok(Self {
            stream: Url::parse(stream)?,
            api_base: Url::parse(api_base)?,
            item_page: Url::parse(item_page)?,
        })
    }

    /// `{api_base}/item/{id}.json`
    pub fn item_json(&self, id: ItemId) -> String {
        format!("{}/item/{}.json", self.api_base.as_str().trim_end_matches('/'), id)
    }

    /// Item page with `id` as its only query parameter.
    pub fn item_page(&self, id: ItemId) -> Url {
        let mut url = self.item_page.clone();
        url.query_pairs_mut()
            .clear()
            .append_pair("id", &id.to_string());
        url
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            stream: Url::parse(STREAM_URL).expect("valid default stream url"),
            api_base: Url::parse(API_BASE).expect("valid default api url"),
            item_page: Url::parse(ITEM_PAGE_URL).expect("valid default item page url"),
        }
    }
}

/// Everything the feed needs besides its transports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedConfig {
    pub endpoints: Endpoints,
    pub retry: RetryPolicy,
    /// `None` waits on a silent stream forever.
    pub read_timeout: Option<Duration>,
    pub reconnect_backoff: Duration,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub cache_capacity: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            endpoints: Endpoints::default(),
            retry: RetryPolicy::default(),
            read_timeout: Some(STREAM_READ_TIMEOUT),
            reconnect_backoff: RECONNECT_BACKOFF,
            connect_timeout: CONNECT_TIMEOUT,
            request_timeout: REQUEST_TIMEOUT,
            cache_capacity: CACHE_CAPACITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_json_url() {
        let endpoints = Endpoints::default();
        assert_eq!(
            endpoints.item_json(ItemId(42)),
            "https://hacker-news.firebaseio.com/v0/item/42.json"
        );
    }

    #[test]
    fn trailing_slash_on_api_base() {
        let endpoints = Endpoints::new(STREAM_URL, "http://localhost:9000/v0/", ITEM_PAGE_URL).unwrap();
        assert_eq!(endpoints.item_json(ItemId(1)), "http://localhost:9000/v0/item/1.json");
    }

    #[test]
    fn item_page_replaces_query() {
        let endpoints = Endpoints::new(STREAM_URL, API_BASE, "https://example.com/item?id=1").unwrap();
        assert_eq!(
            endpoints.item_page(ItemId(39000001)).as_str(),
            "https://example.com/item?id=39000001"
        );
    }

    #[test]
    fn rejects_garbage_urls() {
        assert!(Endpoints::new("not a url", API_BASE, ITEM_PAGE_URL).is_err());
    }
}
