// src/ingest/types.rs
use serde::Deserialize;
use std::collections::BTreeMap;
use thiserror::Error;

pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_MAX_ITEMS: usize = 20;

fn default_max_items() -> usize {
    DEFAULT_MAX_ITEMS
}
fn default_timeout_secs() -> u64 {
    DEFAULT_FETCH_TIMEOUT_SECS
}
fn default_link_attr() -> String {
    "href".to_string()
}

/// One polling target. Loaded from config, never created at runtime.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Category or publisher name shown in messages, e.g. "네이버 정치".
    pub label: String,
    pub url: String,
    #[serde(flatten)]
    pub parser: ParserKind,
    #[serde(default = "default_max_items")]
    pub max_items: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Extra request headers; values may be `ENV:NAME`.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Poll this source at most every N seconds (defaults to the global interval).
    #[serde(default)]
    pub interval_secs: Option<u64>,
}

impl SourceConfig {
    pub fn rss(label: &str, url: &str) -> Self {
        Self::with_parser(label, url, ParserKind::Rss)
    }

    pub fn with_parser(label: &str, url: &str, parser: ParserKind) -> Self {
        Self {
            label: label.to_string(),
            url: url.to_string(),
            parser,
            max_items: DEFAULT_MAX_ITEMS,
            timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            headers: BTreeMap::new(),
            interval_secs: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParserKind {
    /// RSS 2.0 / RDF / Atom feed.
    Rss,
    /// HTML listing page read with CSS selectors.
    Html(HtmlSelectors),
    /// Naver search API JSON (`items[].title/link/pubDate`).
    NaverSearch,
}

impl ParserKind {
    pub fn name(&self) -> &'static str {
        match self {
            ParserKind::Rss => "rss",
            ParserKind::Html(_) => "html",
            ParserKind::NaverSearch => "naver_search",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HtmlSelectors {
    /// One match per article row (or the title anchor itself).
    pub item_selector: String,
    /// Title element inside the row; the row itself when absent.
    #[serde(default)]
    pub title_selector: Option<String>,
    #[serde(default = "default_link_attr")]
    pub link_attr: String,
    #[serde(default)]
    pub time_selector: Option<String>,
    /// Attribute holding the timestamp (e.g. `datetime`); element text otherwise.
    #[serde(default)]
    pub time_attr: Option<String>,
    #[serde(default)]
    pub label_selector: Option<String>,
}

impl HtmlSelectors {
    pub fn new(item_selector: &str) -> Self {
        Self {
            item_selector: item_selector.to_string(),
            title_selector: None,
            link_attr: default_link_attr(),
            time_selector: None,
            time_attr: None,
            label_selector: None,
        }
    }

    /// Every selector string, for validation.
    pub fn all(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.item_selector.as_str())
            .chain(self.title_selector.as_deref())
            .chain(self.time_selector.as_deref())
            .chain(self.label_selector.as_deref())
    }
}

/// Transport failure for one source; the source is skipped for the cycle.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("timed out")]
    Timeout,
    #[error("HTTP status {status}")]
    Status { status: u16 },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("reading body failed: {0}")]
    Body(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else if let Some(status) = e.status() {
            FetchError::Status {
                status: status.as_u16(),
            }
        } else if e.is_body() || e.is_decode() {
            FetchError::Body(e.to_string())
        } else {
            FetchError::Transport(e.to_string())
        }
    }
}

/// Document-level parse failure; per-item misses are not errors.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("XML parse error: {0}")]
    Xml(String),
    #[error("JSON parse error: {0}")]
    Json(String),
    #[error("invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },
    #[error("unrecognised feed document")]
    UnknownFeed,
}

#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    /// Raw page or feed body for `source`, bounded by its timeout.
    async fn fetch(&self, source: &SourceConfig) -> Result<String, FetchError>;
}
