// src/ingest/fetch.rs
use async_trait::async_trait;
use metrics::{counter, histogram};
use reqwest::Client;
use std::time::{Duration, Instant};

use crate::ingest::types::{FetchError, Fetcher, SourceConfig};

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; news-relay/0.1)";

/// Plain HTTP GET fetcher; one request per source per cycle, no retries.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, FetchError> {
        Self::with_user_agent(DEFAULT_USER_AGENT)
    }

    pub fn with_user_agent(user_agent: &str) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .gzip(true)
            .build()
            .map_err(|e| FetchError::Transport(format!("building HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

async fn send_for_text(req: reqwest::RequestBuilder) -> Result<String, FetchError> {
    let resp = req.send().await?.error_for_status()?;
    Ok(resp.text().await?)
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, source: &SourceConfig) -> Result<String, FetchError> {
        let t0 = Instant::now();
        let mut req = self
            .client
            .get(&source.url)
            .timeout(Duration::from_secs(source.timeout_secs.max(1)));
        for (k, v) in &source.headers {
            req = req.header(k.as_str(), v.as_str());
        }

        let result = send_for_text(req).await;

        histogram!("relay_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        if result.is_err() {
            counter!("relay_source_errors_total", "source" => source.label.clone()).increment(1);
        }
        result
    }
}
