// src/metrics.rs
use anyhow::{Context, Result};
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

static HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder. Safe to call more than once; later
    /// calls reuse the first recorder.
    pub fn init() -> Result<Self> {
        let handle = HANDLE
            .get_or_try_init(|| {
                let handle = PrometheusBuilder::new()
                    .install_recorder()
                    .context("prometheus: install recorder")?;
                describe();
                Ok::<_, anyhow::Error>(handle)
            })?
            .clone();
        Ok(Self { handle })
    }

    /// `/metrics` in the Prometheus exposition format plus a `/healthz` probe.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new()
            .route(
                "/metrics",
                get(move || {
                    let h = handle.clone();
                    async move { h.render() }
                }),
            )
            .route("/healthz", get(|| async { "ok" }))
    }

    /// Serve [`Metrics::router`] on `addr` in a background task.
    pub async fn serve(&self, addr: &str) -> Result<tokio::task::JoinHandle<()>> {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .with_context(|| format!("binding metrics listener on {addr}"))?;
        let local = listener.local_addr()?;
        let app = self.router();
        tracing::info!(target: "relay", %local, "metrics endpoint listening");
        Ok(tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(target: "relay", error = %e, "metrics server stopped");
            }
        }))
    }
}

fn describe() {
    describe_counter!("relay_articles_total", "Articles extracted from all sources");
    describe_counter!("relay_irrelevant_total", "Articles rejected by the relevance filter");
    describe_counter!("relay_stale_total", "Articles rejected by the freshness filter");
    describe_counter!("relay_duplicate_total", "Articles already in the seen set");
    describe_counter!("relay_throttled_total", "Keyword matches suppressed by cooldown");
    describe_counter!("relay_published_total", "Messages delivered");
    describe_counter!("relay_publish_errors_total", "Failed deliveries");
    describe_counter!("relay_source_errors_total", "Fetch or extract failures per source");
    describe_counter!("relay_items_dropped_total", "Items without link or title");
    describe_counter!("relay_articles_parsed_total", "Items parsed out of feeds");
    describe_histogram!("relay_fetch_ms", "Fetch latency in milliseconds");
    describe_histogram!("relay_parse_ms", "Feed parse time in milliseconds");
    describe_gauge!("relay_seen_set_size", "Identities retained in the seen set");
    describe_gauge!("relay_last_cycle_ts", "Unix time of the last finished cycle");
}
