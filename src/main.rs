//! news-relay worker: polls the configured sources on a fixed interval and
//! relays fresh, relevant, unseen headlines to Telegram.

use anyhow::{Context, Result};
use news_relay::config;
use news_relay::ingest::fetch::HttpFetcher;
use news_relay::logging::init_tracing;
use news_relay::metrics::Metrics;
use news_relay::pipeline::{notifier_from_config, Pipeline};
use news_relay::scheduler::{self, SchedulerCfg};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = config::load_default().context("loading relay configuration")?;
    tracing::info!(
        target: "relay",
        sources = cfg.sources.len(),
        interval_secs = cfg.schedule.interval_secs,
        dry_run = cfg.publisher.dry_run,
        "starting news relay"
    );

    let metrics = Metrics::init()?;
    let _metrics_task = match cfg.metrics.addr.as_deref() {
        Some(addr) => Some(metrics.serve(addr).await?),
        None => None,
    };

    let fetcher = HttpFetcher::new().context("building HTTP client")?;
    let notifier = notifier_from_config(&cfg.publisher);
    let mut pipeline = Pipeline::from_config(&cfg, Box::new(fetcher), notifier);
    tracing::info!(target: "dedup", seen = pipeline.store().len(), path = %pipeline.store().path().display(), "seen set loaded");

    if cfg.schedule.announce_startup {
        if let Err(e) = pipeline.announce(&cfg.schedule.startup_message).await {
            tracing::warn!(target: "notify", error = %e, "startup announcement failed");
        }
    }

    let sched = SchedulerCfg {
        interval_secs: cfg.schedule.interval_secs,
        max_cycles: None,
    };
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(target: "relay", error = %e, "cannot listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };
    let cycles = scheduler::run(&mut pipeline, sched, shutdown).await;

    if let Err(e) = pipeline.store().persist() {
        tracing::error!(target: "dedup", error = %e, "final persist failed");
    }
    tracing::info!(target: "relay", cycles, "news relay stopped");
    Ok(())
}
