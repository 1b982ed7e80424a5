//! Run exactly one cycle over every source and exit.
//!
//! `relay_once --dry-run` logs the messages instead of sending them; the seen
//! set is still updated unless `--no-commit` is given as well.

use anyhow::{Context, Result};
use chrono::Utc;
use news_relay::config;
use news_relay::dedup::DedupStore;
use news_relay::ingest::fetch::HttpFetcher;
use news_relay::logging::init_tracing;
use news_relay::pipeline::{notifier_from_config, Pipeline};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let dry_run = args.iter().any(|a| a == "--dry-run");
    let no_commit = args.iter().any(|a| a == "--no-commit");

    let mut cfg = config::read_default()?;
    if dry_run {
        cfg.publisher.dry_run = true;
    }
    let cfg = cfg.prepare().context("invalid relay configuration")?;

    let store = if no_commit {
        // throwaway copy so the real state file is untouched
        let tmp = std::env::temp_dir().join("news-relay-once-seen.json");
        let mut scratch = DedupStore::load(cfg.dedup.path.clone(), cfg.dedup.cap);
        scratch.relocate(tmp);
        scratch
    } else {
        DedupStore::load(cfg.dedup.path.clone(), cfg.dedup.cap)
    };

    let fetcher = HttpFetcher::new().context("building HTTP client")?;
    let notifier = notifier_from_config(&cfg.publisher);
    let mut pipeline = Pipeline::new(&cfg, Box::new(fetcher), notifier, store);

    let report = pipeline.run_all(Utc::now()).await;
    for outcome in &report.sources {
        println!("{outcome:?}");
    }
    println!(
        "articles={} irrelevant={} stale={} duplicate={} throttled={} published={} failed={}",
        report.articles,
        report.irrelevant,
        report.stale,
        report.duplicate,
        report.throttled,
        report.published,
        report.publish_failed
    );
    Ok(())
}
