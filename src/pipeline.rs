// src/pipeline.rs
//! One polling cycle: fetch → extract → relevance → freshness → dedup →
//! throttle → commit → publish.
//!
//! A cycle always reaches [`CyclePhase::Done`]. Sources that fail to fetch or
//! parse are reported as [`SourceOutcome::Skipped`] and the rest carry on.
//! Articles are handled strictly in the order sources and extractors yield
//! them, and the seen set is only touched from `&mut self`, so check and
//! commit are single-writer even when fetches run concurrently.

use chrono::{DateTime, FixedOffset, Utc};
use futures::stream::{self, StreamExt};
use metrics::{counter, gauge};

use crate::article::{ArticleRecord, IdentityRules};
use crate::config::{PublisherConfig, RelayConfig};
use crate::dedup::DedupStore;
use crate::freshness::FreshnessPolicy;
use crate::ingest::types::{FetchError, Fetcher, SourceConfig};
use crate::ingest::{extract, ExtractContext};
use crate::notify::{
    format_article, Delivery, LogNotifier, Notifier, PublishError, Publisher, TelegramNotifier,
};
use crate::relevance::RelevancePolicy;
use crate::throttle::KeywordThrottle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    Fetching,
    Extracting,
    Filtering,
    Deduping,
    Publishing,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceOutcome {
    Polled { label: String, articles: usize },
    Skipped { label: String, reason: String },
}

impl SourceOutcome {
    pub fn label(&self) -> &str {
        match self {
            SourceOutcome::Polled { label, .. } | SourceOutcome::Skipped { label, .. } => label,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, SourceOutcome::Skipped { .. })
    }
}

/// What happened during one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub phase: CyclePhase,
    pub sources: Vec<SourceOutcome>,
    pub articles: usize,
    pub irrelevant: usize,
    pub stale: usize,
    pub duplicate: usize,
    pub throttled: usize,
    pub published: usize,
    pub publish_failed: usize,
}

impl CycleReport {
    fn new() -> Self {
        Self {
            phase: CyclePhase::Fetching,
            sources: Vec::new(),
            articles: 0,
            irrelevant: 0,
            stale: 0,
            duplicate: 0,
            throttled: 0,
            published: 0,
            publish_failed: 0,
        }
    }

    /// Articles that passed every gate and were committed.
    pub fn accepted(&self) -> usize {
        self.published + self.publish_failed
    }

    fn enter(&mut self, phase: CyclePhase) {
        if self.phase != phase {
            tracing::trace!(target: "relay", from = ?self.phase, to = ?phase, "cycle phase");
            self.phase = phase;
        }
    }
}

/// Decision for a single article, before any side effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    Irrelevant,
    Stale,
    Duplicate,
    Throttled,
}

pub struct Pipeline {
    sources: Vec<SourceConfig>,
    fetcher: Box<dyn Fetcher>,
    relevance: RelevancePolicy,
    freshness: FreshnessPolicy,
    identity: IdentityRules,
    store: DedupStore,
    throttle: KeywordThrottle,
    publisher: Publisher,
    fetch_concurrency: usize,
    offset: FixedOffset,
}

/// Telegram in normal operation, the log sink in dry-run mode.
pub fn notifier_from_config(cfg: &PublisherConfig) -> Box<dyn Notifier> {
    if cfg.dry_run {
        Box::new(LogNotifier)
    } else {
        Box::new(
            TelegramNotifier::new(cfg.bot_token.clone(), cfg.chat_id.clone())
                .with_endpoint(cfg.endpoint.clone())
                .with_timeout(cfg.timeout_secs),
        )
    }
}

impl Pipeline {
    /// Wire a pipeline from a prepared config. Loads the seen set from disk.
    pub fn from_config(
        cfg: &RelayConfig,
        fetcher: Box<dyn Fetcher>,
        notifier: Box<dyn Notifier>,
    ) -> Self {
        let store = DedupStore::load(cfg.dedup.path.clone(), cfg.dedup.cap);
        Self::new(cfg, fetcher, notifier, store)
    }

    /// Like [`Pipeline::from_config`] with an already loaded store.
    pub fn new(
        cfg: &RelayConfig,
        fetcher: Box<dyn Fetcher>,
        notifier: Box<dyn Notifier>,
        store: DedupStore,
    ) -> Self {
        Self {
            sources: cfg.sources.clone(),
            fetcher,
            relevance: cfg.relevance.clone().cleaned(),
            freshness: cfg.freshness.policy(),
            identity: cfg.dedup.rules(),
            store,
            throttle: KeywordThrottle::new(cfg.throttle.keyword_cooldown_secs),
            publisher: Publisher::new(notifier, cfg.publisher.settings()),
            fetch_concurrency: cfg.schedule.fetch_concurrency.max(1),
            offset: cfg.freshness.offset(),
        }
    }

    pub fn sources(&self) -> &[SourceConfig] {
        &self.sources
    }

    pub fn store(&self) -> &DedupStore {
        &self.store
    }

    /// Send a one-off text through the publisher (startup notice, probes).
    pub async fn announce(&mut self, text: &str) -> Result<Delivery, PublishError> {
        self.publisher.publish(text).await
    }

    /// Poll every configured source once.
    pub async fn run_all(&mut self, now: DateTime<Utc>) -> CycleReport {
        let all: Vec<usize> = (0..self.sources.len()).collect();
        self.run_cycle(now, &all).await
    }

    /// Poll the sources at indexes `due`, in that order.
    pub async fn run_cycle(&mut self, now: DateTime<Utc>, due: &[usize]) -> CycleReport {
        let mut report = CycleReport::new();
        let bodies = self.fetch_due(due).await;

        for (idx, fetched) in bodies {
            let source = &self.sources[idx];
            let label = source.label.clone();
            let body = match fetched {
                Ok(body) => body,
                Err(e) => {
                    tracing::warn!(target: "ingest", source = %label, error = %e, "fetch failed; source skipped");
                    report.sources.push(SourceOutcome::Skipped {
                        label,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            report.enter(CyclePhase::Extracting);
            let ctx = ExtractContext::new(now, self.offset);
            let articles = match extract(source, &body, ctx) {
                Ok(stream) => stream,
                Err(e) => {
                    counter!("relay_source_errors_total", "source" => label.clone()).increment(1);
                    tracing::warn!(target: "ingest", source = %label, error = %e, "unparseable document; source skipped");
                    report.sources.push(SourceOutcome::Skipped {
                        label,
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let mut seen_here = 0usize;
            for rec in articles {
                seen_here += 1;
                self.process(rec, now, &mut report).await;
            }
            tracing::debug!(target: "ingest", source = %label, articles = seen_here, "source polled");
            report.sources.push(SourceOutcome::Polled {
                label,
                articles: seen_here,
            });
        }

        self.throttle.prune(now);
        report.enter(CyclePhase::Done);
        gauge!("relay_seen_set_size").set(self.store.len() as f64);
        gauge!("relay_last_cycle_ts").set(now.timestamp() as f64);
        tracing::info!(
            target: "relay",
            sources = report.sources.len(),
            skipped = report.sources.iter().filter(|s| s.is_skipped()).count(),
            articles = report.articles,
            published = report.published,
            failed = report.publish_failed,
            duplicate = report.duplicate,
            stale = report.stale,
            "cycle done"
        );
        report
    }

    /// Fetch bodies for `due`, up to `fetch_concurrency` at a time. Results
    /// come back in `due` order regardless of completion order.
    async fn fetch_due(&self, due: &[usize]) -> Vec<(usize, Result<String, FetchError>)> {
        let fetcher = &*self.fetcher;
        let sources = &self.sources;
        stream::iter(due.iter().copied().filter(|&i| i < sources.len()))
            .map(|i| async move { (i, fetcher.fetch(&sources[i]).await) })
            .buffered(self.fetch_concurrency)
            .collect()
            .await
    }

    async fn process(&mut self, rec: ArticleRecord, now: DateTime<Utc>, report: &mut CycleReport) {
        report.articles += 1;
        counter!("relay_articles_total").increment(1);

        report.enter(CyclePhase::Filtering);
        let Some(hit) = self.relevance.evaluate(rec.title()) else {
            return self.reject(&rec, Verdict::Irrelevant, report);
        };
        if !self.freshness.evaluate(&rec, now).is_fresh() {
            return self.reject(&rec, Verdict::Stale, report);
        }

        report.enter(CyclePhase::Deduping);
        let ids = self.identity.identities(&rec);
        if self.store.check_any(&ids) {
            return self.reject(&rec, Verdict::Duplicate, report);
        }
        let throttled_kw = !hit.is_tag() && self.throttle.is_enabled();
        if throttled_kw && !self.throttle.should_allow(&hit.needle, now) {
            return self.reject(&rec, Verdict::Throttled, report);
        }
        // committed before sending: a failed delivery is not retried
        self.store.commit_all(&ids);
        if throttled_kw {
            self.throttle.record(&hit.needle, now);
        }

        report.enter(CyclePhase::Publishing);
        let text = {
            let hashtags = self.relevance.keywords_in(rec.title());
            format_article(&rec, &hit, &hashtags, self.publisher.settings().is_html())
        };
        tracing::info!(target: "relay", source = %rec.source_label(), title = %rec.short_title(), matched = %hit.label, "relaying");
        match self.publisher.publish(&text).await {
            Ok(_) => report.published += 1,
            Err(_) => report.publish_failed += 1,
        }
    }

    fn reject(&self, rec: &ArticleRecord, verdict: Verdict, report: &mut CycleReport) {
        let (slot, metric) = match verdict {
            Verdict::Irrelevant => (&mut report.irrelevant, "relay_irrelevant_total"),
            Verdict::Stale => (&mut report.stale, "relay_stale_total"),
            Verdict::Duplicate => (&mut report.duplicate, "relay_duplicate_total"),
            Verdict::Throttled => (&mut report.throttled, "relay_throttled_total"),
        };
        *slot += 1;
        counter!(metric).increment(1);
        if verdict != Verdict::Irrelevant {
            tracing::debug!(target: "relay", title = %rec.short_title(), ?verdict, "skipped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_starts_fetching_and_counts_accepted() {
        let mut r = CycleReport::new();
        assert_eq!(r.phase, CyclePhase::Fetching);
        r.published = 2;
        r.publish_failed = 1;
        assert_eq!(r.accepted(), 3);
        r.enter(CyclePhase::Done);
        assert_eq!(r.phase, CyclePhase::Done);
    }

    #[test]
    fn outcome_label() {
        let o = SourceOutcome::Skipped {
            label: "a".into(),
            reason: "timed out".into(),
        };
        assert!(o.is_skipped());
        assert_eq!(o.label(), "a");
    }
}
