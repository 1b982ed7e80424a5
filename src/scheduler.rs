// src/scheduler.rs
use chrono::{DateTime, Utc};
use std::future::Future;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

use crate::ingest::types::SourceConfig;
use crate::pipeline::{CycleReport, Pipeline};

#[derive(Clone, Copy, Debug)]
pub struct SchedulerCfg {
    pub interval_secs: u64,
    /// Stop after this many cycles; `None` runs until shutdown.
    pub max_cycles: Option<u64>,
}

/// Tracks when each source was last polled so sources with their own
/// `interval_secs` are only due every so often.
#[derive(Debug, Clone)]
pub struct SourceClock {
    intervals: Vec<Option<chrono::Duration>>,
    last_polled: Vec<Option<DateTime<Utc>>>,
}

impl SourceClock {
    pub fn new(sources: &[SourceConfig]) -> Self {
        Self {
            intervals: sources
                .iter()
                .map(|s| s.interval_secs.map(|secs| chrono::Duration::seconds(secs as i64)))
                .collect(),
            last_polled: vec![None; sources.len()],
        }
    }

    /// Indexes of sources due at `now`, marking them polled.
    pub fn due(&mut self, now: DateTime<Utc>) -> Vec<usize> {
        let mut out = Vec::new();
        for (i, (interval, last)) in self.intervals.iter().zip(self.last_polled.iter_mut()).enumerate() {
            let is_due = match (interval, *last) {
                (Some(iv), Some(ts)) => now.signed_duration_since(ts) >= *iv,
                _ => true,
            };
            if is_due {
                *last = Some(now);
                out.push(i);
            }
        }
        out
    }
}

/// Run cycles on a fixed interval until `shutdown` resolves. Ticks never
/// overlap: a slow cycle delays the next one and missed ticks are skipped.
pub async fn run<F>(pipeline: &mut Pipeline, cfg: SchedulerCfg, shutdown: F) -> u64
where
    F: Future<Output = ()>,
{
    let mut ticker = tokio::time::interval(Duration::from_secs(cfg.interval_secs.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut clock = SourceClock::new(pipeline.sources());
    let mut cycles = 0u64;

    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!(target: "relay", cycles, "shutdown requested");
                break;
            }
            _ = ticker.tick() => {
                let now = Utc::now();
                let due = clock.due(now);
                let report: CycleReport = pipeline.run_cycle(now, &due).await;
                cycles += 1;
                if report.sources.iter().all(|s| s.is_skipped()) && !report.sources.is_empty() {
                    tracing::warn!(target: "relay", "every source failed this cycle");
                }
                if cfg.max_cycles.is_some_and(|max| cycles >= max) {
                    break;
                }
            }
        }
    }
    cycles
}
