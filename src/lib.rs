// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod article;
pub mod config;
pub mod dedup;
pub mod freshness;
pub mod ingest;
pub mod logging;
pub mod metrics;
pub mod notify;
pub mod pipeline;
pub mod relevance;
pub mod scheduler;
pub mod throttle;

// ---- Re-exports for stable public API ----
pub use crate::article::{ArticleIdentity, ArticleRecord, IdentityMode, IdentityRules};
pub use crate::config::RelayConfig;
pub use crate::dedup::{DedupStore, SeenSet};
pub use crate::ingest::types::{FetchError, Fetcher, ParserKind, SourceConfig};
pub use crate::notify::{Notifier, OutboundMessage, PublishError, Publisher};
pub use crate::pipeline::{CycleReport, Pipeline, SourceOutcome};
