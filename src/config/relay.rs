// src/config/relay.rs
use chrono::{Duration, FixedOffset};
use serde::Deserialize;
use std::path::PathBuf;

use crate::article::{default_noise_tokens, IdentityMode, IdentityRules};
use crate::dedup::{DEFAULT_SEEN_CAP, DEFAULT_SEEN_PATH};
use crate::freshness::{kst, Fallback, FreshnessPolicy};
use crate::ingest::types::SourceConfig;
use crate::notify::telegram::DEFAULT_ENDPOINT;
use crate::notify::{PublisherSettings, DEFAULT_MAX_LEN, DEFAULT_MIN_DELAY_MS};
use crate::relevance::RelevancePolicy;

fn default_interval_secs() -> u64 {
    60
}
fn default_fetch_concurrency() -> usize {
    1
}
fn default_startup_message() -> String {
    "📡 news relay started".to_string()
}
fn default_window_secs() -> i64 {
    600
}
fn default_true() -> bool {
    true
}
fn default_utc_offset_hours() -> i32 {
    9
}
fn default_seen_path() -> PathBuf {
    PathBuf::from(DEFAULT_SEEN_PATH)
}
fn default_seen_cap() -> usize {
    DEFAULT_SEEN_CAP
}
fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}
fn default_env_secret() -> String {
    "ENV".to_string()
}
fn default_max_len() -> usize {
    DEFAULT_MAX_LEN
}
fn default_min_delay_ms() -> u64 {
    DEFAULT_MIN_DELAY_MS
}
fn default_publish_timeout_secs() -> u64 {
    10
}
fn default_parse_mode() -> Option<String> {
    Some("HTML".to_string())
}
fn default_keyword_cooldown_secs() -> i64 {
    300
}

/// Whole relay configuration as read from `config/relay.toml` (or `.json`).
#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub schedule: ScheduleConfig,
    pub sources: Vec<SourceConfig>,
    #[serde(default)]
    pub relevance: RelevancePolicy,
    #[serde(default)]
    pub freshness: FreshnessConfig,
    #[serde(default)]
    pub dedup: DedupConfig,
    #[serde(default)]
    pub publisher: PublisherConfig,
    #[serde(default)]
    pub throttle: ThrottleConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Sources fetched at once; processing stays sequential either way.
    #[serde(default = "default_fetch_concurrency")]
    pub fetch_concurrency: usize,
    #[serde(default)]
    pub announce_startup: bool,
    #[serde(default = "default_startup_message")]
    pub startup_message: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            fetch_concurrency: default_fetch_concurrency(),
            announce_startup: false,
            startup_message: default_startup_message(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FreshnessConfig {
    #[serde(default = "default_window_secs")]
    pub window_secs: i64,
    #[serde(default)]
    pub fallback: Fallback,
    #[serde(default = "default_true")]
    pub url_date_hint: bool,
    /// Offset for zone-less timestamps and URL dates (KST by default).
    #[serde(default = "default_utc_offset_hours")]
    pub utc_offset_hours: i32,
}

impl Default for FreshnessConfig {
    fn default() -> Self {
        Self {
            window_secs: default_window_secs(),
            fallback: Fallback::default(),
            url_date_hint: true,
            utc_offset_hours: default_utc_offset_hours(),
        }
    }
}

impl FreshnessConfig {
    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_hours * 3600).unwrap_or_else(kst)
    }

    pub fn policy(&self) -> FreshnessPolicy {
        FreshnessPolicy::new(Duration::seconds(self.window_secs.max(0)), self.fallback)
            .with_url_date_hint(self.url_date_hint, self.offset())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DedupConfig {
    #[serde(default = "default_seen_path")]
    pub path: PathBuf,
    #[serde(default = "default_seen_cap")]
    pub cap: usize,
    #[serde(default)]
    pub identity: IdentityMode,
    #[serde(default = "default_noise_tokens")]
    pub noise_tokens: Vec<String>,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            path: default_seen_path(),
            cap: default_seen_cap(),
            identity: IdentityMode::default(),
            noise_tokens: default_noise_tokens(),
        }
    }
}

impl DedupConfig {
    pub fn rules(&self) -> IdentityRules {
        IdentityRules::new(self.identity, self.noise_tokens.clone())
    }
}

#[derive(Clone, Deserialize)]
pub struct PublisherConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// `"ENV"` reads `TELEGRAM_BOT_TOKEN`; `"ENV:NAME"` reads `NAME`.
    #[serde(default = "default_env_secret")]
    pub bot_token: String,
    /// `"ENV"` reads `TELEGRAM_CHAT_ID`.
    #[serde(default = "default_env_secret")]
    pub chat_id: String,
    #[serde(default = "default_max_len")]
    pub max_len: usize,
    #[serde(default = "default_min_delay_ms")]
    pub min_delay_ms: u64,
    #[serde(default = "default_publish_timeout_secs")]
    pub timeout_secs: u64,
    /// `None` (or `""`) sends plain text.
    #[serde(default = "default_parse_mode")]
    pub parse_mode: Option<String>,
    #[serde(default = "default_true")]
    pub disable_preview: bool,
    #[serde(default)]
    pub dry_run: bool,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            bot_token: default_env_secret(),
            chat_id: default_env_secret(),
            max_len: default_max_len(),
            min_delay_ms: default_min_delay_ms(),
            timeout_secs: default_publish_timeout_secs(),
            parse_mode: default_parse_mode(),
            disable_preview: true,
            dry_run: false,
        }
    }
}

impl std::fmt::Debug for PublisherConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublisherConfig")
            .field("endpoint", &self.endpoint)
            .field("chat_id", &self.chat_id)
            .field("max_len", &self.max_len)
            .field("min_delay_ms", &self.min_delay_ms)
            .field("parse_mode", &self.parse_mode)
            .field("dry_run", &self.dry_run)
            .finish_non_exhaustive()
    }
}

impl PublisherConfig {
    pub fn settings(&self) -> PublisherSettings {
        PublisherSettings {
            max_len: self.max_len,
            min_delay: std::time::Duration::from_millis(self.min_delay_ms),
            parse_mode: self.parse_mode.clone().filter(|m| !m.trim().is_empty()),
            disable_preview: self.disable_preview,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThrottleConfig {
    /// 0 disables the cooldown.
    #[serde(default = "default_keyword_cooldown_secs")]
    pub keyword_cooldown_secs: i64,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            keyword_cooldown_secs: default_keyword_cooldown_secs(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetricsConfig {
    /// e.g. `127.0.0.1:9184`; no exporter endpoint when unset.
    #[serde(default)]
    pub addr: Option<String>,
}
