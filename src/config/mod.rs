// src/config/mod.rs
//! Loading, secret resolution and validation for [`RelayConfig`].
//!
//! Lookup order:
//! 1) `$RELAY_CONFIG_PATH`
//! 2) `config/relay.toml`
//! 3) `config/relay.json`

pub mod relay;

use anyhow::{anyhow, bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::ingest::providers::html::validate_selectors;
use crate::ingest::types::ParserKind;

pub use relay::{
    DedupConfig, FreshnessConfig, MetricsConfig, PublisherConfig, RelayConfig, ScheduleConfig,
    ThrottleConfig,
};

pub const ENV_CONFIG_PATH: &str = "RELAY_CONFIG_PATH";
pub const ENV_INTERVAL_SECS: &str = "RELAY_INTERVAL_SECS";
pub const ENV_DRY_RUN: &str = "RELAY_DRY_RUN";
pub const ENV_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
pub const ENV_CHAT_ID: &str = "TELEGRAM_CHAT_ID";

const DEFAULT_TOML_PATH: &str = "config/relay.toml";
const DEFAULT_JSON_PATH: &str = "config/relay.json";
const MIN_MAX_LEN: usize = 64;

/// Find the config file without reading it.
pub fn locate() -> Result<PathBuf> {
    if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return Ok(pb);
        }
        bail!("{ENV_CONFIG_PATH} points to non-existent path {}", pb.display());
    }
    for candidate in [DEFAULT_TOML_PATH, DEFAULT_JSON_PATH] {
        let pb = PathBuf::from(candidate);
        if pb.exists() {
            return Ok(pb);
        }
    }
    Err(anyhow!(
        "no configuration found (set {ENV_CONFIG_PATH} or create {DEFAULT_TOML_PATH})"
    ))
}

/// Read and parse the located file. Secrets are left unresolved; call
/// [`RelayConfig::prepare`] before use.
pub fn read_default() -> Result<RelayConfig> {
    let path = locate()?;
    RelayConfig::read_from(&path)
}

/// Locate, parse, apply env overrides, resolve secrets and validate.
pub fn load_default() -> Result<RelayConfig> {
    read_default()?.prepare()
}

impl RelayConfig {
    pub fn read_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        parse_config(&content, ext.as_str())
            .with_context(|| format!("parsing config {}", path.display()))
    }

    /// Env overrides, secret resolution and validation, in that order.
    pub fn prepare(mut self) -> Result<Self> {
        self.apply_env_overrides()?;
        self.resolve_secrets()?;
        self.validate()?;
        Ok(self)
    }

    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(v) = std::env::var(ENV_INTERVAL_SECS) {
            self.schedule.interval_secs = v
                .trim()
                .parse()
                .with_context(|| format!("{ENV_INTERVAL_SECS} is not a number: {v:?}"))?;
        }
        if std::env::var(ENV_DRY_RUN).is_ok_and(|v| v.trim() == "1") {
            self.publisher.dry_run = true;
        }
        Ok(())
    }

    /// Replace `"ENV"` / `"ENV:NAME"` values with the environment's.
    /// Publisher credentials may stay empty in dry-run mode.
    pub fn resolve_secrets(&mut self) -> Result<()> {
        let dry_run = self.publisher.dry_run;
        for (value, default_var) in [
            (&mut self.publisher.bot_token, ENV_BOT_TOKEN),
            (&mut self.publisher.chat_id, ENV_CHAT_ID),
        ] {
            match resolve_secret(value, Some(default_var)) {
                Ok(v) => *value = v,
                Err(_) if dry_run => value.clear(),
                Err(e) => return Err(e),
            }
        }
        for src in &mut self.sources {
            for (name, value) in src.headers.iter_mut() {
                *value = resolve_secret(value, None)
                    .with_context(|| format!("header {name} of source {:?}", src.label))?;
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.sources.is_empty() {
            bail!("at least one [[sources]] entry is required");
        }
        for src in &self.sources {
            if src.label.trim().is_empty() {
                bail!("source with url {:?} has an empty label", src.url);
            }
            let u = url::Url::parse(&src.url)
                .with_context(|| format!("source {:?}: invalid url {:?}", src.label, src.url))?;
            if !matches!(u.scheme(), "http" | "https") {
                bail!("source {:?}: unsupported scheme {}", src.label, u.scheme());
            }
            if src.max_items == 0 {
                bail!("source {:?}: max_items must be at least 1", src.label);
            }
            if let ParserKind::Html(sel) = &src.parser {
                validate_selectors(sel).with_context(|| format!("source {:?}", src.label))?;
            }
        }
        if self.dedup.cap < 1 {
            bail!("[dedup] cap must be at least 1");
        }
        if self.publisher.max_len < MIN_MAX_LEN {
            bail!("[publisher] max_len must be at least {MIN_MAX_LEN}");
        }
        if self.schedule.interval_secs == 0 {
            bail!("[schedule] interval_secs must be positive");
        }
        url::Url::parse(&self.publisher.endpoint)
            .with_context(|| format!("[publisher] invalid endpoint {:?}", self.publisher.endpoint))?;
        if !self.publisher.dry_run {
            if self.publisher.bot_token.trim().is_empty() {
                bail!("[publisher] bot_token is required unless dry_run is set");
            }
            if self.publisher.chat_id.trim().is_empty() {
                bail!("[publisher] chat_id is required unless dry_run is set");
            }
        }
        if self.relevance.tags.is_empty() && self.relevance.keywords.is_empty() {
            tracing::warn!(target: "relay", "no tags or keywords configured; nothing will be relayed");
        }
        Ok(())
    }
}

/// `"ENV"` needs a default variable name; `"ENV:NAME"` names its own.
/// Any other value is returned unchanged.
pub fn resolve_secret(value: &str, default_var: Option<&str>) -> Result<String> {
    let t = value.trim();
    let var = if t.eq_ignore_ascii_case("env") {
        default_var.ok_or_else(|| anyhow!("bare \"ENV\" is only allowed for publisher credentials"))?
    } else if let Some(name) = t.strip_prefix("ENV:") {
        name.trim()
    } else {
        return Ok(value.to_string());
    };
    std::env::var(var).map_err(|_| anyhow!("Missing {var} env var"))
}

fn parse_config(s: &str, hint_ext: &str) -> Result<RelayConfig> {
    if hint_ext == "json" {
        return Ok(serde_json::from_str(s)?);
    }
    if hint_ext == "toml" {
        return Ok(toml::from_str(s)?);
    }
    // unknown extension: sniff
    if s.trim_start().starts_with('{') {
        Ok(serde_json::from_str(s)?)
    } else {
        Ok(toml::from_str(s)?)
    }
}
