// src/freshness.rs
//! Freshness gate: is an article recent enough to publish?

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use once_cell::sync::OnceCell;
use regex::Regex;
use serde::Deserialize;

use crate::article::ArticleRecord;

/// What to do with an article that has no usable timestamp.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fallback {
    Accept,
    #[default]
    Reject,
}

/// Granularity of a date recovered from a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HintPrecision {
    Minute,
    Day,
}

/// Which evidence decided the verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Basis {
    Published,
    UrlHint(HintPrecision),
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreshnessVerdict {
    Fresh(Basis),
    Stale(Basis),
}

impl FreshnessVerdict {
    pub fn is_fresh(&self) -> bool {
        matches!(self, FreshnessVerdict::Fresh(_))
    }

    pub fn basis(&self) -> Basis {
        match self {
            FreshnessVerdict::Fresh(b) | FreshnessVerdict::Stale(b) => *b,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FreshnessPolicy {
    pub window: Duration,
    pub fallback: Fallback,
    /// Recover a date from the link when the source gives none.
    pub url_date_hint: bool,
    /// Offset used to read dates embedded in URLs.
    pub offset: FixedOffset,
}

impl FreshnessPolicy {
    pub fn new(window: Duration, fallback: Fallback) -> Self {
        Self {
            window,
            fallback,
            url_date_hint: false,
            offset: kst(),
        }
    }

    pub fn with_url_date_hint(mut self, on: bool, offset: FixedOffset) -> Self {
        self.url_date_hint = on;
        self.offset = offset;
        self
    }

    pub fn evaluate(&self, rec: &ArticleRecord, now: DateTime<Utc>) -> FreshnessVerdict {
        if let Some(published) = rec.published_at() {
            return verdict(now, published, self.window, Basis::Published);
        }

        if self.url_date_hint {
            if let Some((hint, precision)) = url_date_hint(rec.url(), self.offset) {
                let slack = match precision {
                    HintPrecision::Minute => Duration::zero(),
                    HintPrecision::Day => Duration::days(1),
                };
                return verdict(now, hint, self.window + slack, Basis::UrlHint(precision));
            }
        }

        match self.fallback {
            Fallback::Accept => FreshnessVerdict::Fresh(Basis::Fallback),
            Fallback::Reject => FreshnessVerdict::Stale(Basis::Fallback),
        }
    }

    pub fn is_fresh(&self, rec: &ArticleRecord, now: DateTime<Utc>) -> bool {
        self.evaluate(rec, now).is_fresh()
    }
}

// Negative age means the source clock runs ahead of ours; that is drift, not staleness.
fn verdict(now: DateTime<Utc>, at: DateTime<Utc>, window: Duration, basis: Basis) -> FreshnessVerdict {
    let age = now.signed_duration_since(at);
    if age <= window {
        FreshnessVerdict::Fresh(basis)
    } else {
        FreshnessVerdict::Stale(basis)
    }
}

/// UTC+9, the offset Korean outlets publish in.
pub fn kst() -> FixedOffset {
    FixedOffset::east_opt(9 * 3600).expect("UTC+9 is a valid offset")
}

/// Recover a publish date from a link: `c_YYYYMMDDHHMM` cluster ids,
/// `/YYYY/MM/DD/` path segments or a standalone `YYYYMMDD` run.
pub fn url_date_hint(url: &str, offset: FixedOffset) -> Option<(DateTime<Utc>, HintPrecision)> {
    static RE_CLUSTER: OnceCell<Regex> = OnceCell::new();
    static RE_PATH: OnceCell<Regex> = OnceCell::new();
    static RE_RUN: OnceCell<Regex> = OnceCell::new();

    let re_cluster = RE_CLUSTER.get_or_init(|| Regex::new(r"c_(\d{12})").unwrap());
    if let Some(c) = re_cluster.captures(url) {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&c[1], "%Y%m%d%H%M") {
            if let Some(dt) = offset.from_local_datetime(&naive).single() {
                return Some((dt.with_timezone(&Utc), HintPrecision::Minute));
            }
        }
    }

    let re_path = RE_PATH.get_or_init(|| Regex::new(r"/((?:19|20)\d{2})/(\d{2})/(\d{2})(?:/|$)").unwrap());
    if let Some(c) = re_path.captures(url) {
        if let Some(d) = ymd(&c[1], &c[2], &c[3]) {
            return day_start(d, offset).map(|dt| (dt, HintPrecision::Day));
        }
    }

    let re_run = RE_RUN.get_or_init(|| Regex::new(r"(?:^|\D)((?:19|20)\d{2})(\d{2})(\d{2})(?:\D|$)").unwrap());
    for c in re_run.captures_iter(url) {
        if let Some(d) = ymd(&c[1], &c[2], &c[3]) {
            return day_start(d, offset).map(|dt| (dt, HintPrecision::Day));
        }
    }
    None
}

fn ymd(y: &str, m: &str, d: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(y.parse().ok()?, m.parse().ok()?, d.parse().ok()?)
}

fn day_start(d: NaiveDate, offset: FixedOffset) -> Option<DateTime<Utc>> {
    let naive = d.and_hms_opt(0, 0, 0)?;
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}
