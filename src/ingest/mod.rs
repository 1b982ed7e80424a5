// src/ingest/mod.rs
pub mod fetch;
pub mod providers;
pub mod types;

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use metrics::counter;
use once_cell::sync::OnceCell;
use regex::Regex;
use time::{format_description::well_known::Rfc2822, OffsetDateTime};

use crate::article::ArticleRecord;
use crate::freshness::kst;
use crate::ingest::types::{ExtractError, ParserKind, SourceConfig};

/// Clock and offset used while reading timestamps out of a document.
#[derive(Debug, Clone, Copy)]
pub struct ExtractContext {
    pub now: DateTime<Utc>,
    /// Offset assumed for timestamps that carry none.
    pub offset: FixedOffset,
}

impl ExtractContext {
    pub fn new(now: DateTime<Utc>, offset: FixedOffset) -> Self {
        Self { now, offset }
    }
}

impl Default for ExtractContext {
    fn default() -> Self {
        Self {
            now: Utc::now(),
            offset: kst(),
        }
    }
}

/// An item as found in the document, before cleaning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawItem {
    pub title: String,
    pub link: String,
    pub published: Option<String>,
    /// Overrides the source label when the page names a publisher per row.
    pub label: Option<String>,
}

/// One pass over the articles of a single fetch. Finite and not restartable.
pub struct ArticleStream {
    inner: Box<dyn Iterator<Item = ArticleRecord> + Send>,
}

impl ArticleStream {
    /// Lazily clean `items` into records, honouring `source.max_items`.
    /// Items without a link or with an empty cleaned title are dropped.
    pub fn from_raw(items: Vec<RawItem>, source: &SourceConfig, ctx: ExtractContext) -> Self {
        let label = source.label.clone();
        let source_name = source.label.clone();
        let iter = items
            .into_iter()
            .take(source.max_items)
            .filter_map(move |raw| {
                let link = raw.link.trim();
                if link.is_empty() {
                    tracing::debug!(target: "ingest", source = %source_name, "item without link dropped");
                    counter!("relay_items_dropped_total").increment(1);
                    return None;
                }
                let published = raw
                    .published
                    .as_deref()
                    .and_then(|p| parse_published(p, &ctx));
                let label = raw.label.as_deref().unwrap_or(&label);
                let rec = ArticleRecord::new(&raw.title, link, label, published);
                if rec.is_none() {
                    tracing::debug!(target: "ingest", source = %source_name, "item with empty title dropped");
                    counter!("relay_items_dropped_total").increment(1);
                }
                rec
            });
        Self {
            inner: Box::new(iter),
        }
    }

    pub fn empty() -> Self {
        Self {
            inner: Box::new(std::iter::empty()),
        }
    }
}

impl Iterator for ArticleStream {
    type Item = ArticleRecord;

    fn next(&mut self) -> Option<ArticleRecord> {
        self.inner.next()
    }
}

/// Parse `body` according to the source's parser kind.
pub fn extract(
    source: &SourceConfig,
    body: &str,
    ctx: ExtractContext,
) -> Result<ArticleStream, ExtractError> {
    let items = match &source.parser {
        ParserKind::Rss => providers::rss::parse_items(body)?,
        ParserKind::Html(sel) => providers::html::parse_items(body, sel, &source.url)?,
        ParserKind::NaverSearch => providers::search::parse_items(body)?,
    };
    Ok(ArticleStream::from_raw(items, source, ctx))
}

/// Best-effort timestamp parsing. Accepts RFC 2822, RFC 3339, common
/// `YYYY-MM-DD HH:MM[:SS]` and compact `YYYYMMDDHHMM[SS]` layouts (in
/// `ctx.offset` when zone-less), unix epochs and relative "5분 전" / "3 hours ago" forms. `None` when nothing fits.
pub fn parse_published(raw: &str, ctx: &ExtractContext) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(odt) = OffsetDateTime::parse(s, &Rfc2822) {
        return DateTime::<Utc>::from_timestamp(odt.unix_timestamp(), odt.nanosecond());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S %z", "%Y-%m-%dT%H:%M:%S%z", "%Y-%m-%d %H:%M:%S%z"] {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for fmt in [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y.%m.%d %H:%M:%S",
        "%Y.%m.%d %H:%M",
        "%Y.%m.%d. %H:%M",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return ctx
                .offset
                .from_local_datetime(&naive)
                .single()
                .map(|dt| dt.with_timezone(&Utc));
        }
    }
    if s.chars().all(|c| c.is_ascii_digit()) {
        return parse_digits(s, ctx);
    }
    parse_relative(s, ctx.now)
}

/// All-digit stamps: compact `YYYYMMDDHHMM[SS]` in `ctx.offset`, or a unix
/// epoch in seconds (10 digits) or millis (13 digits). Other lengths are ambiguous.
fn parse_digits(s: &str, ctx: &ExtractContext) -> Option<DateTime<Utc>> {
    let compact = match s.len() {
        14 => Some("%Y%m%d%H%M%S"),
        12 => Some("%Y%m%d%H%M"),
        _ => None,
    };
    if let Some(fmt) = compact {
        return NaiveDateTime::parse_from_str(s, fmt).ok().and_then(|naive| {
            ctx.offset
                .from_local_datetime(&naive)
                .single()
                .map(|dt| dt.with_timezone(&Utc))
        });
    }
    let n: i64 = s.parse().ok()?;
    match s.len() {
        10 => DateTime::<Utc>::from_timestamp(n, 0),
        13 => DateTime::<Utc>::from_timestamp_millis(n),
        _ => None,
    }
}

fn parse_relative(s: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    static RE_KO: OnceCell<Regex> = OnceCell::new();
    static RE_EN: OnceCell<Regex> = OnceCell::new();

    let re_ko = RE_KO.get_or_init(|| Regex::new(r"(\d+)\s*(초|분|시간|일)\s*전").unwrap());
    let re_en = RE_EN.get_or_init(|| {
        Regex::new(r"(?i)(\d+)\s*(second|sec|minute|min|hour|hr|day)s?\s+ago").unwrap()
    });

    let (n, unit_secs) = if let Some(c) = re_ko.captures(s) {
        let unit = match &c[2] {
            "초" => 1,
            "분" => 60,
            "시간" => 3600,
            _ => 86_400,
        };
        (c[1].parse::<i64>().ok()?, unit)
    } else if let Some(c) = re_en.captures(s) {
        let unit = match c[2].to_ascii_lowercase().as_str() {
            "second" | "sec" => 1,
            "minute" | "min" => 60,
            "hour" | "hr" => 3600,
            _ => 86_400,
        };
        (c[1].parse::<i64>().ok()?, unit)
    } else {
        return None;
    };

    let secs = n.checked_mul(unit_secs)?;
    now.checked_sub_signed(chrono::Duration::try_seconds(secs)?)
}
