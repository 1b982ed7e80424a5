// src/article.rs
//! Article records and the identities used to recognise them across cycles.

use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Hard cap on a cleaned title, in chars.
const MAX_TITLE_CHARS: usize = 512;

/// Clean a raw headline: decode entities, strip markup, collapse whitespace.
pub fn clean_title(raw: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(raw).to_string();

    // 2) Strip HTML tags (search APIs wrap hits in <b>..</b>)
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[a-z][^>]*>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    // 3) Normalize “ ” ‘ ’ to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace (incl. NBSP left over from &nbsp;)
    out = out.split_whitespace().collect::<Vec<_>>().join(" ");

    if out.chars().count() > MAX_TITLE_CHARS {
        out = out.chars().take(MAX_TITLE_CHARS).collect();
    }
    out
}

/// One fetched item. Built by the extractors, never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArticleRecord {
    title: String,
    url: String,
    source_label: String,
    published_at: Option<DateTime<Utc>>,
}

impl ArticleRecord {
    /// Returns `None` when the title is empty after cleaning.
    pub fn new(
        raw_title: &str,
        url: impl Into<String>,
        source_label: impl Into<String>,
        published_at: Option<DateTime<Utc>>,
    ) -> Option<Self> {
        let title = clean_title(raw_title);
        if title.is_empty() {
            return None;
        }
        Some(Self {
            title,
            url: url.into().trim().to_string(),
            source_label: source_label.into().trim().to_string(),
            published_at,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn source_label(&self) -> &str {
        &self.source_label
    }

    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        self.published_at
    }

    /// Title shortened for log lines.
    pub fn short_title(&self) -> String {
        self.title.chars().take(40).collect()
    }
}

/// Deduplication key derived from an article.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArticleIdentity {
    /// Canonical link.
    Url(String),
    /// Hex digest of the title with noise tokens removed.
    Title(String),
}

impl ArticleIdentity {
    /// String form stored in the seen set.
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ArticleIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArticleIdentity::Url(u) => write!(f, "url:{u}"),
            ArticleIdentity::Title(h) => write!(f, "title:{h}"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityMode {
    Url,
    Title,
    #[default]
    Both,
}

/// Noise tokens stripped from titles before hashing.
pub fn default_noise_tokens() -> Vec<String> {
    ["[속보]", "[단독]", "(단독)", "[기획]", "(기획)", "[인터뷰]", "[여론조사]"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// How identities are derived for a record.
#[derive(Debug, Clone)]
pub struct IdentityRules {
    pub mode: IdentityMode,
    pub noise_tokens: Vec<String>,
}

impl Default for IdentityRules {
    fn default() -> Self {
        Self {
            mode: IdentityMode::Both,
            noise_tokens: default_noise_tokens(),
        }
    }
}

impl IdentityRules {
    pub fn new(mode: IdentityMode, noise_tokens: Vec<String>) -> Self {
        Self { mode, noise_tokens }
    }

    /// Identities for `rec`, never empty. `Url` mode falls back to the title
    /// hash when the link does not parse.
    pub fn identities(&self, rec: &ArticleRecord) -> Vec<ArticleIdentity> {
        let url_id = canonical_url(rec.url()).map(ArticleIdentity::Url);
        let title_id = || ArticleIdentity::Title(title_fingerprint(rec.title(), &self.noise_tokens));
        match (self.mode, url_id) {
            (IdentityMode::Url, Some(u)) => vec![u],
            (IdentityMode::Url, None) | (IdentityMode::Title, _) => vec![title_id()],
            (IdentityMode::Both, Some(u)) => vec![u, title_id()],
            (IdentityMode::Both, None) => vec![title_id()],
        }
    }
}

/// Canonical form of a link: parsed, fragment and `utm_*` params dropped.
pub fn canonical_url(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let mut url = url::Url::parse(raw).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.set_fragment(None);

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !k.starts_with("utm_"))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }
    Some(url.to_string())
}

/// Digest of the title with `noise` tokens removed, so re-tagged copies
/// ("[속보] X" vs "[단독] X") collide.
pub fn title_fingerprint(title: &str, noise: &[String]) -> String {
    use sha2::{Digest, Sha256};

    let mut stripped = title.to_string();
    for tok in noise.iter().filter(|t| !t.is_empty()) {
        stripped = stripped.replace(tok.as_str(), " ");
    }
    let mut normalized = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    if normalized.is_empty() {
        // title consisted only of noise tokens
        normalized = title.split_whitespace().collect::<Vec<_>>().join(" ");
    }

    let digest = Sha256::digest(normalized.as_bytes());
    let mut out = String::with_capacity(32);
    for b in digest.iter().take(16) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_title_strips_markup_and_entities() {
        let t = clean_title("  <b>삼성</b>&nbsp;&nbsp;반도체 &ldquo;HBM&rdquo;\n 증설 ");
        assert_eq!(t, "삼성 반도체 \"HBM\" 증설");
    }

    #[test]
    fn empty_after_cleaning_is_rejected() {
        assert!(ArticleRecord::new("  <span></span> &nbsp; ", "https://a.test/1", "x", None).is_none());
        assert!(ArticleRecord::new("ok", "https://a.test/1", "x", None).is_some());
    }

    #[test]
    fn retagged_titles_share_fingerprint() {
        let noise = default_noise_tokens();
        let a = title_fingerprint("[속보] 환율 1500원 돌파", &noise);
        let b = title_fingerprint("[단독]  환율 1500원 돌파", &noise);
        let c = title_fingerprint("환율 1400원", &noise);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn canonical_url_drops_fragment_and_tracking() {
        let u = canonical_url("https://n.news.test/a/1?utm_source=x&id=7#top").unwrap();
        assert_eq!(u, "https://n.news.test/a/1?id=7");
        let u2 = canonical_url("https://n.news.test/a/1?utm_medium=rss").unwrap();
        assert_eq!(u2, "https://n.news.test/a/1");
        assert!(canonical_url("/relative/path").is_none());
        assert!(canonical_url("").is_none());
    }

    #[test]
    fn identity_modes() {
        let rec = ArticleRecord::new("[속보] A", "https://x.test/1", "src", None).unwrap();
        let no_url = ArticleRecord::new("[속보] A", "", "src", None).unwrap();

        let url_rules = IdentityRules::new(IdentityMode::Url, default_noise_tokens());
        assert!(matches!(url_rules.identities(&rec).as_slice(), [ArticleIdentity::Url(_)]));
        assert!(matches!(url_rules.identities(&no_url).as_slice(), [ArticleIdentity::Title(_)]));

        let both = IdentityRules::default();
        assert_eq!(both.identities(&rec).len(), 2);
        assert_eq!(both.identities(&rec), both.identities(&rec));
        assert!(both.identities(&rec)[0].key().starts_with("url:"));
    }
}
