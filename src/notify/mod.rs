// src/notify/mod.rs
//! Outbound notifications: message formatting, the `Notifier` seam and the
//! pacing/length-limiting `Publisher` in front of it.
//!
//! Delivery is at-most-once: the pipeline commits an article to the seen set
//! before publishing and never rolls that back on a failed send.

pub mod log;
pub mod telegram;

use metrics::counter;
use std::time::Duration;
use thiserror::Error;

use crate::article::ArticleRecord;
use crate::relevance::RelevanceMatch;

pub use self::log::LogNotifier;
pub use self::telegram::TelegramNotifier;

pub const DEFAULT_MAX_LEN: usize = 4096;
pub const DEFAULT_MIN_DELAY_MS: u64 = 1000;
pub const TRUNCATION_MARKER: &str = "\n\n(truncated)";
const DEFAULT_EMOJI: &str = "📰";
const MAX_HASHTAGS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub text: String,
    /// e.g. "HTML"; `None` sends plain text.
    pub parse_mode: Option<String>,
    pub disable_preview: bool,
}

/// What the endpoint acknowledged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delivery {
    pub message_id: Option<i64>,
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("timed out")]
    Timeout,
    #[error("HTTP status {status}: {description}")]
    Status { status: u16, description: String },
    #[error("rejected by endpoint: {0}")]
    Rejected(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unexpected response: {0}")]
    Decode(String),
}

#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, msg: &OutboundMessage) -> Result<Delivery, PublishError>;
    fn name(&self) -> &'static str;
}

#[derive(Debug, Clone)]
pub struct PublisherSettings {
    pub max_len: usize,
    pub min_delay: Duration,
    pub parse_mode: Option<String>,
    pub disable_preview: bool,
}

impl Default for PublisherSettings {
    fn default() -> Self {
        Self {
            max_len: DEFAULT_MAX_LEN,
            min_delay: Duration::from_millis(DEFAULT_MIN_DELAY_MS),
            parse_mode: Some("HTML".to_string()),
            disable_preview: true,
        }
    }
}

impl PublisherSettings {
    pub fn is_html(&self) -> bool {
        self.parse_mode
            .as_deref()
            .is_some_and(|m| m.eq_ignore_ascii_case("html"))
    }
}

/// Sends messages one at a time, truncated to `max_len` and spaced at least
/// `min_delay` apart.
pub struct Publisher {
    notifier: Box<dyn Notifier>,
    settings: PublisherSettings,
    last_sent: Option<tokio::time::Instant>,
}

impl Publisher {
    pub fn new(notifier: Box<dyn Notifier>, settings: PublisherSettings) -> Self {
        Self {
            notifier,
            settings,
            last_sent: None,
        }
    }

    pub fn settings(&self) -> &PublisherSettings {
        &self.settings
    }

    pub fn notifier_name(&self) -> &'static str {
        self.notifier.name()
    }

    /// Deliver `text`. Failures are logged and returned; nothing is retried.
    pub async fn publish(&mut self, text: &str) -> Result<Delivery, PublishError> {
        if let Some(last) = self.last_sent {
            let since = last.elapsed();
            if since < self.settings.min_delay {
                tokio::time::sleep(self.settings.min_delay - since).await;
            }
        }

        let msg = OutboundMessage {
            text: truncate_message(text, self.settings.max_len, self.settings.is_html()),
            parse_mode: self.settings.parse_mode.clone(),
            disable_preview: self.settings.disable_preview,
        };
        let result = self.notifier.send(&msg).await;
        self.last_sent = Some(tokio::time::Instant::now());

        match &result {
            Ok(d) => {
                counter!("relay_published_total").increment(1);
                tracing::debug!(target: "notify", notifier = self.notifier.name(), message_id = ?d.message_id, "delivered");
            }
            Err(e) => {
                counter!("relay_publish_errors_total").increment(1);
                tracing::warn!(target: "notify", notifier = self.notifier.name(), error = %e, "delivery failed");
            }
        }
        result
    }
}

fn escape(s: &str, html: bool) -> String {
    if html {
        html_escape::encode_text(s).to_string()
    } else {
        s.to_string()
    }
}

/// Render an accepted article:
///
/// ```text
/// 🔔 <b>속보</b>
///
/// [속보] 제목
///
/// 📰 연합뉴스
/// 🔗 https://...
/// #반도체 #AI
/// ```
pub fn format_article(
    rec: &ArticleRecord,
    m: &RelevanceMatch,
    hashtags: &[&str],
    html: bool,
) -> String {
    let emoji = m.emoji.as_deref().unwrap_or(DEFAULT_EMOJI);
    let label = escape(&m.label, html);
    let heading = if html {
        format!("{emoji} <b>{label}</b>")
    } else {
        format!("{emoji} {label}")
    };

    let mut out = format!("{heading}\n\n{}\n", escape(rec.title(), html));
    if !rec.source_label().is_empty() {
        out.push_str(&format!("\n📰 {}", escape(rec.source_label(), html)));
    }
    out.push_str(&format!("\n🔗 {}", escape(rec.url(), html)));

    let tags: Vec<String> = hashtags
        .iter()
        .take(MAX_HASHTAGS)
        .map(|k| format!("#{}", k.split_whitespace().collect::<String>()))
        .collect();
    if !tags.is_empty() {
        out.push('\n');
        out.push_str(&escape(&tags.join(" "), html));
    }
    out
}

/// Cut `text` to at most `max_len` chars, ending with [`TRUNCATION_MARKER`].
/// In HTML mode a dangling entity or tag at the cut is dropped too.
pub fn truncate_message(text: &str, max_len: usize, html: bool) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    let marker_len = TRUNCATION_MARKER.chars().count();
    let keep = max_len.saturating_sub(marker_len);
    let mut head: String = text.chars().take(keep).collect();

    if html {
        if let Some(amp) = head.rfind('&') {
            if !head[amp..].contains(';') {
                head.truncate(amp);
            }
        }
        if let Some(lt) = head.rfind('<') {
            if !head[lt..].contains('>') {
                head.truncate(lt);
            }
        }
    }
    head.push_str(TRUNCATION_MARKER);
    head
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relevance::MatchKind;

    fn tag_match() -> RelevanceMatch {
        RelevanceMatch {
            kind: MatchKind::Tag,
            label: "속보".into(),
            needle: "[속보]".into(),
            emoji: Some("🔔".into()),
        }
    }

    #[test]
    fn format_escapes_html() {
        let rec = ArticleRecord::new("[속보] A&B <결정>", "https://x.test/a?b=1&c=2", "연합뉴스", None).unwrap();
        let text = format_article(&rec, &tag_match(), &["반도체", "AI 칩"], true);
        assert!(text.starts_with("🔔 <b>속보</b>\n\n[속보] A&amp;B &lt;결정&gt;\n"));
        assert!(text.contains("\n📰 연합뉴스"));
        assert!(text.contains("🔗 https://x.test/a?b=1&amp;c=2"));
        assert!(text.ends_with("#반도체 #AI칩"));
    }

    #[test]
    fn format_plain_text() {
        let rec = ArticleRecord::new("A&B", "https://x.test/a", "", None).unwrap();
        let text = format_article(&rec, &tag_match(), &[], false);
        assert_eq!(text, "🔔 속보\n\nA&B\n\n🔗 https://x.test/a");
    }

    #[test]
    fn truncation_is_visible_and_bounded() {
        let long = "가".repeat(5000);
        let out = truncate_message(&long, 4096, true);
        assert_eq!(out.chars().count(), 4096);
        assert!(out.ends_with(TRUNCATION_MARKER));

        let short = "짧은 메시지";
        assert_eq!(truncate_message(short, 4096, true), short);
    }

    #[test]
    fn truncation_does_not_split_entities() {
        let text = format!("{}&amp;{}", "x".repeat(60), "tail".repeat(20));
        let out = truncate_message(&text, 63 + TRUNCATION_MARKER.chars().count(), true);
        assert_eq!(out, format!("{}{}", "x".repeat(60), TRUNCATION_MARKER));
    }
}
