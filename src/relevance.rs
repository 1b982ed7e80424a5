// src/relevance.rs
//! Relevance gate: tag markers ("[속보]", "(단독)") and keyword containment.
//!
//! Evaluation is pure. Tag groups are tried in configuration order before any
//! keyword, so the reported match is stable for a given policy.

use serde::Deserialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Tag marker OR keyword.
    #[default]
    Any,
    /// Tag markers only; keywords are ignored for acceptance.
    TagOnly,
}

/// How needles are compared with titles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseRule {
    /// Latin-script letters compare case-insensitively; every other script exactly.
    #[default]
    FoldLatin,
    /// Byte-exact substring containment.
    Exact,
}

/// A labelled family of markers, e.g. `단독` = `[단독]`, `(단독)`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TagGroup {
    pub label: String,
    pub markers: Vec<String>,
    #[serde(default)]
    pub emoji: Option<String>,
}

fn default_keyword_label() -> String {
    "Keyword".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelevancePolicy {
    #[serde(default)]
    pub mode: MatchMode,
    #[serde(default)]
    pub case_rule: CaseRule,
    #[serde(default)]
    pub tags: Vec<TagGroup>,
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Label used in messages for keyword-only matches.
    #[serde(default = "default_keyword_label")]
    pub keyword_label: String,
    #[serde(default)]
    pub keyword_emoji: Option<String>,
}

impl Default for RelevancePolicy {
    fn default() -> Self {
        Self {
            mode: MatchMode::Any,
            case_rule: CaseRule::FoldLatin,
            tags: Vec::new(),
            keywords: Vec::new(),
            keyword_label: default_keyword_label(),
            keyword_emoji: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Tag,
    Keyword,
}

/// Why an article was accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelevanceMatch {
    pub kind: MatchKind,
    /// Tag group label, or the policy's keyword label.
    pub label: String,
    /// The marker or keyword that hit.
    pub needle: String,
    pub emoji: Option<String>,
}

impl RelevanceMatch {
    pub fn is_tag(&self) -> bool {
        self.kind == MatchKind::Tag
    }
}

/// Substring containment under `rule`.
pub fn contains(haystack: &str, needle: &str, rule: CaseRule) -> bool {
    if needle.is_empty() {
        return false;
    }
    match rule {
        CaseRule::Exact => haystack.contains(needle),
        CaseRule::FoldLatin => fold_latin(haystack).contains(&fold_latin(needle)),
    }
}

fn is_latin(c: char) -> bool {
    c.is_ascii_alphabetic()
        || matches!(c, '\u{00C0}'..='\u{024F}' | '\u{1E00}'..='\u{1EFF}' | '\u{FF21}'..='\u{FF3A}' | '\u{FF41}'..='\u{FF5A}')
}

/// Lowercase Latin letters (ASCII, accented, fullwidth); Hangul and CJK pass through.
fn fold_latin(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if is_latin(c) {
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

impl RelevancePolicy {
    /// Trim needles, drop empties and duplicates (order preserved).
    pub fn cleaned(mut self) -> Self {
        for g in &mut self.tags {
            g.label = g.label.trim().to_string();
            g.markers = clean_list(std::mem::take(&mut g.markers));
        }
        self.tags.retain(|g| !g.markers.is_empty());
        self.keywords = clean_list(std::mem::take(&mut self.keywords));
        self
    }

    /// Union of all tag markers.
    pub fn tag_markers(&self) -> impl Iterator<Item = &str> {
        self.tags
            .iter()
            .flat_map(|g| g.markers.iter().map(String::as_str))
    }

    pub fn evaluate(&self, title: &str) -> Option<RelevanceMatch> {
        for group in &self.tags {
            if let Some(marker) = group
                .markers
                .iter()
                .find(|m| contains(title, m, self.case_rule))
            {
                return Some(RelevanceMatch {
                    kind: MatchKind::Tag,
                    label: group.label.clone(),
                    needle: marker.clone(),
                    emoji: group.emoji.clone(),
                });
            }
        }

        if self.mode == MatchMode::TagOnly {
            return None;
        }

        self.keywords
            .iter()
            .find(|k| contains(title, k, self.case_rule))
            .map(|k| RelevanceMatch {
                kind: MatchKind::Keyword,
                label: self.keyword_label.clone(),
                needle: k.clone(),
                emoji: self.keyword_emoji.clone(),
            })
    }

    pub fn accepts(&self, title: &str) -> bool {
        self.evaluate(title).is_some()
    }

    /// Every configured keyword present in `title`, in configuration order.
    pub fn keywords_in<'a>(&'a self, title: &str) -> Vec<&'a str> {
        self.keywords
            .iter()
            .filter(|k| contains(title, k, self.case_rule))
            .map(String::as_str)
            .collect()
    }
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for it in items {
        let t = it.trim();
        if !t.is_empty() && !out.iter().any(|o| o == t) {
            out.push(t.to_string());
        }
    }
    out
}
