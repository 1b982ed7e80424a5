// src/dedup.rs
//! Persisted set of already-published article identities.
//!
//! The store is single-writer: `check` and `commit` are not atomic as a pair,
//! and callers must not share one store between concurrently running cycles.
//! `&mut self` on every mutating method keeps that true within one process.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::article::{canonical_url, ArticleIdentity};

pub const DEFAULT_SEEN_PATH: &str = "state/seen.json";
pub const DEFAULT_SEEN_CAP: usize = 5000;

/// Insertion-ordered set with a fixed cap; the oldest key is evicted first.
#[derive(Debug, Clone)]
pub struct SeenSet {
    order: VecDeque<String>,
    members: HashSet<String>,
    cap: usize,
}

impl SeenSet {
    /// `cap` below 1 is treated as 1.
    pub fn with_cap(cap: usize) -> Self {
        let cap = cap.max(1);
        Self {
            order: VecDeque::with_capacity(cap.min(10_000)),
            members: HashSet::with_capacity(cap.min(10_000)),
            cap,
        }
    }

    /// Build from keys listed oldest first; keeps the newest `cap` distinct keys.
    pub fn from_keys<I: IntoIterator<Item = String>>(keys: I, cap: usize) -> Self {
        let mut set = Self::with_cap(cap);
        for k in keys {
            set.insert(k);
        }
        set
    }

    pub fn contains(&self, key: &str) -> bool {
        self.members.contains(key)
    }

    /// Insert `key`; returns the keys evicted to stay within the cap.
    /// Re-inserting a present key is a no-op and does not refresh its age.
    pub fn insert(&mut self, key: String) -> Vec<String> {
        if key.is_empty() || self.members.contains(&key) {
            return Vec::new();
        }
        self.members.insert(key.clone());
        self.order.push_back(key);

        let mut evicted = Vec::new();
        while self.order.len() > self.cap {
            if let Some(old) = self.order.pop_front() {
                self.members.remove(&old);
                evicted.push(old);
            }
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    /// Keys, oldest first.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct SeenFile {
    version: u32,
    keys: Vec<String>,
}

// Older bots wrote `{"urls": [...], "hashes": [...]}`, `{"hashes": [...]}` or
// a bare array of links. Their hashes are MD5 over a different title
// normalisation and can never match a `title:` key, so only links survive.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SeenFileAny {
    Current(SeenFile),
    Legacy {
        #[serde(default)]
        urls: Vec<String>,
        #[serde(default)]
        hashes: Vec<String>,
    },
    Bare(Vec<String>),
}

impl SeenFileAny {
    fn into_keys(self) -> Vec<String> {
        match self {
            SeenFileAny::Current(f) => f.keys,
            SeenFileAny::Legacy { urls, hashes } => {
                if !hashes.is_empty() {
                    tracing::warn!(target: "dedup", dropped = hashes.len(), "legacy title hashes are not comparable, dropped");
                }
                legacy_links(urls)
            }
            SeenFileAny::Bare(v) => legacy_links(v),
        }
    }
}

fn legacy_links(links: Vec<String>) -> Vec<String> {
    links
        .into_iter()
        .filter_map(|l| {
            if l.starts_with("url:") || l.starts_with("title:") {
                return Some(l);
            }
            canonical_url(&l).map(|u| ArticleIdentity::Url(u).key())
        })
        .collect()
}

/// The dedup store: a [`SeenSet`] plus its backing file.
#[derive(Debug)]
pub struct DedupStore {
    path: PathBuf,
    seen: SeenSet,
}

impl DedupStore {
    /// Load from `path`. A missing, unreadable or corrupt file yields an empty
    /// set; this never fails.
    pub fn load(path: impl Into<PathBuf>, cap: usize) -> Self {
        let path = path.into();
        let seen = match fs::read_to_string(&path) {
            Ok(s) => match serde_json::from_str::<SeenFileAny>(&s) {
                Ok(any) => {
                    let set = SeenSet::from_keys(any.into_keys(), cap);
                    tracing::info!(target: "dedup", path = %path.display(), entries = set.len(), "seen set loaded");
                    set
                }
                Err(e) => {
                    tracing::error!(target: "dedup", path = %path.display(), error = %e, "corrupt seen set, starting empty");
                    SeenSet::with_cap(cap)
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!(target: "dedup", path = %path.display(), "no seen set yet, starting empty");
                SeenSet::with_cap(cap)
            }
            Err(e) => {
                tracing::error!(target: "dedup", path = %path.display(), error = %e, "unreadable seen set, starting empty");
                SeenSet::with_cap(cap)
            }
        };
        Self { path, seen }
    }

    /// In-memory store that still persists to `path` on commit.
    pub fn empty(path: impl Into<PathBuf>, cap: usize) -> Self {
        Self {
            path: path.into(),
            seen: SeenSet::with_cap(cap),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Keep the loaded entries but persist to `path` from now on.
    pub fn relocate(&mut self, path: impl Into<PathBuf>) {
        self.path = path.into();
    }

    pub fn seen(&self) -> &SeenSet {
        &self.seen
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// True if `id` was already committed (and not evicted since).
    pub fn check(&self, id: &ArticleIdentity) -> bool {
        self.seen.contains(&id.key())
    }

    /// True if any of `ids` was already committed.
    pub fn check_any(&self, ids: &[ArticleIdentity]) -> bool {
        ids.iter().any(|id| self.check(id))
    }

    /// Mark `id` as seen and persist. Persistence failures are logged, not returned.
    pub fn commit(&mut self, id: &ArticleIdentity) {
        self.commit_all(std::slice::from_ref(id));
    }

    /// Mark every id in `ids` as seen, then persist once.
    pub fn commit_all(&mut self, ids: &[ArticleIdentity]) {
        for id in ids {
            let evicted = self.seen.insert(id.key());
            if !evicted.is_empty() {
                tracing::debug!(target: "dedup", evicted = evicted.len(), "seen set over cap");
            }
        }
        if let Err(e) = self.persist() {
            tracing::error!(target: "dedup", path = %self.path.display(), error = ?e, "persisting seen set failed");
        }
    }

    /// Write the set to disk (temp file + rename).
    pub fn persist(&self) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating state dir {}", dir.display()))?;
        }
        let file = SeenFile {
            version: 1,
            keys: self.seen.keys().map(str::to_string).collect(),
        };
        let body = serde_json::to_vec(&file).context("serializing seen set")?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, body).with_context(|| format!("writing {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("renaming {} -> {}", tmp.display(), self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> ArticleIdentity {
        ArticleIdentity::Url(format!("https://x.test/{s}"))
    }

    #[test]
    fn cap_evicts_oldest_first() {
        let mut set = SeenSet::with_cap(3);
        for k in ["a", "b", "c"] {
            assert!(set.insert(k.into()).is_empty());
        }
        let evicted = set.insert("d".into());
        assert_eq!(evicted, vec!["a".to_string()]);
        assert!(!set.contains("a"));
        assert!(set.contains("b") && set.contains("c") && set.contains("d"));
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn reinsert_does_not_refresh_age() {
        let mut set = SeenSet::from_keys(["a".into(), "b".into()], 2);
        set.insert("a".into());
        set.insert("c".into());
        assert!(!set.contains("a"));
        assert_eq!(set.keys().collect::<Vec<_>>(), vec!["b", "c"]);
    }

    #[test]
    fn from_keys_keeps_newest() {
        let set = SeenSet::from_keys((0..10).map(|i| i.to_string()), 4);
        assert_eq!(set.keys().collect::<Vec<_>>(), vec!["6", "7", "8", "9"]);
    }

    #[test]
    fn commit_persists_and_reload_matches() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("seen.json");

        let mut store = DedupStore::load(&path, 10);
        assert!(store.is_empty());
        store.commit(&id("1"));
        store.commit_all(&[id("2"), ArticleIdentity::Title("abc".into())]);
        assert!(path.exists());

        let again = DedupStore::load(&path, 10);
        assert!(again.check(&id("1")));
        assert!(again.check(&id("2")));
        assert!(again.check(&ArticleIdentity::Title("abc".into())));
        assert!(!again.check(&id("3")));
    }
}
