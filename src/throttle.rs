// src/throttle.rs
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::HashMap;

/// Per-keyword cooldown to keep one hot topic from flooding the channel.
/// - First article for a keyword always passes.
/// - Inside the cooldown, further keyword-only articles for it are suppressed.
/// - State is updated explicitly via `record` once the article is committed.
#[derive(Debug, Clone, Default)]
pub struct KeywordThrottle {
    cooldown: ChronoDuration,
    last_sent: HashMap<String, DateTime<Utc>>,
}

impl KeywordThrottle {
    /// `cooldown_secs` <= 0 disables the throttle.
    pub fn new(cooldown_secs: i64) -> Self {
        Self {
            cooldown: ChronoDuration::seconds(cooldown_secs.max(0)),
            last_sent: HashMap::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.cooldown > ChronoDuration::zero()
    }

    /// May an article for `keyword` go out at `now`? Does NOT mutate state.
    pub fn should_allow(&self, keyword: &str, now: DateTime<Utc>) -> bool {
        if !self.is_enabled() {
            return true;
        }
        match self.last_sent.get(keyword) {
            None => true,
            Some(ts) => now.signed_duration_since(*ts) >= self.cooldown,
        }
    }

    pub fn record(&mut self, keyword: &str, now: DateTime<Utc>) {
        if self.is_enabled() {
            self.last_sent.insert(keyword.to_string(), now);
        }
    }

    /// Drop entries whose cooldown has passed.
    pub fn prune(&mut self, now: DateTime<Utc>) {
        let cooldown = self.cooldown;
        self.last_sent
            .retain(|_, ts| now.signed_duration_since(*ts) < cooldown);
    }

    pub fn tracked(&self) -> usize {
        self.last_sent.len()
    }
}
