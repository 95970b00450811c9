use std::collections::VecDeque;
use std::time::Duration;

use rand::Rng;
use tracing::debug;

use crate::config::PacingConfig;

/// How many published texts the guard remembers before evicting.
pub const RECENT_CAPACITY: usize = 100;
/// Prefix length used for the near-duplicate check.
const DUPLICATE_PREFIX_CHARS: usize = 50;

/// Bounded window of recently published texts. Owned by the watch loop and
/// injected wherever duplicate checks happen; process-lifetime only, never
/// persisted.
#[derive(Debug)]
pub struct RecentPosts {
    posts: VecDeque<String>,
    capacity: usize,
}

impl RecentPosts {
    pub fn new() -> Self {
        Self::with_capacity(RECENT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            posts: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Soft match: the first 50 chars of `text` appearing anywhere inside a
    /// remembered post counts as a duplicate, so trivially reworded repeats
    /// are caught too.
    pub fn is_duplicate(&self, text: &str) -> bool {
        let probe: String = text.chars().take(DUPLICATE_PREFIX_CHARS).collect();
        self.posts.iter().any(|post| post.contains(&probe))
    }

    pub fn remember(&mut self, text: &str) {
        self.posts.push_back(text.to_string());
        if self.posts.len() > self.capacity {
            self.posts.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }
}

impl Default for RecentPosts {
    fn default() -> Self {
        Self::new()
    }
}

/// Human-like publish pacing: a randomized wait before each post and a
/// fixed pause after it. Scheduling behavior only, so tests and one-shot
/// runs can turn it off wholesale.
#[derive(Debug, Clone)]
pub struct Pacing {
    min_delay_secs: u64,
    max_delay_secs: u64,
    post_publish_pause_secs: u64,
    enabled: bool,
}

impl Pacing {
    pub fn from_config(config: &PacingConfig) -> Self {
        Self {
            min_delay_secs: config.min_delay_secs,
            max_delay_secs: config.max_delay_secs.max(config.min_delay_secs),
            post_publish_pause_secs: config.post_publish_pause_secs,
            enabled: config.enabled,
        }
    }

    pub fn disabled() -> Self {
        Self {
            min_delay_secs: 0,
            max_delay_secs: 0,
            post_publish_pause_secs: 0,
            enabled: false,
        }
    }

    pub async fn before_publish(&self) {
        if !self.enabled {
            return;
        }
        let secs = rand::thread_rng().gen_range(self.min_delay_secs..=self.max_delay_secs);
        debug!(secs, "waiting before publish");
        tokio::time::sleep(Duration::from_secs(secs)).await;
    }

    pub async fn after_publish(&self) {
        if !self.enabled || self.post_publish_pause_secs == 0 {
            return;
        }
        tokio::time::sleep(Duration::from_secs(self.post_publish_pause_secs)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_prefix_counts_as_duplicate() {
        let mut recent = RecentPosts::new();
        recent.remember("Team wins in dramatic final over finish, what a game that was");
        assert!(recent.is_duplicate(
            "Team wins in dramatic final over finish, unbelievable scenes tonight"
        ));
        assert!(!recent.is_duplicate("Completely unrelated post about the toss"));
    }

    #[test]
    fn short_texts_match_as_substrings() {
        let mut recent = RecentPosts::new();
        recent.remember("What a finish to this game");
        // Probe shorter than the prefix window still matches as a substring.
        assert!(recent.is_duplicate("What a finish"));
    }

    #[test]
    fn oldest_entry_is_evicted_at_capacity() {
        let mut recent = RecentPosts::new();
        let first = "The very first remembered post about the opening over";
        recent.remember(first);
        for i in 0..RECENT_CAPACITY {
            recent.remember(&format!("Filler post number {i} about nothing in particular"));
        }
        assert_eq!(recent.len(), RECENT_CAPACITY);
        assert!(!recent.is_duplicate(first));
        assert!(recent.is_duplicate("Filler post number 42 about nothing in particular"));
    }

    #[test]
    fn small_capacity_evicts_in_fifo_order() {
        let mut recent = RecentPosts::with_capacity(2);
        recent.remember("First post in a tiny window, long enough to match");
        recent.remember("Second post in a tiny window, long enough to match");
        recent.remember("Third post in a tiny window, long enough to match");
        assert!(!recent.is_duplicate("First post in a tiny window, long enough to match"));
        assert!(recent.is_duplicate("Third post in a tiny window, long enough to match"));
    }
}
