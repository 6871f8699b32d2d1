//! # Recently Published Event Cache
//!
//! Producer-side guard against re-publishing the same chain event when a
//! block or signature is observed twice (reconnects, overlapping polls).
//!
//! ## Design
//!
//! - Event ids are remembered for a validity window (default 10 minutes)
//! - Expired ids are garbage-collected in insertion order
//! - A hard capacity evicts the oldest ids first, bounding memory
//!
//! The consumer dedups by `event_id` regardless; this cache only saves
//! broker traffic.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

/// Time-bounded set of event ids.
pub struct RecentEventCache {
    /// event_id -> when it was recorded.
    seen: HashMap<String, Instant>,

    /// Insertion order for expiry and eviction.
    order: VecDeque<(String, Instant)>,

    validity_window: Duration,

    capacity: usize,
}

impl RecentEventCache {
    /// Default validity window: 10 minutes.
    pub const DEFAULT_VALIDITY_WINDOW: Duration = Duration::from_secs(600);

    /// Default maximum number of remembered ids.
    pub const DEFAULT_CAPACITY: usize = 100_000;

    #[must_use]
    pub fn new() -> Self {
        Self::with_config(Self::DEFAULT_VALIDITY_WINDOW, Self::DEFAULT_CAPACITY)
    }

    #[must_use]
    pub fn with_config(validity_window: Duration, capacity: usize) -> Self {
        Self {
            seen: HashMap::new(),
            order: VecDeque::new(),
            validity_window,
            capacity: capacity.max(1),
        }
    }

    /// True if `event_id` was recorded within the validity window.
    #[must_use]
    pub fn contains(&self, event_id: &str) -> bool {
        self.contains_at(event_id, Instant::now())
    }

    /// Remember `event_id` as published now.
    pub fn record(&mut self, event_id: &str) {
        self.record_at(event_id, Instant::now());
    }

    pub(crate) fn contains_at(&self, event_id: &str, now: Instant) -> bool {
        self.seen
            .get(event_id)
            .is_some_and(|&at| now.saturating_duration_since(at) < self.validity_window)
    }

    pub(crate) fn record_at(&mut self, event_id: &str, now: Instant) {
        self.garbage_collect(now);
        if self.contains_at(event_id, now) {
            return;
        }
        self.seen.insert(event_id.to_string(), now);
        self.order.push_back((event_id.to_string(), now));

        while self.seen.len() > self.capacity {
            let Some((oldest, at)) = self.order.pop_front() else {
                break;
            };
            self.remove_if_current(&oldest, at);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Drop every id older than the validity window.
    fn garbage_collect(&mut self, now: Instant) {
        while let Some((_, at)) = self.order.front() {
            if now.saturating_duration_since(*at) < self.validity_window {
                break;
            }
            if let Some((id, at)) = self.order.pop_front() {
                self.remove_if_current(&id, at);
            }
        }
    }

    /// Remove `id` only if `at` is still its live record.
    fn remove_if_current(&mut self, id: &str, at: Instant) {
        if self.seen.get(id) == Some(&at) {
            self.seen.remove(id);
        }
    }
}

impl Default for RecentEventCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_and_detects_duplicates() {
        let mut cache = RecentEventCache::new();
        assert!(!cache.contains("eth:0x1"));
        cache.record("eth:0x1");
        assert!(cache.contains("eth:0x1"));
        cache.record("eth:0x1");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_ids_expire_after_window() {
        let mut cache = RecentEventCache::with_config(Duration::from_secs(60), 10);
        let t0 = Instant::now();
        cache.record_at("a", t0);

        assert!(cache.contains_at("a", t0 + Duration::from_secs(59)));
        assert!(!cache.contains_at("a", t0 + Duration::from_secs(60)));

        // Recording anything later collects the expired id.
        cache.record_at("b", t0 + Duration::from_secs(61));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_expired_id_can_be_recorded_again() {
        let mut cache = RecentEventCache::with_config(Duration::from_secs(10), 10);
        let t0 = Instant::now();
        cache.record_at("a", t0);
        let later = t0 + Duration::from_secs(11);
        cache.record_at("a", later);
        assert!(cache.contains_at("a", later));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut cache = RecentEventCache::with_config(Duration::from_secs(600), 3);
        let t0 = Instant::now();
        for (i, id) in ["a", "b", "c", "d"].iter().enumerate() {
            cache.record_at(id, t0 + Duration::from_millis(i as u64));
        }
        assert_eq!(cache.len(), 3);
        assert!(!cache.contains_at("a", t0));
        assert!(cache.contains_at("d", t0 + Duration::from_millis(3)));
    }

    #[test]
    fn test_empty() {
        let cache = RecentEventCache::default();
        assert!(cache.is_empty());
        assert_eq!(cache.len(), 0);
    }
}
