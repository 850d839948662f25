//! Metrics collection for the event bus

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Bus metrics collector
pub struct BusMetrics {
    /// Publish successes by topic
    publish_successes: RwLock<FxHashMap<String, AtomicU64>>,
    /// Expired messages by topic
    expired_messages: RwLock<FxHashMap<String, AtomicU64>>,
    /// Messages with no subscribers by topic
    no_subscribers: RwLock<FxHashMap<String, AtomicU64>>,
}

impl BusMetrics {
    /// Create new metrics collector
    #[must_use] pub fn new() -> Self {
        Self {
            publish_successes: RwLock::new(FxHashMap::default()),
            expired_messages: RwLock::new(FxHashMap::default()),
            no_subscribers: RwLock::new(FxHashMap::default()),
        }
    }

    fn bump(counters: &RwLock<FxHashMap<String, AtomicU64>>, topic: &str) {
        let read = counters.read();
        if let Some(counter) = read.get(topic) {
            counter.fetch_add(1, Ordering::Relaxed);
        } else {
            drop(read);
            counters
                .write()
                .entry(topic.to_string())
                .or_insert_with(|| AtomicU64::new(0))
                .fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a successful publish
    pub fn record_publish_success(&self, topic: &str) {
        Self::bump(&self.publish_successes, topic);
    }

    /// Record an expired message
    pub fn record_expired(&self, topic: &str) {
        Self::bump(&self.expired_messages, topic);
    }

    /// Record a message with no subscribers
    pub fn record_no_subscribers(&self, topic: &str) {
        Self::bump(&self.no_subscribers, topic);
    }

    /// Get publish count for topic
    pub fn get_publish_count(&self, topic: &str) -> u64 {
        self.publish_successes
            .read()
            .get(topic)
            .map_or(0, |c| c.load(Ordering::Relaxed))
    }

    /// Get expired-message count for topic
    pub fn get_expired_count(&self, topic: &str) -> u64 {
        self.expired_messages
            .read()
            .get(topic)
            .map_or(0, |c| c.load(Ordering::Relaxed))
    }

    /// Get no-subscribers count for topic
    pub fn get_no_subscribers_count(&self, topic: &str) -> u64 {
        self.no_subscribers
            .read()
            .get(topic)
            .map_or(0, |c| c.load(Ordering::Relaxed))
    }
}

impl Default for BusMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = BusMetrics::new();
        assert_eq!(metrics.get_publish_count("test"), 0);
    }

    #[test]
    fn test_publish_metrics() {
        let metrics = BusMetrics::new();

        metrics.record_publish_success("test");
        metrics.record_publish_success("test");

        assert_eq!(metrics.get_publish_count("test"), 2);
    }

    #[test]
    fn test_expired_and_no_subscribers_are_tracked_per_topic() {
        let metrics = BusMetrics::new();

        metrics.record_expired("expiring_topic");
        metrics.record_no_subscribers("quiet_topic");

        assert_eq!(metrics.get_expired_count("expiring_topic"), 1);
        assert_eq!(metrics.get_expired_count("quiet_topic"), 0);
        assert_eq!(metrics.get_no_subscribers_count("quiet_topic"), 1);
    }
}
