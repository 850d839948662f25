//! Core Event Bus Implementation
//!
//! High-performance, lock-free event bus with advanced features

use super::{BusMessage, BusResult, EventBusError, MessageEnvelope, MessageMetadata};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Event bus configuration
#[derive(Debug, Clone)]
pub struct EventBusConfig {
    /// Channel capacity
    pub capacity: usize,
    /// Enable metrics collection
    pub enable_metrics: bool,
    /// Default message TTL in milliseconds
    pub default_ttl_ms: Option<u64>,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            capacity: 10000,
            enable_metrics: true,
            default_ttl_ms: Some(30000), // 30 seconds
        }
    }
}

/// Main event bus implementation
pub struct EventBus<T: BusMessage> {
    /// Configuration
    config: EventBusConfig,
    /// Topic-based broadcasters
    broadcasters: Arc<RwLock<FxHashMap<String, broadcast::Sender<MessageEnvelope<T>>>>>,
    /// Metrics collector
    metrics: Arc<super::metrics::BusMetrics>,
}

impl<T: BusMessage> EventBus<T> {
    /// Create a new event bus with configuration
    #[must_use] pub fn new(config: EventBusConfig) -> Self {
        Self {
            config,
            broadcasters: Arc::new(RwLock::new(FxHashMap::default())),
            metrics: Arc::new(super::metrics::BusMetrics::new()),
        }
    }

    /// Get bus capacity
    #[must_use] pub const fn capacity(&self) -> usize {
        self.config.capacity
    }

    /// Get or create broadcaster for topic
    fn get_or_create_broadcaster(&self, topic: &str) -> broadcast::Sender<MessageEnvelope<T>> {
        let mut broadcasters = self.broadcasters.write();

        if let Some(broadcaster) = broadcasters.get(topic) {
            broadcaster.clone()
        } else {
            let (tx, _) = broadcast::channel(self.config.capacity);
            broadcasters.insert(topic.to_string(), tx.clone());
            tx
        }
    }

    /// Publish a message to the bus
    pub async fn publish(&self, message: T) -> BusResult<()> {
        let metadata = MessageMetadata {
            source: "event_bus".to_string(),
            ..Default::default()
        };

        self.publish_with_metadata(message, metadata).await
    }

    /// Publish a message with custom metadata
    pub async fn publish_with_metadata(
        &self,
        message: T,
        metadata: MessageMetadata,
    ) -> BusResult<()> {
        let topic = message.topic().to_string();

        // Check TTL
        if let Some(ttl_ms) = metadata.ttl_ms.or(self.config.default_ttl_ms) {
            let now = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                // SAFETY: u128 to u64 - milliseconds since epoch fits in u64
                .as_millis() as u64;
            // SAFETY: u64 arithmetic result to u64
            let message_age = now - metadata.timestamp / 1_000_000;

            if message_age > ttl_ms {
                warn!(
                    message_id = %metadata.message_id,
                    topic = %topic,
                    age_ms = message_age,
                    ttl_ms = ttl_ms,
                    "Message expired, dropping"
                );
                self.metrics.record_expired(&topic);
                return Err(EventBusError::MessageExpired);
            }
        }

        let envelope = MessageEnvelope { message, metadata };

        // Get broadcaster for topic
        let broadcaster = self.get_or_create_broadcaster(&topic);

        // Send to subscribers
        if let Ok(subscriber_count) = broadcaster.send(envelope.clone()) {
            debug!(
                message_id = %envelope.metadata.message_id,
                topic = %topic,
                subscribers = subscriber_count,
                "Message published"
            );
            self.metrics.record_publish_success(&topic);
            Ok(())
        } else {
            warn!(
                message_id = %envelope.metadata.message_id,
                topic = %topic,
                "No subscribers for topic"
            );
            self.metrics.record_no_subscribers(&topic);
            Err(EventBusError::NoSubscribers { topic })
        }
    }

    /// Subscribe to messages for a topic
    pub async fn subscribe(
        &self,
        topic: &str,
    ) -> BusResult<broadcast::Receiver<MessageEnvelope<T>>> {
        let broadcaster = self.get_or_create_broadcaster(topic);
        Ok(broadcaster.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone)]
    struct TestMessage {
        id: u64,
        content: String,
    }

    impl BusMessage for TestMessage {
        fn topic(&self) -> &str {
            "test_topic"
        }
    }

    #[tokio::test]
    async fn test_event_bus_basic() {
        let config = EventBusConfig::default();
        let bus = EventBus::new(config);

        assert_eq!(bus.capacity(), 10000);
    }

    #[tokio::test]
    async fn test_publish_subscribe() {
        let config = EventBusConfig::default();
        let bus = Arc::new(EventBus::new(config));

        let mut subscriber = bus.subscribe("test_topic").await.unwrap();

        let message = TestMessage {
            id: 42,
            content: "Hello, World!".to_string(),
        };

        bus.publish(message.clone()).await.unwrap();

        let received = subscriber.recv().await.unwrap();
        assert_eq!(received.message.id, 42);
        assert_eq!(received.message.content, "Hello, World!");
    }

    #[tokio::test]
    async fn test_ttl_expiration() {
        let config = EventBusConfig {
            default_ttl_ms: Some(1), // 1ms TTL
            ..Default::default()
        };
        let bus = Arc::new(EventBus::new(config));

        let message = TestMessage {
            id: 1,
            content: "Expired message".to_string(),
        };

        // Wait for message to expire
        tokio::time::sleep(tokio::time::Duration::from_millis(5)).await;

        let result = bus.publish(message).await;
        assert!(matches!(result, Err(EventBusError::MessageExpired)));
    }
}
