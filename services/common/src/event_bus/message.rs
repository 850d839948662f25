//! Message types and envelope for the event bus

use super::{BusMessage, MessageMetadata};
use serde::{Deserialize, Serialize};

/// Message envelope wrapping the actual message with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageEnvelope<T: BusMessage> {
    /// The actual message
    pub message: T,
    /// Message metadata
    pub metadata: MessageMetadata,
}

impl<T: BusMessage> MessageEnvelope<T> {
    /// Create a new message envelope
    pub const fn new(message: T, metadata: MessageMetadata) -> Self {
        Self { message, metadata }
    }

    /// Create a message envelope with default metadata
    pub fn with_defaults(message: T, source: impl Into<String>) -> Self {
        let metadata = MessageMetadata {
            source: source.into(),
            ..Default::default()
        };
        Self { message, metadata }
    }

    /// Get the message topic
    pub fn topic(&self) -> &str {
        self.message.topic()
    }

    /// Get the message priority
    pub fn priority(&self) -> u8 {
        self.message.priority()
    }

    /// Check if message has expired
    pub fn is_expired(&self) -> bool {
        if let Some(ttl_ms) = self.metadata.ttl_ms {
            let now = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                // SAFETY: u128 to u64 - milliseconds since epoch fits in u64
                .as_millis() as u64;
            // SAFETY: u64 arithmetic result to u64
            let message_age = now - self.metadata.timestamp / 1_000_000;
            message_age > ttl_ms
        } else {
            false
        }
    }

    /// Get message age in milliseconds
    pub fn age_ms(&self) -> u64 {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            // SAFETY: u128 to u64 - milliseconds since epoch fits in u64
            .as_millis() as u64;
        // SAFETY: u64 arithmetic result to u64
        now - self.metadata.timestamp / 1_000_000
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct TestMessage {
        id: u64,
        data: String,
    }

    impl BusMessage for TestMessage {
        fn topic(&self) -> &str {
            "test"
        }
    }

    #[test]
    fn test_message_envelope_creation() {
        let message = TestMessage {
            id: 1,
            data: "test".to_string(),
        };

        let envelope = MessageEnvelope::with_defaults(message.clone(), "test_service");
        assert_eq!(envelope.topic(), "test");
        assert_eq!(envelope.metadata.source, "test_service");
        assert!(!envelope.metadata.message_id.is_empty());
    }

    #[test]
    fn test_message_expiration() {
        let message = TestMessage {
            id: 1,
            data: "test".to_string(),
        };

        let mut metadata = MessageMetadata::default();
        metadata.ttl_ms = Some(1); // 1ms TTL
        metadata.timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            // SAFETY: u128 to u64 - nanoseconds since epoch fits in u64
            .as_nanos() as u64;

        let envelope = MessageEnvelope::new(message, metadata);

        // Should not be expired immediately
        assert!(!envelope.is_expired());

        // Wait and check again
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(envelope.is_expired());
    }
}
