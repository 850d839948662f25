//! Tests for the topic-based publish/subscribe message bus.
//!
//! Covers publish/subscribe delivery, priority and TTL metadata, and the
//! `EmcMessage` topic mapping.

use anyhow::Result;
use rstest::*;
use rust_decimal::Decimal;
use services_common::{BusMessage, EmcMessage, EventBus, EventBusConfig, MessageEnvelope, MessageMetadata};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

#[derive(Debug, Clone)]
struct TestMessage {
    id: u64,
    content: String,
    priority: u8,
    topic_name: String,
}

impl BusMessage for TestMessage {
    fn topic(&self) -> &str {
        &self.topic_name
    }

    fn priority(&self) -> u8 {
        self.priority
    }
}

#[rstest]
#[tokio::test]
async fn bus_reports_configured_capacity() {
    let config = EventBusConfig {
        capacity: 1000,
        enable_metrics: true,
        default_ttl_ms: Some(30000),
    };

    let bus = EventBus::<TestMessage>::new(config);
    assert_eq!(bus.capacity(), 1000);
}

#[rstest]
#[tokio::test]
async fn publish_then_subscribe_recv() -> Result<()> {
    let bus = EventBus::<TestMessage>::new(EventBusConfig::default());
    let mut subscriber = bus.subscribe("test_topic").await?;

    let message = TestMessage {
        id: 1,
        content: "hello".to_string(),
        priority: 128,
        topic_name: "test_topic".to_string(),
    };

    bus.publish(message.clone()).await?;

    let received = timeout(Duration::from_millis(100), subscriber.recv())
        .await
        .map_err(|_| anyhow::anyhow!("timed out waiting for message"))??;

    assert_eq!(received.message.id, message.id);
    assert_eq!(received.message.content, message.content);
    assert_eq!(received.topic(), message.topic());

    Ok(())
}

#[rstest]
#[tokio::test]
async fn concurrent_publishers_all_land() -> Result<()> {
    let bus = Arc::new(EventBus::<TestMessage>::new(EventBusConfig::default()));
    let mut subscriber = bus.subscribe("concurrent_topic").await?;

    let message_count = 100u64;
    let mut handles = Vec::new();

    for i in 0..message_count {
        let bus_clone = Arc::clone(&bus);
        handles.push(tokio::spawn(async move {
            let msg = TestMessage {
                id: i,
                content: format!("message {i}"),
                priority: (i % 256) as u8,
                topic_name: "concurrent_topic".to_string(),
            };
            bus_clone.publish(msg).await
        }));
    }

    for handle in handles {
        handle.await??;
    }

    let mut received = 0usize;
    while received < message_count as usize {
        timeout(Duration::from_millis(200), subscriber.recv()).await??;
        received += 1;
    }

    Ok(())
}

#[rstest]
#[tokio::test]
async fn distinct_topics_do_not_cross_deliver() -> Result<()> {
    let bus = EventBus::<TestMessage>::new(EventBusConfig::default());
    let mut sub1 = bus.subscribe("topic1").await?;
    let mut sub2 = bus.subscribe("topic2").await?;

    bus.publish(TestMessage {
        id: 11,
        content: "t1".to_string(),
        priority: 128,
        topic_name: "topic1".to_string(),
    })
    .await?;
    bus.publish(TestMessage {
        id: 12,
        content: "t2".to_string(),
        priority: 128,
        topic_name: "topic2".to_string(),
    })
    .await?;

    let received1 = timeout(Duration::from_millis(100), sub1.recv()).await??;
    let received2 = timeout(Duration::from_millis(100), sub2.recv()).await??;

    assert_eq!(received1.message.id, 11);
    assert_eq!(received2.message.id, 12);

    Ok(())
}

#[rstest]
#[test]
fn message_metadata_default_is_sane() {
    let metadata = MessageMetadata::default();
    assert!(!metadata.message_id.is_empty());
    assert_eq!(metadata.source, "unknown");
    assert!(metadata.timestamp > 0);
    assert_eq!(metadata.retry_count, 0);
}

#[rstest]
#[test]
fn emc_message_order_event_topic_matches_status() {
    let msg = EmcMessage::OrderEvent {
        uuid: "u1".to_string(),
        order_id: Some("venue-1".to_string()),
        symbol: "BTCUSDT".to_string(),
        status: "partially_filled".to_string(),
        timestamp: 0,
    };
    assert_eq!(msg.topic(), "partially_filled");
    assert_eq!(msg.priority(), 16);
}

#[rstest]
#[test]
fn emc_message_market_data_topics_and_priority() {
    let trade = EmcMessage::Trade {
        symbol: "ETHUSDT".to_string(),
        price: Decimal::new(300000, 2),
        amount: Decimal::ONE,
        timestamp: 0,
    };
    assert_eq!(trade.topic(), "trade");
    assert_eq!(trade.priority(), 48);

    let kline = EmcMessage::Kline {
        symbol: "ETHUSDT".to_string(),
        close: Decimal::new(300000, 2),
        timestamp: 0,
    };
    assert_eq!(kline.topic(), "kline");
    assert_eq!(kline.priority(), 96);
}

#[rstest]
#[test]
fn message_expires_after_ttl() {
    let message = TestMessage {
        id: 8,
        content: "expiring".to_string(),
        priority: 128,
        topic_name: "expiry_test".to_string(),
    };

    let mut metadata = MessageMetadata {
        ttl_ms: Some(1),
        ..Default::default()
    };
    metadata.timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos() as u64;

    let envelope = MessageEnvelope::new(message, metadata);
    assert!(!envelope.is_expired());

    std::thread::sleep(Duration::from_millis(5));
    assert!(envelope.is_expired());
}

#[rstest]
#[tokio::test]
async fn small_capacity_bus_still_reports_configured_value() {
    let config = EventBusConfig {
        capacity: 10,
        enable_metrics: false,
        default_ttl_ms: None,
    };

    let bus = EventBus::<TestMessage>::new(config);
    assert_eq!(bus.capacity(), 10);
}
