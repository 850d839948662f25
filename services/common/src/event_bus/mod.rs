//! Topic-based publish/subscribe message bus.
//!
//! Single-process, in-memory, backed by one `tokio::sync::broadcast` channel
//! per topic. This is the one piece of shared mutable state every component
//! in the core is allowed to reach through (everything else is
//! constructor-injected `Arc`s) — it models the boundary where a
//! `PrivateConnector`/market-data adapter outside this crate would publish
//! execution reports and book/trade/kline snapshots.

pub mod bus;
pub mod message;
pub mod metrics;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

pub use bus::{EventBus, EventBusConfig};
pub use message::MessageEnvelope;
pub use metrics::BusMetrics;

/// Core message trait for all event bus messages.
pub trait BusMessage: Send + Sync + Clone + Debug + 'static {
    /// The topic string this message routes under.
    fn topic(&self) -> &str;

    /// Message priority (0 = highest, 255 = lowest).
    fn priority(&self) -> u8 {
        128
    }

    /// Message metadata.
    fn metadata(&self) -> MessageMetadata {
        MessageMetadata::default()
    }
}

/// Message metadata for enhanced routing and processing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageMetadata {
    /// Message id
    pub message_id: String,
    /// Publishing component
    pub source: String,
    /// Target component, if addressed
    pub target: Option<String>,
    /// Correlation id for request tracing
    pub correlation_id: Option<String>,
    /// Publish timestamp, nanoseconds since epoch
    pub timestamp: u64,
    /// Message time-to-live in milliseconds
    pub ttl_ms: Option<u64>,
    /// Retry count, incremented by handler dispatch on failure
    pub retry_count: u32,
    /// Custom headers
    pub headers: rustc_hash::FxHashMap<String, String>,
}

impl Default for MessageMetadata {
    fn default() -> Self {
        Self {
            message_id: uuid::Uuid::new_v4().to_string(),
            source: "unknown".to_string(),
            target: None,
            correlation_id: None,
            timestamp: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos() as u64,
            ttl_ms: None,
            retry_count: 0,
            headers: rustc_hash::FxHashMap::default(),
        }
    }
}

/// Error types for event bus operations.
#[derive(Debug, thiserror::Error)]
pub enum EventBusError {
    /// Message TTL expired before it could be delivered
    #[error("message TTL expired")]
    MessageExpired,
    /// No subscribers were registered for the topic
    #[error("no subscribers for topic: {topic}")]
    NoSubscribers {
        /// Topic with no subscribers
        topic: String,
    },
}

/// Result type for event bus operations.
pub type BusResult<T> = std::result::Result<T, EventBusError>;

/// The closed set of messages flowing over the core's bus: execution
/// lifecycle events published by the EMS and consumed by the OMS and
/// strategies, plus the three market-data snapshot topics the cache
/// subscribes to (published by a market-data adapter outside this crate).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EmcMessage {
    /// An order moved to a new status
    OrderEvent {
        /// Order uuid
        uuid: String,
        /// Venue order id, once known
        order_id: Option<String>,
        /// Venue-qualified symbol
        symbol: String,
        /// New status, as a string for transport simplicity
        status: String,
        /// Event timestamp, milliseconds since epoch
        timestamp: i64,
    },
    /// Best bid/ask snapshot for a symbol
    BookL1 {
        /// Venue-qualified symbol
        symbol: String,
        /// Best bid price
        bid: Decimal,
        /// Best ask price
        ask: Decimal,
        /// Event timestamp, milliseconds since epoch
        timestamp: i64,
    },
    /// Last-trade snapshot for a symbol
    Trade {
        /// Venue-qualified symbol
        symbol: String,
        /// Trade price
        price: Decimal,
        /// Trade quantity
        amount: Decimal,
        /// Event timestamp, milliseconds since epoch
        timestamp: i64,
    },
    /// Kline/candle snapshot for a symbol
    Kline {
        /// Venue-qualified symbol
        symbol: String,
        /// Close price
        close: Decimal,
        /// Candle open timestamp, milliseconds since epoch
        timestamp: i64,
    },
    /// A validated, cache-consistent order snapshot re-published by the OMS
    /// after observing an `OrderEvent`, carrying the fill detail strategies
    /// need that the raw event doesn't.
    LifecycleEvent {
        /// Order uuid
        uuid: String,
        /// Venue order id, once known
        order_id: Option<String>,
        /// Venue-qualified symbol
        symbol: String,
        /// New status, as a string for transport simplicity
        status: String,
        /// Total requested amount
        amount: Decimal,
        /// Cumulative filled amount
        filled: Decimal,
        /// Remaining unfilled amount
        remaining: Decimal,
        /// Event timestamp, milliseconds since epoch
        timestamp: i64,
    },
}

impl EmcMessage {
    /// The order-event topic an order in `status` was published on.
    #[must_use]
    pub const fn topic_for_status(status: &str) -> &'static str {
        match status.as_bytes() {
            b"pending" => "pending",
            b"accepted" => "accepted",
            b"partially_filled" => "partially_filled",
            b"filled" => "filled",
            b"canceling" => "canceling",
            b"canceled" => "canceled",
            b"failed" => "failed",
            b"expired" => "expired",
            b"cancel_failed" => "cancel_failed",
            _ => "order_event",
        }
    }

    /// The lifecycle-event topic an order in `status` was re-published on
    /// by the OMS, namespaced under `lifecycle.` to distinguish it from the
    /// EMS's raw [`EmcMessage::OrderEvent`].
    #[must_use]
    pub const fn topic_for_lifecycle_status(status: &str) -> &'static str {
        match status.as_bytes() {
            b"pending" => "lifecycle.pending",
            b"accepted" => "lifecycle.accepted",
            b"partially_filled" => "lifecycle.partially_filled",
            b"filled" => "lifecycle.filled",
            b"canceling" => "lifecycle.canceling",
            b"canceled" => "lifecycle.canceled",
            b"failed" => "lifecycle.failed",
            b"expired" => "lifecycle.expired",
            b"cancel_failed" => "lifecycle.cancel_failed",
            _ => "lifecycle.order_event",
        }
    }
}

impl BusMessage for EmcMessage {
    fn topic(&self) -> &str {
        match self {
            Self::OrderEvent { status, .. } => Self::topic_for_status(status),
            Self::LifecycleEvent { status, .. } => Self::topic_for_lifecycle_status(status),
            Self::BookL1 { .. } => "bookl1",
            Self::Trade { .. } => "trade",
            Self::Kline { .. } => "kline",
        }
    }

    fn priority(&self) -> u8 {
        match self {
            Self::OrderEvent { .. } | Self::LifecycleEvent { .. } => 16,
            Self::Trade { .. } | Self::BookL1 { .. } => 48,
            Self::Kline { .. } => 96,
        }
    }
}
