//! Order and algorithmic (TWAP) parent order.

use super::status::{AlgoOrderStatus, OrderStatus, OrderType, TimeInForce};
use super::symbol::{ExchangeId, OrderSide, PositionSide};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single order as tracked by the cache and routed through the EMS.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Client-generated identity, stable for the life of the order
    pub uuid: Uuid,
    /// Venue-assigned order id, set once the venue acknowledges the order
    pub id: Option<String>,
    /// If this order is a TWAP slice, the parent algo order's uuid
    pub parent_uuid: Option<String>,
    /// Venue-qualified symbol
    pub symbol: String,
    /// Venue
    pub exchange: ExchangeId,
    /// Side
    pub side: OrderSide,
    /// Order type
    pub order_type: OrderType,
    /// Requested amount, in base-asset units, precision-adjusted
    pub amount: Decimal,
    /// Limit price; `None` for market orders
    pub price: Option<Decimal>,
    /// Cumulative filled amount
    pub filled: Decimal,
    /// Remaining unfilled amount (`amount - filled`)
    pub remaining: Decimal,
    /// Current lifecycle status
    pub status: OrderStatus,
    /// Position side this order acts on, for derivatives in hedge mode
    pub position_side: Option<PositionSide>,
    /// Time in force
    pub time_in_force: TimeInForce,
    /// Whether the venue call that produced this order succeeded
    pub success: bool,
    /// Event timestamp, milliseconds since epoch
    pub timestamp: i64,
}

impl Order {
    /// True while the order can still receive fills or be canceled.
    #[must_use]
    pub const fn is_opened(&self) -> bool {
        self.status.is_open()
    }

    /// True once the order has reached a terminal status.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.status.is_closed()
    }

    /// True while the order has been submitted but not yet confirmed either
    /// way by the venue (no fill, cancel, or rejection observed yet).
    #[must_use]
    pub const fn on_flight(&self) -> bool {
        matches!(
            self.status,
            OrderStatus::Initialized | OrderStatus::Pending | OrderStatus::Canceling
        )
    }
}

/// A TWAP algorithmic parent order. Tracks the child slice orders it has
/// spawned; `orders` is append-only for the life of the parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlgoOrder {
    /// Identity, always prefixed `ALGO-`
    pub uuid: String,
    /// Venue-qualified symbol
    pub symbol: String,
    /// Venue
    pub exchange: ExchangeId,
    /// Side, applied to every child slice
    pub side: OrderSide,
    /// Total amount to execute across all slices
    pub amount: Decimal,
    /// Total duration of the execution, in seconds
    pub duration: u64,
    /// Target wait between slices, in seconds
    pub wait: u64,
    /// Lifecycle status
    pub status: AlgoOrderStatus,
    /// Child slice order uuids, in placement order
    pub orders: Vec<Uuid>,
    /// Creation timestamp, milliseconds since epoch
    pub timestamp: i64,
}

impl AlgoOrder {
    /// Mint a new parent uuid in the `ALGO-<uuid>` form used throughout the
    /// cache and bus topics to distinguish parents from plain order uuids.
    #[must_use]
    pub fn new_uuid() -> String {
        format!("ALGO-{}", Uuid::new_v4())
    }
}
