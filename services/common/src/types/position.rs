//! Position aggregation: spot (single-sided) and futures (long/short/both).

use super::order::Order;
use super::status::OrderStatus;
use super::symbol::{ExchangeId, OrderSide, PositionSide};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Aggregate spot holding for a symbol. Spot has no short side: `amount` is
/// always the net long holding, and can only grow or shrink, never flip sign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpotPosition {
    /// Venue-qualified symbol
    pub symbol: String,
    /// Venue
    pub exchange: ExchangeId,
    /// Net held amount
    pub amount: Decimal,
    /// Volume-weighted average entry price
    pub avg_price: Decimal,
}

impl SpotPosition {
    /// A flat starting position for `symbol` on `exchange`.
    #[must_use]
    pub fn flat(symbol: impl Into<String>, exchange: ExchangeId) -> Self {
        Self {
            symbol: symbol.into(),
            exchange,
            amount: Decimal::ZERO,
            avg_price: Decimal::ZERO,
        }
    }

    /// Apply a fill/cancel observation from `order` to this position.
    ///
    /// Buys increase the held amount and roll the average price forward;
    /// sells reduce the held amount and leave the average price of the
    /// remainder unchanged (realized PnL on the sold portion is not tracked
    /// here, matching the scope of this aggregate — it is a position size
    /// and cost-basis view, not a PnL ledger).
    pub fn apply(&mut self, order: &Order) {
        let filled_delta = order.filled;
        if filled_delta.is_zero() {
            return;
        }
        match order.side {
            OrderSide::Buy => {
                let new_amount = self.amount + filled_delta;
                if !new_amount.is_zero() {
                    self.avg_price = (self.avg_price * self.amount
                        + order.price.unwrap_or(self.avg_price) * filled_delta)
                        / new_amount;
                }
                self.amount = new_amount;
            }
            OrderSide::Sell => {
                self.amount -= filled_delta;
            }
        }
    }
}

/// Aggregate derivative position for a symbol, tracked per position side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuturePosition {
    /// Venue-qualified symbol
    pub symbol: String,
    /// Venue
    pub exchange: ExchangeId,
    /// Position side (long/short/both, depending on venue hedge mode)
    pub position_side: PositionSide,
    /// Net held amount, always non-negative; direction is carried by `position_side`
    pub amount: Decimal,
    /// Volume-weighted average entry price
    pub avg_price: Decimal,
}

impl FuturePosition {
    /// A flat starting position for `symbol` on `exchange` with the given side.
    #[must_use]
    pub fn flat(symbol: impl Into<String>, exchange: ExchangeId, position_side: PositionSide) -> Self {
        Self {
            symbol: symbol.into(),
            exchange,
            position_side,
            amount: Decimal::ZERO,
            avg_price: Decimal::ZERO,
        }
    }

    /// Apply a fill/cancel observation from `order` to this position, using
    /// the same opening-side-increases / closing-side-decreases convention
    /// as [`SpotPosition::apply`].
    pub fn apply(&mut self, order: &Order) {
        let filled_delta = order.filled;
        if filled_delta.is_zero() {
            return;
        }
        let opens = matches!(
            (self.position_side, order.side),
            (PositionSide::Long, OrderSide::Buy) | (PositionSide::Short, OrderSide::Sell)
        );
        if opens {
            let new_amount = self.amount + filled_delta;
            if !new_amount.is_zero() {
                self.avg_price = (self.avg_price * self.amount
                    + order.price.unwrap_or(self.avg_price) * filled_delta)
                    / new_amount;
            }
            self.amount = new_amount;
        } else {
            self.amount = (self.amount - filled_delta).max(Decimal::ZERO);
        }
    }
}

/// Either position flavor, used where cache callers don't need to
/// distinguish spot from futures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Position {
    /// Spot holding
    Spot(SpotPosition),
    /// Derivative position
    Future(FuturePosition),
}

/// Whether `order`'s status means it should be applied to a position at all.
#[must_use]
pub const fn affects_position(status: OrderStatus) -> bool {
    matches!(
        status,
        OrderStatus::Filled | OrderStatus::PartiallyFilled | OrderStatus::Canceled
    )
}
