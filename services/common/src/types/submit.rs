//! The order-intent envelope strategies hand to the EMS.
//!
//! Modeled as a tagged union rather than a single struct with a grab-bag of
//! optional fields: each submit kind only carries the fields that make sense
//! for it, so a `Cancel` can't accidentally carry a `price`.

use super::status::{OrderType, TimeInForce};
use super::symbol::{InstrumentId, OrderSide, PositionSide};
use rust_decimal::Decimal;
use uuid::Uuid;

/// An order-intent message submitted to the EMS.
#[derive(Debug, Clone)]
pub enum OrderSubmit {
    /// Submit a new immediate order (market or limit).
    Create {
        /// Client-generated identity for the new order
        uuid: Uuid,
        /// Target instrument
        instrument_id: InstrumentId,
        /// Side
        side: OrderSide,
        /// Order type
        order_type: OrderType,
        /// Requested amount, pre-precision
        amount: Decimal,
        /// Limit price; required for `OrderType::Limit`
        price: Option<Decimal>,
        /// Time in force
        time_in_force: TimeInForce,
        /// Position side, for derivatives in hedge mode
        position_side: Option<PositionSide>,
    },
    /// Cancel a previously submitted order.
    Cancel {
        /// Target instrument (needed for venue routing)
        instrument_id: InstrumentId,
        /// Uuid of the order to cancel
        uuid_target: Uuid,
    },
    /// Start a TWAP execution.
    Twap {
        /// Parent algo order identity (`ALGO-<uuid>`)
        uuid: String,
        /// Target instrument
        instrument_id: InstrumentId,
        /// Side, applied to every slice
        side: OrderSide,
        /// Total amount to execute
        amount: Decimal,
        /// Total duration, seconds
        duration: u64,
        /// Target wait between slices, seconds
        wait: u64,
    },
    /// Cancel a running TWAP execution.
    CancelTwap {
        /// Target instrument (needed for venue routing)
        instrument_id: InstrumentId,
        /// Parent algo order identity to cancel
        uuid_target: String,
    },
}

impl OrderSubmit {
    /// The instrument this submit routes against.
    #[must_use]
    pub const fn instrument_id(&self) -> &InstrumentId {
        match self {
            Self::Create { instrument_id, .. }
            | Self::Cancel { instrument_id, .. }
            | Self::Twap { instrument_id, .. }
            | Self::CancelTwap { instrument_id, .. } => instrument_id,
        }
    }
}
