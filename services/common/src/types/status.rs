//! Order lifecycle status and the transition table governing it.

use serde::{Deserialize, Serialize};

/// Order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderType {
    /// Market order
    Market,
    /// Limit order
    Limit,
}

/// Time in force.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeInForce {
    /// Good till canceled
    Gtc,
    /// Immediate or cancel
    Ioc,
    /// Fill or kill
    Fok,
}

/// Order lifecycle status.
///
/// `INITIALIZED` is a cache-local pre-state: it marks an order the EMS has
/// constructed but not yet heard back from the venue about. It is never
/// observed outside this crate's own bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Constructed locally, not yet submitted
    Initialized,
    /// Submitted, awaiting venue acknowledgement
    Pending,
    /// Acknowledged open on the venue
    Accepted,
    /// Partially filled, still open
    PartiallyFilled,
    /// Fully filled
    Filled,
    /// Cancel requested, awaiting venue acknowledgement
    Canceling,
    /// Canceled
    Canceled,
    /// Rejected or failed to submit
    Failed,
    /// Expired (time-in-force)
    Expired,
}

impl OrderStatus {
    /// A status is closed once no further fills or state changes are expected.
    #[must_use]
    pub const fn is_closed(self) -> bool {
        matches!(
            self,
            Self::Filled | Self::Canceled | Self::Failed | Self::Expired
        )
    }

    /// A status is open while the order can still receive fills or be canceled.
    #[must_use]
    pub const fn is_open(self) -> bool {
        !self.is_closed()
    }
}

/// Algorithmic (TWAP) parent order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlgoOrderStatus {
    /// Constructed, not yet handed to the TWAP loop
    Initialized,
    /// Running, slices still to be placed
    Running,
    /// All slices placed and closed, parent done
    Finished,
    /// External cancel requested, cleanup cancels in flight
    Canceling,
    /// Canceled; cleanup cancels issued
    Canceled,
    /// A child submission failed; the loop exited without finishing
    Failed,
}

impl AlgoOrderStatus {
    /// Whether this status is terminal: no further slices will be placed
    /// and the loop that drives this parent has exited.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Canceled | Self::Failed)
    }
}

/// The legal next statuses for each current status.
///
/// This is a reconstructed safe superset rather than a table recovered from
/// a single source of truth: it allows every transition a venue's fill/cancel
/// stream can plausibly produce (including partial fills closing straight to
/// `Filled`, and `Canceling` resolving to either `Canceled` or `Filled` if a
/// fill race beat the cancel to the venue), while forbidding transitions out
/// of a closed state and backward transitions (e.g. `Filled` -> `Accepted`).
#[must_use]
pub const fn allowed_next(from: OrderStatus) -> &'static [OrderStatus] {
    use OrderStatus::{
        Accepted, Canceled, Canceling, Expired, Failed, Filled, Initialized, PartiallyFilled,
        Pending,
    };
    match from {
        Initialized => &[Pending, Accepted, Failed],
        Pending => &[Accepted, PartiallyFilled, Filled, Canceled, Failed, Expired],
        Accepted => &[PartiallyFilled, Filled, Canceling, Canceled, Expired],
        PartiallyFilled => &[PartiallyFilled, Filled, Canceling, Canceled, Expired],
        Canceling => &[Canceled, Filled, PartiallyFilled],
        Filled | Canceled | Failed | Expired => &[],
    }
}

/// Whether `from -> to` is a legal transition per [`allowed_next`].
///
/// A status transitioning to itself is always legal (idempotent replays of
/// the same venue event must not be dropped as invalid).
#[must_use]
pub fn is_valid_transition(from: OrderStatus, to: OrderStatus) -> bool {
    from == to || allowed_next(from).contains(&to)
}
