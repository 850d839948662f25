//! The venue-facing boundary: everything this crate knows about an exchange
//! beyond the account-type routing quirks in [`crate::routing`].
//!
//! Grounded on `services/execution-router/src/venue_manager.rs`'s
//! connector-per-venue shape, narrowed to the two operations the EMS
//! actually drives (submit, cancel) instead of a full market-data/account
//! surface, since order book and balance feeds are out of scope here.

use async_trait::async_trait;
use rust_decimal::Decimal;
use services_common::{
    AccountType, InstrumentId, OrderSide, OrderType, PositionSide, TimeInForce,
};
use thiserror::Error;

/// A venue-transport failure. Every variant here becomes a synthetic failed
/// [`Order`](services_common::Order) at the call site — it is never returned
/// to a strategy as a Rust `Err`, per the error taxonomy in spec §7.
#[derive(Debug, Error, Clone)]
pub enum ConnectorError {
    /// The request never reached the venue (socket error, timeout, DNS).
    #[error("transport error talking to venue: {0}")]
    Transport(String),

    /// The venue accepted the request and rejected it (4xx-equivalent).
    #[error("venue rejected order: {0}")]
    Rejected(String),

    /// The venue's own systems failed independent of the request
    /// (5xx-equivalent); safe to retry, but this crate does not retry
    /// automatically — the caller observes a `Failed` order instead.
    #[error("venue server error: {0}")]
    ServerError(String),
}

/// The private (authenticated, order-entry) surface of one exchange.
///
/// One implementation per exchange; an [`crate::ems::EmsWorker`] is generic
/// over it. Every method takes the resolved [`AccountType`] the caller
/// already picked via [`crate::routing::VenueRouting`] — this trait never
/// makes routing decisions itself.
#[async_trait]
pub trait PrivateConnector: Send + Sync {
    /// Submit a new order. Returns the venue's immediate acknowledgement
    /// (`id`, accepted/rejected, initial status) — not necessarily terminal.
    #[allow(clippy::too_many_arguments)]
    async fn submit_order(
        &self,
        account_type: AccountType,
        uuid: uuid::Uuid,
        instrument_id: &InstrumentId,
        side: OrderSide,
        order_type: OrderType,
        amount: Decimal,
        price: Option<Decimal>,
        time_in_force: TimeInForce,
        position_side: Option<PositionSide>,
    ) -> Result<services_common::Order, ConnectorError>;

    /// Cancel a previously submitted order, identified by the venue order id
    /// the original submit returned.
    async fn cancel_order(
        &self,
        account_type: AccountType,
        instrument_id: &InstrumentId,
        uuid_target: uuid::Uuid,
        venue_order_id: &str,
    ) -> Result<services_common::Order, ConnectorError>;
}

#[cfg(test)]
pub mod mock {
    //! An in-memory [`PrivateConnector`] test double that always accepts,
    //! used by `ems`/`twap` unit tests in place of a real venue.

    use super::{ConnectorError, PrivateConnector};
    use async_trait::async_trait;
    use dashmap::DashMap;
    use rust_decimal::Decimal;
    use services_common::{
        AccountType, InstrumentId, Order, OrderSide, OrderStatus, OrderType, PositionSide,
        TimeInForce,
    };
    use std::sync::atomic::{AtomicU64, Ordering};
    use uuid::Uuid;

    /// Always-accept connector that hands back `Accepted` orders and tracks
    /// submitted/canceled uuids so tests can assert on call counts.
    #[derive(Default)]
    pub struct MockConnector {
        next_venue_id: AtomicU64,
        /// uuid -> assigned venue order id, for submitted orders
        pub submitted: DashMap<Uuid, String>,
        /// uuids that received a cancel call
        pub canceled: DashMap<Uuid, ()>,
        /// when true, every submit is rejected instead of accepted
        pub reject_all: std::sync::atomic::AtomicBool,
    }

    #[async_trait]
    impl PrivateConnector for MockConnector {
        async fn submit_order(
            &self,
            _account_type: AccountType,
            uuid: Uuid,
            instrument_id: &InstrumentId,
            side: OrderSide,
            order_type: OrderType,
            amount: Decimal,
            price: Option<Decimal>,
            time_in_force: TimeInForce,
            position_side: Option<PositionSide>,
        ) -> Result<Order, ConnectorError> {
            if self.reject_all.load(Ordering::Relaxed) {
                return Err(ConnectorError::Rejected("mock rejects everything".into()));
            }
            let venue_id = self.next_venue_id.fetch_add(1, Ordering::Relaxed);
            let venue_id = format!("MOCK-{venue_id}");
            self.submitted.insert(uuid, venue_id.clone());
            Ok(Order {
                uuid,
                id: Some(venue_id),
                parent_uuid: None,
                symbol: instrument_id.symbol.clone(),
                exchange: instrument_id.exchange,
                side,
                order_type,
                amount,
                price,
                filled: Decimal::ZERO,
                remaining: amount,
                status: OrderStatus::Accepted,
                position_side,
                time_in_force,
                success: true,
                timestamp: 0,
            })
        }

        async fn cancel_order(
            &self,
            _account_type: AccountType,
            instrument_id: &InstrumentId,
            uuid_target: Uuid,
            _venue_order_id: &str,
        ) -> Result<Order, ConnectorError> {
            self.canceled.insert(uuid_target, ());
            Ok(Order {
                uuid: uuid_target,
                id: self.submitted.get(&uuid_target).map(|v| v.clone()),
                parent_uuid: None,
                symbol: instrument_id.symbol.clone(),
                exchange: instrument_id.exchange,
                side: OrderSide::Buy,
                order_type: OrderType::Limit,
                amount: Decimal::ZERO,
                price: None,
                filled: Decimal::ZERO,
                remaining: Decimal::ZERO,
                status: OrderStatus::Canceled,
                position_side: None,
                time_in_force: TimeInForce::Gtc,
                success: true,
                timestamp: 0,
            })
        }
    }
}
