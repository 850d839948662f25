//! The execution management system itself: per-venue order dispatch plus
//! the TWAP algo-order lifecycle built on top of it.
//!
//! Grounded on `tradebot/base/ems.py`'s `ExecutionManagementSystem` base
//! class: `_build_order_submit_queues` at construction, one queue worker per
//! account type, `_handle_submit_order`/`_handle_cancel_order` per message,
//! and `_twap_order`/`_cancel_twap_order` for algo orders. Reworked from an
//! abstract base class with venue subclasses overriding hook methods into a
//! `VenueRouting`-generic worker, per spec §4.5 — Rust has no virtual method
//! dispatch to lean on, and the three venues' hooks differ only in the data
//! `routing.rs` already encapsulates.

use crate::config::EmsConfig;
use crate::connector::{ConnectorError, PrivateConnector};
use crate::error::EmsError;
use crate::routing::VenueRouting;
use crate::twap;
use cache::OrderStore;
use dashmap::DashMap;
use registry::OrderRegistry;
use rustc_hash::FxHashMap;
use services_common::{
    AccountType, BusMessage, Clock, EmcMessage, EventBus, ExchangeId, Market, Order, OrderStatus,
    OrderSubmit, PreconditionError,
};
use std::sync::{Arc, Weak};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

/// The dispatch surface strategies submit orders through. One instance per
/// exchange; `submit` never blocks and never returns an error — every
/// failure mode downstream of construction is either a synthetic `Failed`
/// order on the bus or a dropped, logged event, per spec §7.
pub trait ExecutionManagementSystem: Send + Sync {
    /// Route `submit` to the right account-type queue, or start/stop the
    /// TWAP task it names.
    fn submit(&self, submit: OrderSubmit);
}

/// A running per-venue worker: owns one `OrderSubmit` queue per configured
/// account type and the set of in-flight TWAP tasks for this exchange.
pub struct EmsWorker<V: VenueRouting, C: PrivateConnector> {
    exchange: ExchangeId,
    routing: V,
    connector: Arc<C>,
    queues: FxHashMap<AccountType, mpsc::UnboundedSender<OrderSubmit>>,
    queued_account_types: Vec<AccountType>,
    pub(crate) markets: Arc<DashMap<String, Market>>,
    pub(crate) store: Arc<dyn OrderStore>,
    registry: Arc<OrderRegistry>,
    pub(crate) bus: Arc<EventBus<EmcMessage>>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) config: EmsConfig,
    pub(crate) twap_tasks: DashMap<String, CancellationToken>,
    self_weak: Weak<Self>,
}

impl<V: VenueRouting + 'static, C: PrivateConnector + 'static> EmsWorker<V, C> {
    /// Build a worker for `exchange`, creating one queue (and one dispatch
    /// task) per account type `routing` selects from `configured_account_types`.
    ///
    /// # Errors
    /// Returns [`EmsError::Precondition`] if no account type in
    /// `configured_account_types` is usable for this venue — there would be
    /// nowhere to route any order.
    pub fn build(
        exchange: ExchangeId,
        routing: V,
        connector: Arc<C>,
        configured_account_types: &[AccountType],
        markets: Vec<Market>,
        store: Arc<dyn OrderStore>,
        registry: Arc<OrderRegistry>,
        bus: Arc<EventBus<EmcMessage>>,
        clock: Arc<dyn Clock>,
        config: EmsConfig,
    ) -> Result<Arc<Self>, EmsError> {
        let queued_account_types = routing.select_queue_account_types(configured_account_types);
        if queued_account_types.is_empty() {
            return Err(EmsError::Precondition(PreconditionError::UnknownRoute {
                exchange: exchange.to_string(),
                account_type: format!("{configured_account_types:?}"),
            }));
        }

        let market_map = Arc::new(DashMap::new());
        for market in markets {
            market_map.insert(market.symbol.clone(), market);
        }

        let worker = Arc::new_cyclic(|weak: &Weak<Self>| {
            let mut queues = FxHashMap::default();
            let mut receivers = Vec::new();
            for account_type in &queued_account_types {
                let (tx, rx) = mpsc::unbounded_channel();
                queues.insert(*account_type, tx);
                receivers.push((*account_type, rx));
            }

            let worker = Self {
                exchange,
                routing,
                connector,
                queues,
                queued_account_types: queued_account_types.clone(),
                markets: market_map,
                store,
                registry,
                bus,
                clock,
                config,
                twap_tasks: DashMap::new(),
                self_weak: weak.clone(),
            };

            for (account_type, rx) in receivers {
                let weak = weak.clone();
                tokio::spawn(async move {
                    run_queue(weak, account_type, rx).await;
                });
            }

            worker
        });

        Ok(worker)
    }

    fn account_type_for(&self, instrument: &services_common::InstrumentId) -> Option<AccountType> {
        self.routing
            .account_type_for(instrument, &self.queued_account_types)
    }

    /// The venue-specific minimum order amount for `market`, per
    /// [`VenueRouting::min_order_amount`], using the latest cached touch
    /// price if one has arrived.
    pub(crate) fn min_order_amount(&self, market: &Market) -> rust_decimal::Decimal {
        let touch = self.store.bookl1(&market.symbol);
        self.routing.min_order_amount(market, touch)
    }

    fn enqueue(&self, account_type: AccountType, submit: OrderSubmit) {
        let Some(tx) = self.queues.get(&account_type) else {
            error!(exchange = %self.exchange, ?account_type, "no queue for resolved account type");
            return;
        };
        if tx.send(submit).is_err() {
            error!(exchange = %self.exchange, ?account_type, "order submit queue worker has exited");
        }
    }

    fn spawn_twap(&self, uuid: String, instrument_id: services_common::InstrumentId, side: services_common::OrderSide, amount: rust_decimal::Decimal, duration: u64, wait: u64) {
        let algo = twap::new_algo_order(uuid.clone(), self.exchange, &instrument_id, side, amount, duration, wait, self.clock.now_ms());
        self.store.algo_order_update(&algo);

        let cancel = CancellationToken::new();
        self.twap_tasks.insert(uuid.clone(), cancel.clone());

        let Some(worker) = self.self_weak.upgrade() else {
            return;
        };
        tokio::spawn(async move {
            twap::run(worker, uuid, instrument_id, side, amount, duration, wait, cancel).await;
        });
    }

    /// Signal cancellation of a running TWAP task. A no-op if `uuid_target`
    /// names no task this worker is tracking (already finished, or never
    /// started here).
    pub fn cancel_twap(&self, uuid_target: &str) {
        if let Some((_, token)) = self.twap_tasks.remove(uuid_target) {
            token.cancel();
        } else {
            warn!(uuid_target, "cancel_twap: no running task with this uuid");
        }
    }
}

impl<V: VenueRouting + 'static, C: PrivateConnector + 'static> ExecutionManagementSystem
    for EmsWorker<V, C>
{
    fn submit(&self, submit: OrderSubmit) {
        match submit {
            OrderSubmit::Create { ref instrument_id, .. } => {
                let Some(account_type) = self.account_type_for(instrument_id) else {
                    error!(symbol = %instrument_id.symbol, exchange = %self.exchange, "no account type routes this instrument");
                    return;
                };
                self.enqueue(account_type, submit);
            }
            OrderSubmit::Cancel { ref instrument_id, .. } => {
                let Some(account_type) = self.account_type_for(instrument_id) else {
                    error!(symbol = %instrument_id.symbol, exchange = %self.exchange, "no account type routes this instrument");
                    return;
                };
                self.enqueue(account_type, submit);
            }
            OrderSubmit::Twap {
                uuid,
                instrument_id,
                side,
                amount,
                duration,
                wait,
            } => {
                let Some(this) = self.self_weak.upgrade() else {
                    return;
                };
                this.spawn_twap(uuid, instrument_id, side, amount, duration, wait);
            }
            OrderSubmit::CancelTwap { uuid_target, .. } => {
                self.cancel_twap(&uuid_target);
            }
        }
    }
}

async fn run_queue<V: VenueRouting + 'static, C: PrivateConnector + 'static>(
    worker: Weak<EmsWorker<V, C>>,
    account_type: AccountType,
    mut rx: mpsc::UnboundedReceiver<OrderSubmit>,
) {
    while let Some(submit) = rx.recv().await {
        let Some(worker) = worker.upgrade() else { break };
        match submit {
            OrderSubmit::Create {
                uuid,
                instrument_id,
                side,
                order_type,
                amount,
                price,
                time_in_force,
                position_side,
            } => {
                handle_create(
                    &worker,
                    account_type,
                    uuid,
                    instrument_id,
                    side,
                    order_type,
                    amount,
                    price,
                    time_in_force,
                    position_side,
                )
                .await;
            }
            OrderSubmit::Cancel {
                instrument_id,
                uuid_target,
            } => {
                handle_cancel(&worker, account_type, instrument_id, uuid_target).await;
            }
            OrderSubmit::Twap { .. } | OrderSubmit::CancelTwap { .. } => {
                // TWAP control messages never reach a venue queue; `submit`
                // handles them directly.
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn handle_create<V: VenueRouting, C: PrivateConnector>(
    worker: &EmsWorker<V, C>,
    account_type: AccountType,
    uuid: Uuid,
    instrument_id: services_common::InstrumentId,
    side: services_common::OrderSide,
    order_type: services_common::OrderType,
    amount: rust_decimal::Decimal,
    price: Option<rust_decimal::Decimal>,
    time_in_force: services_common::TimeInForce,
    position_side: Option<services_common::PositionSide>,
) {
    let rounded_amount = worker
        .markets
        .get(&instrument_id.symbol)
        .map_or(amount, |m| precision::round_amount(&m, amount, precision::RoundMode::Floor));
    let rounded_price = price.map(|p| {
        worker
            .markets
            .get(&instrument_id.symbol)
            .map_or(p, |m| precision::round_price(&m, p, precision::RoundMode::Round))
    });

    let initialized = Order {
        uuid,
        id: None,
        parent_uuid: None,
        symbol: instrument_id.symbol.clone(),
        exchange: worker.exchange,
        side,
        order_type,
        amount: rounded_amount,
        price: rounded_price,
        filled: rust_decimal::Decimal::ZERO,
        remaining: rounded_amount,
        status: OrderStatus::Initialized,
        position_side,
        time_in_force,
        success: true,
        timestamp: worker.clock.now_ms(),
    };
    worker.store.order_initialized(&initialized);

    let result = worker
        .connector
        .submit_order(
            account_type,
            uuid,
            &instrument_id,
            side,
            order_type,
            rounded_amount,
            rounded_price,
            time_in_force,
            position_side,
        )
        .await;

    let order = match result {
        // A successful submit lands the order on `Pending` regardless of the
        // status the connector echoed back — the venue's own acknowledgement
        // (accepted/partially filled/etc.) arrives as a later, separate
        // status update, never folded into the create response itself.
        Ok(order) => Order {
            status: OrderStatus::Pending,
            ..order
        },
        Err(err) => failed_order(uuid, &instrument_id, side, order_type, rounded_amount, rounded_price, time_in_force, position_side, worker.clock.now_ms(), &err),
    };

    worker.registry.register(&order);
    worker.store.order_status_update(&order);
    publish(&worker.bus, &order).await;
}

async fn handle_cancel<V: VenueRouting, C: PrivateConnector>(
    worker: &EmsWorker<V, C>,
    account_type: AccountType,
    instrument_id: services_common::InstrumentId,
    uuid_target: Uuid,
) {
    let Some(venue_order_id) = worker.registry.get_order_id(uuid_target) else {
        warn!(%uuid_target, "cancel requested for an order with no registered venue id, dropping");
        return;
    };

    let result = worker
        .connector
        .cancel_order(account_type, &instrument_id, uuid_target, &venue_order_id)
        .await;

    match result {
        Ok(order) => {
            worker.store.order_status_update(&order);
            publish(&worker.bus, &order).await;
        }
        Err(err) => {
            error!(%uuid_target, %err, "cancel request failed at the venue");
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn failed_order(
    uuid: Uuid,
    instrument_id: &services_common::InstrumentId,
    side: services_common::OrderSide,
    order_type: services_common::OrderType,
    amount: rust_decimal::Decimal,
    price: Option<rust_decimal::Decimal>,
    time_in_force: services_common::TimeInForce,
    position_side: Option<services_common::PositionSide>,
    timestamp: i64,
    err: &ConnectorError,
) -> Order {
    warn!(%uuid, symbol = %instrument_id.symbol, %err, "order submit failed, recording as Failed");
    Order {
        uuid,
        id: None,
        parent_uuid: None,
        symbol: instrument_id.symbol.clone(),
        exchange: instrument_id.exchange,
        side,
        order_type,
        amount,
        price,
        filled: rust_decimal::Decimal::ZERO,
        remaining: amount,
        status: OrderStatus::Failed,
        position_side,
        time_in_force,
        success: false,
        timestamp,
    }
}

/// Lowercase status token used on the bus, matching `EmcMessage::topic_for_status`.
/// `Initialized` has no topic: it is this crate's own pre-submission
/// bookkeeping state and is never published.
const fn status_str(status: OrderStatus) -> Option<&'static str> {
    match status {
        OrderStatus::Initialized => None,
        OrderStatus::Pending => Some("pending"),
        OrderStatus::Accepted => Some("accepted"),
        OrderStatus::PartiallyFilled => Some("partially_filled"),
        OrderStatus::Filled => Some("filled"),
        OrderStatus::Canceling => Some("canceling"),
        OrderStatus::Canceled => Some("canceled"),
        OrderStatus::Failed => Some("failed"),
        OrderStatus::Expired => Some("expired"),
    }
}

async fn publish(bus: &Arc<EventBus<EmcMessage>>, order: &Order) {
    let Some(status) = status_str(order.status) else {
        return;
    };
    let message = EmcMessage::OrderEvent {
        uuid: order.uuid.to_string(),
        order_id: order.id.clone(),
        symbol: order.symbol.clone(),
        status: status.to_string(),
        timestamp: order.timestamp,
    };
    if let Err(err) = bus.publish(message).await {
        info!(%err, uuid = %order.uuid, "no subscribers for order event, continuing");
    }
}
