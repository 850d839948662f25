//! TWAP (time-weighted average price) parent-order slicing.
//!
//! Ported from `tradebot/base/ems.py`'s `_calculate_twap_orders`/`_twap_order`:
//! split `amount` into slices sized against the venue's minimum order amount,
//! rest each non-final slice one tick inside the touch price as a LIMIT
//! order, fire the final slice as a MARKET order, and watch every 100ms for
//! a slice that hasn't filled by the time the next one is due — canceling it
//! and folding or re-submitting whatever remains. One `tokio` task runs per
//! parent TWAP order, cooperatively canceled via a `CancellationToken`
//! stored alongside it in [`crate::ems::EmsWorker::twap_tasks`].
//!
//! Cancellation intentionally cancels every open order on the instrument's
//! symbol, not just this TWAP's own child slices — carried over verbatim
//! from the original `_cancel_twap_order`, which queries the cache's
//! symbol-level open-order set rather than the parent's own `orders` list.
//! Left as-is per the spec's open question: a strategy relying on precise
//! per-algo cancellation would need EMC to track child uuids instead, but
//! nothing here assumes that guarantee holds today.

use crate::ems::{EmsWorker, ExecutionManagementSystem};
use crate::routing::VenueRouting;
use cache::OrderStore;
use precision::RoundMode;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use services_common::{
    AlgoOrder, AlgoOrderStatus, ExchangeId, InstrumentId, Market, Order, OrderSide, OrderStatus,
    OrderSubmit, OrderType, TimeInForce,
};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Compute the TWAP slice amounts and the per-slice wait (seconds), per
/// spec §4.6. Pure and side-effect-free so the boundary cases in spec §8
/// can be unit-tested directly.
///
/// - `total_amount == 0` yields no slices at all (the caller finishes the
///   parent immediately).
/// - `total_amount < min_order_amount` yields a single slice sized exactly
///   `min_order_amount`, with no wait between slices (there is only one).
/// - Otherwise, `duration / wait` candidate slices are sized to
///   `max(min, ceil_to_lot(total / candidate_count))`, the slice count is
///   recomputed against that settled size, and the leftover remainder is
///   folded into the last slice if it's smaller than the minimum, else
///   appended as one extra slice.
#[must_use]
pub fn calculate_twap_slices(
    total_amount: Decimal,
    duration_secs: u64,
    wait_secs: u64,
    min_order_amount: Decimal,
    market: &Market,
) -> (VecDeque<Decimal>, u64) {
    if total_amount.is_zero() {
        return (VecDeque::new(), 0);
    }
    if total_amount < min_order_amount {
        return (VecDeque::from([min_order_amount]), 0);
    }

    let wait_secs = wait_secs.max(1);
    let candidate_count = (duration_secs / wait_secs).max(1);
    let raw_base = total_amount / Decimal::from(candidate_count);
    let base = precision::round_amount(market, raw_base, RoundMode::Ceil).max(min_order_amount);

    let interval = (total_amount / base)
        .trunc()
        .to_u64()
        .unwrap_or(1)
        .max(1);
    let remainder = total_amount - Decimal::from(interval) * base;

    let mut slices: VecDeque<Decimal> = std::iter::repeat(base).take(interval as usize).collect();
    if remainder.is_zero() {
        // exact fit
    } else if remainder < min_order_amount {
        if let Some(last) = slices.back_mut() {
            *last += remainder;
        } else {
            slices.push_back(remainder);
        }
    } else {
        slices.push_back(remainder);
    }

    let wait = duration_secs / (slices.len() as u64).max(1);
    (slices, wait)
}

/// What the watch phase observed about an outstanding child order.
enum WatchOutcome {
    /// The parent was canceled externally while watching this child.
    Canceled,
    /// The child reached a terminal status; carries the final order so the
    /// caller can reclaim `remaining` and check `status == Failed`.
    Closed(Order),
    /// The child never appeared in the cache (submission never completed)
    /// before the watch window elapsed; treated like a stuck, never-opened
    /// order and canceled.
    NeverObserved,
}

/// Run one TWAP parent order to completion, failure, or cancellation.
/// Spawned as its own `tokio` task by [`crate::ems::EmsWorker::submit`].
#[allow(clippy::too_many_arguments)]
pub async fn run<V: VenueRouting + 'static, C: crate::connector::PrivateConnector + 'static>(
    worker: Arc<EmsWorker<V, C>>,
    parent_uuid: String,
    instrument_id: InstrumentId,
    side: OrderSide,
    total_amount: Decimal,
    duration_secs: u64,
    wait_secs: u64,
    cancel: CancellationToken,
) {
    let Some(market) = worker.markets.get(&instrument_id.symbol).map(|m| m.clone()) else {
        error!(parent_uuid, symbol = %instrument_id.symbol, "twap: no market registered for symbol, failing parent");
        set_algo_status(&worker, &parent_uuid, AlgoOrderStatus::Failed).await;
        worker.twap_tasks.remove(&parent_uuid);
        return;
    };
    let min_order_amount = worker.min_order_amount(&market);
    let (mut slices, wait_secs) =
        calculate_twap_slices(total_amount, duration_secs, wait_secs, min_order_amount, &market);

    info!(
        parent_uuid,
        symbol = %instrument_id.symbol,
        slice_count = slices.len(),
        wait_secs,
        "starting twap run"
    );

    set_algo_status(&worker, &parent_uuid, AlgoOrderStatus::Running).await;

    if slices.is_empty() {
        set_algo_status(&worker, &parent_uuid, AlgoOrderStatus::Finished).await;
        worker.twap_tasks.remove(&parent_uuid);
        return;
    }

    let watch_interval = Duration::from_millis(worker.config.twap_watch_interval_ms);
    let mut failed = false;

    'place: while let Some(slice_amount) = slices.pop_front() {
        if cancel.is_cancelled() {
            break 'place;
        }
        let is_last_slice = slices.is_empty();
        let (order_type, price) = if is_last_slice {
            (OrderType::Market, None)
        } else {
            (OrderType::Limit, limit_price_for(&worker, &instrument_id, side))
        };

        let mut child_uuid = Uuid::new_v4();
        worker.submit(OrderSubmit::Create {
            uuid: child_uuid,
            instrument_id: instrument_id.clone(),
            side,
            order_type,
            amount: slice_amount,
            price,
            time_in_force: TimeInForce::Gtc,
            position_side: None,
        });
        append_child(&worker, &parent_uuid, child_uuid).await;

        // Watch this child for the remainder of its slot, then (if it
        // hasn't closed) cancel it and keep watching until it does.
        loop {
            match watch_until(&worker, &instrument_id, child_uuid, watch_interval, wait_secs, &cancel).await {
                WatchOutcome::Canceled => break 'place,
                WatchOutcome::NeverObserved => {
                    warn!(%child_uuid, "twap child never reached the cache before its slot elapsed");
                    break;
                }
                WatchOutcome::Closed(order) if order.status == OrderStatus::Failed => {
                    error!(%child_uuid, parent_uuid, "twap child submission failed, failing parent");
                    failed = true;
                    break 'place;
                }
                WatchOutcome::Closed(order) => {
                    let remaining = order.remaining;
                    if remaining > min_order_amount {
                        child_uuid = Uuid::new_v4();
                        worker.submit(OrderSubmit::Create {
                            uuid: child_uuid,
                            instrument_id: instrument_id.clone(),
                            side,
                            order_type: OrderType::Market,
                            amount: remaining,
                            price: None,
                            time_in_force: TimeInForce::Gtc,
                            position_side: None,
                        });
                        append_child(&worker, &parent_uuid, child_uuid).await;
                        // Watch the reclaim market order to closure before
                        // moving on to the next scheduled slice.
                        continue;
                    }
                    if !remaining.is_zero() {
                        if let Some(last) = slices.back_mut() {
                            *last += remaining;
                        }
                    }
                    break;
                }
            }
        }
    }

    let final_status = if failed {
        AlgoOrderStatus::Failed
    } else if cancel.is_cancelled() {
        set_algo_status(&worker, &parent_uuid, AlgoOrderStatus::Canceling).await;
        cancel_all_open_orders(&worker, &instrument_id).await;
        AlgoOrderStatus::Canceled
    } else {
        AlgoOrderStatus::Finished
    };

    set_algo_status(&worker, &parent_uuid, final_status).await;
    worker.twap_tasks.remove(&parent_uuid);
    info!(parent_uuid, ?final_status, "twap run finished");
}

/// Poll the cache for `child_uuid` every `watch_interval` until it closes,
/// an external cancel arrives, or `timeout_secs` elapses with the child
/// still open (in which case it's canceled so the next poll observes its
/// closure), mirroring the watch-phase rules in spec §4.6.
async fn watch_until<V: VenueRouting + 'static, C: crate::connector::PrivateConnector + 'static>(
    worker: &Arc<EmsWorker<V, C>>,
    instrument_id: &InstrumentId,
    child_uuid: Uuid,
    watch_interval: Duration,
    timeout_secs: u64,
    cancel: &CancellationToken,
) -> WatchOutcome {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(timeout_secs);
    let mut cancel_requested = false;
    loop {
        if cancel.is_cancelled() {
            return WatchOutcome::Canceled;
        }
        let past_deadline = tokio::time::Instant::now() >= deadline;
        match worker.store.get_order(child_uuid).await.ok().flatten() {
            Some(order) if order.is_closed() => return WatchOutcome::Closed(order),
            Some(order)
                if order.is_opened()
                    && !order.on_flight()
                    && !cancel_requested
                    && past_deadline =>
            {
                warn!(%child_uuid, "twap slice unfilled, canceling");
                worker.submit(OrderSubmit::Cancel {
                    instrument_id: instrument_id.clone(),
                    uuid_target: child_uuid,
                });
                cancel_requested = true;
            }
            _ => {}
        }
        if past_deadline && !cancel_requested {
            return WatchOutcome::NeverObserved;
        }
        tokio::select! {
            () = cancel.cancelled() => return WatchOutcome::Canceled,
            () = tokio::time::sleep(watch_interval) => {}
        }
    }
}

fn limit_price_for<V: VenueRouting, C: crate::connector::PrivateConnector>(
    worker: &EmsWorker<V, C>,
    instrument_id: &InstrumentId,
    side: OrderSide,
) -> Option<Decimal> {
    let market = worker.markets.get(&instrument_id.symbol)?;
    let touch = worker.store.bookl1(&instrument_id.symbol)?;
    Some(precision::limit_price_one_tick_inside(
        &market, side, touch.bid, touch.ask,
    ))
}

async fn append_child<V: VenueRouting + 'static, C: crate::connector::PrivateConnector + 'static>(
    worker: &Arc<EmsWorker<V, C>>,
    parent_uuid: &str,
    child_uuid: Uuid,
) {
    if let Some(mut algo) = worker.store.get_algo_order(parent_uuid).await.ok().flatten() {
        algo.orders.push(child_uuid);
        worker.store.algo_order_update(&algo);
    }
}

async fn set_algo_status<V: VenueRouting + 'static, C: crate::connector::PrivateConnector + 'static>(
    worker: &Arc<EmsWorker<V, C>>,
    parent_uuid: &str,
    status: AlgoOrderStatus,
) {
    if let Some(mut algo) = worker.store.get_algo_order(parent_uuid).await.ok().flatten() {
        algo.status = status;
        worker.store.algo_order_update(&algo);
    }
}

async fn cancel_all_open_orders<V: VenueRouting, C: crate::connector::PrivateConnector>(
    worker: &EmsWorker<V, C>,
    instrument_id: &InstrumentId,
) {
    let open = worker.store.open_orders_for_symbol(&instrument_id.symbol);
    for uuid_target in open {
        worker.submit(OrderSubmit::Cancel {
            instrument_id: instrument_id.clone(),
            uuid_target,
        });
    }
}

/// A fresh [`AlgoOrder`], constructed `RUNNING` per spec §4.6 ("the parent
/// record is initialized with status RUNNING"), ready to hand to the cache
/// before the TWAP task starts placing slices. `uuid` is the caller's own
/// `ALGO-`-prefixed identity (from [`OrderSubmit::Twap`]'s `uuid` field, or
/// minted fresh by [`AlgoOrder::new_uuid`] by whoever builds the submit) —
/// it is not re-minted here, since every later lookup in this module keys
/// off that same string as `parent_uuid`.
#[must_use]
pub fn new_algo_order(
    uuid: String,
    exchange: ExchangeId,
    instrument_id: &InstrumentId,
    side: OrderSide,
    amount: Decimal,
    duration_secs: u64,
    wait_secs: u64,
    timestamp: i64,
) -> AlgoOrder {
    AlgoOrder {
        uuid,
        symbol: instrument_id.symbol.clone(),
        exchange,
        side,
        amount,
        duration: duration_secs,
        wait: wait_secs,
        status: AlgoOrderStatus::Running,
        orders: Vec::new(),
        timestamp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use services_common::{AmountLimits, Limits, MarketKind, Precision};

    fn market(amount_step: Decimal) -> Market {
        Market {
            symbol: "BTCUSDT".to_string(),
            kind: MarketKind::Spot,
            precision: Precision {
                amount: amount_step,
                price: dec!(0.01),
            },
            limits: Limits {
                amount: AmountLimits { min: dec!(0.001), max: None },
            },
        }
    }

    #[test]
    fn zero_amount_yields_no_slices() {
        let (slices, wait) = calculate_twap_slices(dec!(0), 30, 10, dec!(0.001), &market(dec!(0.0001)));
        assert!(slices.is_empty());
        assert_eq!(wait, 0);
    }

    #[test]
    fn below_minimum_yields_a_single_minimum_slice_with_no_wait() {
        let (slices, wait) =
            calculate_twap_slices(dec!(0.0001), 30, 10, dec!(0.001), &market(dec!(0.0001)));
        assert_eq!(slices, VecDeque::from([dec!(0.001)]));
        assert_eq!(wait, 0);
    }

    #[test]
    fn three_even_slices_sum_to_the_total() {
        let (slices, wait) =
            calculate_twap_slices(dec!(0.03), 30, 10, dec!(0.001), &market(dec!(0.0001)));
        let total: Decimal = slices.iter().copied().sum();
        assert_eq!(total, dec!(0.03));
        assert_eq!(slices.len(), 3);
        assert_eq!(wait, 10);
    }

    #[test]
    fn small_remainder_folds_into_the_last_slice() {
        let (slices, _wait) =
            calculate_twap_slices(dec!(10.0003), 30, 10, dec!(0.001), &market(dec!(0.0001)));
        let total: Decimal = slices.iter().copied().sum();
        assert_eq!(total, dec!(10.0003));
        assert_eq!(slices.len(), 3);
    }

    // --- end-to-end run() -------------------------------------------------
    //
    // `MockConnector`'s create response only ever lands an order on
    // `Pending` (per `ems::handle_create`'s post-submit normalization) and
    // nothing here advances it further, so a placed slice never reaches
    // `is_opened() && !on_flight()` and `watch_until`'s stuck-order branch
    // never fires. Each slice's watch window simply elapses and `run` moves
    // on having observed it as `NeverObserved`; this still exercises the
    // full place/watch loop and the parent's terminal status.

    use crate::connector::mock::MockConnector;
    use crate::ems::EmsWorker;
    use crate::routing::BybitRouting;
    use cache::{Cache, CacheConfig, InMemoryKv};
    use registry::OrderRegistry;
    use services_common::{
        AccountType, EventBus, EventBusConfig, InstrumentId, OrderSide, StrategyIdentity,
        SystemClock,
    };

    async fn test_worker() -> Arc<EmsWorker<BybitRouting, MockConnector>> {
        let bus = Arc::new(EventBus::new(EventBusConfig::default()));
        let cache = Cache::new(
            StrategyIdentity::default(),
            Arc::new(InMemoryKv::new()),
            Arc::new(SystemClock),
            CacheConfig::default(),
            bus.clone(),
        )
        .await;
        let store: Arc<dyn cache::OrderStore> = cache;
        EmsWorker::build(
            ExchangeId::Bybit,
            BybitRouting,
            Arc::new(MockConnector::default()),
            &[AccountType::BybitUnified],
            vec![market(dec!(0.0001))],
            store,
            Arc::new(OrderRegistry::new()),
            bus,
            Arc::new(SystemClock),
            crate::config::EmsConfig {
                twap_watch_interval_ms: 20,
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn twap_run_finishes_even_when_slices_are_never_observed_closed() {
        let worker = test_worker().await;
        let instrument_id = InstrumentId::new(ExchangeId::Bybit, "BTCUSDT", MarketKind::Spot);
        let parent_uuid = AlgoOrder::new_uuid();
        let algo = new_algo_order(
            parent_uuid.clone(),
            ExchangeId::Bybit,
            &instrument_id,
            OrderSide::Buy,
            dec!(0.002),
            0,
            0,
            0,
        );
        worker.store.algo_order_update(&algo);

        run(
            worker.clone(),
            parent_uuid.clone(),
            instrument_id,
            OrderSide::Buy,
            dec!(0.002),
            0,
            0,
            CancellationToken::new(),
        )
        .await;

        let finished = worker.store.get_algo_order(&parent_uuid).await.unwrap().unwrap();
        assert_eq!(finished.status, AlgoOrderStatus::Finished);
        assert_eq!(finished.uuid, parent_uuid);
    }

    #[tokio::test]
    async fn watch_until_does_not_cancel_a_stuck_order_before_its_window_elapses() {
        let worker = test_worker().await;
        let instrument_id = InstrumentId::new(ExchangeId::Bybit, "BTCUSDT", MarketKind::Spot);
        let uuid = Uuid::new_v4();

        worker.submit(OrderSubmit::Create {
            uuid,
            instrument_id: instrument_id.clone(),
            side: OrderSide::Buy,
            order_type: OrderType::Limit,
            amount: dec!(0.001),
            price: Some(dec!(65000)),
            time_in_force: TimeInForce::Gtc,
            position_side: None,
        });

        // Give the create a beat to land, then simulate a late venue ack
        // that leaves the order open but no longer on-flight -- exactly the
        // state `watch_until`'s stuck-order branch looks for.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let mut accepted = worker.store.get_order(uuid).await.unwrap().unwrap();
        accepted.status = OrderStatus::Accepted;
        worker.store.order_status_update(&accepted);

        let cancel = CancellationToken::new();
        let outcome = tokio::time::timeout(
            Duration::from_millis(150),
            watch_until(&worker, &instrument_id, uuid, Duration::from_millis(20), 1, &cancel),
        )
        .await;
        assert!(
            outcome.is_err(),
            "a stuck order must not be canceled before its full watch window elapses"
        );
    }
}
