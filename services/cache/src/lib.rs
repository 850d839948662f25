//! In-memory order/position store with write-through to an external KV
//! store and TTL eviction.
//!
//! Grounded on `tradebot/core/cache.py`'s `AsyncCache` for exact semantics
//! (write-through schedule, status-transition gate, idempotent position
//! application, memory-then-KV read path, market-data snapshot caches) and
//! `services/data-aggregator/src/storage/mod.rs`'s `RedisStorage` for the
//! Rust `redis`-crate idiom. See `DESIGN.md` for why this crate uses `redis`
//! rather than the teacher's own `oms` (which persists to Postgres via
//! `sqlx`) — the spec's key layout is a hash/set KV shape `sqlx` doesn't fit.

pub mod config;
pub mod error;
pub mod keys;
pub mod kv;

pub use config::CacheConfig;
pub use error::CacheError;
pub use kv::{InMemoryKv, KvStore, RedisKv};

use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use services_common::{
    affects_position, is_valid_transition, AlgoOrder, BusMessage, Clock,
    EmcMessage, EventBus, ExchangeId, FuturePosition, Order, OrderStatus, PositionSide,
    SpotPosition, StrategyIdentity,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};
use uuid::Uuid;

/// Latest best-bid/ask snapshot for a symbol. No history is retained.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BookTop {
    /// Best bid price
    pub bid: Decimal,
    /// Best ask price
    pub ask: Decimal,
    /// Event timestamp, milliseconds since epoch
    pub timestamp: i64,
}

/// Latest last-trade snapshot for a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradeSnapshot {
    /// Trade price
    pub price: Decimal,
    /// Trade quantity
    pub amount: Decimal,
    /// Event timestamp, milliseconds since epoch
    pub timestamp: i64,
}

/// Latest kline/candle snapshot for a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KlineSnapshot {
    /// Close price
    pub close: Decimal,
    /// Candle open timestamp, milliseconds since epoch
    pub timestamp: i64,
}

/// The two-tier order/position/market-data store described in spec §4.2.
pub struct Cache<K: KvStore> {
    identity: StrategyIdentity,
    kv: Arc<K>,
    clock: Arc<dyn Clock>,
    config: CacheConfig,

    orders: DashMap<Uuid, Order>,
    algo_orders: DashMap<String, AlgoOrder>,
    closed_orders: DashMap<Uuid, ()>,

    open_orders: DashMap<ExchangeId, HashSet<Uuid>>,
    symbol_orders: DashMap<String, HashSet<Uuid>>,
    symbol_open_orders: DashMap<String, HashSet<Uuid>>,

    spot_positions: DashMap<String, SpotPosition>,
    future_positions: DashMap<(String, PositionSide), FuturePosition>,

    bookl1: DashMap<String, BookTop>,
    trades: DashMap<String, TradeSnapshot>,
    klines: DashMap<String, KlineSnapshot>,

    shutdown: AtomicBool,
}

impl<K: KvStore + 'static> Cache<K> {
    /// Construct the cache and subscribe it to the `bookl1`/`trade`/`kline`
    /// topics on `bus`, mirroring `AsyncCache.__init__`'s three
    /// `msgbus.subscribe` calls. Does not start the write-through task; call
    /// [`Cache::start`] for that once the cache is wrapped in an `Arc`.
    pub async fn new(
        identity: StrategyIdentity,
        kv: Arc<K>,
        clock: Arc<dyn Clock>,
        config: CacheConfig,
        bus: Arc<EventBus<EmcMessage>>,
    ) -> Arc<Self> {
        let cache = Arc::new(Self {
            identity,
            kv,
            clock,
            config,
            orders: DashMap::new(),
            algo_orders: DashMap::new(),
            closed_orders: DashMap::new(),
            open_orders: DashMap::new(),
            symbol_orders: DashMap::new(),
            symbol_open_orders: DashMap::new(),
            spot_positions: DashMap::new(),
            future_positions: DashMap::new(),
            bookl1: DashMap::new(),
            trades: DashMap::new(),
            klines: DashMap::new(),
            shutdown: AtomicBool::new(false),
        });

        cache.clone().spawn_market_data_subscription(bus).await;
        cache
    }

    async fn spawn_market_data_subscription(self: Arc<Self>, bus: Arc<EventBus<EmcMessage>>) {
        for topic in ["bookl1", "trade", "kline"] {
            let mut rx = match bus.subscribe(topic).await {
                Ok(rx) => rx,
                Err(err) => {
                    error!(topic, %err, "cache failed to subscribe to market data topic");
                    continue;
                }
            };
            let cache = Arc::clone(&self);
            tokio::spawn(async move {
                while let Ok(envelope) = rx.recv().await {
                    cache.handle_market_data(envelope.message);
                }
            });
        }
    }

    fn handle_market_data(&self, message: EmcMessage) {
        match message {
            EmcMessage::BookL1 {
                symbol,
                bid,
                ask,
                timestamp,
            } => {
                self.bookl1.insert(symbol, BookTop { bid, ask, timestamp });
            }
            EmcMessage::Trade {
                symbol,
                price,
                amount,
                timestamp,
            } => {
                self.trades
                    .insert(symbol, TradeSnapshot { price, amount, timestamp });
            }
            EmcMessage::Kline {
                symbol,
                close,
                timestamp,
            } => {
                self.klines.insert(symbol, KlineSnapshot { close, timestamp });
            }
            EmcMessage::OrderEvent { .. } | EmcMessage::LifecycleEvent { .. } => {}
        }
    }

    /// Start the background write-through/TTL-eviction task. Cheap to call
    /// once; spawns one `tokio` task for the lifetime of the cache.
    pub fn start(self: &Arc<Self>) {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            while !cache.shutdown.load(Ordering::Acquire) {
                if let Err(err) = cache.sync_to_kv().await {
                    error!(%err, "cache sync to kv failed");
                }
                cache.cleanup_expired();
                tokio::time::sleep(Duration::from_secs(cache.config.sync_interval_secs)).await;
            }
        });
    }

    /// Signal the background task to stop and perform one final sync.
    pub async fn close(&self) -> Result<(), CacheError> {
        self.shutdown.store(true, Ordering::Release);
        self.sync_to_kv().await
    }

    // ---- private data: orders -------------------------------------------

    fn check_status_transition(&self, order: &Order) -> bool {
        let Some(previous) = self.orders.get(&order.uuid) else {
            return true;
        };
        if !is_valid_transition(previous.status, order.status) {
            error!(
                uuid = %order.uuid,
                venue_id = ?order.id,
                from = ?previous.status,
                to = ?order.status,
                "invalid status transition, dropping update"
            );
            return false;
        }
        true
    }

    /// Record a freshly constructed order (status `Initialized`/`Pending`).
    /// Indexes it into `open_orders`/`symbol_orders`/`symbol_open_orders`.
    pub fn order_initialized(&self, order: &Order) {
        if !self.check_status_transition(order) {
            return;
        }
        self.orders.insert(order.uuid, order.clone());
        self.open_orders
            .entry(order.exchange)
            .or_default()
            .insert(order.uuid);
        self.symbol_orders
            .entry(order.symbol.clone())
            .or_default()
            .insert(order.uuid);
        self.symbol_open_orders
            .entry(order.symbol.clone())
            .or_default()
            .insert(order.uuid);
    }

    /// Apply a status update to a previously-initialized order. Illegal
    /// transitions are dropped per §4.3. Closes out the open-order indices
    /// once the order reaches a terminal status, and applies the fill to
    /// the relevant position.
    pub fn order_status_update(&self, order: &Order) {
        if !self.check_status_transition(order) {
            return;
        }
        self.orders.insert(order.uuid, order.clone());
        if order.is_closed() {
            if let Some(mut set) = self.open_orders.get_mut(&order.exchange) {
                set.remove(&order.uuid);
            }
            if let Some(mut set) = self.symbol_open_orders.get_mut(&order.symbol) {
                set.remove(&order.uuid);
            }
        }
        self.apply_position(order);
    }

    fn apply_position(&self, order: &Order) {
        if self.closed_orders.contains_key(&order.uuid) {
            debug!(uuid = %order.uuid, "order already closed, skipping position update");
            return;
        }
        if matches!(order.status, OrderStatus::Filled | OrderStatus::Canceled) {
            self.closed_orders.insert(order.uuid, ());
        }
        if !affects_position(order.status) {
            return;
        }
        match order.position_side {
            None => {
                let mut position = self
                    .spot_positions
                    .entry(order.symbol.clone())
                    .or_insert_with(|| SpotPosition::flat(order.symbol.clone(), order.exchange));
                position.apply(order);
            }
            Some(side) => {
                let mut position = self
                    .future_positions
                    .entry((order.symbol.clone(), side))
                    .or_insert_with(|| {
                        FuturePosition::flat(order.symbol.clone(), order.exchange, side)
                    });
                position.apply(order);
            }
        }
    }

    /// Record or update an algo (TWAP) parent order. Algo orders bypass the
    /// status-transition gate — their status vocabulary is independent of
    /// `OrderStatus` and is only ever driven by the TWAP engine itself.
    pub fn algo_order_update(&self, algo: &AlgoOrder) {
        self.algo_orders.insert(algo.uuid.clone(), algo.clone());
    }

    /// Read an order, memory first, then the external KV store
    /// (re-caching on hit).
    pub async fn get_order(&self, uuid: Uuid) -> Result<Option<Order>, CacheError> {
        if let Some(order) = self.orders.get(&uuid) {
            return Ok(Some(order.clone()));
        }
        let key = keys::orders(&self.identity);
        let Some(raw) = self.kv.hget(&key, &uuid.to_string()).await? else {
            return Ok(None);
        };
        let order: Order = serde_json::from_str(&raw).map_err(|source| CacheError::Decode {
            kind: "order",
            key,
            source,
        })?;
        self.orders.insert(uuid, order.clone());
        Ok(Some(order))
    }

    /// Read an algo order, memory first, then the external KV store.
    pub async fn get_algo_order(&self, uuid: &str) -> Result<Option<AlgoOrder>, CacheError> {
        if let Some(algo) = self.algo_orders.get(uuid) {
            return Ok(Some(algo.clone()));
        }
        let key = keys::algo_orders(&self.identity);
        let Some(raw) = self.kv.hget(&key, uuid).await? else {
            return Ok(None);
        };
        let algo: AlgoOrder = serde_json::from_str(&raw).map_err(|source| CacheError::Decode {
            kind: "algo_order",
            key,
            source,
        })?;
        self.algo_orders.insert(uuid.to_string(), algo.clone());
        Ok(Some(algo))
    }

    /// In-memory open-order uuids for `symbol`.
    #[must_use]
    pub fn open_orders_for_symbol(&self, symbol: &str) -> HashSet<Uuid> {
        self.symbol_open_orders
            .get(symbol)
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    /// In-memory open-order uuids for `exchange`.
    #[must_use]
    pub fn open_orders_for_exchange(&self, exchange: ExchangeId) -> HashSet<Uuid> {
        self.open_orders
            .get(&exchange)
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    /// Every order uuid ever seen for `symbol`, in memory.
    #[must_use]
    pub fn symbol_orders(&self, symbol: &str) -> HashSet<Uuid> {
        self.symbol_orders
            .get(symbol)
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    /// The spot position for `symbol`, memory first then KV.
    pub async fn get_spot_position(
        &self,
        symbol: &str,
        exchange: ExchangeId,
    ) -> Result<Option<SpotPosition>, CacheError> {
        if let Some(position) = self.spot_positions.get(symbol) {
            return Ok(Some(position.clone()));
        }
        let key = keys::symbol_position(&self.identity, exchange, symbol);
        let Some(raw) = self.kv.get(&key).await? else {
            return Ok(None);
        };
        let position: SpotPosition =
            serde_json::from_str(&raw).map_err(|source| CacheError::Decode {
                kind: "position",
                key,
                source,
            })?;
        self.spot_positions.insert(symbol.to_string(), position.clone());
        Ok(Some(position))
    }

    /// The `side` future position for `symbol`, memory first then KV.
    pub async fn get_future_position(
        &self,
        symbol: &str,
        exchange: ExchangeId,
        side: PositionSide,
    ) -> Result<Option<FuturePosition>, CacheError> {
        if let Some(position) = self.future_positions.get(&(symbol.to_string(), side)) {
            return Ok(Some(position.clone()));
        }
        let key = keys::symbol_position(&self.identity, exchange, symbol);
        let Some(raw) = self.kv.get(&key).await? else {
            return Ok(None);
        };
        let position: FuturePosition =
            serde_json::from_str(&raw).map_err(|source| CacheError::Decode {
                kind: "position",
                key,
                source,
            })?;
        self.future_positions
            .insert((symbol.to_string(), side), position.clone());
        Ok(Some(position))
    }

    // ---- public data: market snapshots -----------------------------------

    /// Latest top-of-book snapshot for `symbol`, if any has arrived.
    #[must_use]
    pub fn bookl1(&self, symbol: &str) -> Option<BookTop> {
        self.bookl1.get(symbol).map(|v| *v)
    }

    /// Latest trade snapshot for `symbol`, if any has arrived.
    #[must_use]
    pub fn trade(&self, symbol: &str) -> Option<TradeSnapshot> {
        self.trades.get(symbol).map(|v| *v)
    }

    /// Latest kline snapshot for `symbol`, if any has arrived.
    #[must_use]
    pub fn kline(&self, symbol: &str) -> Option<KlineSnapshot> {
        self.klines.get(symbol).map(|v| *v)
    }

    // ---- write-through / TTL eviction -------------------------------------

    /// Serialize every dirty in-memory entry and write it to the KV store.
    /// Open-order sets are fully rewritten (delete-then-sadd); orders and
    /// positions are per-key upserts, per spec §6.
    pub async fn sync_to_kv(&self) -> Result<(), CacheError> {
        debug!("syncing cache to kv store");
        let orders_key = keys::orders(&self.identity);
        for entry in self.orders.iter() {
            let json = serde_json::to_string(entry.value()).map_err(|source| {
                CacheError::Decode {
                    kind: "order",
                    key: orders_key.clone(),
                    source,
                }
            })?;
            self.kv.hset(&orders_key, &entry.key().to_string(), json).await?;
        }

        let algo_orders_key = keys::algo_orders(&self.identity);
        for entry in self.algo_orders.iter() {
            let json = serde_json::to_string(entry.value()).map_err(|source| {
                CacheError::Decode {
                    kind: "algo_order",
                    key: algo_orders_key.clone(),
                    source,
                }
            })?;
            self.kv.hset(&algo_orders_key, entry.key(), json).await?;
        }

        for entry in self.open_orders.iter() {
            let key = keys::open_orders(&self.identity, *entry.key());
            self.kv.delete(&key).await?;
            let members = entry.value().iter().map(ToString::to_string).collect();
            self.kv.sadd(&key, members).await?;
        }

        for entry in self.symbol_orders.iter() {
            let symbol = entry.key();
            let exchange = self.exchange_for_symbol(symbol);
            let key = keys::symbol_orders(&self.identity, exchange, symbol);
            self.kv.delete(&key).await?;
            let members = entry.value().iter().map(ToString::to_string).collect();
            self.kv.sadd(&key, members).await?;
        }

        for entry in self.symbol_open_orders.iter() {
            let symbol = entry.key();
            let exchange = self.exchange_for_symbol(symbol);
            let key = keys::symbol_open_orders(&self.identity, exchange, symbol);
            self.kv.delete(&key).await?;
            let members = entry.value().iter().map(ToString::to_string).collect();
            self.kv.sadd(&key, members).await?;
        }

        for entry in self.spot_positions.iter() {
            let key = keys::symbol_position(&self.identity, entry.value().exchange, entry.key());
            let json = serde_json::to_string(entry.value()).map_err(|source| {
                CacheError::Decode {
                    kind: "position",
                    key: key.clone(),
                    source,
                }
            })?;
            self.kv.set(&key, json).await?;
        }

        for entry in self.future_positions.iter() {
            let (symbol, _side) = entry.key();
            let key = keys::symbol_position(&self.identity, entry.value().exchange, symbol);
            let json = serde_json::to_string(entry.value()).map_err(|source| {
                CacheError::Decode {
                    kind: "position",
                    key: key.clone(),
                    source,
                }
            })?;
            self.kv.set(&key, json).await?;
        }

        Ok(())
    }

    /// Rebuild the in-memory order/algo-order indices from the external KV
    /// store's `orders`/`algo_orders` hashes, for use at process startup
    /// after a restart. Positions are left to lazily rehydrate through
    /// [`Cache::get_spot_position`]/[`Cache::get_future_position`], which
    /// already read through to the KV store on a memory miss; there is no
    /// KV-enumerable set of symbols to eagerly reload them from. Returns the
    /// reloaded orders so the caller can rebuild a venue-id registry from
    /// them.
    pub async fn reload_from_kv(&self) -> Result<Vec<Order>, CacheError> {
        let orders_key = keys::orders(&self.identity);
        let raw_orders = self.kv.hgetall(&orders_key).await?;
        let mut orders = Vec::with_capacity(raw_orders.len());
        for (_uuid_str, json) in raw_orders {
            let order: Order = serde_json::from_str(&json).map_err(|source| CacheError::Decode {
                kind: "order",
                key: orders_key.clone(),
                source,
            })?;
            self.orders.insert(order.uuid, order.clone());
            self.open_orders
                .entry(order.exchange)
                .or_default()
                .insert(order.uuid);
            self.symbol_orders
                .entry(order.symbol.clone())
                .or_default()
                .insert(order.uuid);
            if order.is_opened() {
                self.symbol_open_orders
                    .entry(order.symbol.clone())
                    .or_default()
                    .insert(order.uuid);
            }
            if matches!(order.status, OrderStatus::Filled | OrderStatus::Canceled) {
                self.closed_orders.insert(order.uuid, ());
            }
            orders.push(order);
        }

        let algo_orders_key = keys::algo_orders(&self.identity);
        let raw_algo_orders = self.kv.hgetall(&algo_orders_key).await?;
        for (uuid, json) in raw_algo_orders {
            let algo: AlgoOrder = serde_json::from_str(&json).map_err(|source| CacheError::Decode {
                kind: "algo_order",
                key: algo_orders_key.clone(),
                source,
            })?;
            self.algo_orders.insert(uuid, algo);
        }

        debug!(
            orders = orders.len(),
            algo_orders = self.algo_orders.len(),
            "reloaded cache from kv store"
        );
        Ok(orders)
    }

    /// Best-effort exchange lookup for a symbol already indexed in
    /// `orders`, used only to build KV keys during sync (the spec's key
    /// layout is per-exchange/per-symbol, but the in-memory indices here
    /// are symbol-keyed only; this recovers the exchange from any order on
    /// file for the symbol).
    fn exchange_for_symbol(&self, symbol: &str) -> ExchangeId {
        self.symbol_orders
            .get(symbol)
            .and_then(|uuids| uuids.iter().next().copied())
            .and_then(|uuid| self.orders.get(&uuid).map(|o| o.exchange))
            .unwrap_or(ExchangeId::Bybit)
    }

    /// Evict closed orders/algo orders whose `timestamp` is older than
    /// `now - expire_time` from memory (the external store keeps them).
    pub fn cleanup_expired(&self) {
        let now = self.clock.now_ms();
        let expire_before = now - (self.config.expire_time_secs as i64) * 1000;

        let expired: Vec<Uuid> = self
            .orders
            .iter()
            .filter(|e| e.value().is_closed() && e.value().timestamp < expire_before)
            .map(|e| *e.key())
            .collect();
        for uuid in expired {
            self.orders.remove(&uuid);
            self.closed_orders.remove(&uuid);
            debug!(%uuid, "evicted expired order from memory");
            for mut set in self.symbol_orders.iter_mut() {
                set.remove(&uuid);
            }
        }

        let expired_algo: Vec<String> = self
            .algo_orders
            .iter()
            .filter(|e| e.value().status.is_terminal() && e.value().timestamp < expire_before)
            .map(|e| e.key().clone())
            .collect();
        for uuid in expired_algo {
            self.algo_orders.remove(&uuid);
            debug!(uuid, "evicted expired algo order from memory");
        }
    }
}

/// Object-safe facade over [`Cache`]'s order-facing operations, so crates
/// downstream (namely `execution-router`'s [`EmsWorker`](../execution_router/ems/struct.EmsWorker.html))
/// can hold a `Arc<dyn OrderStore>` instead of threading the `K: KvStore`
/// type parameter through their own generics.
#[async_trait::async_trait]
pub trait OrderStore: Send + Sync {
    /// See [`Cache::order_initialized`].
    fn order_initialized(&self, order: &Order);
    /// See [`Cache::order_status_update`].
    fn order_status_update(&self, order: &Order);
    /// See [`Cache::algo_order_update`].
    fn algo_order_update(&self, algo: &AlgoOrder);
    /// See [`Cache::get_order`].
    async fn get_order(&self, uuid: Uuid) -> Result<Option<Order>, CacheError>;
    /// See [`Cache::get_algo_order`].
    async fn get_algo_order(&self, uuid: &str) -> Result<Option<AlgoOrder>, CacheError>;
    /// See [`Cache::open_orders_for_symbol`].
    fn open_orders_for_symbol(&self, symbol: &str) -> HashSet<Uuid>;
    /// See [`Cache::bookl1`].
    fn bookl1(&self, symbol: &str) -> Option<BookTop>;
}

#[async_trait::async_trait]
impl<K: KvStore + 'static> OrderStore for Cache<K> {
    fn order_initialized(&self, order: &Order) {
        Cache::order_initialized(self, order);
    }

    fn order_status_update(&self, order: &Order) {
        Cache::order_status_update(self, order);
    }

    fn algo_order_update(&self, algo: &AlgoOrder) {
        Cache::algo_order_update(self, algo);
    }

    async fn get_order(&self, uuid: Uuid) -> Result<Option<Order>, CacheError> {
        Cache::get_order(self, uuid).await
    }

    async fn get_algo_order(&self, uuid: &str) -> Result<Option<AlgoOrder>, CacheError> {
        Cache::get_algo_order(self, uuid).await
    }

    fn open_orders_for_symbol(&self, symbol: &str) -> HashSet<Uuid> {
        Cache::open_orders_for_symbol(self, symbol)
    }

    fn bookl1(&self, symbol: &str) -> Option<BookTop> {
        Cache::bookl1(self, symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use services_common::{OrderSide, OrderType, TestClock, TimeInForce};

    fn order(uuid: Uuid, status: OrderStatus, filled: Decimal, timestamp: i64) -> Order {
        Order {
            uuid,
            id: Some("V1".to_string()),
            parent_uuid: None,
            symbol: "BTCUSDT".to_string(),
            exchange: ExchangeId::Bybit,
            side: OrderSide::Buy,
            order_type: OrderType::Limit,
            amount: dec!(1),
            price: Some(dec!(65000)),
            filled,
            remaining: dec!(1) - filled,
            status,
            position_side: None,
            time_in_force: TimeInForce::Gtc,
            success: true,
            timestamp,
        }
    }

    async fn test_cache() -> Arc<Cache<InMemoryKv>> {
        let bus = Arc::new(EventBus::new(Default::default()));
        Cache::new(
            StrategyIdentity::default(),
            Arc::new(InMemoryKv::new()),
            TestClock::new(0),
            CacheConfig::default(),
            bus,
        )
        .await
    }

    #[tokio::test]
    async fn initialize_then_fill_updates_open_sets_and_position() {
        let cache = test_cache().await;
        let uuid = Uuid::new_v4();
        cache.order_initialized(&order(uuid, OrderStatus::Pending, dec!(0), 0));

        assert!(cache.open_orders_for_symbol("BTCUSDT").contains(&uuid));
        assert!(cache.open_orders_for_exchange(ExchangeId::Bybit).contains(&uuid));

        cache.order_status_update(&order(uuid, OrderStatus::Filled, dec!(1), 0));

        assert!(!cache.open_orders_for_symbol("BTCUSDT").contains(&uuid));
        let position = cache.get_spot_position("BTCUSDT", ExchangeId::Bybit).await.unwrap();
        assert_eq!(position.unwrap().amount, dec!(1));
    }

    #[tokio::test]
    async fn illegal_transition_is_dropped() {
        let cache = test_cache().await;
        let uuid = Uuid::new_v4();
        cache.order_initialized(&order(uuid, OrderStatus::Filled, dec!(1), 0));
        // Filled -> Accepted is never legal.
        cache.order_status_update(&order(uuid, OrderStatus::Accepted, dec!(1), 0));

        let stored = cache.get_order(uuid).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Filled);
    }

    #[tokio::test]
    async fn duplicate_terminal_status_does_not_double_apply_position() {
        let cache = test_cache().await;
        let uuid = Uuid::new_v4();
        cache.order_initialized(&order(uuid, OrderStatus::Pending, dec!(0), 0));
        cache.order_status_update(&order(uuid, OrderStatus::Filled, dec!(1), 0));
        cache.order_status_update(&order(uuid, OrderStatus::Filled, dec!(1), 0));

        let position = cache
            .get_spot_position("BTCUSDT", ExchangeId::Bybit)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(position.amount, dec!(1));
    }

    #[tokio::test]
    async fn round_trip_through_kv_is_exact() {
        let cache = test_cache().await;
        let uuid = Uuid::new_v4();
        cache.order_initialized(&order(uuid, OrderStatus::Pending, dec!(0), 0));
        cache.sync_to_kv().await.unwrap();
        cache.orders.remove(&uuid);

        let reloaded = cache.get_order(uuid).await.unwrap().unwrap();
        assert_eq!(reloaded, order(uuid, OrderStatus::Pending, dec!(0), 0));
    }

    #[tokio::test]
    async fn cleanup_expired_evicts_only_closed_orders_past_ttl() {
        let cache = test_cache().await;
        let open_uuid = Uuid::new_v4();
        let closed_uuid = Uuid::new_v4();
        cache.order_initialized(&order(open_uuid, OrderStatus::Pending, dec!(0), 0));
        cache.order_initialized(&order(closed_uuid, OrderStatus::Pending, dec!(0), 0));
        cache.order_status_update(&order(closed_uuid, OrderStatus::Filled, dec!(1), 0));

        // now_ms is 0 at construction; expire_time defaults to 3600s.
        let clock = TestClock::new(0);
        clock.advance(3_601_000);
        // cleanup_expired reads the cache's own clock, not this local one;
        // rebuild a cache with a clock we can advance to exercise TTL.
        let bus = Arc::new(EventBus::new(Default::default()));
        let cache = Cache::new(
            StrategyIdentity::default(),
            Arc::new(InMemoryKv::new()),
            clock.clone(),
            CacheConfig::default(),
            bus,
        )
        .await;
        cache.order_initialized(&order(open_uuid, OrderStatus::Pending, dec!(0), 0));
        cache.order_initialized(&order(closed_uuid, OrderStatus::Pending, dec!(0), 0));
        cache.order_status_update(&order(closed_uuid, OrderStatus::Filled, dec!(1), 0));

        cache.cleanup_expired();
        assert!(cache.get_order(open_uuid).await.unwrap().is_some());
        assert!(cache.get_order(closed_uuid).await.unwrap().is_none());
    }
}
