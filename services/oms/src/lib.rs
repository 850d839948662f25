//! Order management: audits the lifecycle events the execution layer
//! publishes, keeps an in-memory audit trail, and re-publishes a
//! cache-validated snapshot for strategy consumers — closing the loop
//! spec.md's data-flow diagram describes: `PrivateConnector -> EMS -> Cache
//! -> MessageBus -> OMS -> Strategy`.
//!
//! Grounded on `services/oms`'s `lifecycle.rs` (status-transition
//! validation; not re-implemented here since `cache`'s own transition table
//! already gates every write the EMS makes before this crate ever sees the
//! event), `audit.rs` (append-only audit trail, reworked as
//! [`audit::AuditLog`] since full durable audit storage is out of scope),
//! and `recovery.rs` (rebuilding in-memory indices from a durable store at
//! startup, reworked as [`Oms::recover`]).

#![warn(missing_docs)]

pub mod audit;
pub mod error;

pub use audit::{AuditEntry, AuditLog};
pub use error::OmsError;

use cache::{Cache, KvStore};
use registry::OrderRegistry;
use services_common::{EmcMessage, EventBus};
use std::sync::Arc;
use tracing::{debug, error, warn};
use uuid::Uuid;

/// Every topic the EMS publishes an [`EmcMessage::OrderEvent`] on, per
/// `EmcMessage::topic_for_status`. Subscribing to all of them, rather than
/// to a single merged "orders" topic, mirrors how `cache` subscribes to
/// each market-data topic individually.
const LIFECYCLE_TOPICS: &[&str] = &[
    "pending",
    "accepted",
    "partially_filled",
    "filled",
    "canceling",
    "canceled",
    "failed",
    "expired",
    "cancel_failed",
    "order_event",
];

/// Subscribes to the execution layer's order-event topics, audits every
/// event, and re-publishes a fuller, cache-consistent snapshot for
/// strategies. One instance serves the whole process; it is venue-agnostic.
pub struct Oms<K: KvStore> {
    cache: Arc<Cache<K>>,
    registry: Arc<OrderRegistry>,
    bus: Arc<EventBus<EmcMessage>>,
    audit: AuditLog,
}

impl<K: KvStore + 'static> Oms<K> {
    /// Build an OMS over `cache`/`registry`/`bus` and subscribe it to every
    /// lifecycle topic. `audit_capacity_per_order` bounds how many events
    /// [`audit::AuditLog`] retains per order. Every topic subscription is
    /// registered before this returns, mirroring [`cache::Cache::new`]'s own
    /// subscribe-before-return construction so a message published right
    /// after `build` returns is never missed.
    pub async fn build(
        cache: Arc<Cache<K>>,
        registry: Arc<OrderRegistry>,
        bus: Arc<EventBus<EmcMessage>>,
        audit_capacity_per_order: usize,
    ) -> Arc<Self> {
        let oms = Arc::new(Self {
            cache,
            registry,
            bus,
            audit: AuditLog::new(audit_capacity_per_order),
        });
        oms.clone().spawn_lifecycle_subscriptions().await;
        oms
    }

    async fn spawn_lifecycle_subscriptions(self: Arc<Self>) {
        for topic in LIFECYCLE_TOPICS {
            let mut rx = match self.bus.subscribe(topic).await {
                Ok(rx) => rx,
                Err(err) => {
                    error!(topic, %err, "oms failed to subscribe to lifecycle topic");
                    continue;
                }
            };
            let oms = Arc::clone(&self);
            tokio::spawn(async move {
                while let Ok(envelope) = rx.recv().await {
                    oms.handle_order_event(envelope.message).await;
                }
            });
        }
    }

    async fn handle_order_event(&self, message: EmcMessage) {
        let EmcMessage::OrderEvent {
            uuid,
            order_id,
            symbol,
            status,
            timestamp,
        } = message
        else {
            return;
        };

        let Ok(uuid) = Uuid::parse_str(&uuid) else {
            warn!(uuid, "oms received an order event with an unparseable uuid, dropping");
            return;
        };

        let order = match self.cache.get_order(uuid).await {
            Ok(Some(order)) => order,
            Ok(None) => {
                warn!(%uuid, status, "oms received an order event for an order absent from the cache");
                return;
            }
            Err(err) => {
                error!(%uuid, %err, "oms failed to read order back from cache");
                return;
            }
        };

        self.audit.record(
            uuid,
            AuditEntry {
                order_id: order_id.clone(),
                symbol: symbol.clone(),
                status: status.clone(),
                amount: order.amount,
                filled: order.filled,
                timestamp,
            },
        );

        let lifecycle = EmcMessage::LifecycleEvent {
            uuid: uuid.to_string(),
            order_id,
            symbol,
            status,
            amount: order.amount,
            filled: order.filled,
            remaining: order.remaining,
            timestamp,
        };
        if let Err(err) = self.bus.publish(lifecycle).await {
            debug!(%uuid, %err, "no subscribers for lifecycle event, continuing");
        }
    }

    /// Rebuild in-memory order/registry state from the durable KV store at
    /// startup. Calls [`Cache::reload_from_kv`] then
    /// [`OrderRegistry::rebuild_from`] with the orders it returns.
    ///
    /// # Errors
    /// Returns [`OmsError::Recovery`] if the KV store can't be read or a
    /// stored order fails to decode.
    pub async fn recover(&self) -> Result<(), OmsError> {
        let orders = self.cache.reload_from_kv().await?;
        debug!(order_count = orders.len(), "oms recovery: reloaded orders from kv");
        self.registry.rebuild_from(&orders);
        Ok(())
    }

    /// The recorded lifecycle history for `uuid`, oldest first.
    #[must_use]
    pub fn audit_history(&self, uuid: Uuid) -> Vec<AuditEntry> {
        self.audit.history(uuid)
    }
}
