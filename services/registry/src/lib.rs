//! Bidirectional map between client `Uuid`s and venue order ids.
//!
//! Pure in-memory, no persistence of its own — at startup the owning
//! process reloads from `cache` and calls [`OrderRegistry::rebuild_from`].

use dashmap::DashMap;
use services_common::Order;
use tracing::debug;
use uuid::Uuid;

/// Bidirectional uuid <-> venue order id map.
#[derive(Debug, Default)]
pub struct OrderRegistry {
    uuid_to_venue: DashMap<Uuid, String>,
    venue_to_uuid: DashMap<String, Uuid>,
}

impl OrderRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the uuid <-> venue-id association for an order that has a
    /// venue id. Orders without one (not yet acknowledged) are ignored.
    pub fn register(&self, order: &Order) {
        let Some(venue_id) = order.id.clone() else {
            return;
        };
        debug!(uuid = %order.uuid, venue_id = %venue_id, "registering order");
        self.uuid_to_venue.insert(order.uuid, venue_id.clone());
        self.venue_to_uuid.insert(venue_id, order.uuid);
    }

    /// The venue order id for a client uuid, if registered.
    #[must_use]
    pub fn get_order_id(&self, uuid: Uuid) -> Option<String> {
        self.uuid_to_venue.get(&uuid).map(|v| v.clone())
    }

    /// The client uuid for a venue order id, if registered.
    #[must_use]
    pub fn get_uuid(&self, venue_id: &str) -> Option<Uuid> {
        self.venue_to_uuid.get(venue_id).map(|v| *v)
    }

    /// Remove both directions of the association for a uuid, if present.
    pub fn remove(&self, uuid: Uuid) {
        if let Some((_, venue_id)) = self.uuid_to_venue.remove(&uuid) {
            self.venue_to_uuid.remove(&venue_id);
        }
    }

    /// Number of registered associations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.uuid_to_venue.len()
    }

    /// Whether the registry holds no associations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.uuid_to_venue.is_empty()
    }

    /// Rebuild the registry from a durable snapshot (a Cache reload at
    /// startup), registering every order that carries a venue id.
    pub fn rebuild_from(&self, orders: &[Order]) {
        self.uuid_to_venue.clear();
        self.venue_to_uuid.clear();
        for order in orders {
            self.register(order);
        }
    }
}
