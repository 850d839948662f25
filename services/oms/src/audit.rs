//! In-memory audit trail of processed lifecycle events.
//!
//! Grounded on `services/oms`'s `audit.rs` `AuditTrail`/`AuditEvent`, with
//! durable Postgres storage replaced by a ring-buffered in-memory log per
//! order: full durable audit storage is out of this crate's scope, but the
//! shape of "what happened to this order, in order" is worth keeping for
//! inspection and tests.

use rust_decimal::Decimal;
use std::collections::VecDeque;
use uuid::Uuid;

use dashmap::DashMap;

/// One processed lifecycle event for a single order.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    /// Venue order id, once known
    pub order_id: Option<String>,
    /// Venue-qualified symbol
    pub symbol: String,
    /// Status string as published on the bus
    pub status: String,
    /// Total requested amount at the time of this event
    pub amount: Decimal,
    /// Cumulative filled amount at the time of this event
    pub filled: Decimal,
    /// Event timestamp, milliseconds since epoch
    pub timestamp: i64,
}

/// An append-only, capacity-bounded audit trail keyed by order uuid. The
/// oldest entry is dropped once a single order's history exceeds
/// `capacity_per_order`, so a pathological order (the original `cancel_all_open_orders`
/// reclaim loop in `twap::run` can cycle a symbol's resting order many times)
/// can't grow the log without bound.
#[derive(Debug)]
pub struct AuditLog {
    capacity_per_order: usize,
    entries: DashMap<Uuid, VecDeque<AuditEntry>>,
}

impl AuditLog {
    /// A new, empty log keeping at most `capacity_per_order` entries per
    /// order uuid.
    #[must_use]
    pub fn new(capacity_per_order: usize) -> Self {
        Self {
            capacity_per_order: capacity_per_order.max(1),
            entries: DashMap::new(),
        }
    }

    /// Append an entry for `uuid`, evicting the oldest entry for that order
    /// if it would exceed capacity.
    pub fn record(&self, uuid: Uuid, entry: AuditEntry) {
        let mut history = self.entries.entry(uuid).or_default();
        if history.len() >= self.capacity_per_order {
            history.pop_front();
        }
        history.push_back(entry);
    }

    /// The recorded history for `uuid`, oldest first. Empty if nothing has
    /// been recorded for this order.
    #[must_use]
    pub fn history(&self, uuid: Uuid) -> Vec<AuditEntry> {
        self.entries
            .get(&uuid)
            .map(|h| h.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Total number of orders with at least one recorded entry.
    #[must_use]
    pub fn tracked_orders(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn entry(status: &str) -> AuditEntry {
        AuditEntry {
            order_id: Some("venue-1".to_string()),
            symbol: "BTCUSDT".to_string(),
            status: status.to_string(),
            amount: dec!(1),
            filled: dec!(0),
            timestamp: 0,
        }
    }

    #[test]
    fn history_is_recorded_in_order() {
        let log = AuditLog::new(10);
        let uuid = Uuid::new_v4();
        log.record(uuid, entry("pending"));
        log.record(uuid, entry("accepted"));
        log.record(uuid, entry("filled"));

        let history = log.history(uuid);
        let statuses: Vec<&str> = history.iter().map(|e| e.status.as_str()).collect();
        assert_eq!(statuses, vec!["pending", "accepted", "filled"]);
    }

    #[test]
    fn history_is_capped_per_order() {
        let log = AuditLog::new(2);
        let uuid = Uuid::new_v4();
        log.record(uuid, entry("pending"));
        log.record(uuid, entry("accepted"));
        log.record(uuid, entry("filled"));

        let history = log.history(uuid);
        let statuses: Vec<&str> = history.iter().map(|e| e.status.as_str()).collect();
        assert_eq!(statuses, vec!["accepted", "filled"]);
    }

    #[test]
    fn unknown_order_has_empty_history() {
        let log = AuditLog::new(10);
        assert!(log.history(Uuid::new_v4()).is_empty());
    }
}
