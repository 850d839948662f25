//! Core constants for the execution system.

/// Default cache sync-to-KV interval, seconds.
pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 60;

/// Default in-memory TTL for closed orders/algo orders, seconds.
pub const DEFAULT_EXPIRE_TIME_SECS: u64 = 3600;

/// TWAP watch-phase poll interval, milliseconds.
pub const TWAP_WATCH_INTERVAL_MS: u64 = 100;

/// Connector call deadline, seconds.
pub const CONNECTOR_TIMEOUT_SECS: u64 = 10;
