//! Cache configuration: one plain struct with a sane `Default`, no dynamic
//! reload, matching `services/execution-router/src/config.rs`'s style.

use serde::{Deserialize, Serialize};
use services_common::constants::{DEFAULT_EXPIRE_TIME_SECS, DEFAULT_SYNC_INTERVAL_SECS};

/// Configuration for the write-through/TTL-eviction background task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// How often the background task writes dirty entries to the KV store
    /// and runs TTL eviction, in seconds.
    pub sync_interval_secs: u64,
    /// How long a closed order/algo order survives in memory after its last
    /// update before TTL eviction removes it, in seconds.
    pub expire_time_secs: u64,
    /// Redis connection URL, used by [`crate::kv::RedisKv::connect`].
    pub redis_url: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            sync_interval_secs: DEFAULT_SYNC_INTERVAL_SECS,
            expire_time_secs: DEFAULT_EXPIRE_TIME_SECS,
            redis_url: "redis://127.0.0.1/".to_string(),
        }
    }
}
