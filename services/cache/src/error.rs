//! Error types for the cache crate.

use thiserror::Error;

/// Errors raised by the cache's external-KV-facing operations.
///
/// Status-transition and position-application errors are *not* represented
/// here: per spec §7 those are logged and dropped, never propagated to the
/// caller as a `Result`. This type only covers failures talking to the
/// external key-value store.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The external KV store rejected or failed a read/write.
    #[error("kv store error: {0}")]
    Kv(#[from] anyhow::Error),

    /// A value read back from the KV store could not be decoded.
    #[error("failed to decode {kind} for key {key}: {source}")]
    Decode {
        /// The record kind being decoded (`order`, `algo_order`, `position`)
        kind: &'static str,
        /// The KV key the bad payload was read from
        key: String,
        /// Underlying JSON error
        #[source]
        source: serde_json::Error,
    },
}
