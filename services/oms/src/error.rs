//! Error types for order management.

use thiserror::Error;

/// Errors surfaced by [`crate::Oms`].
#[derive(Error, Debug)]
pub enum OmsError {
    /// The cache or registry reload failed during startup recovery.
    #[error("recovery failed: {0}")]
    Recovery(#[from] cache::CacheError),
}
