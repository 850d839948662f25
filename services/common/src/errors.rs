//! Error types shared across the execution core's crates.
//!
//! Per-crate errors (`CacheError`, `PrecisionError`, `EmsError`) live in
//! their own crates; this module only holds the construction-time
//! `Precondition` error the EMS raises from `build()` when venue routing
//! cannot be established, since more than one crate needs to report it.

use thiserror::Error;

/// A construction-time error: something about how the core was assembled
/// (missing venue routing, unknown exchange) rather than a runtime failure.
#[derive(Debug, Error)]
pub enum PreconditionError {
    /// No routing entry exists for the given exchange/account type pair.
    #[error("no venue routing entry for {exchange}/{account_type}")]
    UnknownRoute {
        /// Exchange named in the missing route
        exchange: String,
        /// Account type named in the missing route
        account_type: String,
    },
    /// A connector was required but not supplied at construction.
    #[error("no connector configured for exchange {0}")]
    MissingConnector(String),
}
