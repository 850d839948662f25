//! Static, read-only per-symbol market metadata (precision and minimum size).

use super::symbol::MarketKind;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Precision steps for amount and price. Per §4.4, a step `>= 1` is an
/// integral number-of-decimal-places step count; a step `< 1` is itself
/// the fractional rounding increment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Precision {
    /// Amount precision step
    pub amount: Decimal,
    /// Price precision step
    pub price: Decimal,
}

/// Minimum/maximum order amount limits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AmountLimits {
    /// Minimum order amount
    pub min: Decimal,
    /// Maximum order amount, if the venue documents one
    pub max: Option<Decimal>,
}

/// Size-related limits for a market.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Limits {
    /// Amount limits
    pub amount: AmountLimits,
}

/// Read-only market metadata for one venue symbol. Loaded once at startup;
/// shared via `Arc` since it never changes for the life of the process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Market {
    /// Venue-qualified symbol
    pub symbol: String,
    /// Market segment
    pub kind: MarketKind,
    /// Precision rules
    pub precision: Precision,
    /// Size limits
    pub limits: Limits,
}
