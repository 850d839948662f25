//! Execution Management System Error Types

use services_common::PreconditionError;
use thiserror::Error;

/// Construction-time errors: a worker or router cannot even be built. These
/// are the only `Err`s this crate returns to its caller — everything that
/// happens once a worker is running either becomes a failed [`Order`] on the
/// bus or is logged and dropped. See [`crate::connector::ConnectorError`] for
/// the venue-transport failures that get folded into a failed order instead
/// of propagating here.
///
/// [`Order`]: services_common::Order
#[derive(Debug, Error)]
pub enum EmsError {
    /// Venue routing could not be established (unknown route or missing
    /// connector), shared with other crates that raise the same shape of
    /// construction-time error.
    #[error(transparent)]
    Precondition(#[from] PreconditionError),

    /// A venue worker was asked to route an instrument but no account type
    /// in its configured set could handle it.
    #[error("no account type configured on {exchange} can route {symbol}")]
    UnroutableInstrument {
        /// The exchange the instrument belongs to
        exchange: String,
        /// The instrument's symbol
        symbol: String,
    },
}
