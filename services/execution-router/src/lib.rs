//! Per-venue execution management: order/cancel dispatch plus the TWAP
//! algo-order engine built on top of it.
//!
//! Grounded on `tradebot/base/ems.py`'s `ExecutionManagementSystem` and its
//! three venue subclasses (`nexustrader/exchange/{bybit,okx}/ems.py`,
//! `tradebot/exchange/binance/ems.py`), reworked per spec §4.5/§4.6 and the
//! REDESIGN FLAGS section from an abstract base class with virtual hooks
//! into a `VenueRouting`-generic worker.

#![warn(missing_docs)]

pub mod config;
pub mod connector;
pub mod ems;
pub mod error;
pub mod routing;
pub mod twap;

pub use config::EmsConfig;
pub use connector::{ConnectorError, PrivateConnector};
pub use ems::{EmsWorker, ExecutionManagementSystem};
pub use error::EmsError;
pub use routing::{BinanceRouting, BybitRouting, OkxRouting, VenueRouting};
