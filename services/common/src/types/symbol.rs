//! Venue and instrument identity types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A supported execution venue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExchangeId {
    /// Bybit
    Bybit,
    /// OKX
    Okx,
    /// Binance
    Binance,
}

impl fmt::Display for ExchangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bybit => write!(f, "bybit"),
            Self::Okx => write!(f, "okx"),
            Self::Binance => write!(f, "binance"),
        }
    }
}

/// Market kind, used to route to the correct account type on venues that
/// segregate spot / linear-derivative / inverse-derivative balances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarketKind {
    /// Spot market
    Spot,
    /// USDT/USDC-margined perpetual or future
    Linear,
    /// Coin-margined perpetual or future
    Inverse,
}

/// A venue-qualified trading symbol, e.g. `bybit:BTCUSDT-linear`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstrumentId {
    /// Venue this instrument trades on
    pub exchange: ExchangeId,
    /// Raw venue symbol, e.g. `BTCUSDT`
    pub symbol: String,
    /// Market segment
    pub kind: MarketKind,
}

impl InstrumentId {
    /// Construct a new instrument identity.
    #[must_use]
    pub fn new(exchange: ExchangeId, symbol: impl Into<String>, kind: MarketKind) -> Self {
        Self {
            exchange,
            symbol: symbol.into(),
            kind,
        }
    }

    /// Whether this instrument trades on the venue's spot market.
    #[must_use]
    pub const fn is_spot(&self) -> bool {
        matches!(self.kind, MarketKind::Spot)
    }

    /// Whether this instrument trades on the venue's linear-derivative market.
    #[must_use]
    pub const fn is_linear(&self) -> bool {
        matches!(self.kind, MarketKind::Linear)
    }

    /// Whether this instrument trades on the venue's inverse-derivative market.
    #[must_use]
    pub const fn is_inverse(&self) -> bool {
        matches!(self.kind, MarketKind::Inverse)
    }
}

impl fmt::Display for InstrumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.exchange, self.symbol)
    }
}

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderSide {
    /// Buy / long
    Buy,
    /// Sell / short
    Sell,
}

/// Position side for derivatives. Spot positions have no side beyond
/// the implicit long-only holding and are represented separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PositionSide {
    /// Long
    Long,
    /// Short
    Short,
    /// Net / one-way mode
    Both,
}

/// Venue account type. The full union across all three supported venues;
/// each venue's routing only ever produces the variants it understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountType {
    /// Bybit unified trading account
    BybitUnified,
    /// Bybit unified trading account, testnet
    BybitUnifiedTestnet,
    /// OKX demo trading
    OkxDemo,
    /// OKX AWS endpoint, live trading
    OkxAws,
    /// OKX live trading
    OkxLive,
    /// Binance spot
    BinanceSpot,
    /// Binance spot, testnet
    BinanceSpotTestnet,
    /// Binance cross margin
    BinanceMargin,
    /// Binance isolated margin
    BinanceIsolatedMargin,
    /// Binance portfolio margin (spans spot + linear + inverse)
    BinancePortfolioMargin,
    /// Binance USDⓈ-margined futures
    BinanceUsdMFuture,
    /// Binance USDⓈ-margined futures, testnet
    BinanceUsdMFutureTestnet,
    /// Binance COIN-margined futures
    BinanceCoinMFuture,
    /// Binance COIN-margined futures, testnet
    BinanceCoinMFutureTestnet,
}
