//! Decimal rounding against per-symbol tick/lot tables.
//!
//! Ported bit-for-bit from `tradebot/base/ems.py`'s `_amount_to_precision`/
//! `_price_to_precision`: a market's `precision.amount`/`precision.price` is
//! either an integral step count (`>= 1`, e.g. a lot of 10) or a fractional
//! step (`< 1`, e.g. a tick of 0.001). Side-effect-free; every function here
//! is a pure `Decimal -> Decimal` transform.

use rust_decimal::{Decimal, RoundingStrategy};
use services_common::{Market, OrderSide};

/// Which rounding direction to apply when quantizing to a market's step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundMode {
    /// Round half away from zero (banker's-rounding-free "round half up")
    Round,
    /// Always round toward positive infinity
    Ceil,
    /// Always round toward negative infinity
    Floor,
}

impl RoundMode {
    const fn strategy(self) -> RoundingStrategy {
        match self {
            Self::Round => RoundingStrategy::MidpointAwayFromZero,
            Self::Ceil => RoundingStrategy::ToPositiveInfinity,
            Self::Floor => RoundingStrategy::ToNegativeInfinity,
        }
    }
}

/// Quantize `value` to `step` under `mode`.
///
/// `step >= 1` is treated as an integral step count: `value` is divided by
/// `step`, quantized to a whole number, then multiplied back (e.g. a lot of
/// 10 rounds 23 down to 20). `step < 1` is the fractional increment itself
/// and `value` is quantized against it directly (e.g. a tick of 0.001 rounds
/// 1.2345 to 1.234/1.235 depending on `mode`).
#[must_use]
pub fn quantize_to_step(value: Decimal, step: Decimal, mode: RoundMode) -> Decimal {
    let strategy = mode.strategy();
    if step >= Decimal::ONE {
        let exp = step.trunc();
        (value / exp).quantize(Decimal::ONE, strategy) * exp
    } else {
        value.quantize(step, strategy)
    }
}

/// Round an amount to `market`'s amount precision.
#[must_use]
pub fn round_amount(market: &Market, amount: Decimal, mode: RoundMode) -> Decimal {
    quantize_to_step(amount, market.precision.amount, mode)
}

/// Round a price to `market`'s price precision.
#[must_use]
pub fn round_price(market: &Market, price: Decimal, mode: RoundMode) -> Decimal {
    quantize_to_step(price, market.precision.price, mode)
}

/// The limit price one tick inside the current top-of-book, per §4.4/§4.6:
/// a buy rests at `bid + tick` when the spread exceeds one tick, else at
/// `bid`; a sell mirrors at `ask - tick`/`ask`. The result is rounded to the
/// market's price precision.
#[must_use]
pub fn limit_price_one_tick_inside(
    market: &Market,
    side: OrderSide,
    bid: Decimal,
    ask: Decimal,
) -> Decimal {
    let tick = market.precision.price;
    let price = match side {
        OrderSide::Buy => {
            if ask - bid > tick {
                bid + tick
            } else {
                bid
            }
        }
        OrderSide::Sell => {
            if ask - bid > tick {
                ask - tick
            } else {
                ask
            }
        }
    };
    round_price(market, price, RoundMode::Round)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use services_common::{AmountLimits, Limits, MarketKind, Precision};
    use test_case::test_case;

    fn market_with(amount_step: Decimal, price_step: Decimal) -> Market {
        Market {
            symbol: "BTCUSDT".to_string(),
            kind: MarketKind::Spot,
            precision: Precision {
                amount: amount_step,
                price: price_step,
            },
            limits: Limits {
                amount: AmountLimits {
                    min: dec!(0.0001),
                    max: None,
                },
            },
        }
    }

    #[test_case(dec!(0.0015), RoundMode::Round, dec!(0.002); "round half up rounds up at midpoint")]
    #[test_case(dec!(0.0015), RoundMode::Ceil, dec!(0.002); "ceil rounds up")]
    #[test_case(dec!(0.0015), RoundMode::Floor, dec!(0.001); "floor rounds down")]
    fn precision_boundary_cases(value: Decimal, mode: RoundMode, expected: Decimal) {
        assert_eq!(quantize_to_step(value, dec!(0.001), mode), expected);
    }

    #[test]
    fn integral_step_reduces_to_multiples() {
        let market = market_with(dec!(10), dec!(0.01));
        assert_eq!(round_amount(&market, dec!(23), RoundMode::Floor), dec!(20));
        assert_eq!(round_amount(&market, dec!(23), RoundMode::Ceil), dec!(30));
    }

    #[test]
    fn fractional_step_quantizes_directly() {
        let market = market_with(dec!(0.001), dec!(0.01));
        assert_eq!(
            round_amount(&market, dec!(1.2345), RoundMode::Round),
            dec!(1.234)
        );
    }

    #[test]
    fn touch_price_inside_wide_spread() {
        let market = market_with(dec!(0.001), dec!(0.01));
        let price = limit_price_one_tick_inside(&market, OrderSide::Buy, dec!(100), dec!(100.05));
        assert_eq!(price, dec!(100.01));

        let price = limit_price_one_tick_inside(&market, OrderSide::Sell, dec!(100), dec!(100.05));
        assert_eq!(price, dec!(100.04));
    }

    #[test]
    fn touch_price_rests_at_touch_when_spread_is_one_tick() {
        let market = market_with(dec!(0.001), dec!(0.01));
        let price = limit_price_one_tick_inside(&market, OrderSide::Buy, dec!(100), dec!(100.01));
        assert_eq!(price, dec!(100));

        let price = limit_price_one_tick_inside(&market, OrderSide::Sell, dec!(100), dec!(100.01));
        assert_eq!(price, dec!(100.01));
    }

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn round_amount_never_panics(raw in 0.0f64..1_000_000.0, step in 0.0001f64..1000.0) {
            let market = market_with(Decimal::try_from(step).unwrap(), dec!(0.01));
            let value = Decimal::try_from(raw).unwrap();
            let _ = round_amount(&market, value, RoundMode::Round);
        }
    }
}
