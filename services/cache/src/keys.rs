//! External-KV key layout, verbatim from spec §6.
//!
//! ```text
//! strategy:{sid}:user_id:{uid}:orders
//! strategy:{sid}:user_id:{uid}:algo_orders
//! strategy:{sid}:user_id:{uid}:exchange:{ex}:open_orders
//! strategy:{sid}:user_id:{uid}:exchange:{ex}:symbol_orders:{symbol}
//! strategy:{sid}:user_id:{uid}:exchange:{ex}:symbol_open_orders:{symbol}
//! strategy:{sid}:user_id:{uid}:exchange:{ex}:symbol_positions:{symbol}
//! ```

use services_common::{ExchangeId, StrategyIdentity};

/// Hash key holding every order, keyed by uuid.
#[must_use]
pub fn orders(id: &StrategyIdentity) -> String {
    format!("strategy:{}:user_id:{}:orders", id.strategy_id, id.user_id)
}

/// Hash key holding every algo order, keyed by uuid.
#[must_use]
pub fn algo_orders(id: &StrategyIdentity) -> String {
    format!(
        "strategy:{}:user_id:{}:algo_orders",
        id.strategy_id, id.user_id
    )
}

/// Set key holding the open-order uuids for one exchange.
#[must_use]
pub fn open_orders(id: &StrategyIdentity, exchange: ExchangeId) -> String {
    format!(
        "strategy:{}:user_id:{}:exchange:{}:open_orders",
        id.strategy_id, id.user_id, exchange
    )
}

/// Set key holding every order uuid ever seen for a symbol.
#[must_use]
pub fn symbol_orders(id: &StrategyIdentity, exchange: ExchangeId, symbol: &str) -> String {
    format!(
        "strategy:{}:user_id:{}:exchange:{}:symbol_orders:{}",
        id.strategy_id, id.user_id, exchange, symbol
    )
}

/// Set key holding the open-order uuids for a symbol.
#[must_use]
pub fn symbol_open_orders(id: &StrategyIdentity, exchange: ExchangeId, symbol: &str) -> String {
    format!(
        "strategy:{}:user_id:{}:exchange:{}:symbol_open_orders:{}",
        id.strategy_id, id.user_id, exchange, symbol
    )
}

/// String key holding the serialized position for a symbol.
#[must_use]
pub fn symbol_position(id: &StrategyIdentity, exchange: ExchangeId, symbol: &str) -> String {
    format!(
        "strategy:{}:user_id:{}:exchange:{}:symbol_positions:{}",
        id.strategy_id, id.user_id, exchange, symbol
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_layout_matches_spec() {
        let id = StrategyIdentity {
            strategy_id: "s1".to_string(),
            user_id: "u1".to_string(),
        };
        assert_eq!(orders(&id), "strategy:s1:user_id:u1:orders");
        assert_eq!(
            open_orders(&id, ExchangeId::Bybit),
            "strategy:s1:user_id:u1:exchange:bybit:open_orders"
        );
        assert_eq!(
            symbol_open_orders(&id, ExchangeId::Okx, "BTCUSDT"),
            "strategy:s1:user_id:u1:exchange:okx:symbol_open_orders:BTCUSDT"
        );
    }
}
