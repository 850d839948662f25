//! Plain configuration structs, one per component, each with a sane
//! `Default` — no dynamic reload, matching the scope of this crate.

use serde::{Deserialize, Serialize};

/// Identity under which this process's cache namespaces its external KV keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyIdentity {
    /// Strategy id, the first key-path segment
    pub strategy_id: String,
    /// User id, the second key-path segment
    pub user_id: String,
}

impl Default for StrategyIdentity {
    fn default() -> Self {
        Self {
            strategy_id: "default".to_string(),
            user_id: "default".to_string(),
        }
    }
}
