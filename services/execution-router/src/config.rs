//! Execution router configuration: one plain struct with a sane `Default`,
//! matching the teacher's config style (no dynamic reload, no builder).

use serde::{Deserialize, Serialize};
use services_common::constants::TWAP_WATCH_INTERVAL_MS;

/// Configuration shared by every [`crate::ems::EmsWorker`] in the process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmsConfig {
    /// How often a running TWAP task re-checks its slice schedule, in
    /// milliseconds.
    pub twap_watch_interval_ms: u64,
}

impl Default for EmsConfig {
    fn default() -> Self {
        Self {
            twap_watch_interval_ms: TWAP_WATCH_INTERVAL_MS,
        }
    }
}
