//! Wall-clock and monotonic time, injected rather than read ambiently.
//!
//! Every component that needs "now" takes a `Arc<dyn Clock>` at construction
//! instead of calling `chrono::Utc::now()`/`Instant::now()` directly, so
//! tests can substitute [`TestClock`] for deterministic TTL/timeout behavior.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Instant;

/// A source of wall-clock and monotonic time.
pub trait Clock: Send + Sync {
    /// Milliseconds since the Unix epoch.
    fn now_ms(&self) -> i64;
    /// A monotonic instant, for measuring elapsed durations (timeouts,
    /// TWAP slice pacing) immune to wall-clock adjustment.
    fn monotonic(&self) -> Instant;
}

/// The real system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }

    fn monotonic(&self) -> Instant {
        Instant::now()
    }
}

/// A clock whose wall-clock reading can be advanced deterministically by
/// tests; `monotonic()` still delegates to the real `Instant::now()` since
/// TWAP timing tests run against `tokio::time::pause`/`advance` instead.
#[derive(Debug)]
pub struct TestClock {
    now_ms: AtomicI64,
}

impl TestClock {
    /// A test clock starting at the given wall-clock millisecond reading.
    #[must_use]
    pub fn new(start_ms: i64) -> Arc<Self> {
        Arc::new(Self {
            now_ms: AtomicI64::new(start_ms),
        })
    }

    /// Advance the wall-clock reading by `delta_ms`.
    pub fn advance(&self, delta_ms: i64) {
        self.now_ms.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for TestClock {
    fn now_ms(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }

    fn monotonic(&self) -> Instant {
        Instant::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_advances() {
        let clock = TestClock::new(1000);
        assert_eq!(clock.now_ms(), 1000);
        clock.advance(500);
        assert_eq!(clock.now_ms(), 1500);
    }

    #[test]
    fn system_clock_returns_plausible_timestamp() {
        let clock = SystemClock;
        assert!(clock.now_ms() > 1_700_000_000_000);
    }
}
