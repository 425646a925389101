//! Clocks

use portable_atomic::{AtomicU64, Ordering};

use aliquot_core::traits::Clock;

/// Clock that only moves when told to
///
/// Used for simulated runs, where command timestamps should be
/// reproducible.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: AtomicU64,
}

impl ManualClock {
    pub const fn new(start_ms: u64) -> Self {
        Self {
            now_ms: AtomicU64::new(start_ms),
        }
    }

    pub fn set(&self, now_ms: u64) {
        self.now_ms.store(now_ms, Ordering::Relaxed);
    }

    /// Move the clock forward by `delta_ms`
    pub fn advance(&self, delta_ms: u64) {
        self.now_ms.fetch_add(delta_ms, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance() {
        let clock = ManualClock::new(100);
        clock.advance(25);
        assert_eq!(clock.now_ms(), 125);
        clock.set(10);
        assert_eq!(clock.now_ms(), 10);
    }

    #[test]
    fn test_shared_reference_is_a_clock() {
        fn read(clock: impl Clock) -> u64 {
            clock.now_ms()
        }
        let clock = ManualClock::new(7);
        assert_eq!(read(&clock), 7);
    }
}
