//! Monotonic time sources

use crate::TimeSpan;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// A monotonic time source.
///
/// `now()` is measured from an arbitrary, clock-specific origin; only
/// differences between readings are meaningful.
pub trait Clock: Send + Sync {
    fn now(&self) -> TimeSpan;
}

/// Wall-clock time backed by [`Instant`].
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> TimeSpan {
        TimeSpan::from_std(self.origin.elapsed())
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    nanos: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward by `span`.
    pub fn advance(&self, span: TimeSpan) {
        self.nanos.fetch_add(span.as_nanos(), Ordering::SeqCst);
    }

    /// Jump to an absolute reading.
    pub fn set(&self, now: TimeSpan) {
        self.nanos.store(now.as_nanos(), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> TimeSpan {
        TimeSpan::from_nanos(self.nanos.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_shared_between_clones() {
        let clock = ManualClock::new();
        let other = clock.clone();
        clock.advance(TimeSpan::from_millis(16));
        assert_eq!(other.now(), TimeSpan::from_millis(16));
        other.set(TimeSpan::from_seconds(3));
        assert_eq!(clock.now(), TimeSpan::from_seconds(3));
    }

    #[test]
    fn test_system_clock_monotonic() {
        let clock = SystemClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(!b.is_less_than(a));
    }
}
