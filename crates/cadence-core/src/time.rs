//! Signed time intervals

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

const NANOS_PER_MILLI: i64 = 1_000_000;
const MILLIS_PER_SECOND: i64 = 1_000;
const SECONDS_PER_MINUTE: i64 = 60;
const MINUTES_PER_HOUR: i64 = 60;
const HOURS_PER_DAY: i64 = 24;

/// An immutable, signed interval of time with nanosecond precision.
///
/// Negative spans are valid values: they are what you get when subtracting
/// a later point from an earlier one, e.g. the remaining time of a callback
/// that is already overdue. Arithmetic wraps instead of panicking.
#[derive(
    Clone, Copy, Default, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct TimeSpan(i64);

impl TimeSpan {
    pub const ZERO: Self = Self(0);

    pub const fn from_nanos(nanos: i64) -> Self {
        Self(nanos)
    }

    pub const fn from_millis(millis: i64) -> Self {
        Self(millis.wrapping_mul(NANOS_PER_MILLI))
    }

    pub const fn from_seconds(seconds: i64) -> Self {
        Self::from_millis(seconds.wrapping_mul(MILLIS_PER_SECOND))
    }

    pub const fn from_minutes(minutes: i64) -> Self {
        Self::from_seconds(minutes.wrapping_mul(SECONDS_PER_MINUTE))
    }

    pub const fn from_hours(hours: i64) -> Self {
        Self::from_minutes(hours.wrapping_mul(MINUTES_PER_HOUR))
    }

    pub const fn from_days(days: i64) -> Self {
        Self::from_hours(days.wrapping_mul(HOURS_PER_DAY))
    }

    /// Build a span from fractional seconds, rounding to the nearest nanosecond.
    pub fn from_secs_f64(seconds: f64) -> Self {
        Self((seconds * 1e9).round() as i64)
    }

    /// Convert a (non-negative) std duration, saturating at `i64::MAX` nanoseconds.
    pub fn from_std(duration: std::time::Duration) -> Self {
        Self(i64::try_from(duration.as_nanos()).unwrap_or(i64::MAX))
    }

    /// Convert to a std duration. Returns `None` for negative spans.
    pub fn to_std(self) -> Option<std::time::Duration> {
        u64::try_from(self.0)
            .ok()
            .map(std::time::Duration::from_nanos)
    }

    pub const fn as_nanos(self) -> i64 {
        self.0
    }

    pub const fn as_millis(self) -> i64 {
        self.0 / NANOS_PER_MILLI
    }

    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / 1e9
    }

    pub const fn add(self, other: Self) -> Self {
        Self(self.0.wrapping_add(other.0))
    }

    pub const fn subtract(self, other: Self) -> Self {
        Self(self.0.wrapping_sub(other.0))
    }

    pub const fn is_greater_than(self, other: Self) -> bool {
        self.0 > other.0
    }

    pub const fn is_less_than(self, other: Self) -> bool {
        self.0 < other.0
    }

    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }
}

impl Add for TimeSpan {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        TimeSpan::add(self, rhs)
    }
}

impl AddAssign for TimeSpan {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for TimeSpan {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        self.subtract(rhs)
    }
}

impl SubAssign for TimeSpan {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Neg for TimeSpan {
    type Output = Self;

    fn neg(self) -> Self {
        Self(self.0.wrapping_neg())
    }
}

impl From<std::time::Duration> for TimeSpan {
    fn from(duration: std::time::Duration) -> Self {
        Self::from_std(duration)
    }
}

impl fmt::Debug for TimeSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TimeSpan({}ns)", self.0)
    }
}

impl fmt::Display for TimeSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}s", self.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_factories() {
        assert_eq!(TimeSpan::from_millis(1).as_nanos(), 1_000_000);
        assert_eq!(TimeSpan::from_seconds(2), TimeSpan::from_millis(2_000));
        assert_eq!(TimeSpan::from_minutes(1), TimeSpan::from_seconds(60));
        assert_eq!(TimeSpan::from_hours(1), TimeSpan::from_minutes(60));
        assert_eq!(TimeSpan::from_days(1), TimeSpan::from_hours(24));
    }

    #[test]
    fn test_subtraction_can_go_negative() {
        let early = TimeSpan::from_millis(10);
        let late = TimeSpan::from_millis(25);
        let diff = early.subtract(late);
        assert!(diff.is_negative());
        assert_eq!(diff, TimeSpan::from_millis(-15));
        assert_eq!(diff + late, early);
    }

    #[test]
    fn test_ordering() {
        let a = TimeSpan::from_millis(5);
        let b = TimeSpan::from_millis(7);
        assert!(b.is_greater_than(a));
        assert!(a.is_less_than(b));
        assert!(!a.is_greater_than(a));
        assert_eq!(a.cmp(&b), std::cmp::Ordering::Less);
        assert_eq!(TimeSpan::ZERO, TimeSpan::default());
    }

    #[test]
    fn test_std_conversion() {
        let span = TimeSpan::from_std(std::time::Duration::from_millis(16));
        assert_eq!(span, TimeSpan::from_millis(16));
        assert_eq!(span.to_std(), Some(std::time::Duration::from_millis(16)));
        assert_eq!(TimeSpan::from_millis(-1).to_std(), None);
    }

    #[test]
    fn test_fractional_seconds() {
        let span = TimeSpan::from_secs_f64(1.0 / 60.0);
        assert_eq!(span.as_nanos(), 16_666_667);
        assert!((span.as_secs_f64() - 1.0 / 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_equal_spans_hash_equal() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(TimeSpan::from_seconds(1));
        assert!(set.contains(&TimeSpan::from_millis(1_000)));
    }
}
