use std::time::Duration;

/// Granularity used when setting or reading a key's time-to-live.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimeUnit {
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    pub const fn millis_per_unit(self) -> u64 {
        match self {
            TimeUnit::Milliseconds => 1,
            TimeUnit::Seconds => 1_000,
            TimeUnit::Minutes => 60_000,
            TimeUnit::Hours => 3_600_000,
            TimeUnit::Days => 86_400_000,
        }
    }

    pub fn to_duration(self, amount: u64) -> Duration {
        Duration::from_millis(amount.saturating_mul(self.millis_per_unit()))
    }

    /// Expresses `remaining` in this unit, rounding up so that any time left
    /// never reads as zero.
    pub fn from_duration_ceil(self, remaining: Duration) -> i64 {
        let unit = u128::from(self.millis_per_unit());
        let units = remaining.as_millis().div_ceil(unit);
        i64::try_from(units).unwrap_or(i64::MAX)
    }
}

/// A time-to-live request: an amount in a unit.
///
/// A non-positive amount means "no expiration". A bare integer converts to
/// minutes, a [`Duration`] converts to milliseconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ttl {
    pub amount: i64,
    pub unit: TimeUnit,
}

impl Ttl {
    pub const DEFAULT_UNIT: TimeUnit = TimeUnit::Minutes;

    pub const fn new(amount: i64, unit: TimeUnit) -> Self {
        Self { amount, unit }
    }

    pub const fn millis(amount: i64) -> Self {
        Self::new(amount, TimeUnit::Milliseconds)
    }

    pub const fn seconds(amount: i64) -> Self {
        Self::new(amount, TimeUnit::Seconds)
    }

    pub const fn minutes(amount: i64) -> Self {
        Self::new(amount, TimeUnit::Minutes)
    }

    pub const fn hours(amount: i64) -> Self {
        Self::new(amount, TimeUnit::Hours)
    }

    pub const fn days(amount: i64) -> Self {
        Self::new(amount, TimeUnit::Days)
    }

    /// `None` when the key should persist.
    pub fn duration(&self) -> Option<Duration> {
        u64::try_from(self.amount)
            .ok()
            .filter(|amount| *amount > 0)
            .map(|amount| self.unit.to_duration(amount))
    }
}

impl From<i64> for Ttl {
    fn from(amount: i64) -> Self {
        Self::new(amount, Self::DEFAULT_UNIT)
    }
}

// untyped integer literals default to i32
impl From<i32> for Ttl {
    fn from(amount: i32) -> Self {
        Self::new(i64::from(amount), Self::DEFAULT_UNIT)
    }
}

// sub-millisecond remainders round up; a positive duration must stay positive
impl From<Duration> for Ttl {
    fn from(duration: Duration) -> Self {
        let millis = duration.as_nanos().div_ceil(1_000_000);
        Self::millis(i64::try_from(millis).unwrap_or(i64::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_amount_defaults_to_minutes() {
        let ttl: Ttl = 5.into();
        assert_eq!(ttl.unit, TimeUnit::Minutes);
        assert_eq!(ttl.duration(), Some(Duration::from_secs(300)));
        assert_eq!(Ttl::from(5_i64), ttl);
    }

    #[test]
    fn test_non_positive_amount_means_persistent() {
        assert_eq!(Ttl::seconds(0).duration(), None);
        assert_eq!(Ttl::hours(-3).duration(), None);
    }

    #[test]
    fn test_duration_conversion_keeps_millis() {
        let ttl = Ttl::from(Duration::from_millis(1500));
        assert_eq!(ttl, Ttl::millis(1500));
        assert_eq!(ttl.duration(), Some(Duration::from_millis(1500)));
    }

    #[test]
    fn test_sub_millisecond_duration_still_expires() {
        let ttl = Ttl::from(Duration::from_micros(500));
        assert_eq!(ttl, Ttl::millis(1));
        assert_eq!(ttl.duration(), Some(Duration::from_millis(1)));
        assert_eq!(Ttl::from(Duration::from_micros(1_001)), Ttl::millis(2));
        assert_eq!(Ttl::from(Duration::ZERO).duration(), None);
    }

    #[test]
    fn test_remaining_time_rounds_up() {
        assert_eq!(TimeUnit::Seconds.from_duration_ceil(Duration::from_millis(1)), 1);
        assert_eq!(TimeUnit::Seconds.from_duration_ceil(Duration::from_millis(4_200)), 5);
        assert_eq!(TimeUnit::Minutes.from_duration_ceil(Duration::from_secs(120)), 2);
        assert_eq!(TimeUnit::Days.from_duration_ceil(Duration::ZERO), 0);
    }

    #[test]
    fn test_huge_amount_saturates() {
        let duration = TimeUnit::Days.to_duration(u64::MAX);
        assert_eq!(duration, Duration::from_millis(u64::MAX));
    }
}
