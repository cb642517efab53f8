//! Frozen scenario time.

use chrono::{DateTime, Utc};

/// Point in time a scenario treats as "now".
///
/// The clock never advances, so time-derived columns compare
/// deterministically. The system under test receives it at construction
/// rather than consulting the wall clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrozenClock {
    now: DateTime<Utc>,
}

impl FrozenClock {
    /// Freezes time at `now`.
    #[must_use]
    pub const fn at(now: DateTime<Utc>) -> Self {
        Self { now }
    }

    /// Freezes time at an RFC 3339 instant.
    ///
    /// Returns `None` when `instant` is not valid RFC 3339.
    #[must_use]
    pub fn parse(instant: &str) -> Option<Self> {
        DateTime::parse_from_rfc3339(instant)
            .ok()
            .map(|at| Self::at(at.with_timezone(&Utc)))
    }

    /// Returns the frozen instant.
    #[must_use]
    pub const fn now(&self) -> DateTime<Utc> {
        self.now
    }
}

#[cfg(test)]
mod tests {
    use super::FrozenClock;

    #[test]
    fn parse_normalises_to_utc() {
        let clock = FrozenClock::parse("2009-11-11T00:00:00+01:00").expect("valid instant");
        assert_eq!(clock.now().to_rfc3339(), "2009-11-10T23:00:00+00:00");
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(FrozenClock::parse("yesterday").is_none());
    }
}
