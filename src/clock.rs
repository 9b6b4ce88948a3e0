//! Monotonic time since boot
//!
//! The clock restarts at every wake from suspension, so instants are only
//! meaningful within one power cycle.

use core::ops::Add;
use core::time::Duration;

/// A point on the monotonic clock, in microseconds since boot
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Instant {
    micros: u64,
}

impl Instant {
    /// Instant `micros` microseconds after boot
    pub const fn from_micros(micros: u64) -> Self {
        Self { micros }
    }

    /// Instant `secs` seconds after boot
    pub const fn from_secs(secs: u64) -> Self {
        Self {
            micros: secs.saturating_mul(1_000_000),
        }
    }

    /// Microseconds since boot
    pub const fn as_micros(self) -> u64 {
        self.micros
    }

    /// Time from `earlier` to `self`, or `None` if `earlier` is later
    pub fn checked_duration_since(self, earlier: Self) -> Option<Duration> {
        self.micros
            .checked_sub(earlier.micros)
            .map(Duration::from_micros)
    }

    /// Time from `earlier` to `self`, zero if `earlier` is later
    pub fn saturating_duration_since(self, earlier: Self) -> Duration {
        self.checked_duration_since(earlier)
            .unwrap_or(Duration::ZERO)
    }
}

impl Add<Duration> for Instant {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self {
        let micros = u64::try_from(rhs.as_micros()).unwrap_or(u64::MAX);
        Self {
            micros: self.micros.saturating_add(micros),
        }
    }
}

/// Source of monotonic time
pub trait Clock {
    /// Current instant
    fn now(&self) -> Instant;
}
