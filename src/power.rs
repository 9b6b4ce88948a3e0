//! Platform services for the update loop
//!
//! The [`Platform`] trait bundles what the loop needs from the board: a
//! monotonic clock, blocking delays, the network link and low-power
//! suspension.
//!
//! Suspension wakes on whichever comes first: the timer deadline, or either
//! external wake input going high.

use core::fmt::Debug;
use core::time::Duration;
use embedded_hal::delay::DelayNs;

use crate::clock::Clock;

/// External inputs that end suspension early, on a high level
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WakeSources {
    /// GPIO numbers of the two wake inputs
    pub pins: [u8; 2],
}

impl WakeSources {
    /// Wake sources for the given GPIO numbers
    pub const fn new(pins: [u8; 2]) -> Self {
        Self { pins }
    }

    /// Bit mask of the wake inputs, bit `n` for GPIO `n`
    ///
    /// ```
    /// use epaper_updater::power::WakeSources;
    ///
    /// assert_eq!(WakeSources::new([2, 4]).pin_mask(), 0b1_0100);
    /// ```
    pub fn pin_mask(&self) -> u64 {
        self.pins
            .iter()
            .fold(0, |mask, &pin| mask | 1u64.checked_shl(u32::from(pin)).unwrap_or(0))
    }
}

/// Everything the platform needs to enter suspension
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SuspendPlan {
    /// Timer wake-up after this long
    pub duration: Duration,
    /// External wake inputs
    pub wake: WakeSources,
}

/// Board services used by the update loop
pub trait Platform: Clock + DelayNs {
    /// Error type for link management
    type Error: Debug;

    /// Take the network link down ahead of suspension
    ///
    /// The link must stay down; reconnect handlers are not to run after this.
    fn shutdown_link_for_suspend(&mut self) -> Result<(), Self::Error>;

    /// Enter low-power suspension as described by `plan`
    ///
    /// On hardware this does not return: waking is a cold start. A return
    /// means suspension could not be entered.
    fn suspend(&mut self, plan: &SuspendPlan);
}
