//! Bounded busy-wait
//!
//! Turns an open-ended status poll into one that gives up after a fixed
//! number of time units. The guard owns its elapsed-unit counter, so two
//! buses never share a bound and `&mut self` keeps waits from nesting.
//!
//! The wait is a pure spin: no yielding and no sleeping of the execution
//! context beyond the per-unit delay.

use embedded_hal::delay::DelayNs;

/// Length of one poll unit in microseconds
pub const UNIT_US: u32 = 1;

/// The awaited condition did not hold within the bound
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimedOut;

/// Bounded busy-wait with an injectable delay
pub struct TimeoutGuard<D> {
    delay: D,
    /// Maximum number of units a wait may consume before timing out
    bound: u32,
    /// Units consumed by the current (or last) wait
    elapsed: u64,
}

impl<D: DelayNs> TimeoutGuard<D> {
    /// Create a guard with the given bound in poll units
    pub fn new(delay: D, bound: u32) -> Self {
        Self {
            delay,
            bound,
            elapsed: 0,
        }
    }

    /// Configured bound in poll units
    pub fn bound(&self) -> u32 {
        self.bound
    }

    /// Change the bound used by subsequent waits
    pub fn set_bound(&mut self, bound: u32) {
        self.bound = bound;
    }

    /// Units consumed by the last wait
    pub fn elapsed(&self) -> u64 {
        self.elapsed
    }

    /// Spin until `ready` returns true or the bound is exceeded
    ///
    /// `ready` is checked before every delay, so a condition that
    /// already holds returns immediately without waiting. Once the
    /// counter exceeds the bound the wait ends without checking `ready`
    /// again.
    pub fn await_condition<F>(&mut self, mut ready: F) -> Result<(), TimedOut>
    where
        F: FnMut() -> bool,
    {
        self.elapsed = 0;

        loop {
            if ready() {
                return Ok(());
            }

            self.delay.delay_us(UNIT_US);
            self.elapsed += 1;

            if self.elapsed > self.bound as u64 {
                return Err(TimedOut);
            }
        }
    }

    /// Release the delay provider
    pub fn free(self) -> D {
        self.delay
    }
}
