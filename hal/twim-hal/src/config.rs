//! TWI master configuration
//!
//! One-time peripheral setup: bus clock, pin routing and internal
//! pull-ups, plus the bound applied to every blocking wait.
//!
//! The clock divisor follows the megaAVR 0-series formula
//!
//! ```text
//! BAUD = (f_cpu / f_scl - f_cpu * t_rise - 10) / 2
//! ```
//!
//! where the assumed rise time depends on the bus speed band.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default bound for every blocking wait, in microseconds
pub const DEFAULT_TIMEOUT_US: u32 = 5000;

/// Default CPU clock (megaAVR 0-series internal 20 MHz oscillator)
pub const DEFAULT_CPU_HZ: u32 = 20_000_000;

/// Bus speeds below this use the standard-mode rise time
pub const STANDARD_MODE_LIMIT_HZ: u32 = 200_000;

/// Bus speeds below this use the fast-mode rise time
pub const FAST_MODE_LIMIT_HZ: u32 = 800_000;

/// SDA/SCL pin set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PinRoute {
    /// Default pin position
    #[default]
    Default,
    /// Alternate pin position selected through the port multiplexer
    Alternate,
}

/// TWI master configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TwiConfig {
    /// CPU clock feeding the peripheral, in Hz
    pub cpu_hz: u32,
    /// SCL frequency in Hz
    pub frequency: u32,
    /// Pin set carrying SDA/SCL
    pub pin_route: PinRoute,
    /// Enable the internal pull-ups on SDA/SCL
    pub pull_up: bool,
    /// Bound for every blocking wait, in microseconds
    pub timeout_us: u32,
}

impl Default for TwiConfig {
    fn default() -> Self {
        Self::STANDARD
    }
}

impl TwiConfig {
    /// Standard mode (100 kHz)
    pub const STANDARD: Self = Self::with_frequency(100_000);

    /// Fast mode (400 kHz)
    pub const FAST: Self = Self::with_frequency(400_000);

    /// Fast mode plus (1 MHz)
    pub const FAST_PLUS: Self = Self::with_frequency(1_000_000);

    /// Default settings at the given SCL frequency
    pub const fn with_frequency(frequency: u32) -> Self {
        Self {
            cpu_hz: DEFAULT_CPU_HZ,
            frequency,
            pin_route: PinRoute::Default,
            pull_up: false,
            timeout_us: DEFAULT_TIMEOUT_US,
        }
    }

    /// Set the CPU clock
    pub const fn cpu_hz(mut self, cpu_hz: u32) -> Self {
        self.cpu_hz = cpu_hz;
        self
    }

    /// Select the pin set
    pub const fn pin_route(mut self, route: PinRoute) -> Self {
        self.pin_route = route;
        self
    }

    /// Enable or disable the internal pull-ups
    pub const fn pull_up(mut self, enabled: bool) -> Self {
        self.pull_up = enabled;
        self
    }

    /// Set the wait bound in microseconds
    pub const fn timeout_us(mut self, timeout_us: u32) -> Self {
        self.timeout_us = timeout_us;
        self
    }

    /// Clock divisor for this configuration
    pub fn baud(&self) -> u8 {
        baud_for(self.cpu_hz, self.frequency)
    }
}

/// Assumed SCL rise time in nanoseconds for a bus frequency
pub const fn rise_time_ns(frequency: u32) -> u32 {
    if frequency < STANDARD_MODE_LIMIT_HZ {
        1000
    } else if frequency < FAST_MODE_LIMIT_HZ {
        300
    } else {
        120
    }
}

/// Clock divisor for the given CPU and bus frequencies
///
/// Saturates at zero for bus clocks the CPU clock cannot reach and
/// clamps to the 8-bit register range for very slow buses.
pub fn baud_for(cpu_hz: u32, frequency: u32) -> u8 {
    if frequency == 0 {
        return u8::MAX;
    }

    let cpu_hz = cpu_hz as u64;
    let rise_cycles = cpu_hz * rise_time_ns(frequency) as u64 / 1_000_000_000;
    let baud = (cpu_hz / frequency as u64)
        .saturating_sub(rise_cycles)
        .saturating_sub(10)
        / 2;

    baud.min(u8::MAX as u64) as u8
}
