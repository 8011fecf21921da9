//! Board-agnostic blocking TWI (I2C) master
//!
//! This crate contains the transaction logic that does not depend on a
//! specific chip:
//!
//! - Timeout guard bounding every status poll
//! - Transaction engine (start, write, read, stop)
//! - Status interpretation into a single outcome per call
//! - `embedded-hal` blocking I2C adapter
//! - Simulated peripheral for host tests (`sim` feature)
//!
//! Hardware access goes through [`twim_hal::TwiPeripheral`].

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod blocking;
pub mod error;
pub mod master;
#[cfg(any(test, feature = "sim"))]
pub mod sim;
pub mod timeout;

pub use error::{outcome_code, TwiError, NO_ERROR};
pub use master::{address_byte, configure, interpret, Direction, TwiMaster};
pub use timeout::{TimedOut, TimeoutGuard};

// Re-export HAL types used in the public API
pub use twim_hal::{AckAction, BusOwnership, PinRoute, Status, TwiConfig, TwiPeripheral};
