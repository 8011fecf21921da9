//! megaAVR 0-series HAL for Twim
//!
//! This crate provides the register-mapped [`twim_hal::TwiPeripheral`]
//! implementation for the TWI0 master of the megaAVR 0-series:
//!
//! - ATmega4809 / ATmega4808
//! - ATmega3209 / ATmega3208
//!
//! # Usage
//!
//! ```ignore
//! let twi = unsafe { Twi0::steal() };
//! let mut bus = TwiMaster::new(twi, delay, &TwiConfig::STANDARD.pull_up(true));
//! ```

#![no_std]

pub mod twi;

pub use twi::Twi0;
