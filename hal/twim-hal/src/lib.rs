//! Twim Hardware Abstraction Layer
//!
//! This crate defines the capability interface a TWI (I2C) master
//! peripheral has to provide to the Twim transaction engine, plus the
//! register-level types shared between the engine and chip-specific
//! implementations.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Firmware logic / embedded-hal drivers  │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  twim-core (timeout guard + engine)     │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  twim-hal (this crate - traits)         │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │  twim-hal-    │       │  twim-core    │
//! │   megaavr     │       │  sim (tests)  │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Modules
//!
//! - [`peripheral::TwiPeripheral`] - Register-level capability interface
//! - [`status::Status`] - Decoded master status register
//! - [`config::TwiConfig`] - Bus clock, pin routing and pull-up settings

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod config;
pub mod peripheral;
pub mod status;

// Re-export key types at crate root for convenience
pub use config::{PinRoute, TwiConfig};
pub use peripheral::{AckAction, Command, TwiPeripheral};
pub use status::{BusOwnership, BusState, Status};
