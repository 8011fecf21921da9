//! TWI master peripheral abstraction
//!
//! Provides the minimal register-level capabilities the transaction
//! engine needs. A register-mapped implementation drives the real
//! hardware; a simulated one backs the host test suite.

use crate::config::PinRoute;
use crate::status::Status;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Acknowledge action sent after the next received byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AckAction {
    /// Acknowledge: more bytes are wanted
    #[default]
    Ack,
    /// Negative acknowledge: this is the last byte
    Nack,
}

/// Master command written to the command field of the control register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// Send the acknowledge action, then receive the next byte
    ReceiveTransfer,
    /// Send the acknowledge action, then issue a STOP condition
    Stop,
}

/// TWI master peripheral
///
/// There is exactly one implementor instance per physical bus. Methods
/// map one-to-one onto register accesses and never block.
pub trait TwiPeripheral {
    /// Read the master status register
    fn status(&mut self) -> Status;

    /// Write the address register
    ///
    /// Hardware generates a START (or a repeated START when it already
    /// owns the bus) followed by the address+direction byte.
    fn write_address(&mut self, address: u8);

    /// Write the data register; hardware starts shifting the byte out
    fn write_data(&mut self, byte: u8);

    /// Read the data register
    fn read_data(&mut self) -> u8;

    /// Program the acknowledge action used by the next command
    fn set_ack_action(&mut self, ack: AckAction);

    /// Issue a master command
    fn command(&mut self, command: Command);

    /// Write the bus clock divisor
    fn set_baud(&mut self, baud: u8);

    /// Enable the master
    fn enable(&mut self);

    /// Force the bus state to idle
    fn set_bus_idle(&mut self);

    /// Select the SDA/SCL pin set
    fn route_pins(&mut self, route: PinRoute);

    /// Enable or disable the internal pull-ups on the pins of `route`
    fn set_pullups(&mut self, route: PinRoute, enabled: bool);
}

impl<T: TwiPeripheral + ?Sized> TwiPeripheral for &mut T {
    fn status(&mut self) -> Status {
        T::status(self)
    }

    fn write_address(&mut self, address: u8) {
        T::write_address(self, address)
    }

    fn write_data(&mut self, byte: u8) {
        T::write_data(self, byte)
    }

    fn read_data(&mut self) -> u8 {
        T::read_data(self)
    }

    fn set_ack_action(&mut self, ack: AckAction) {
        T::set_ack_action(self, ack)
    }

    fn command(&mut self, command: Command) {
        T::command(self, command)
    }

    fn set_baud(&mut self, baud: u8) {
        T::set_baud(self, baud)
    }

    fn enable(&mut self) {
        T::enable(self)
    }

    fn set_bus_idle(&mut self) {
        T::set_bus_idle(self)
    }

    fn route_pins(&mut self, route: PinRoute) {
        T::route_pins(self, route)
    }

    fn set_pullups(&mut self, route: PinRoute, enabled: bool) {
        T::set_pullups(self, route, enabled)
    }
}
