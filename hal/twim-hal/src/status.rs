//! Master status register model
//!
//! The layout follows the megaAVR 0-series `TWIn.MSTATUS` register:
//!
//! | Bit | Name     | Meaning                                   |
//! |-----|----------|-------------------------------------------|
//! | 7   | RIF      | Read interrupt flag (byte received)       |
//! | 6   | WIF      | Write interrupt flag (byte/address sent)  |
//! | 5   | CLKHOLD  | Master is holding SCL low                 |
//! | 4   | RXACK    | Last acknowledge received was a NACK      |
//! | 3   | ARBLOST  | Arbitration lost                          |
//! | 2   | BUSERR   | Illegal bus condition detected            |
//! | 1:0 | BUSSTATE | Unknown / Idle / Owner / Busy             |

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Status register bit masks
pub mod bits {
    /// Read interrupt flag
    pub const RIF: u8 = 1 << 7;
    /// Write interrupt flag
    pub const WIF: u8 = 1 << 6;
    /// Clock hold
    pub const CLKHOLD: u8 = 1 << 5;
    /// Received acknowledge (set = NACK)
    pub const RXACK: u8 = 1 << 4;
    /// Arbitration lost
    pub const ARBLOST: u8 = 1 << 3;
    /// Bus error
    pub const BUSERR: u8 = 1 << 2;
    /// Bus state group mask
    pub const BUSSTATE_MASK: u8 = 0x03;
}

/// Bus state as reported by the BUSSTATE field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BusState {
    /// Bus state unknown (after reset or a bus error)
    #[default]
    Unknown,
    /// Bus is idle
    Idle,
    /// This master owns the bus
    Owner,
    /// Another master owns the bus
    Busy,
}

impl BusState {
    /// Decode the two BUSSTATE bits
    pub const fn from_bits(value: u8) -> Self {
        match value & bits::BUSSTATE_MASK {
            0 => BusState::Unknown,
            1 => BusState::Idle,
            2 => BusState::Owner,
            _ => BusState::Busy,
        }
    }

    /// Encode into the two BUSSTATE bits
    pub const fn bits(self) -> u8 {
        match self {
            BusState::Unknown => 0,
            BusState::Idle => 1,
            BusState::Owner => 2,
            BusState::Busy => 3,
        }
    }
}

/// Bus ownership from the point of view of this master
///
/// Derived on demand from [`BusState`]; never cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusOwnership {
    /// Nobody holds the bus
    Unowned,
    /// This master holds the bus; byte transfers are allowed
    Owned,
    /// Another master holds the bus
    OwnedByOther,
    /// Bus state lost after an illegal bus condition
    BusError,
}

impl From<BusState> for BusOwnership {
    fn from(state: BusState) -> Self {
        match state {
            BusState::Idle => BusOwnership::Unowned,
            BusState::Owner => BusOwnership::Owned,
            BusState::Busy => BusOwnership::OwnedByOther,
            BusState::Unknown => BusOwnership::BusError,
        }
    }
}

/// Decoded master status register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Status {
    /// A byte has been received (read phase complete)
    pub read_complete: bool,
    /// A byte or address has been sent (write phase complete)
    pub write_complete: bool,
    /// Master is stretching the clock
    pub clock_hold: bool,
    /// The last acknowledge bit received was a NACK
    pub nack_received: bool,
    /// Arbitration was lost to another master
    pub arbitration_lost: bool,
    /// Illegal START/STOP placement detected
    pub bus_error: bool,
    /// Current bus state
    pub bus_state: BusState,
}

impl Status {
    /// Parse from a raw MSTATUS register value
    pub const fn from_register(value: u8) -> Self {
        Self {
            read_complete: value & bits::RIF != 0,
            write_complete: value & bits::WIF != 0,
            clock_hold: value & bits::CLKHOLD != 0,
            nack_received: value & bits::RXACK != 0,
            arbitration_lost: value & bits::ARBLOST != 0,
            bus_error: value & bits::BUSERR != 0,
            bus_state: BusState::from_bits(value),
        }
    }

    /// Encode back into a raw MSTATUS register value
    pub const fn to_register(&self) -> u8 {
        let mut value = self.bus_state.bits();
        if self.read_complete {
            value |= bits::RIF;
        }
        if self.write_complete {
            value |= bits::WIF;
        }
        if self.clock_hold {
            value |= bits::CLKHOLD;
        }
        if self.nack_received {
            value |= bits::RXACK;
        }
        if self.arbitration_lost {
            value |= bits::ARBLOST;
        }
        if self.bus_error {
            value |= bits::BUSERR;
        }
        value
    }

    /// Either transfer phase has completed
    pub const fn transfer_complete(&self) -> bool {
        self.read_complete || self.write_complete
    }

    /// Ownership of the bus as seen from this master
    pub fn ownership(&self) -> BusOwnership {
        self.bus_state.into()
    }
}
