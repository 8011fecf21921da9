//! Transaction outcome codes
//!
//! Every engine operation reports exactly one outcome. Success is `Ok`;
//! each failure kind is one [`TwiError`] variant. The numeric codes of
//! the bit-valued outcome taxonomy are kept for logging and for callers
//! that forward outcomes over a wire.

use embedded_hal::i2c::{Error as I2cError, ErrorKind, NoAcknowledgeSource};

use crate::timeout::TimedOut;

/// Outcome code of a successful operation
pub const NO_ERROR: u8 = 0x00;

/// Errors reported by the transaction engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TwiError {
    /// The addressed slave (or the receiver of a data byte) sent a NACK
    SlaveNack,
    /// Reserved: slave acknowledged. Never produced by the engine.
    SlaveAck,
    /// Another master won arbitration
    ArbitrationLost,
    /// Illegal bus condition detected by hardware
    BusError,
    /// Byte transfer attempted while this master does not own the bus
    NotBusOwner,
    /// The awaited status flag did not appear within the bound
    Timeout,
}

impl TwiError {
    /// Bit-valued outcome code
    pub const fn code(&self) -> u8 {
        match self {
            TwiError::SlaveNack => 0x01,
            TwiError::SlaveAck => 0x02,
            TwiError::ArbitrationLost => 0x04,
            TwiError::BusError => 0x08,
            TwiError::NotBusOwner => 0x10,
            TwiError::Timeout => 0x20,
        }
    }

    /// Parse a bit-valued outcome code
    ///
    /// Returns `None` for [`NO_ERROR`] and for values that are not a
    /// single known code.
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0x01 => Some(TwiError::SlaveNack),
            0x02 => Some(TwiError::SlaveAck),
            0x04 => Some(TwiError::ArbitrationLost),
            0x08 => Some(TwiError::BusError),
            0x10 => Some(TwiError::NotBusOwner),
            0x20 => Some(TwiError::Timeout),
            _ => None,
        }
    }
}

/// Bit-valued outcome code of an operation result
pub fn outcome_code<T>(result: &Result<T, TwiError>) -> u8 {
    match result {
        Ok(_) => NO_ERROR,
        Err(e) => e.code(),
    }
}

impl From<TimedOut> for TwiError {
    fn from(_: TimedOut) -> Self {
        TwiError::Timeout
    }
}

impl I2cError for TwiError {
    fn kind(&self) -> ErrorKind {
        match self {
            TwiError::SlaveNack => ErrorKind::NoAcknowledge(NoAcknowledgeSource::Unknown),
            TwiError::ArbitrationLost => ErrorKind::ArbitrationLoss,
            TwiError::BusError => ErrorKind::Bus,
            TwiError::SlaveAck | TwiError::NotBusOwner | TwiError::Timeout => ErrorKind::Other,
        }
    }
}

impl core::fmt::Display for TwiError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let msg = match self {
            TwiError::SlaveNack => "slave responded with NACK",
            TwiError::SlaveAck => "slave responded with ACK",
            TwiError::ArbitrationLost => "arbitration lost",
            TwiError::BusError => "bus error",
            TwiError::NotBusOwner => "master not controlling bus",
            TwiError::Timeout => "timeout waiting for bus",
        };
        f.write_str(msg)
    }
}
