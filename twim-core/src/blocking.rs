//! `embedded-hal` blocking I2C adapter
//!
//! Lets device drivers written against [`embedded_hal::i2c::I2c`] run on
//! top of [`TwiMaster`]. Each run of same-direction operations starts
//! with a (repeated) START, every received byte is ACKed except the
//! last one of a run, and the transaction always ends with STOP.
//!
//! Unlike the raw engine, this layer issues STOP after an error too:
//! the `embedded-hal` contract expects the bus released when
//! `transaction` returns.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{ErrorType, I2c, Operation, SevenBitAddress};

use twim_hal::peripheral::{AckAction, TwiPeripheral};

use crate::error::TwiError;
use crate::master::{address_byte, Direction, TwiMaster};

impl<P: TwiPeripheral, D: DelayNs> ErrorType for TwiMaster<P, D> {
    type Error = TwiError;
}

impl<P: TwiPeripheral, D: DelayNs> I2c<SevenBitAddress> for TwiMaster<P, D> {
    fn transaction(
        &mut self,
        address: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        if operations.is_empty() {
            return Ok(());
        }

        let result = self.run_operations(address, operations);
        self.stop();
        result
    }
}

impl<P: TwiPeripheral, D: DelayNs> TwiMaster<P, D> {
    fn run_operations(
        &mut self,
        address: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), TwiError> {
        let mut previous = None;

        for i in 0..operations.len() {
            // Bytes still to come in this run of adjacent reads
            let more_reads = operations[i + 1..]
                .iter()
                .take_while(|op| matches!(op, Operation::Read(_)))
                .any(|op| matches!(op, Operation::Read(buf) if !buf.is_empty()));

            match &mut operations[i] {
                Operation::Write(bytes) => {
                    if previous != Some(Direction::Write) {
                        self.start(address_byte(address, Direction::Write))?;
                    }
                    for &byte in bytes.iter() {
                        self.write(byte)?;
                    }
                    previous = Some(Direction::Write);
                }
                Operation::Read(buf) => {
                    if previous != Some(Direction::Read) {
                        self.start(address_byte(address, Direction::Read))?;
                    }
                    let len = buf.len();
                    for (j, slot) in buf.iter_mut().enumerate() {
                        let last = !more_reads && j + 1 == len;
                        let ack = if last { AckAction::Nack } else { AckAction::Ack };
                        *slot = self.read(ack)?;
                    }
                    previous = Some(Direction::Read);
                }
            }
        }

        Ok(())
    }

    /// Check whether a slave acknowledges its address
    ///
    /// Sends START with the write direction, then STOP. Only a NACK maps
    /// to `Ok(false)`; other failures are passed through.
    pub fn probe(&mut self, address: SevenBitAddress) -> Result<bool, TwiError> {
        let result = self.start(address_byte(address, Direction::Write));
        self.stop();

        match result {
            Ok(()) => Ok(true),
            Err(TwiError::SlaveNack) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
