//! Blocking TWI master transaction engine
//!
//! Issues START/repeated START with an address+direction byte, moves
//! single bytes in either direction and issues STOP. Every wait on a
//! status flag goes through the [`TimeoutGuard`], and every completed
//! wait is turned into exactly one outcome by [`interpret`].
//!
//! # Bus state
//!
//! ```text
//!            start ok                 write/read ok
//! UNOWNED ───────────────► OWNED ◄──────────────────┐
//!    ▲                       │  └───────────────────┘
//!    └──────── stop ─────────┘
//!
//! any operation ──► BUS_ERROR (until cleared externally)
//! ```
//!
//! The engine never retries and never issues STOP on its own: after any
//! error the caller decides whether to stop or recover.
//!
//! # Usage
//!
//! ```ignore
//! let mut bus = TwiMaster::new(twi, delay, &TwiConfig::STANDARD);
//!
//! bus.start(address_byte(0x50, Direction::Write))?;
//! bus.write(0x42)?;
//! bus.stop();
//! ```

use embedded_hal::delay::DelayNs;

use twim_hal::config::TwiConfig;
use twim_hal::peripheral::{AckAction, Command, TwiPeripheral};
use twim_hal::status::{BusOwnership, Status};

use crate::error::TwiError;
use crate::timeout::{TimeoutGuard, UNIT_US};

/// Transfer direction encoded in the least-significant address bit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Direction {
    /// Master transmits
    Write = 0,
    /// Master receives
    Read = 1,
}

/// Build the address+direction byte for a 7-bit slave address
pub const fn address_byte(address: u8, direction: Direction) -> u8 {
    (address << 1) | direction as u8
}

/// Map a completed transfer's status onto an outcome
///
/// Precedence is fixed: bus error, then arbitration lost, then NACK.
pub fn interpret(status: &Status) -> Result<(), TwiError> {
    if status.bus_error {
        Err(TwiError::BusError)
    } else if status.arbitration_lost {
        Err(TwiError::ArbitrationLost)
    } else if status.nack_received {
        Err(TwiError::SlaveNack)
    } else {
        Ok(())
    }
}

/// One-time peripheral setup
///
/// Routes the pins, sets the pull-ups, writes the clock divisor, enables
/// the master and forces the bus state to idle.
pub fn configure<P: TwiPeripheral>(twi: &mut P, config: &TwiConfig) {
    twi.route_pins(config.pin_route);
    twi.set_pullups(config.pin_route, config.pull_up);

    let baud = config.baud();
    #[cfg(feature = "defmt")]
    {
        defmt::debug!(
            "twi: {} Hz bus, baud {}, {}, pull-ups {}",
            config.frequency,
            baud,
            config.pin_route,
            config.pull_up
        );
        if baud == 0 || baud == u8::MAX {
            defmt::warn!("twi: clock divisor clamped to {}", baud);
        }
    }
    twi.set_baud(baud);

    twi.enable();
    twi.set_bus_idle();
}

/// Blocking TWI master
///
/// Owns the peripheral and the timeout guard. Operations take `&mut
/// self`, so waits cannot overlap; sharing one bus between execution
/// contexts needs external locking.
pub struct TwiMaster<P, D> {
    twi: P,
    guard: TimeoutGuard<D>,
}

impl<P: TwiPeripheral, D: DelayNs> TwiMaster<P, D> {
    /// Configure the peripheral and create the master
    pub fn new(mut twi: P, delay: D, config: &TwiConfig) -> Self {
        configure(&mut twi, config);
        Self {
            twi,
            guard: TimeoutGuard::new(delay, config.timeout_us / UNIT_US),
        }
    }

    /// Wrap an already configured peripheral
    pub fn from_configured(twi: P, delay: D, timeout_us: u32) -> Self {
        Self {
            twi,
            guard: TimeoutGuard::new(delay, timeout_us / UNIT_US),
        }
    }

    /// Read the status register
    pub fn status(&mut self) -> Status {
        self.twi.status()
    }

    /// Current bus ownership, read from hardware
    pub fn bus_ownership(&mut self) -> BusOwnership {
        self.twi.status().ownership()
    }

    /// Bound applied to every blocking wait, in poll units
    pub fn timeout_bound(&self) -> u32 {
        self.guard.bound()
    }

    /// Poll units consumed by the last blocking wait
    pub fn last_wait(&self) -> u64 {
        self.guard.elapsed()
    }

    /// Send START (or repeated START) and the address+direction byte
    ///
    /// A latched bus error is reported without touching the address
    /// register; clearing it is up to the caller.
    pub fn start(&mut self, address_and_direction: u8) -> Result<(), TwiError> {
        if self.twi.status().bus_error {
            #[cfg(feature = "defmt")]
            defmt::warn!("twi: start refused, bus error latched");
            return Err(TwiError::BusError);
        }

        #[cfg(feature = "defmt")]
        defmt::trace!("twi: start {=u8:#x}", address_and_direction);

        self.twi.write_address(address_and_direction);
        self.complete(Status::transfer_complete)
    }

    /// Send a repeated START while the bus is held
    pub fn repeated_start(&mut self, address_and_direction: u8) -> Result<(), TwiError> {
        self.start(address_and_direction)
    }

    /// Transmit one byte
    pub fn write(&mut self, byte: u8) -> Result<(), TwiError> {
        self.require_ownership()?;

        self.twi.write_data(byte);
        self.complete(|status| status.write_complete)
    }

    /// Receive one byte, then acknowledge it according to `ack`
    ///
    /// [`AckAction::Ack`] asks the slave for another byte,
    /// [`AckAction::Nack`] ends the read. The NACK flag checked here is
    /// the one latched by the preceding acknowledge phase.
    pub fn read(&mut self, ack: AckAction) -> Result<u8, TwiError> {
        self.require_ownership()?;

        self.complete(|status| status.read_complete)?;

        let byte = self.twi.read_data();
        self.twi.set_ack_action(ack);
        self.twi.command(Command::ReceiveTransfer);

        Ok(byte)
    }

    /// Issue STOP
    ///
    /// Fire-and-forget: the bus is released by hardware after the call
    /// returns. Safe to call when the bus is already released.
    pub fn stop(&mut self) {
        #[cfg(feature = "defmt")]
        defmt::trace!("twi: stop");

        self.twi.command(Command::Stop);
    }

    /// Release the peripheral and the delay provider
    pub fn free(self) -> (P, D) {
        (self.twi, self.guard.free())
    }

    fn require_ownership(&mut self) -> Result<(), TwiError> {
        let ownership = self.twi.status().ownership();
        if ownership == BusOwnership::Owned {
            Ok(())
        } else {
            #[cfg(feature = "defmt")]
            defmt::warn!("twi: transfer refused, bus {}", ownership);
            Err(TwiError::NotBusOwner)
        }
    }

    /// Wait for `ready`, then interpret the status flags
    fn complete(&mut self, ready: fn(&Status) -> bool) -> Result<(), TwiError> {
        let twi = &mut self.twi;
        if let Err(e) = self.guard.await_condition(|| ready(&twi.status())) {
            #[cfg(feature = "defmt")]
            defmt::warn!("twi: no response within {} us", self.guard.bound());
            return Err(e.into());
        }

        let result = interpret(&self.twi.status());
        #[cfg(feature = "defmt")]
        {
            if let Err(e) = result {
                defmt::warn!("twi: transfer failed: {}", e);
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{outcome_code, NO_ERROR};
    use crate::sim::{Access, SimDelay, SimTwi, SlaveBehavior};
    use proptest::prelude::*;
    use twim_hal::config::{PinRoute, DEFAULT_TIMEOUT_US};
    use twim_hal::status::BusState;

    const SLAVE: u8 = 0x50;

    fn new_master(twi: &mut SimTwi) -> TwiMaster<&mut SimTwi, SimDelay> {
        TwiMaster::new(twi, SimDelay::new(), &TwiConfig::STANDARD)
    }

    /// Latch extra status flags while the master holds the bus
    fn latch<'a>(
        bus: TwiMaster<&'a mut SimTwi, SimDelay>,
        update: impl FnOnce(&mut Status),
    ) -> TwiMaster<&'a mut SimTwi, SimDelay> {
        let (twi, delay) = bus.free();
        let mut status = twi.peek_status();
        update(&mut status);
        twi.set_status(status);
        TwiMaster::from_configured(twi, delay, DEFAULT_TIMEOUT_US)
    }

    #[test]
    fn test_address_byte() {
        assert_eq!(address_byte(0x50, Direction::Write), 0xA0);
        assert_eq!(address_byte(0x50, Direction::Read), 0xA1);
    }

    #[test]
    fn test_configure_sequence() {
        let mut twi = SimTwi::new(SlaveBehavior::Responsive);
        let config = TwiConfig::STANDARD
            .pin_route(PinRoute::Alternate)
            .pull_up(true);

        configure(&mut twi, &config);

        assert_eq!(
            twi.log(),
            &[
                Access::Route(PinRoute::Alternate),
                Access::Pullups(PinRoute::Alternate, true),
                Access::Baud(85),
                Access::Enable,
                Access::BusIdle,
            ]
        );
        assert!(twi.is_enabled());
        assert_eq!(twi.peek_status().bus_state, BusState::Idle);
    }

    #[test]
    fn test_default_timeout_bound() {
        let mut twi = SimTwi::default();
        let bus = new_master(&mut twi);
        assert_eq!(bus.timeout_bound(), DEFAULT_TIMEOUT_US);
    }

    // Scenario A: successful write
    #[test]
    fn test_write_transaction() {
        let mut twi = SimTwi::new(SlaveBehavior::Responsive).with_latency(3);
        let mut bus = new_master(&mut twi);

        assert_eq!(bus.start(address_byte(SLAVE, Direction::Write)), Ok(()));
        assert_eq!(bus.bus_ownership(), BusOwnership::Owned);
        assert_eq!(bus.write(0x42), Ok(()));
        bus.stop();
        assert_eq!(bus.bus_ownership(), BusOwnership::Unowned);

        let (twi, _) = bus.free();
        assert_eq!(twi.address_writes().collect::<heapless::Vec<_, 4>>(), [0xA0]);
        assert_eq!(twi.data_writes().collect::<heapless::Vec<_, 4>>(), [0x42]);
        assert_eq!(
            twi.commands().collect::<heapless::Vec<_, 4>>(),
            [Command::Stop]
        );
    }

    // Scenario B: absent slave
    #[test]
    fn test_absent_slave_times_out() {
        let mut twi = SimTwi::new(SlaveBehavior::Absent);
        let mut bus = new_master(&mut twi);

        let result = bus.start(address_byte(SLAVE, Direction::Write));
        assert_eq!(result, Err(TwiError::Timeout));
        assert_eq!(outcome_code(&result), 0x20);

        let (_, delay) = bus.free();
        let waited = delay.elapsed_us();
        assert!(waited >= DEFAULT_TIMEOUT_US as u64);
        assert!(waited <= DEFAULT_TIMEOUT_US as u64 + 1);
    }

    // Scenario C: address NACK
    #[test]
    fn test_address_nack() {
        let mut twi = SimTwi::new(SlaveBehavior::AddressNack);
        let mut bus = new_master(&mut twi);

        assert_eq!(
            bus.start(address_byte(SLAVE, Direction::Read)),
            Err(TwiError::SlaveNack)
        );

        // No automatic STOP after an error
        let (twi, _) = bus.free();
        assert_eq!(twi.commands().count(), 0);
    }

    // Scenario D: multi-byte read
    #[test]
    fn test_multi_byte_read() {
        let mut twi = SimTwi::new(SlaveBehavior::Responsive).with_latency(2);
        twi.queue_rx(&[0xB1, 0xB2]);
        let mut bus = new_master(&mut twi);

        assert_eq!(bus.start(address_byte(SLAVE, Direction::Read)), Ok(()));
        assert_eq!(bus.read(AckAction::Ack), Ok(0xB1));
        assert_eq!(bus.read(AckAction::Nack), Ok(0xB2));
        bus.stop();

        let (twi, _) = bus.free();
        let tail = &twi.log()[5..];
        assert_eq!(
            tail,
            &[
                Access::Address(0xA1),
                Access::DataRead(0xB1),
                Access::Ack(AckAction::Ack),
                Access::Command(Command::ReceiveTransfer),
                Access::DataRead(0xB2),
                Access::Ack(AckAction::Nack),
                Access::Command(Command::ReceiveTransfer),
                Access::Command(Command::Stop),
            ]
        );
    }

    // Scenario E: pre-existing bus error
    #[test]
    fn test_start_with_latched_bus_error() {
        let mut twi = SimTwi::new(SlaveBehavior::Responsive);
        let bus = new_master(&mut twi);
        let (twi, delay) = bus.free();
        twi.inject_bus_error();
        let mut bus = TwiMaster::from_configured(twi, delay, DEFAULT_TIMEOUT_US);

        assert_eq!(
            bus.start(address_byte(SLAVE, Direction::Write)),
            Err(TwiError::BusError)
        );
        assert_eq!(bus.bus_ownership(), BusOwnership::BusError);

        let (twi, delay) = bus.free();
        assert_eq!(twi.address_writes().count(), 0);
        assert_eq!(delay.elapsed_us(), 0);
    }

    #[test]
    fn test_arbitration_lost_on_start() {
        let mut twi = SimTwi::new(SlaveBehavior::ArbitrationLost);
        let mut bus = new_master(&mut twi);

        assert_eq!(
            bus.start(address_byte(SLAVE, Direction::Write)),
            Err(TwiError::ArbitrationLost)
        );
        assert_eq!(bus.bus_ownership(), BusOwnership::OwnedByOther);
        assert_eq!(bus.write(0x01), Err(TwiError::NotBusOwner));
    }

    #[test]
    fn test_data_nack() {
        let mut twi = SimTwi::new(SlaveBehavior::DataNack);
        let mut bus = new_master(&mut twi);

        assert_eq!(bus.start(address_byte(SLAVE, Direction::Write)), Ok(()));
        assert_eq!(bus.write(0x42), Err(TwiError::SlaveNack));
    }

    #[test]
    fn test_transfer_requires_ownership() {
        let mut twi = SimTwi::new(SlaveBehavior::Responsive);
        let mut bus = new_master(&mut twi);

        assert_eq!(bus.write(0x42), Err(TwiError::NotBusOwner));
        assert_eq!(bus.read(AckAction::Ack), Err(TwiError::NotBusOwner));

        let (twi, delay) = bus.free();
        assert_eq!(twi.data_writes().count(), 0);
        assert!(!twi.log().iter().any(|a| matches!(a, Access::DataRead(_))));
        assert_eq!(delay.elapsed_us(), 0);
    }

    #[test]
    fn test_write_after_stop_is_refused() {
        let mut twi = SimTwi::new(SlaveBehavior::Responsive);
        let mut bus = new_master(&mut twi);

        assert_eq!(bus.start(address_byte(SLAVE, Direction::Write)), Ok(()));
        bus.stop();
        assert_eq!(bus.write(0x42), Err(TwiError::NotBusOwner));
    }

    #[test]
    fn test_stop_is_idempotent() {
        let mut twi = SimTwi::new(SlaveBehavior::Responsive);
        let mut bus = new_master(&mut twi);

        bus.stop();
        bus.stop();
        assert_eq!(bus.bus_ownership(), BusOwnership::Unowned);

        let (twi, delay) = bus.free();
        assert_eq!(twi.commands().count(), 2);
        assert_eq!(delay.elapsed_us(), 0);
    }

    #[test]
    fn test_repeated_start_switches_direction() {
        let mut twi = SimTwi::new(SlaveBehavior::Responsive);
        twi.queue_rx(&[0x77]);
        let mut bus = new_master(&mut twi);

        assert_eq!(bus.start(address_byte(SLAVE, Direction::Write)), Ok(()));
        assert_eq!(bus.write(0x10), Ok(()));
        assert_eq!(bus.repeated_start(address_byte(SLAVE, Direction::Read)), Ok(()));
        assert_eq!(bus.read(AckAction::Nack), Ok(0x77));
        bus.stop();

        let (twi, _) = bus.free();
        assert_eq!(
            twi.address_writes().collect::<heapless::Vec<_, 4>>(),
            [0xA0, 0xA1]
        );
    }

    #[test]
    fn test_read_timeout_when_slave_holds() {
        let mut twi = SimTwi::new(SlaveBehavior::Responsive);
        twi.queue_rx(&[0x01]);
        let mut bus = TwiMaster::new(&mut twi, SimDelay::new(), &TwiConfig::STANDARD.timeout_us(100));

        assert_eq!(bus.start(address_byte(SLAVE, Direction::Read)), Ok(()));
        assert_eq!(bus.read(AckAction::Nack), Ok(0x01));
        // NACK was sent, so no further byte is clocked in
        assert_eq!(bus.read(AckAction::Nack), Err(TwiError::Timeout));
        assert_eq!(bus.last_wait(), 101);
    }

    /// The NACK flag seen by `read` belongs to the previous acknowledge
    /// phase, not to the byte being read. A stale flag fails the read even
    /// though a byte arrived.
    #[test]
    fn test_read_reports_stale_nack_flag() {
        let mut twi = SimTwi::new(SlaveBehavior::Responsive);
        twi.queue_rx(&[0x5A]);
        let mut bus = new_master(&mut twi);

        assert_eq!(bus.start(address_byte(SLAVE, Direction::Read)), Ok(()));
        let (twi, delay) = bus.free();
        let mut status = twi.peek_status();
        status.nack_received = true;
        twi.set_status(status);

        let mut bus = TwiMaster::from_configured(twi, delay, DEFAULT_TIMEOUT_US);
        assert_eq!(bus.read(AckAction::Ack), Err(TwiError::SlaveNack));

        // No byte captured, no acknowledge issued
        let (twi, _) = bus.free();
        assert!(!twi.log().iter().any(|a| matches!(a, Access::DataRead(_))));
        assert_eq!(twi.commands().count(), 0);
    }

    #[test]
    fn test_write_reports_arbitration_lost() {
        let mut twi = SimTwi::new(SlaveBehavior::Responsive);
        let mut bus = new_master(&mut twi);

        assert_eq!(bus.start(address_byte(SLAVE, Direction::Write)), Ok(()));
        let mut bus = latch(bus, |s| s.arbitration_lost = true);
        assert_eq!(bus.write(0x42), Err(TwiError::ArbitrationLost));

        let (twi, _) = bus.free();
        assert_eq!(twi.data_writes().collect::<heapless::Vec<_, 4>>(), [0x42]);
    }

    #[test]
    fn test_write_bus_error_wins_over_arbitration() {
        let mut twi = SimTwi::new(SlaveBehavior::Responsive);
        let mut bus = new_master(&mut twi);

        assert_eq!(bus.start(address_byte(SLAVE, Direction::Write)), Ok(()));
        let mut bus = latch(bus, |s| {
            s.bus_error = true;
            s.arbitration_lost = true;
        });
        assert_eq!(bus.write(0x42), Err(TwiError::BusError));
    }

    #[test]
    fn test_read_fault_captures_nothing() {
        let faults: [(fn(&mut Status), TwiError); 2] = [
            (|s| s.bus_error = true, TwiError::BusError),
            (|s| s.arbitration_lost = true, TwiError::ArbitrationLost),
        ];

        for (fault, expected) in faults {
            let mut twi = SimTwi::new(SlaveBehavior::Responsive);
            twi.queue_rx(&[0x5A]);
            let mut bus = new_master(&mut twi);

            assert_eq!(bus.start(address_byte(SLAVE, Direction::Read)), Ok(()));
            let mut bus = latch(bus, fault);
            assert_eq!(bus.read(AckAction::Ack), Err(expected));

            let (twi, _) = bus.free();
            assert!(!twi
                .log()
                .iter()
                .any(|a| matches!(a, Access::DataRead(_) | Access::Ack(_))));
            assert_eq!(twi.commands().count(), 0);
        }
    }

    #[test]
    fn test_interpret_precedence() {
        let all = Status {
            bus_error: true,
            arbitration_lost: true,
            nack_received: true,
            write_complete: true,
            ..Status::default()
        };
        assert_eq!(interpret(&all), Err(TwiError::BusError));

        let no_bus_error = Status {
            bus_error: false,
            ..all
        };
        assert_eq!(interpret(&no_bus_error), Err(TwiError::ArbitrationLost));

        let nack_only = Status {
            arbitration_lost: false,
            ..no_bus_error
        };
        assert_eq!(interpret(&nack_only), Err(TwiError::SlaveNack));

        assert_eq!(interpret(&Status::default()), Ok(()));
    }

    proptest! {
        #[test]
        fn test_interpret_reports_one_outcome(value in any::<u8>()) {
            let status = Status::from_register(value);
            let code = outcome_code(&interpret(&status));

            prop_assert!(code == NO_ERROR || code.count_ones() == 1);
            if status.bus_error {
                prop_assert_eq!(interpret(&status), Err(TwiError::BusError));
            } else if status.arbitration_lost {
                prop_assert_eq!(interpret(&status), Err(TwiError::ArbitrationLost));
            }
        }

        #[test]
        fn test_absent_slave_bound(timeout_us in 0u32..2000) {
            let mut twi = SimTwi::new(SlaveBehavior::Absent);
            let config = TwiConfig::STANDARD.timeout_us(timeout_us);
            let mut bus = TwiMaster::new(&mut twi, SimDelay::new(), &config);

            prop_assert_eq!(
                bus.start(address_byte(SLAVE, Direction::Write)),
                Err(TwiError::Timeout)
            );

            let (_, delay) = bus.free();
            prop_assert!(delay.elapsed_us() >= timeout_us as u64);
            prop_assert!(delay.elapsed_us() <= timeout_us as u64 + 1);
        }
    }
}
