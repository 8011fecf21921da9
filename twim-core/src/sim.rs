//! Software-simulated TWI master peripheral
//!
//! Scripts the behavior of a single slave and records every register
//! access, so transaction sequences can be checked on the host without
//! hardware or wall-clock waits.
//!
//! ```ignore
//! let mut twi = SimTwi::new(SlaveBehavior::Responsive);
//! twi.queue_rx(&[0x12, 0x34]);
//! let mut bus = TwiMaster::new(&mut twi, SimDelay::new(), &TwiConfig::STANDARD);
//! ```

use embedded_hal::delay::DelayNs;
use heapless::{Deque, Vec};

use twim_hal::config::PinRoute;
use twim_hal::peripheral::{AckAction, Command, TwiPeripheral};
use twim_hal::status::{BusState, Status};

/// Maximum number of recorded register accesses
pub const LOG_CAPACITY: usize = 64;

/// Maximum number of queued receive bytes
pub const RX_CAPACITY: usize = 32;

/// Byte clocked in when the slave has nothing queued (released SDA)
pub const IDLE_BYTE: u8 = 0xFF;

/// Delay provider that only counts the time it was asked to wait
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimDelay {
    elapsed_ns: u64,
}

impl SimDelay {
    /// Create a delay with nothing elapsed
    pub const fn new() -> Self {
        Self { elapsed_ns: 0 }
    }

    /// Total time waited, in nanoseconds
    pub fn elapsed_ns(&self) -> u64 {
        self.elapsed_ns
    }

    /// Total time waited, in whole microseconds
    pub fn elapsed_us(&self) -> u64 {
        self.elapsed_ns / 1000
    }
}

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.elapsed_ns += ns as u64;
    }
}

/// Scripted behavior of the simulated slave
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlaveBehavior {
    /// Acknowledges its address and every data byte
    #[default]
    Responsive,
    /// Never completes the address phase
    Absent,
    /// Answers its address with a NACK
    AddressNack,
    /// Acknowledges its address, NACKs every data byte
    DataNack,
    /// Another master wins arbitration during the address phase
    ArbitrationLost,
}

/// A recorded register access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Address register written
    Address(u8),
    /// Data register written
    Data(u8),
    /// Data register read
    DataRead(u8),
    /// Acknowledge action programmed
    Ack(AckAction),
    /// Master command issued
    Command(Command),
    /// Clock divisor written
    Baud(u8),
    /// Master enabled
    Enable,
    /// Bus state forced to idle
    BusIdle,
    /// Pin set selected
    Route(PinRoute),
    /// Pull-ups changed on a pin set
    Pullups(PinRoute, bool),
}

/// Status change that becomes visible after a number of polls
#[derive(Debug, Clone, Copy)]
struct Pending {
    remaining: u32,
    status: Status,
}

/// Simulated TWI master with one scripted slave
#[derive(Debug, Clone)]
pub struct SimTwi {
    behavior: SlaveBehavior,
    status: Status,
    data: u8,
    ack: AckAction,
    latency: u32,
    pending: Option<Pending>,
    rx: Deque<u8, RX_CAPACITY>,
    log: Vec<Access, LOG_CAPACITY>,
    enabled: bool,
}

impl Default for SimTwi {
    fn default() -> Self {
        Self::new(SlaveBehavior::default())
    }
}

impl SimTwi {
    /// Create a simulated peripheral in its reset state
    pub fn new(behavior: SlaveBehavior) -> Self {
        Self {
            behavior,
            status: Status::default(),
            data: 0,
            ack: AckAction::Ack,
            latency: 0,
            pending: None,
            rx: Deque::new(),
            log: Vec::new(),
            enabled: false,
        }
    }

    /// Number of status polls before a transfer completes
    pub fn with_latency(mut self, polls: u32) -> Self {
        self.latency = polls;
        self
    }

    /// Change the slave behavior
    pub fn set_behavior(&mut self, behavior: SlaveBehavior) {
        self.behavior = behavior;
    }

    /// Queue bytes the slave sends on subsequent reads
    pub fn queue_rx(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.rx.push_back(byte).expect("sim rx queue full");
        }
    }

    /// Latch a bus error as the hardware would on an illegal condition
    pub fn inject_bus_error(&mut self) {
        self.status.bus_error = true;
        self.status.bus_state = BusState::Unknown;
    }

    /// Overwrite the status register
    pub fn set_status(&mut self, status: Status) {
        self.status = status;
        self.pending = None;
    }

    /// Current status without advancing pending completions
    pub fn peek_status(&self) -> Status {
        self.status
    }

    /// Whether the master has been enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// All recorded register accesses in order
    pub fn log(&self) -> &[Access] {
        &self.log
    }

    /// Forget recorded accesses
    pub fn clear_log(&mut self) {
        self.log.clear();
    }

    /// Bytes written to the address register
    pub fn address_writes(&self) -> impl Iterator<Item = u8> + '_ {
        self.log.iter().filter_map(|a| match a {
            Access::Address(addr) => Some(*addr),
            _ => None,
        })
    }

    /// Bytes written to the data register
    pub fn data_writes(&self) -> impl Iterator<Item = u8> + '_ {
        self.log.iter().filter_map(|a| match a {
            Access::Data(byte) => Some(*byte),
            _ => None,
        })
    }

    /// Master commands issued
    pub fn commands(&self) -> impl Iterator<Item = Command> + '_ {
        self.log.iter().filter_map(|a| match a {
            Access::Command(cmd) => Some(*cmd),
            _ => None,
        })
    }

    fn record(&mut self, access: Access) {
        self.log.push(access).expect("sim access log full");
    }

    /// Schedule a status change after the configured latency
    fn complete(&mut self, status: Status) {
        if self.latency == 0 {
            self.status = status;
        } else {
            self.pending = Some(Pending {
                remaining: self.latency,
                status,
            });
        }
    }

    /// Clock in the next byte from the slave
    fn receive_next(&mut self) {
        self.data = self.rx.pop_front().unwrap_or(IDLE_BYTE);
        let mut next = self.status;
        next.read_complete = true;
        self.complete(next);
    }

    fn address_phase(&mut self, address: u8) {
        self.status.read_complete = false;
        self.status.write_complete = false;

        let mut next = self.status;
        match self.behavior {
            SlaveBehavior::Absent => {}
            SlaveBehavior::ArbitrationLost => {
                next.arbitration_lost = true;
                next.write_complete = true;
                next.bus_state = BusState::Busy;
                self.complete(next);
            }
            SlaveBehavior::AddressNack => {
                next.nack_received = true;
                next.write_complete = true;
                next.bus_state = BusState::Owner;
                self.complete(next);
            }
            SlaveBehavior::Responsive | SlaveBehavior::DataNack => {
                self.status.nack_received = false;
                self.status.bus_state = BusState::Owner;
                if address & 1 == 1 {
                    self.receive_next();
                } else {
                    let mut next = self.status;
                    next.write_complete = true;
                    self.complete(next);
                }
            }
        }
    }
}

impl TwiPeripheral for SimTwi {
    fn status(&mut self) -> Status {
        if let Some(pending) = self.pending.as_mut() {
            if pending.remaining == 0 {
                self.status = pending.status;
                self.pending = None;
            } else {
                pending.remaining -= 1;
            }
        }
        self.status
    }

    fn write_address(&mut self, address: u8) {
        self.record(Access::Address(address));
        self.address_phase(address);
    }

    fn write_data(&mut self, byte: u8) {
        self.record(Access::Data(byte));
        self.status.read_complete = false;
        self.status.write_complete = false;

        if self.status.bus_state != BusState::Owner || self.behavior == SlaveBehavior::Absent {
            return;
        }

        let mut next = self.status;
        next.write_complete = true;
        next.nack_received = self.behavior == SlaveBehavior::DataNack;
        self.complete(next);
    }

    fn read_data(&mut self) -> u8 {
        self.record(Access::DataRead(self.data));
        self.data
    }

    fn set_ack_action(&mut self, ack: AckAction) {
        self.record(Access::Ack(ack));
        self.ack = ack;
    }

    fn command(&mut self, command: Command) {
        self.record(Access::Command(command));
        match command {
            Command::ReceiveTransfer => {
                self.status.read_complete = false;
                if self.ack == AckAction::Ack {
                    self.receive_next();
                }
            }
            Command::Stop => {
                self.pending = None;
                self.status.read_complete = false;
                self.status.write_complete = false;
                if !self.status.bus_error {
                    self.status.bus_state = BusState::Idle;
                }
            }
        }
    }

    fn set_baud(&mut self, baud: u8) {
        self.record(Access::Baud(baud));
    }

    fn enable(&mut self) {
        self.record(Access::Enable);
        self.enabled = true;
    }

    fn set_bus_idle(&mut self) {
        self.record(Access::BusIdle);
        self.status.bus_state = BusState::Idle;
    }

    fn route_pins(&mut self, route: PinRoute) {
        self.record(Access::Route(route));
    }

    fn set_pullups(&mut self, route: PinRoute, enabled: bool) {
        self.record(Access::Pullups(route, enabled));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_counts_time() {
        let mut delay = SimDelay::new();
        delay.delay_us(3);
        delay.delay_ns(500);
        assert_eq!(delay.elapsed_ns(), 3500);
        assert_eq!(delay.elapsed_us(), 3);
    }

    #[test]
    fn test_latency_delays_completion() {
        let mut twi = SimTwi::new(SlaveBehavior::Responsive).with_latency(2);
        twi.set_bus_idle();
        twi.write_address(0x50 << 1);

        assert!(!twi.status().write_complete);
        assert!(!twi.status().write_complete);
        assert!(twi.status().write_complete);
    }

    #[test]
    fn test_absent_slave_never_completes() {
        let mut twi = SimTwi::new(SlaveBehavior::Absent);
        twi.set_bus_idle();
        twi.write_address(0x50 << 1);

        for _ in 0..100 {
            assert!(!twi.status().transfer_complete());
        }
    }

    #[test]
    fn test_read_address_clocks_first_byte() {
        let mut twi = SimTwi::new(SlaveBehavior::Responsive);
        twi.queue_rx(&[0xA5]);
        twi.write_address((0x50 << 1) | 1);

        let status = twi.status();
        assert!(status.read_complete);
        assert_eq!(status.bus_state, BusState::Owner);
        assert_eq!(twi.read_data(), 0xA5);
    }

    #[test]
    fn test_stop_releases_bus() {
        let mut twi = SimTwi::new(SlaveBehavior::Responsive);
        twi.write_address(0x50 << 1);
        twi.command(Command::Stop);

        assert_eq!(twi.status().bus_state, BusState::Idle);
        assert_eq!(twi.commands().count(), 1);
    }
}
