//! TWI0 master driver for megaAVR 0-series
//!
//! Register-mapped implementation of [`TwiPeripheral`]. All accesses are
//! single-byte volatile reads/writes to the data-space addresses of the
//! TWI0, PORTMUX, PORTA and PORTC blocks.
//!
//! # Pin routing (ATmega4809)
//!
//! | Route     | Port  | SDA | SCL |
//! |-----------|-------|-----|-----|
//! | Default   | PORTA | PA2 | PA3 |
//! | Alternate | PORTC | PC2 | PC3 |

use twim_hal::config::PinRoute;
use twim_hal::peripheral::{AckAction, Command, TwiPeripheral};
use twim_hal::status::{BusState, Status};

/// Peripheral base addresses
pub mod base {
    /// Port multiplexer
    pub const PORTMUX: usize = 0x05E0;
    /// Port A
    pub const PORTA: usize = 0x0400;
    /// Port C
    pub const PORTC: usize = 0x0440;
    /// Two-wire interface 0
    pub const TWI0: usize = 0x08A0;
}

/// TWI register offsets
pub mod reg {
    /// Master control A
    pub const MCTRLA: usize = 0x03;
    /// Master control B
    pub const MCTRLB: usize = 0x04;
    /// Master status
    pub const MSTATUS: usize = 0x05;
    /// Master baud rate
    pub const MBAUD: usize = 0x06;
    /// Master address
    pub const MADDR: usize = 0x07;
    /// Master data
    pub const MDATA: usize = 0x08;
}

/// Port and port-multiplexer register offsets
pub mod port {
    /// PORTMUX TWI/SPI routing register
    pub const TWISPIROUTEA: usize = 0x03;
    /// TWI0 routing field mask
    pub const TWI0_GM: u8 = 0x30;
    /// TWI0 on the alternate pins (ALT2)
    pub const TWI0_ALT2: u8 = 0x20;
    /// SDA pin control
    pub const PIN2CTRL: usize = 0x12;
    /// SCL pin control
    pub const PIN3CTRL: usize = 0x13;
    /// Pull-up enable
    pub const PULLUPEN: u8 = 0x08;
}

/// MCTRLA bits
const ENABLE: u8 = 0x01;

/// MCTRLB bits
const MCMD_GM: u8 = 0x03;
const MCMD_RECVTRANS: u8 = 0x02;
const MCMD_STOP: u8 = 0x03;
const ACKACT_NACK: u8 = 0x04;

/// TWI0 master peripheral
///
/// Not `Clone`/`Copy`: exactly one instance may exist per bus.
pub struct Twi0 {
    _private: (),
}

impl Twi0 {
    /// Take the TWI0 peripheral
    ///
    /// # Safety
    ///
    /// The caller must make sure no other `Twi0` exists and that nothing
    /// else touches the TWI0, PORTMUX routing or SDA/SCL pin control
    /// registers while this instance is alive.
    pub unsafe fn steal() -> Self {
        Self { _private: () }
    }

    #[inline(always)]
    fn read(&self, addr: usize) -> u8 {
        // SAFETY: `addr` is one of the fixed I/O register addresses above,
        // owned exclusively through `self`.
        unsafe { core::ptr::read_volatile(addr as *const u8) }
    }

    #[inline(always)]
    fn write(&mut self, addr: usize, value: u8) {
        // SAFETY: see `read`.
        unsafe { core::ptr::write_volatile(addr as *mut u8, value) }
    }

    #[inline(always)]
    fn modify(&mut self, addr: usize, f: impl FnOnce(u8) -> u8) {
        let value = self.read(addr);
        self.write(addr, f(value));
    }

    fn port_base(route: PinRoute) -> usize {
        match route {
            PinRoute::Default => base::PORTA,
            PinRoute::Alternate => base::PORTC,
        }
    }
}

impl TwiPeripheral for Twi0 {
    fn status(&mut self) -> Status {
        Status::from_register(self.read(base::TWI0 + reg::MSTATUS))
    }

    fn write_address(&mut self, address: u8) {
        self.write(base::TWI0 + reg::MADDR, address);
    }

    fn write_data(&mut self, byte: u8) {
        self.write(base::TWI0 + reg::MDATA, byte);
    }

    fn read_data(&mut self) -> u8 {
        self.read(base::TWI0 + reg::MDATA)
    }

    fn set_ack_action(&mut self, ack: AckAction) {
        let value = match ack {
            AckAction::Ack => 0,
            AckAction::Nack => ACKACT_NACK,
        };
        self.write(base::TWI0 + reg::MCTRLB, value);
    }

    fn command(&mut self, command: Command) {
        let mcmd = match command {
            Command::ReceiveTransfer => MCMD_RECVTRANS,
            Command::Stop => MCMD_STOP,
        };
        self.modify(base::TWI0 + reg::MCTRLB, |v| (v & !MCMD_GM) | mcmd);
    }

    fn set_baud(&mut self, baud: u8) {
        self.write(base::TWI0 + reg::MBAUD, baud);
    }

    fn enable(&mut self) {
        self.write(base::TWI0 + reg::MCTRLA, ENABLE);
    }

    fn set_bus_idle(&mut self) {
        self.write(base::TWI0 + reg::MSTATUS, BusState::Idle.bits());
    }

    fn route_pins(&mut self, route: PinRoute) {
        let addr = base::PORTMUX + port::TWISPIROUTEA;
        match route {
            PinRoute::Default => self.modify(addr, |v| v & !port::TWI0_GM),
            PinRoute::Alternate => self.modify(addr, |v| (v & !port::TWI0_GM) | port::TWI0_ALT2),
        }
    }

    fn set_pullups(&mut self, route: PinRoute, enabled: bool) {
        let port_base = Self::port_base(route);
        for pin in [port::PIN2CTRL, port::PIN3CTRL] {
            if enabled {
                self.modify(port_base + pin, |v| v | port::PULLUPEN);
            } else {
                self.modify(port_base + pin, |v| v & !port::PULLUPEN);
            }
        }
    }
}
