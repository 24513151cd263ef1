//! Support for the `RTC Pi` board, a `DS1307` "64 x 8, Serial, I2C Real-Time Clock"
//!
//! Datasheet: https://www.analog.com/media/en/technical-documentation/data-sheets/DS1307.pdf
//!
//! The clock keeps a two digit year, the century is held by the driver.  Registers `0x08` to
//! `0x3F` are 56 bytes of battery-backed SRAM.
use crate::bcd::{self, ClockRegisters};
use crate::bits::BitField;
use crate::bus::I2cExt;
use crate::link::{ConnectedDevice, Link};
use crate::shadow::{RegisterShadow, ShadowRegister};
use crate::{Argument, Error};
use chrono::NaiveDateTime;

pub const DEFAULT_ADDRESS: u8 = 0x68;
pub const DEFAULT_CENTURY: i32 = 2000;

/// First byte of the battery-backed memory.
pub const MEMORY_START: u8 = 0x08;
/// Last byte of the battery-backed memory.
pub const MEMORY_END: u8 = 0x3f;
/// Size of the battery-backed memory.
pub const MEMORY_SIZE: usize = 56;

/// Control register after power-up of the board: output off, 32.768 kHz selected.
const CONTROL_RESET: u8 = 0x03;

const BIT_RS0: u8 = 0;
const BIT_RS1: u8 = 1;
const BIT_SQWE: u8 = 4;
const BIT_OUT: u8 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Regs {
    Seconds = 0x00,
    Control = 0x07,
}

impl From<Regs> for u8 {
    fn from(r: Regs) -> u8 {
        r as u8
    }
}

// Only the control register is shadowed, the clock registers are always read from the chip.
impl ShadowRegister for Regs {
    fn slot(self) -> usize {
        0
    }
}

/// Frequency of the square wave output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SquareWave {
    Hz1,
    Hz4096,
    Hz8192,
    Hz32768,
}

impl SquareWave {
    pub const fn hz(self) -> u32 {
        match self {
            SquareWave::Hz1 => 1,
            SquareWave::Hz4096 => 4096,
            SquareWave::Hz8192 => 8192,
            SquareWave::Hz32768 => 32768,
        }
    }

    const fn rate_bits(self) -> u8 {
        match self {
            SquareWave::Hz1 => 0b00,
            SquareWave::Hz4096 => 0b01,
            SquareWave::Hz8192 => 0b10,
            SquareWave::Hz32768 => 0b11,
        }
    }

    fn from_control(control: u8) -> Self {
        match (control.bit(BIT_RS1), control.bit(BIT_RS0)) {
            (false, false) => SquareWave::Hz1,
            (false, true) => SquareWave::Hz4096,
            (true, false) => SquareWave::Hz8192,
            (true, true) => SquareWave::Hz32768,
        }
    }
}

/// `RTC Pi` board.
pub struct RtcPi<I2C> {
    link: Link<I2C>,
    addr: u8,
    century: i32,
    control: RegisterShadow<Regs, 1>,
}

impl<I2C> RtcPi<I2C> {
    pub fn new(address: u8) -> Self {
        Self {
            link: Link::new(),
            addr: address,
            century: DEFAULT_CENTURY,
            control: RegisterShadow::new([CONTROL_RESET]),
        }
    }

    /// Use `century` instead of 2000 as base for the two digit year.
    pub fn with_century(mut self, century: i32) -> Self {
        self.century = century;
        self
    }

    pub fn century(&self) -> i32 {
        self.century
    }

    /// Base added to the two digit year of the clock.
    pub fn set_century(&mut self, century: i32) {
        self.century = century;
    }
}

impl<I2C> Default for RtcPi<I2C> {
    fn default() -> Self {
        Self::new(DEFAULT_ADDRESS)
    }
}

impl<I2C: crate::I2cBus> RtcPi<I2C> {
    /// Current date and time.
    ///
    /// If the clock registers do not hold a valid date (e.g. after a battery failure), the
    /// fallback date 1990-01-01 01:01:01 is returned.  Bus errors are still reported.
    pub fn date_time(&mut self) -> Result<NaiveDateTime, Error<I2C::Error>> {
        let bus = self.link.get()?;
        let mut regs: ClockRegisters = [0x00; 7];
        bus.read_block(self.addr, Regs::Seconds, &mut regs)
            .map_err(Error::Bus)?;
        Ok(bcd::decode_date_time(&regs, self.century))
    }

    /// Set date and time.  The year must lie within the configured century.
    pub fn set_date_time(&mut self, date: &NaiveDateTime) -> Result<(), Error<I2C::Error>> {
        let regs = bcd::encode_date_time(date, self.century).ok_or(Argument::Year)?;
        let bus = self.link.get()?;
        bus.write_block(self.addr, Regs::Seconds, &regs)
            .map_err(Error::Bus)
    }

    /// Enable or disable the square wave output.
    pub fn set_output(&mut self, enable: bool) -> Result<(), Error<I2C::Error>> {
        let bus = self.link.get()?;
        self.control.update_bit(Regs::Control, BIT_OUT, enable);
        self.control.update_bit(Regs::Control, BIT_SQWE, enable);
        self.control
            .write_back(bus, self.addr, Regs::Control)
            .map_err(Error::Bus)
    }

    /// Whether the square wave output is enabled, read from the chip.
    pub fn output(&mut self) -> Result<bool, Error<I2C::Error>> {
        Ok(self.read_control()?.bit(BIT_OUT))
    }

    /// Select the frequency of the square wave output.
    pub fn set_frequency(&mut self, frequency: SquareWave) -> Result<(), Error<I2C::Error>> {
        let bus = self.link.get()?;
        let bits = frequency.rate_bits();
        self.control.update_bit(Regs::Control, BIT_RS0, bits.bit(0));
        self.control.update_bit(Regs::Control, BIT_RS1, bits.bit(1));
        self.control
            .write_back(bus, self.addr, Regs::Control)
            .map_err(Error::Bus)
    }

    /// Frequency of the square wave output, read from the chip.
    pub fn frequency(&mut self) -> Result<SquareWave, Error<I2C::Error>> {
        Ok(SquareWave::from_control(self.read_control()?))
    }

    /// Write `data` to the battery-backed memory starting at `address` (0x08-0x3F).
    ///
    /// Fails with [`Error::Overflow`] if the data does not fit before the end of the memory.
    pub fn write_memory(&mut self, address: u8, data: &[u8]) -> Result<(), Error<I2C::Error>> {
        check_address(address)?;
        if usize::from(address) + data.len() > usize::from(MEMORY_END) + 1 {
            return Err(Error::Overflow);
        }
        let bus = self.link.get()?;
        if data.is_empty() {
            return Ok(());
        }
        bus.write_block(self.addr, address, data)
            .map_err(Error::Bus)
    }

    /// Read `len` bytes of battery-backed memory starting at `address` (0x08-0x3F).
    pub fn read_memory(
        &mut self,
        address: u8,
        len: usize,
    ) -> Result<heapless::Vec<u8, MEMORY_SIZE>, Error<I2C::Error>> {
        check_address(address)?;
        if usize::from(address) + len > usize::from(MEMORY_END) + 1 {
            return Err(Argument::Length.into());
        }
        let bus = self.link.get()?;

        let mut buf: heapless::Vec<u8, MEMORY_SIZE> = heapless::Vec::new();
        buf.resize(len, 0x00).map_err(|_| Argument::Length)?;
        if len > 0 {
            bus.read_block(self.addr, address, &mut buf)
                .map_err(Error::Bus)?;
        }
        Ok(buf)
    }

    fn read_control(&mut self) -> Result<u8, Error<I2C::Error>> {
        let bus = self.link.get()?;
        let control = bus
            .read_reg(self.addr, Regs::Control)
            .map_err(Error::Bus)?;
        self.control.resync(Regs::Control, control);
        Ok(control)
    }
}

fn check_address(address: u8) -> Result<(), Argument> {
    if (MEMORY_START..=MEMORY_END).contains(&address) {
        Ok(())
    } else {
        Err(Argument::Address)
    }
}

impl<I2C: crate::I2cBus> ConnectedDevice for RtcPi<I2C> {
    type Handle = I2C;
    type Error = Error<I2C::Error>;

    fn connect(&mut self, handle: Self::Handle) -> Result<(), Self::Error> {
        self.link.attach(handle)?;
        debug!("rtc connected at {:#x}", self.addr);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.link.is_connected()
    }

    fn release(&mut self) -> Option<Self::Handle> {
        self.link.release()
    }
}
