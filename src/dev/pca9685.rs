//! Support for the `Servo Pi` board, a `PCA9685` "16-channel, 12-bit PWM Fm+ I2C-bus LED
//! controller"
//!
//! Datasheet: https://www.nxp.com/docs/en/data-sheet/PCA9685.pdf
//!
//! Channels are numbered 1-16.  Each channel has four registers holding the 12 bit counter values
//! at which the output turns on and off.  The output enable pad of the board can be wired to a
//! GPIO of the Raspberry Pi, see [`ServoPi::with_output_enable`].
use crate::bits::BitField;
use crate::bus::I2cExt;
use crate::gpio::{self, GpioController, Line, NoGpio};
use crate::link::{ConnectedDevice, Link};
use crate::pwm;
use crate::shadow::{RegisterShadow, ShadowRegister};
use crate::{Argument, Error};

pub const DEFAULT_ADDRESS: u8 = 0x40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Regs {
    /// MODE1:
    /// - Bit 7: RESTART
    /// - Bit 6: EXTCLK
    /// - Bit 5: AI: register auto increment (left disabled)
    /// - Bit 4: SLEEP: oscillator off
    /// - Bit 0: ALLCALL: respond to the all-call address
    Mode1 = 0x00,
    /// MODE2:
    /// - Bit 4: INVRT: output logic inverted
    /// - Bit 2: OUTDRV: totem pole outputs (reset value)
    Mode2 = 0x01,
    AllCallAddress = 0x05,
    PreScale = 0xfe,
}

impl From<Regs> for u8 {
    fn from(r: Regs) -> u8 {
        r as u8
    }
}

impl ShadowRegister for Regs {
    fn slot(self) -> usize {
        match self {
            Regs::Mode1 => 0,
            Regs::Mode2 => 1,
            Regs::AllCallAddress => 2,
            Regs::PreScale => 3,
        }
    }
}

const MODE1_RESTART: u8 = 7;
const MODE1_SLEEP: u8 = 4;
const MODE1_ALLCALL: u8 = 0;
const MODE2_INVRT: u8 = 4;

/// MODE1, MODE2, ALLCALLADR and PRE_SCALE after power-on.
const RESET_VALUES: [u8; 4] = [0x11, 0x04, 0xe0, 0x1e];

/// First register of `channel` (1-16).
fn channel_base(channel: u8) -> Result<u8, Argument> {
    pwm::channel_base(channel).ok_or(Argument::Channel)
}

fn check_time(time: u16, arg: Argument) -> Result<(), Argument> {
    if time <= pwm::MAX_TIME {
        Ok(())
    } else {
        Err(arg)
    }
}

/// Validate an on/off pair for the combined setters.
fn check_pair(on: u16, off: u16) -> Result<(), Argument> {
    check_time(on, Argument::OnTime)?;
    check_time(off, Argument::OffTime)?;
    if off < on {
        return Err(Argument::OffTime);
    }
    Ok(())
}

/// Write a 12 bit time into two consecutive registers starting at `reg`.
fn write_time<B: I2cExt>(bus: &mut B, addr: u8, reg: u8, time: u16) -> Result<(), B::Error> {
    let [low, high] = pwm::split_time(time);
    bus.write_reg(addr, reg, low)?;
    bus.write_reg(addr, reg + 1, high)
}

/// `Servo Pi` board.
pub struct ServoPi<I2C, G = NoGpio> {
    link: Link<I2C>,
    addr: u8,
    mode: RegisterShadow<Regs, 4>,
    output_enable: Option<Line<G>>,
}

impl<I2C> ServoPi<I2C, NoGpio> {
    pub fn new(address: u8) -> Self {
        Self {
            link: Link::new(),
            addr: address,
            mode: RegisterShadow::new(RESET_VALUES),
            output_enable: None,
        }
    }
}

impl<I2C> Default for ServoPi<I2C, NoGpio> {
    fn default() -> Self {
        Self::new(DEFAULT_ADDRESS)
    }
}

impl<I2C, G: GpioController> ServoPi<I2C, G> {
    /// Attach the GPIO line wired to the output enable pad of the board.
    ///
    /// `connect()` then drives the line high so the outputs start disabled.  Use
    /// [`output_enable`](Self::output_enable) once the channels are set up.
    pub fn with_output_enable<G2: GpioController>(self, gpio: G2, pin: u8) -> ServoPi<I2C, G2> {
        ServoPi {
            link: self.link,
            addr: self.addr,
            mode: self.mode,
            output_enable: Some(Line::new(gpio, pin)),
        }
    }

    pub fn address(&self) -> u8 {
        self.addr
    }
}

impl<I2C: crate::I2cBus, G: GpioController> ServoPi<I2C, G> {
    /// Set the PWM frequency of all channels (40 Hz to 1000 Hz).
    ///
    /// The prescaler only latches while the oscillator is off, so the chip is put to sleep, the
    /// prescaler written, the previous mode restored and the PWM restarted.
    pub fn set_pwm_frequency(&mut self, frequency: u16) -> Result<(), Error<I2C::Error>> {
        if !(pwm::MIN_FREQUENCY..=pwm::MAX_FREQUENCY).contains(&frequency) {
            return Err(Argument::Frequency.into());
        }
        let bus = self.link.get()?;
        let prescale = pwm::prescale(frequency);
        let old = self.mode.get(Regs::Mode1);
        let asleep = (old & 0x7f).with_bit(MODE1_SLEEP, true);

        debug!("pwm frequency {} Hz, prescale {}", frequency, prescale);
        bus.write_reg(self.addr, Regs::Mode1, asleep)
            .map_err(Error::Bus)?;
        bus.write_reg(self.addr, Regs::PreScale, prescale)
            .map_err(Error::Bus)?;
        self.mode.set(Regs::PreScale, prescale);
        bus.write_reg(self.addr, Regs::Mode1, old)
            .map_err(Error::Bus)?;
        bus.write_reg(self.addr, Regs::Mode1, old.with_bit(MODE1_RESTART, true))
            .map_err(Error::Bus)
    }

    /// Set on and off time (0-4095) of `channel` (1-16).  `off` must not be before `on`.
    pub fn set_pwm(&mut self, channel: u8, on: u16, off: u16) -> Result<(), Error<I2C::Error>> {
        let base = channel_base(channel)?;
        check_pair(on, off)?;
        let bus = self.link.get()?;
        write_time(bus, self.addr, base + pwm::ON, on).map_err(Error::Bus)?;
        write_time(bus, self.addr, base + pwm::OFF, off).map_err(Error::Bus)
    }

    /// Set only the on time (0-4095) of `channel` (1-16).
    pub fn set_pwm_on_time(&mut self, channel: u8, on: u16) -> Result<(), Error<I2C::Error>> {
        let base = channel_base(channel)?;
        check_time(on, Argument::OnTime)?;
        let bus = self.link.get()?;
        write_time(bus, self.addr, base + pwm::ON, on).map_err(Error::Bus)
    }

    /// Set only the off time (0-4095) of `channel` (1-16).
    pub fn set_pwm_off_time(&mut self, channel: u8, off: u16) -> Result<(), Error<I2C::Error>> {
        let base = channel_base(channel)?;
        check_time(off, Argument::OffTime)?;
        let bus = self.link.get()?;
        write_time(bus, self.addr, base + pwm::OFF, off).map_err(Error::Bus)
    }

    /// Set on and off time of all channels at once.
    pub fn set_all_pwm(&mut self, on: u16, off: u16) -> Result<(), Error<I2C::Error>> {
        check_pair(on, off)?;
        let bus = self.link.get()?;
        write_time(bus, self.addr, pwm::ALL_LED_ON_L + pwm::ON, on).map_err(Error::Bus)?;
        write_time(bus, self.addr, pwm::ALL_LED_ON_L + pwm::OFF, off).map_err(Error::Bus)
    }

    /// Put the oscillator to sleep or wake it up.
    pub fn set_sleep(&mut self, sleep: bool) -> Result<(), Error<I2C::Error>> {
        self.update_mode(Regs::Mode1, MODE1_SLEEP, sleep)
    }

    /// Whether the chip is asleep, read from the chip.
    pub fn sleep(&mut self) -> Result<bool, Error<I2C::Error>> {
        Ok(self.read_mode(Regs::Mode1)?.bit(MODE1_SLEEP))
    }

    /// Invert the outputs of all channels.
    pub fn set_invert_output(&mut self, invert: bool) -> Result<(), Error<I2C::Error>> {
        self.update_mode(Regs::Mode2, MODE2_INVRT, invert)
    }

    /// Whether the outputs are inverted, read from the chip.
    pub fn invert_output(&mut self) -> Result<bool, Error<I2C::Error>> {
        Ok(self.read_mode(Regs::Mode2)?.bit(MODE2_INVRT))
    }

    /// Enable the all-call address and set it to `address` (0x04-0x77).
    pub fn set_all_call_address(&mut self, address: u8) -> Result<(), Error<I2C::Error>> {
        if !(0x04..=0x77).contains(&address) {
            return Err(Argument::Address.into());
        }
        let bus = self.link.get()?;
        self.mode
            .update_and_write(bus, self.addr, Regs::Mode1, MODE1_ALLCALL, true)
            .map_err(Error::Bus)?;
        // the register holds the address in its upper seven bits
        self.mode
            .store_and_write(bus, self.addr, Regs::AllCallAddress, address << 1)
            .map_err(Error::Bus)
    }

    pub fn enable_all_call_address(&mut self) -> Result<(), Error<I2C::Error>> {
        self.update_mode(Regs::Mode1, MODE1_ALLCALL, true)
    }

    pub fn disable_all_call_address(&mut self) -> Result<(), Error<I2C::Error>> {
        self.update_mode(Regs::Mode1, MODE1_ALLCALL, false)
    }

    /// Enable the outputs by pulling the output enable line low.
    pub fn output_enable(&mut self) -> Result<(), Error<I2C::Error>> {
        gpio::require(&mut self.output_enable)?.set_low()?;
        Ok(())
    }

    /// Disable the outputs by driving the output enable line high.
    pub fn output_disable(&mut self) -> Result<(), Error<I2C::Error>> {
        gpio::require(&mut self.output_enable)?.set_high()?;
        Ok(())
    }

    fn update_mode(&mut self, reg: Regs, bit: u8, state: bool) -> Result<(), Error<I2C::Error>> {
        let bus = self.link.get()?;
        self.mode
            .update_and_write(bus, self.addr, reg, bit, state)
            .map_err(Error::Bus)
    }

    fn read_mode(&mut self, reg: Regs) -> Result<u8, Error<I2C::Error>> {
        let bus = self.link.get()?;
        let value = bus.read_reg(self.addr, reg).map_err(Error::Bus)?;
        self.mode.resync(reg, value);
        Ok(value)
    }
}

impl<I2C: crate::I2cBus, G: GpioController> ConnectedDevice for ServoPi<I2C, G> {
    type Handle = I2C;
    type Error = Error<I2C::Error>;

    fn connect(&mut self, handle: Self::Handle) -> Result<(), Self::Error> {
        let bus = self.link.attach(handle)?;
        // wake up with auto increment, sub addresses and all-call disabled
        if let Err(e) = self.mode.store_and_write(bus, self.addr, Regs::Mode1, 0x00) {
            self.link.detach();
            return Err(Error::Bus(e));
        }
        // outputs stay disabled until `output_enable()` is called
        if let Some(line) = self.output_enable.as_mut() {
            if let Err(e) = line.set_high() {
                self.link.detach();
                return Err(e.into());
            }
        }
        debug!("servo controller connected at {:#x}", self.addr);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.link.is_connected()
    }

    fn release(&mut self) -> Option<Self::Handle> {
        self.link.release()
    }
}
