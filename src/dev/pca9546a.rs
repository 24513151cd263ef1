//! Support for the `I2C Switch` board, a `PCA9546A` "4-channel I2C-bus switch with reset"
//!
//! Datasheet: https://www.nxp.com/docs/en/data-sheet/PCA9546A.pdf
//!
//! The switch has a single control register without address: the lower four bits connect
//! downstream channels 1-4 to the upstream bus.  Reading returns the current selection.
use crate::bits::BitField;
use crate::bus::I2cExt;
use crate::gpio::{self, GpioController, Line, NoGpio};
use crate::link::{ConnectedDevice, Link};
use crate::{Argument, Error};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

pub const DEFAULT_ADDRESS: u8 = 0x70;

/// Bits of the control register that select channels.
const CHANNEL_MASK: u8 = 0x0f;

/// Length of the low pulse and of the recovery time after a reset.
const RESET_PULSE_MS: u32 = 1;

/// Bit of the control register for `channel` (1-4).
fn channel_bit(channel: u8) -> Result<u8, Argument> {
    match channel {
        1..=4 => Ok(channel - 1),
        _ => Err(Argument::Channel),
    }
}

/// `I2C Switch` board.
pub struct I2cSwitch<I2C, G = NoGpio> {
    link: Link<I2C>,
    addr: u8,
    reset: Option<Line<G>>,
}

impl<I2C> I2cSwitch<I2C, NoGpio> {
    pub fn new(address: u8) -> Self {
        Self {
            link: Link::new(),
            addr: address,
            reset: None,
        }
    }
}

impl<I2C> Default for I2cSwitch<I2C, NoGpio> {
    fn default() -> Self {
        Self::new(DEFAULT_ADDRESS)
    }
}

impl<I2C, G: GpioController> I2cSwitch<I2C, G> {
    /// Attach the GPIO line wired to the reset pin of the switch.
    pub fn with_reset_pin<G2: GpioController>(self, gpio: G2, pin: u8) -> I2cSwitch<I2C, G2> {
        I2cSwitch {
            link: self.link,
            addr: self.addr,
            reset: Some(Line::new(gpio, pin)),
        }
    }

    pub fn address(&self) -> u8 {
        self.addr
    }
}

impl<I2C: crate::I2cBus, G: GpioController> I2cSwitch<I2C, G> {
    /// Pulse the reset line: low for 1 ms, then high and wait another 1 ms.
    ///
    /// All channels are disconnected afterwards.  The line is released again when the pulse is
    /// done, also if driving it fails.
    pub fn reset(&mut self, delay: &mut impl DelayNs) -> Result<(), Error<I2C::Error>> {
        let line = gpio::require(&mut self.reset)?;
        line.with_pin(|pin| {
            pin.set_low()?;
            delay.delay_ms(RESET_PULSE_MS);
            pin.set_high()?;
            delay.delay_ms(RESET_PULSE_MS);
            Ok(())
        })?;
        debug!("i2c switch reset");
        Ok(())
    }

    /// Connect `channel` (1-4) and disconnect all others.
    pub fn switch_channel(&mut self, channel: u8) -> Result<(), Error<I2C::Error>> {
        let bit = channel_bit(channel)?;
        self.write_control(0u8.with_bit(bit, true))
    }

    /// Connect or disconnect `channel` (1-4), leaving the other channels as they are.
    pub fn set_channel_state(&mut self, channel: u8, state: bool) -> Result<(), Error<I2C::Error>> {
        let bit = channel_bit(channel)?;
        let control = self.read_control()?;
        self.write_control(control.with_bit(bit, state))
    }

    /// Whether `channel` (1-4) is connected.
    pub fn channel_state(&mut self, channel: u8) -> Result<bool, Error<I2C::Error>> {
        let bit = channel_bit(channel)?;
        Ok(self.read_control()?.bit(bit))
    }

    /// Connect exactly the channels set in `mask` (bit 0 = channel 1, ... bit 3 = channel 4).
    pub fn set_channels(&mut self, mask: u8) -> Result<(), Error<I2C::Error>> {
        if mask & !CHANNEL_MASK != 0 {
            return Err(Argument::Mask.into());
        }
        self.write_control(mask)
    }

    /// Mask of the connected channels.
    pub fn channels(&mut self) -> Result<u8, Error<I2C::Error>> {
        Ok(self.read_control()? & CHANNEL_MASK)
    }

    fn read_control(&mut self) -> Result<u8, Error<I2C::Error>> {
        let bus = self.link.get()?;
        bus.read_byte(self.addr).map_err(Error::Bus)
    }

    fn write_control(&mut self, control: u8) -> Result<(), Error<I2C::Error>> {
        let bus = self.link.get()?;
        trace!("i2c switch channels {:#x}", control);
        bus.write_byte(self.addr, control).map_err(Error::Bus)
    }
}

impl<I2C: crate::I2cBus, G: GpioController> ConnectedDevice for I2cSwitch<I2C, G> {
    type Handle = I2C;
    type Error = Error<I2C::Error>;

    fn connect(&mut self, handle: Self::Handle) -> Result<(), Self::Error> {
        if !(0x70..=0x77).contains(&self.addr) {
            return Err(Argument::Address.into());
        }
        self.link.attach(handle)?;
        // release the switch from reset
        if let Some(line) = self.reset.as_mut() {
            if let Err(e) = line.set_high() {
                self.link.detach();
                return Err(e.into());
            }
        }
        debug!("i2c switch connected at {:#x}", self.addr);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.link.is_connected()
    }

    fn release(&mut self) -> Option<Self::Handle> {
        self.link.release()
    }
}

#[cfg(test)]
mod tests {
    use super::I2cSwitch;
    use crate::gpio::mock::MockGpio;
    use crate::{Argument, ConnectedDevice, Error};
    use embedded_hal::digital::ErrorKind;
    use embedded_hal_mock::eh1::delay::NoopDelay;
    use embedded_hal_mock::eh1::digital as mock_pin;
    use embedded_hal_mock::eh1::i2c as mock_i2c;
    use embedded_hal_mock::eh1::MockError;
    use std::io;

    #[test]
    fn channel_selection() {
        let expectations = [
            mock_i2c::Transaction::write(0x70, vec![0x01]),
            mock_i2c::Transaction::write(0x70, vec![0x08]),
            mock_i2c::Transaction::read(0x70, vec![0x08]),
            mock_i2c::Transaction::write(0x70, vec![0x0a]),
            mock_i2c::Transaction::read(0x70, vec![0x0a]),
            mock_i2c::Transaction::write(0x70, vec![0x02]),
            mock_i2c::Transaction::read(0x70, vec![0x02]),
            mock_i2c::Transaction::read(0x70, vec![0x02]),
            mock_i2c::Transaction::write(0x70, vec![0x0f]),
            mock_i2c::Transaction::read(0x70, vec![0x0f]),
        ];
        let mut bus = mock_i2c::Mock::new(&expectations);

        let mut switch = I2cSwitch::new(0x70);
        switch.connect(bus.clone()).unwrap();

        switch.switch_channel(1).unwrap();
        switch.switch_channel(4).unwrap();
        switch.set_channel_state(2, true).unwrap();
        switch.set_channel_state(4, false).unwrap();
        assert!(switch.channel_state(2).unwrap());
        assert!(!switch.channel_state(1).unwrap());
        switch.set_channels(0x0f).unwrap();
        assert_eq!(switch.channels().unwrap(), 0x0f);

        bus.done();
    }

    #[test]
    fn arguments_are_checked_before_the_bus() {
        let mut bus = mock_i2c::Mock::new(&[]);

        let mut switch = I2cSwitch::new(0x70);
        switch.connect(bus.clone()).unwrap();
        for channel in [0, 5] {
            assert_eq!(
                switch.switch_channel(channel),
                Err(Error::InvalidArgument(Argument::Channel))
            );
            assert_eq!(
                switch.channel_state(channel),
                Err(Error::InvalidArgument(Argument::Channel))
            );
        }
        assert_eq!(
            switch.set_channels(0x10),
            Err(Error::InvalidArgument(Argument::Mask))
        );

        bus.done();
    }

    #[test]
    fn reset_pulse() {
        let mut bus = mock_i2c::Mock::new(&[]);
        let mut gpio = MockGpio::new(
            13,
            &[
                // connect releases the reset
                mock_pin::Transaction::set(mock_pin::State::High),
                mock_pin::Transaction::set(mock_pin::State::Low),
                mock_pin::Transaction::set(mock_pin::State::High),
            ],
        );

        let mut switch = I2cSwitch::new(0x70).with_reset_pin(gpio.clone(), 13);
        switch.connect(bus.clone()).unwrap();
        switch.reset(&mut NoopDelay::new()).unwrap();
        // one acquisition for connect, one for the whole pulse
        assert_eq!(gpio.opened(), 2);

        bus.done();
        gpio.done();
    }

    #[test]
    fn reset_pin_failure() {
        let mut gpio = MockGpio::new(
            13,
            &[mock_pin::Transaction::set(mock_pin::State::Low)
                .with_error(MockError::Io(io::ErrorKind::Other))],
        );

        let mut switch: I2cSwitch<mock_i2c::Mock, _> =
            I2cSwitch::new(0x70).with_reset_pin(gpio.clone(), 13);
        assert_eq!(
            switch.reset(&mut NoopDelay::new()),
            Err(Error::Gpio(ErrorKind::Other))
        );

        gpio.done();
    }

    #[test]
    fn failed_connect_can_be_retried() {
        let mut bus = mock_i2c::Mock::new(&[]);
        let mut gpio = MockGpio::new(
            13,
            &[
                mock_pin::Transaction::set(mock_pin::State::High)
                    .with_error(MockError::Io(io::ErrorKind::Other)),
                mock_pin::Transaction::set(mock_pin::State::High),
            ],
        );

        let mut switch = I2cSwitch::new(0x70).with_reset_pin(gpio.clone(), 13);
        assert_eq!(
            switch.connect(bus.clone()),
            Err(Error::Gpio(ErrorKind::Other))
        );
        assert!(!switch.is_connected());
        assert_eq!(switch.channels(), Err(Error::NotConnected));

        switch.connect(bus.clone()).unwrap();
        assert!(switch.is_connected());

        bus.done();
        gpio.done();
    }

    #[test]
    fn reset_without_pin() {
        let mut switch: I2cSwitch<mock_i2c::Mock> = I2cSwitch::default();
        assert_eq!(
            switch.reset(&mut NoopDelay::new()),
            Err(Error::PinNotConfigured)
        );
    }

    #[test]
    fn lifecycle() {
        let mut bus = mock_i2c::Mock::new(&[]);

        let mut switch: I2cSwitch<mock_i2c::Mock> = I2cSwitch::new(0x68);
        assert_eq!(
            switch.connect(bus.clone()),
            Err(Error::InvalidArgument(Argument::Address))
        );

        let mut switch: I2cSwitch<mock_i2c::Mock> = I2cSwitch::default();
        assert_eq!(switch.channels(), Err(Error::NotConnected));
        switch.connect(bus.clone()).unwrap();
        assert!(switch.release().is_some());
        assert!(switch.release().is_none());
        assert_eq!(switch.switch_channel(1), Err(Error::Released));

        bus.done();
    }
}
