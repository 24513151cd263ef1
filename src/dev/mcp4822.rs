//! Support for the `MCP4822` "12-Bit Dual Voltage Output Digital-to-Analog Converter with SPI
//! Interface", the DAC of the ADC-DAC Pi and the Expander Pi.
//!
//! Datasheet: https://ww1.microchip.com/downloads/en/DeviceDoc/20002249B.pdf
use crate::link::{ConnectedDevice, Link};
use crate::{Argument, Error};

/// Command bits in the high byte of a write.
const CHANNEL_B: u8 = 1 << 7;
const GAIN_1: u8 = 1 << 5;
const ACTIVE: u8 = 1 << 4;

/// Internal reference of the DAC.
pub const REFERENCE: f64 = 2.048;
/// Highest output at gain 2, limited by the 3.3 V supply.
pub const SUPPLY: f64 = 3.3;

const MAX_RAW: u16 = 4095;

/// Output gain of the DAC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DacGain {
    /// 0 V to 2.048 V.
    X1,
    /// 0 V to 3.3 V.
    X2,
}

impl DacGain {
    /// Largest output voltage reachable at this gain.
    pub fn max_voltage(self) -> f64 {
        match self {
            DacGain::X1 => REFERENCE,
            DacGain::X2 => SUPPLY,
        }
    }

    fn full_scale(self) -> f64 {
        match self {
            DacGain::X1 => REFERENCE,
            DacGain::X2 => 2.0 * REFERENCE,
        }
    }
}

/// Map an output number (1-2) to the A/B select.
pub(crate) fn check_output(channel: u8) -> Result<bool, Argument> {
    match channel {
        1 => Ok(false),
        2 => Ok(true),
        _ => Err(Argument::Channel),
    }
}

/// Two byte write setting one output, with the output active.
pub(crate) fn command(channel_b: bool, value: u16, gain: DacGain) -> Result<[u8; 2], Argument> {
    if value > MAX_RAW {
        return Err(Argument::Value);
    }
    let mut high = ACTIVE | (value >> 8) as u8;
    if channel_b {
        high |= CHANNEL_B;
    }
    if gain == DacGain::X1 {
        high |= GAIN_1;
    }
    Ok([high, (value & 0xff) as u8])
}

/// Raw code for `voltage`, rounded to the nearest step and clamped to 4095.
pub(crate) fn raw_for_voltage(voltage: f64, gain: DacGain) -> Result<u16, Argument> {
    if !(0.0..=gain.max_voltage()).contains(&voltage) {
        return Err(Argument::Voltage);
    }
    let steps = voltage / gain.full_scale() * 4096.0;
    Ok(((steps + 0.5) as u32).min(u32::from(MAX_RAW)) as u16)
}

/// A `MCP4822` on its own chip select.
pub struct Mcp4822<SPI> {
    link: Link<SPI>,
    gain: DacGain,
}

impl<SPI> Mcp4822<SPI> {
    pub fn new() -> Self {
        Self {
            link: Link::new(),
            gain: DacGain::X1,
        }
    }

    pub fn gain(&self) -> DacGain {
        self.gain
    }

    /// Select the gain used by the following writes.
    pub fn set_gain(&mut self, gain: DacGain) {
        self.gain = gain;
    }
}

impl<SPI> Default for Mcp4822<SPI> {
    fn default() -> Self {
        Self::new()
    }
}

impl<SPI: crate::SpiBus> Mcp4822<SPI> {
    /// Write a raw 12-bit value (0-4095) to output `channel` (1-2).
    pub fn set_raw(&mut self, channel: u8, value: u16) -> Result<(), Error<SPI::Error>> {
        let bytes = command(check_output(channel)?, value, self.gain)?;
        let spi = self.link.get()?;
        trace!("dac channel {} = {}", channel, value);
        spi.write(&bytes).map_err(Error::Bus)
    }

    /// Set output `channel` (1-2) to `voltage`.
    ///
    /// The accepted range depends on the gain, see [`DacGain::max_voltage`].
    pub fn set_voltage(&mut self, channel: u8, voltage: f64) -> Result<(), Error<SPI::Error>> {
        check_output(channel)?;
        let raw = raw_for_voltage(voltage, self.gain)?;
        self.set_raw(channel, raw)
    }
}

impl<SPI: crate::SpiBus> ConnectedDevice for Mcp4822<SPI> {
    type Handle = SPI;
    type Error = Error<SPI::Error>;

    fn connect(&mut self, handle: Self::Handle) -> Result<(), Self::Error> {
        self.link.attach(handle)?;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.link.is_connected()
    }

    fn release(&mut self) -> Option<Self::Handle> {
        self.link.release()
    }
}
