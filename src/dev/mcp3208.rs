//! Support for the `MCP3208` "2.7V 4-Channel/8-Channel 12-Bit A/D Converters with SPI Serial
//! Interface", the ADC of the Expander Pi.
//!
//! Datasheet: https://ww1.microchip.com/downloads/en/DeviceDoc/21298e.pdf
use super::mcp3202::AdcMode;
use crate::link::{ConnectedDevice, Link};
use crate::{Argument, Error};

/// Start bit of a conversion request, in the first byte.
const START: u8 = 1 << 2;
const SGL: u8 = 1 << 1;

/// Onboard reference of the Expander Pi.
pub const DEFAULT_REFERENCE: f64 = 4.096;
/// Highest accepted reference voltage.
pub const MAX_REFERENCE: f64 = 7.0;

fn check_channel(channel: u8) -> Result<u8, Argument> {
    match channel {
        1..=8 => Ok(channel - 1),
        _ => Err(Argument::Channel),
    }
}

/// Three byte request for input `input` (0-7).
///
/// Start bit, SGL/DIFF and D2 go into the first byte, D1 and D0 into the top of the second, so
/// the 12 result bits end up right aligned in the last two bytes.
const fn request(input: u8, mode: AdcMode) -> [u8; 3] {
    let sgl = match mode {
        AdcMode::SingleEnded => SGL,
        AdcMode::Differential => 0x00,
    };
    [START | sgl | (input >> 2), (input & 0x03) << 6, 0x00]
}

/// A `MCP3208` on its own chip select.
pub struct Mcp3208<SPI> {
    link: Link<SPI>,
    reference: f64,
}

impl<SPI> Mcp3208<SPI> {
    pub fn new() -> Self {
        Self {
            link: Link::new(),
            reference: DEFAULT_REFERENCE,
        }
    }

    /// Reference voltage used to scale readings.
    pub fn reference_voltage(&self) -> f64 {
        self.reference
    }
}

impl<SPI> Default for Mcp3208<SPI> {
    fn default() -> Self {
        Self::new()
    }
}

impl<SPI: crate::SpiBus> Mcp3208<SPI> {
    /// Set the reference voltage (0.0 V to 7.0 V).  Defaults to the onboard 4.096 V.
    pub fn set_reference_voltage(&mut self, voltage: f64) -> Result<(), Error<SPI::Error>> {
        if !(0.0..=MAX_REFERENCE).contains(&voltage) {
            return Err(Argument::ReferenceVoltage.into());
        }
        self.reference = voltage;
        Ok(())
    }

    /// Raw 12-bit reading of `channel` (1-8).
    pub fn read_raw(&mut self, channel: u8, mode: AdcMode) -> Result<u16, Error<SPI::Error>> {
        let input = check_channel(channel)?;
        let spi = self.link.get()?;

        let mut rx = [0x00; 3];
        spi.transfer(&mut rx, &request(input, mode))
            .map_err(Error::Bus)?;
        Ok((u16::from(rx[1] & 0x0f) << 8) | u16::from(rx[2]))
    }

    /// Voltage on `channel` (1-8), scaled by the reference voltage.
    pub fn read_voltage(&mut self, channel: u8, mode: AdcMode) -> Result<f64, Error<SPI::Error>> {
        let raw = self.read_raw(channel, mode)?;
        Ok(self.reference / 4096.0 * f64::from(raw))
    }
}

impl<SPI: crate::SpiBus> ConnectedDevice for Mcp3208<SPI> {
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
