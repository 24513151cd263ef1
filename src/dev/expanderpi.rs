//! Support for the `Expander Pi` board, which combines an `MCP3208` ADC, an `MCP4822` DAC, an
//! `MCP23017` IO expander and a `DS1307` real-time clock.
//!
//! The ADC sits on SPI chip select 0 and the DAC on chip select 1.  The IO expander (0x20) and
//! the clock (0x68) share one I2C bus; pass two handles to it, e.g. shared bus devices from
//! `embedded-hal-bus`.
use super::ds1307::RtcPi;
use super::mcp23017::IoPi;
use super::mcp3208::Mcp3208;
use super::mcp4822::Mcp4822;
use crate::link::ConnectedDevice;
use crate::Error;

/// Error of the transport behind a failed Expander Pi operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusError<S, I> {
    #[error("spi transfer failed")]
    Spi(S),
    #[error("i2c transfer failed")]
    I2c(I),
}

/// `Expander Pi` board.
///
/// The parts are reached through [`adc`](Self::adc), [`dac`](Self::dac), [`io`](Self::io) and
/// [`rtc`](Self::rtc).  Connecting and releasing is done for the whole board.
pub struct ExpanderPi<SPI, I2C> {
    adc: Mcp3208<SPI>,
    dac: Mcp4822<SPI>,
    io: IoPi<I2C>,
    rtc: RtcPi<I2C>,
}

impl<SPI, I2C> ExpanderPi<SPI, I2C> {
    pub fn new() -> Self {
        Self {
            adc: Mcp3208::new(),
            dac: Mcp4822::new(),
            io: IoPi::default(),
            rtc: RtcPi::default(),
        }
    }

    /// Whether `connect()` resets the IO pins, see [`IoPi::with_initialisation`].
    pub fn with_io_initialisation(mut self, initialise: bool) -> Self {
        self.io = self.io.with_initialisation(initialise);
        self
    }

    /// Eight channel 12-bit ADC.
    pub fn adc(&mut self) -> &mut Mcp3208<SPI> {
        &mut self.adc
    }

    /// Two channel 12-bit DAC.
    pub fn dac(&mut self) -> &mut Mcp4822<SPI> {
        &mut self.dac
    }

    /// Sixteen digital IO pins.
    pub fn io(&mut self) -> &mut IoPi<I2C> {
        &mut self.io
    }

    /// Real-time clock with battery-backed memory.
    pub fn rtc(&mut self) -> &mut RtcPi<I2C> {
        &mut self.rtc
    }
}

impl<SPI, I2C> Default for ExpanderPi<SPI, I2C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<SPI: crate::SpiBus, I2C: crate::I2cBus> ConnectedDevice for ExpanderPi<SPI, I2C> {
    /// `(adc, dac, io, rtc)`
    type Handle = (SPI, SPI, I2C, I2C);
    type Error = Error<BusError<SPI::Error, I2C::Error>>;

    fn connect(&mut self, handle: Self::Handle) -> Result<(), Self::Error> {
        if self.adc.is_connected()
            || self.dac.is_connected()
            || self.io.is_connected()
            || self.rtc.is_connected()
        {
            return Err(Error::AlreadyConnected);
        }
        let (adc, dac, io, rtc) = handle;

        // the IO expander is the only part that talks to the bus on connect
        self.io.connect(io).map_err(|e| e.map_bus(BusError::I2c))?;
        self.rtc.connect(rtc).map_err(|e| e.map_bus(BusError::I2c))?;
        self.adc.connect(adc).map_err(|e| e.map_bus(BusError::Spi))?;
        self.dac.connect(dac).map_err(|e| e.map_bus(BusError::Spi))?;
        debug!("expander connected");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.adc.is_connected()
            && self.dac.is_connected()
            && self.io.is_connected()
            && self.rtc.is_connected()
    }

    /// Release all four parts.  `None` unless every part still held its handle.
    fn release(&mut self) -> Option<Self::Handle> {
        let adc = self.adc.release();
        let dac = self.dac.release();
        let io = self.io.release();
        let rtc = self.rtc.release();
        Some((adc?, dac?, io?, rtc?))
    }
}
