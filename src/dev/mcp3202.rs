//! Support for the `ADC-DAC Pi` board: a `MCP3202` "2.7V Dual Channel 12-Bit A/D Converter with
//! SPI Serial Interface" on chip select 0 and a `MCP4822` "12-Bit Dual Voltage Output
//! Digital-to-Analog Converter with SPI Interface" on chip select 1.
//!
//! Datasheets:
//! - https://ww1.microchip.com/downloads/en/DeviceDoc/21034F.pdf
//! - https://ww1.microchip.com/downloads/en/DeviceDoc/20002249B.pdf
use super::mcp4822::{self, DacGain};
use crate::link::{ConnectedDevice, Link};
use crate::{Argument, Error};

/// Start bit of an ADC conversion request.
const ADC_START: u8 = 0x01;
/// ADC command bits in the second request byte.
const ADC_SGL: u8 = 1 << 7;
const ADC_ODD: u8 = 1 << 6;

/// Highest accepted ADC reference voltage.
pub const MAX_ADC_REFERENCE: f64 = 7.0;

/// How the two ADC inputs are sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AdcMode {
    /// Channel against ground.
    SingleEnded,
    /// Channel against its neighbour of the same pair.  On the `MCP3202` channel 1 reads
    /// CH0 - CH1 and channel 2 reads CH1 - CH0.
    Differential,
}

fn check_channel(channel: u8) -> Result<u8, Argument> {
    match channel {
        1 | 2 => Ok(channel - 1),
        _ => Err(Argument::Channel),
    }
}

/// `ADC-DAC Pi` board.
///
/// The handle passed to [`ConnectedDevice::connect`] is `(adc, dac)`, the SPI devices on chip
/// select 0 and 1.
pub struct AdcDacPi<SPI> {
    link: Link<(SPI, SPI)>,
    reference: f64,
    gain: DacGain,
}

impl<SPI> AdcDacPi<SPI> {
    pub fn new() -> Self {
        Self {
            link: Link::new(),
            reference: mcp4822::SUPPLY,
            gain: DacGain::X1,
        }
    }

    /// Reference voltage used to scale ADC readings.
    pub fn adc_reference_voltage(&self) -> f64 {
        self.reference
    }

    pub fn dac_gain(&self) -> DacGain {
        self.gain
    }

    /// Select the DAC gain used by the following writes.
    pub fn set_dac_gain(&mut self, gain: DacGain) {
        self.gain = gain;
    }
}

impl<SPI> Default for AdcDacPi<SPI> {
    fn default() -> Self {
        Self::new()
    }
}

impl<SPI: crate::SpiBus> AdcDacPi<SPI> {
    /// Set the ADC reference voltage (0.0 V to 7.0 V).  Defaults to the 3.3 V supply.
    pub fn set_adc_reference_voltage(&mut self, voltage: f64) -> Result<(), Error<SPI::Error>> {
        if !(0.0..=MAX_ADC_REFERENCE).contains(&voltage) {
            return Err(Argument::ReferenceVoltage.into());
        }
        self.reference = voltage;
        Ok(())
    }

    /// Raw 12-bit reading of ADC `channel` (1-2).
    pub fn read_adc_raw(&mut self, channel: u8, mode: AdcMode) -> Result<u16, Error<SPI::Error>> {
        let input = check_channel(channel)?;
        let (adc, _) = self.link.get()?;

        let mut command = if input == 1 { ADC_ODD } else { 0x00 };
        if mode == AdcMode::SingleEnded {
            command |= ADC_SGL;
        }

        let mut rx = [0x00; 3];
        adc.transfer(&mut rx, &[ADC_START, command, 0x00])
            .map_err(Error::Bus)?;
        Ok((u16::from(rx[1] & 0x0f) << 8) | u16::from(rx[2]))
    }

    /// Voltage on ADC `channel` (1-2), scaled by the reference voltage.
    pub fn read_adc_voltage(
        &mut self,
        channel: u8,
        mode: AdcMode,
    ) -> Result<f64, Error<SPI::Error>> {
        let raw = self.read_adc_raw(channel, mode)?;
        Ok(self.reference / 4096.0 * f64::from(raw))
    }

    /// Write a raw 12-bit value (0-4095) to DAC `channel` (1-2).
    pub fn set_dac_raw(&mut self, channel: u8, value: u16) -> Result<(), Error<SPI::Error>> {
        let bytes = mcp4822::command(mcp4822::check_output(channel)?, value, self.gain)?;
        let (_, dac) = self.link.get()?;
        trace!("dac channel {} = {}", channel, value);
        dac.write(&bytes).map_err(Error::Bus)
    }

    /// Set DAC `channel` (1-2) to `voltage`.
    ///
    /// The accepted range depends on the gain, see [`DacGain::max_voltage`].
    pub fn set_dac_voltage(&mut self, channel: u8, voltage: f64) -> Result<(), Error<SPI::Error>> {
        mcp4822::check_output(channel)?;
        let raw = mcp4822::raw_for_voltage(voltage, self.gain)?;
        self.set_dac_raw(channel, raw)
    }
}

impl<SPI: crate::SpiBus> ConnectedDevice for AdcDacPi<SPI> {
    type Handle = (SPI, SPI);
    type Error = Error<SPI::Error>;

    fn connect(&mut self, handle: Self::Handle) -> Result<(), Self::Error> {
        self.link.attach(handle)?;
        debug!("adc-dac connected");
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
    use super::{AdcDacPi, AdcMode, DacGain};
    use crate::{Argument, ConnectedDevice, Error};
    use embedded_hal_mock::eh1::spi as mock_spi;

    fn transfer(tx: [u8; 3], rx: [u8; 3]) -> [mock_spi::Transaction<u8>; 3] {
        [
            mock_spi::Transaction::transaction_start(),
            mock_spi::Transaction::transfer(tx.to_vec(), rx.to_vec()),
            mock_spi::Transaction::transaction_end(),
        ]
    }

    fn write(bytes: [u8; 2]) -> [mock_spi::Transaction<u8>; 3] {
        [
            mock_spi::Transaction::transaction_start(),
            mock_spi::Transaction::write_vec(bytes.to_vec()),
            mock_spi::Transaction::transaction_end(),
        ]
    }

    #[test]
    fn adc_reads() {
        let expectations: Vec<_> = [
            transfer([0x01, 0x80, 0x00], [0x00, 0xfa, 0xbc]),
            transfer([0x01, 0xc0, 0x00], [0x00, 0x0f, 0xff]),
            transfer([0x01, 0x40, 0x00], [0x00, 0x08, 0x00]),
        ]
        .concat();
        let mut adc = mock_spi::Mock::new(&expectations);
        let mut dac = mock_spi::Mock::<u8>::new(&[]);

        let mut board = AdcDacPi::new();
        board.connect((adc.clone(), dac.clone())).unwrap();

        // the upper nibble of the middle byte is not part of the result
        assert_eq!(board.read_adc_raw(1, AdcMode::SingleEnded).unwrap(), 0xabc);
        let v = board.read_adc_voltage(2, AdcMode::SingleEnded).unwrap();
        assert!((v - 3.3 * 4095.0 / 4096.0).abs() < 1e-9);
        assert_eq!(board.read_adc_raw(2, AdcMode::Differential).unwrap(), 2048);

        adc.done();
        dac.done();
    }

    #[test]
    fn dac_writes() {
        let expectations: Vec<_> = [
            write([0x31, 0x23]),
            write([0x9f, 0xff]),
            write([0x38, 0x00]),
            write([0x9c, 0xe4]),
        ]
        .concat();
        let mut adc = mock_spi::Mock::<u8>::new(&[]);
        let mut dac = mock_spi::Mock::new(&expectations);

        let mut board = AdcDacPi::default();
        board.connect((adc.clone(), dac.clone())).unwrap();

        board.set_dac_raw(1, 0x123).unwrap();
        board.set_dac_gain(DacGain::X2);
        board.set_dac_raw(2, 4095).unwrap();
        board.set_dac_gain(DacGain::X1);
        board.set_dac_voltage(1, 1.024).unwrap();
        board.set_dac_gain(DacGain::X2);
        // 3.3 V of 4.096 V full scale
        board.set_dac_voltage(2, 3.3).unwrap();

        adc.done();
        dac.done();
    }

    #[test]
    fn arguments_are_checked_before_the_bus() {
        let mut adc = mock_spi::Mock::<u8>::new(&[]);
        let mut dac = mock_spi::Mock::<u8>::new(&[]);

        let mut board = AdcDacPi::default();
        board.connect((adc.clone(), dac.clone())).unwrap();

        assert_eq!(
            board.read_adc_raw(0, AdcMode::SingleEnded),
            Err(Error::InvalidArgument(Argument::Channel))
        );
        assert_eq!(
            board.set_dac_raw(3, 0),
            Err(Error::InvalidArgument(Argument::Channel))
        );
        assert_eq!(
            board.set_dac_raw(1, 4096),
            Err(Error::InvalidArgument(Argument::Value))
        );
        assert_eq!(
            board.set_dac_voltage(1, 2.1),
            Err(Error::InvalidArgument(Argument::Voltage))
        );
        assert_eq!(
            board.set_dac_voltage(1, -0.1),
            Err(Error::InvalidArgument(Argument::Voltage))
        );
        assert_eq!(
            board.set_adc_reference_voltage(7.5),
            Err(Error::InvalidArgument(Argument::ReferenceVoltage))
        );
        board.set_adc_reference_voltage(5.0).unwrap();
        assert_eq!(board.adc_reference_voltage(), 5.0);

        adc.done();
        dac.done();
    }

    #[test]
    fn lifecycle() {
        let mut adc = mock_spi::Mock::<u8>::new(&[]);
        let mut dac = mock_spi::Mock::<u8>::new(&[]);

        let mut board: AdcDacPi<mock_spi::Mock<u8>> = AdcDacPi::default();
        assert_eq!(board.set_dac_raw(1, 0), Err(Error::NotConnected));
        // shadow-only settings work before connecting
        board.set_dac_gain(DacGain::X2);
        assert_eq!(board.dac_gain(), DacGain::X2);

        board.connect((adc.clone(), dac.clone())).unwrap();
        assert_eq!(
            board.connect((adc.clone(), dac.clone())),
            Err(Error::AlreadyConnected)
        );
        assert!(board.release().is_some());
        assert!(board.release().is_none());
        assert_eq!(
            board.read_adc_raw(1, AdcMode::SingleEnded),
            Err(Error::Released)
        );

        adc.done();
        dac.done();
    }
}
