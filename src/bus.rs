use embedded_hal::i2c as hal_i2c;
use embedded_hal::spi as hal_spi;

/// Blanket trait for I2C transports addressed with 7-bit device addresses.
pub trait I2cBus: hal_i2c::I2c<hal_i2c::SevenBitAddress> {}

impl<T> I2cBus for T where T: hal_i2c::I2c<hal_i2c::SevenBitAddress> {}

/// Blanket trait for SPI transports with their own chip-select line.
pub trait SpiBus: hal_spi::SpiDevice<u8> {}

impl<T> SpiBus for T where T: hal_spi::SpiDevice<u8> {}

/// Register-level helpers on top of raw I2C transactions.
///
/// Failures are handed back as the transport's own error type; mapping into
/// [`crate::Error`] happens in the drivers.
pub(crate) trait I2cExt {
    type Error;

    fn write_reg<R: Into<u8>>(&mut self, addr: u8, reg: R, value: u8) -> Result<(), Self::Error>;
    fn read_reg<R: Into<u8>>(&mut self, addr: u8, reg: R) -> Result<u8, Self::Error>;
    fn read_block<R: Into<u8>>(
        &mut self,
        addr: u8,
        reg: R,
        buf: &mut [u8],
    ) -> Result<(), Self::Error>;
    fn write_block<R: Into<u8>>(
        &mut self,
        addr: u8,
        reg: R,
        values: &[u8],
    ) -> Result<(), Self::Error>;
    fn write_byte(&mut self, addr: u8, value: u8) -> Result<(), Self::Error>;
    fn read_byte(&mut self, addr: u8) -> Result<u8, Self::Error>;
}

/// Largest block (register byte included) written in a single transaction.
const MAX_BLOCK: usize = 64;

impl<I2C: I2cBus> I2cExt for I2C {
    type Error = I2C::Error;

    fn write_reg<R: Into<u8>>(&mut self, addr: u8, reg: R, value: u8) -> Result<(), Self::Error> {
        self.write(addr, &[reg.into(), value])?;
        Ok(())
    }

    fn read_reg<R: Into<u8>>(&mut self, addr: u8, reg: R) -> Result<u8, Self::Error> {
        let mut buf = [0x00];
        self.write_read(addr, &[reg.into()], &mut buf)?;
        Ok(buf[0])
    }

    fn read_block<R: Into<u8>>(
        &mut self,
        addr: u8,
        reg: R,
        buf: &mut [u8],
    ) -> Result<(), Self::Error> {
        self.write_read(addr, &[reg.into()], buf)
    }

    fn write_block<R: Into<u8>>(
        &mut self,
        addr: u8,
        reg: R,
        values: &[u8],
    ) -> Result<(), Self::Error> {
        // Callers bound `values` well below this; anything longer is truncated.
        let len = values.len().min(MAX_BLOCK - 1);
        let mut buf = [0x00; MAX_BLOCK];
        buf[0] = reg.into();
        buf[1..=len].copy_from_slice(&values[..len]);
        self.write(addr, &buf[..=len])
    }

    fn write_byte(&mut self, addr: u8, value: u8) -> Result<(), Self::Error> {
        self.write(addr, &[value])
    }

    fn read_byte(&mut self, addr: u8) -> Result<u8, Self::Error> {
        let mut buf = [0x00];
        self.read(addr, &mut buf)?;
        Ok(buf[0])
    }
}

#[cfg(test)]
mod tests {
    use super::I2cExt;
    use embedded_hal_mock::eh1::i2c as mock_i2c;

    #[test]
    fn register_access() {
        let expectations = [
            mock_i2c::Transaction::write(0x68, vec![0x07, 0x13]),
            mock_i2c::Transaction::write_read(0x68, vec![0x07], vec![0x93]),
            mock_i2c::Transaction::write_read(0x68, vec![0x00], vec![0x01, 0x02, 0x03]),
            mock_i2c::Transaction::write(0x68, vec![0x08, 0xaa, 0xbb]),
            mock_i2c::Transaction::write(0x70, vec![0x04]),
            mock_i2c::Transaction::read(0x70, vec![0x05]),
        ];
        let mut bus = mock_i2c::Mock::new(&expectations);

        bus.write_reg(0x68, 0x07u8, 0x13).unwrap();
        assert_eq!(bus.read_reg(0x68, 0x07u8).unwrap(), 0x93);
        let mut buf = [0; 3];
        bus.read_block(0x68, 0x00u8, &mut buf).unwrap();
        assert_eq!(buf, [0x01, 0x02, 0x03]);
        bus.write_block(0x68, 0x08u8, &[0xaa, 0xbb]).unwrap();
        bus.write_byte(0x70, 0x04).unwrap();
        assert_eq!(bus.read_byte(0x70).unwrap(), 0x05);

        bus.done();
    }
}
