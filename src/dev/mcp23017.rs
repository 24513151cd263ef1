//! Support for the `IO Pi` board, built from `MCP23017` "16-Bit I/O Expander with Serial
//! Interface" chips
//!
//! Datasheet: https://ww1.microchip.com/downloads/en/devicedoc/20001952c.pdf
//!
//! Each chip offers two eight-bit ports.  Pins are numbered 1-16 on the board: pins 1-8 are port
//! 0 (GPA0-GPA7), pins 9-16 are port 1 (GPB0-GPB7).  Three address pins select addresses
//! 0x20-0x27.
//!
//! All configuration registers and the output latches are shadowed.  Changing a single pin sets
//! the bit in the shadow and writes the whole register, the chip is never read back first.
use crate::bits::BitField;
use crate::bus::I2cExt;
use crate::link::{ConnectedDevice, Link};
use crate::shadow::{RegisterShadow, ShadowRegister};
use crate::{Argument, Error};

pub const DEFAULT_ADDRESS: u8 = 0x20;

/// Register addresses for BANK=0, the reset state of the chip which this driver keeps.
///
/// All registers reset to 0x00 except IODIR{A,B}, which reset to 0xFF (all pins inputs).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::upper_case_acronyms)]
enum Regs {
    /// IODIR: direction: 0=output; 1=input
    IODIRA = 0x00,
    IODIRB = 0x01,
    /// IPOL: input polarity: 1=GPIO reads the inverted pin level
    IPOLA = 0x02,
    IPOLB = 0x03,
    /// GPINTEN: interrupt-on-change enable
    GPINTENA = 0x04,
    GPINTENB = 0x05,
    /// DEFVAL: compare values for interrupt-on-change
    DEFVALA = 0x06,
    DEFVALB = 0x07,
    /// INTCON: 0=interrupt on any change; 1=interrupt when the pin differs from DEFVAL
    INTCONA = 0x08,
    INTCONB = 0x09,
    /// IOCON: configuration, shared by both ports (0x0b mirrors 0x0a)
    /// - Bit 7: BANK (kept 0)
    /// - Bit 6: MIRROR: INTA and INTB are ORed together
    /// - Bit 5: SEQOP: 1=address pointer does not increment
    /// - Bit 4: DISSLW: slew rate control on SDA disabled
    /// - Bit 3: HAEN: no effect on MCP23017
    /// - Bit 2: ODR: interrupt pins are open-drain (overrides INTPOL)
    /// - Bit 1: INTPOL: interrupt pins are 0=active-low; 1=active-high
    IOCON = 0x0a,
    /// GPPU: 100k pull-up on input pins
    GPPUA = 0x0c,
    GPPUB = 0x0d,
    /// INTF: pins that caused the pending interrupt
    INTFA = 0x0e,
    INTFB = 0x0f,
    /// INTCAP: port value captured at the interrupt, reading clears the interrupt
    INTCAPA = 0x10,
    INTCAPB = 0x11,
    /// GPIO: pin levels
    GPIOA = 0x12,
    GPIOB = 0x13,
    /// OLAT: output latches
    OLATA = 0x14,
    OLATB = 0x15,
}

impl From<Regs> for u8 {
    fn from(r: Regs) -> u8 {
        r as u8
    }
}

impl ShadowRegister for Regs {
    fn slot(self) -> usize {
        self as usize
    }
}

/// One shadow slot per register address, only the configuration registers are used.
const SHADOW_SIZE: usize = 0x16;

const IODIR: [Regs; 2] = [Regs::IODIRA, Regs::IODIRB];
const IPOL: [Regs; 2] = [Regs::IPOLA, Regs::IPOLB];
const GPINTEN: [Regs; 2] = [Regs::GPINTENA, Regs::GPINTENB];
const DEFVAL: [Regs; 2] = [Regs::DEFVALA, Regs::DEFVALB];
const INTCON: [Regs; 2] = [Regs::INTCONA, Regs::INTCONB];
const GPPU: [Regs; 2] = [Regs::GPPUA, Regs::GPPUB];
const INTF: [Regs; 2] = [Regs::INTFA, Regs::INTFB];
const INTCAP: [Regs; 2] = [Regs::INTCAPA, Regs::INTCAPB];
const GPIO: [Regs; 2] = [Regs::GPIOA, Regs::GPIOB];
const OLAT: [Regs; 2] = [Regs::OLATA, Regs::OLATB];

/// IOCON after initialisation: no address increment, active-high interrupt pins.
const IOCON_INIT: u8 = 0x22;
const BIT_INTPOL: u8 = 1;
const BIT_MIRROR: u8 = 6;

/// Registers written when the chip is initialised on connect.
const INIT: [(Regs, u8); 7] = [
    (Regs::IOCON, IOCON_INIT),
    (Regs::IODIRA, 0xff),
    (Regs::IODIRB, 0xff),
    (Regs::GPPUA, 0x00),
    (Regs::GPPUB, 0x00),
    (Regs::IPOLA, 0x00),
    (Regs::IPOLB, 0x00),
];

/// Every shadowed register, in the order they are read back on connect.
const SHADOWED: [Regs; 15] = [
    Regs::IOCON,
    Regs::IODIRA,
    Regs::IODIRB,
    Regs::IPOLA,
    Regs::IPOLB,
    Regs::GPINTENA,
    Regs::GPINTENB,
    Regs::DEFVALA,
    Regs::DEFVALB,
    Regs::INTCONA,
    Regs::INTCONB,
    Regs::GPPUA,
    Regs::GPPUB,
    Regs::OLATA,
    Regs::OLATB,
];

/// Power-on values of the registers.
const fn reset_values() -> [u8; SHADOW_SIZE] {
    let mut values = [0x00; SHADOW_SIZE];
    values[Regs::IODIRA as usize] = 0xff;
    values[Regs::IODIRB as usize] = 0xff;
    values
}

/// Map board pin 1-16 to its port and bit.
fn pin_location(pin: u8) -> Result<(usize, u8), Argument> {
    match pin {
        1..=8 => Ok((0, pin - 1)),
        9..=16 => Ok((1, pin - 9)),
        _ => Err(Argument::Pin),
    }
}

fn check_port(port: u8) -> Result<usize, Argument> {
    match port {
        0 | 1 => Ok(usize::from(port)),
        _ => Err(Argument::Port),
    }
}

/// `IO Pi` expander chip.
pub struct IoPi<I2C> {
    link: Link<I2C>,
    addr: u8,
    initialise: bool,
    shadow: RegisterShadow<Regs, SHADOW_SIZE>,
}

impl<I2C> IoPi<I2C> {
    pub fn new(address: u8) -> Self {
        Self {
            link: Link::new(),
            addr: address,
            initialise: true,
            shadow: RegisterShadow::new(reset_values()),
        }
    }

    /// Create a driver for the chip with the given address pin levels.
    pub fn from_address_pins(a0: bool, a1: bool, a2: bool) -> Self {
        Self::new(DEFAULT_ADDRESS | ((a2 as u8) << 2) | ((a1 as u8) << 1) | (a0 as u8))
    }

    /// Whether `connect()` resets the chip to all inputs without pull-ups or inversion.
    ///
    /// Enabled by default.  When disabled, the current configuration is read from the chip
    /// instead, so outputs keep their state.
    pub fn with_initialisation(mut self, initialise: bool) -> Self {
        self.initialise = initialise;
        self
    }

    pub fn address(&self) -> u8 {
        self.addr
    }
}

impl<I2C> Default for IoPi<I2C> {
    fn default() -> Self {
        Self::new(DEFAULT_ADDRESS)
    }
}

impl<I2C: crate::I2cBus> IoPi<I2C> {
    /// Configure pin 1-16 as input (`true`) or output (`false`).
    pub fn set_pin_direction(&mut self, pin: u8, input: bool) -> Result<(), Error<I2C::Error>> {
        self.update_pin(IODIR, pin, input)
    }

    /// Configure all pins of port 0-1 at once, a set bit makes the pin an input.
    pub fn set_port_direction(&mut self, port: u8, value: u8) -> Result<(), Error<I2C::Error>> {
        self.store_port(IODIR, port, value)
    }

    pub fn set_pin_pullup(&mut self, pin: u8, enable: bool) -> Result<(), Error<I2C::Error>> {
        self.update_pin(GPPU, pin, enable)
    }

    pub fn set_port_pullups(&mut self, port: u8, value: u8) -> Result<(), Error<I2C::Error>> {
        self.store_port(GPPU, port, value)
    }

    /// Drive output pin 1-16.
    pub fn write_pin(&mut self, pin: u8, high: bool) -> Result<(), Error<I2C::Error>> {
        self.update_pin(OLAT, pin, high)
    }

    pub fn write_port(&mut self, port: u8, value: u8) -> Result<(), Error<I2C::Error>> {
        self.store_port(OLAT, port, value)
    }

    /// Level of pin 1-16, after input inversion.
    pub fn read_pin(&mut self, pin: u8) -> Result<bool, Error<I2C::Error>> {
        let (port, bit) = pin_location(pin)?;
        let value = self.read_port_reg(GPIO, port)?;
        Ok(value.bit(bit))
    }

    pub fn read_port(&mut self, port: u8) -> Result<u8, Error<I2C::Error>> {
        let port = check_port(port)?;
        self.read_port_reg(GPIO, port)
    }

    /// Invert the level reported for input pin 1-16.
    pub fn invert_pin(&mut self, pin: u8, invert: bool) -> Result<(), Error<I2C::Error>> {
        self.update_pin(IPOL, pin, invert)
    }

    pub fn invert_port(&mut self, port: u8, value: u8) -> Result<(), Error<I2C::Error>> {
        self.store_port(IPOL, port, value)
    }

    /// Tie both interrupt outputs together so either port triggers both.
    pub fn mirror_interrupts(&mut self, mirror: bool) -> Result<(), Error<I2C::Error>> {
        self.update_config(BIT_MIRROR, mirror)
    }

    /// Select whether the interrupt outputs are active high (`true`) or active low.
    pub fn set_interrupt_polarity(&mut self, active_high: bool) -> Result<(), Error<I2C::Error>> {
        self.update_config(BIT_INTPOL, active_high)
    }

    /// Per pin of `port`: 1=compare against the default value; 0=interrupt on every change.
    pub fn set_interrupt_type(&mut self, port: u8, value: u8) -> Result<(), Error<I2C::Error>> {
        self.store_port(INTCON, port, value)
    }

    /// Compare values for pins whose interrupt type is "compare against default".
    pub fn set_interrupt_defaults(
        &mut self,
        port: u8,
        value: u8,
    ) -> Result<(), Error<I2C::Error>> {
        self.store_port(DEFVAL, port, value)
    }

    pub fn set_interrupt_on_pin(&mut self, pin: u8, enable: bool) -> Result<(), Error<I2C::Error>> {
        self.update_pin(GPINTEN, pin, enable)
    }

    pub fn set_interrupt_on_port(&mut self, port: u8, value: u8) -> Result<(), Error<I2C::Error>> {
        self.store_port(GPINTEN, port, value)
    }

    /// Pins of `port` that caused the pending interrupt.
    pub fn read_interrupt_status(&mut self, port: u8) -> Result<u8, Error<I2C::Error>> {
        let port = check_port(port)?;
        self.read_port_reg(INTF, port)
    }

    /// Value of `port` captured when the interrupt occurred.  Reading clears the interrupt.
    pub fn read_interrupt_capture(&mut self, port: u8) -> Result<u8, Error<I2C::Error>> {
        let port = check_port(port)?;
        self.read_port_reg(INTCAP, port)
    }

    /// Clear pending interrupts on both ports.
    pub fn reset_interrupts(&mut self) -> Result<(), Error<I2C::Error>> {
        self.read_port_reg(INTCAP, 0)?;
        self.read_port_reg(INTCAP, 1)?;
        Ok(())
    }

    fn update_pin(
        &mut self,
        regs: [Regs; 2],
        pin: u8,
        state: bool,
    ) -> Result<(), Error<I2C::Error>> {
        let (port, bit) = pin_location(pin)?;
        let bus = self.link.get()?;
        self.shadow
            .update_and_write(bus, self.addr, regs[port], bit, state)
            .map_err(Error::Bus)
    }

    fn store_port(
        &mut self,
        regs: [Regs; 2],
        port: u8,
        value: u8,
    ) -> Result<(), Error<I2C::Error>> {
        let port = check_port(port)?;
        let bus = self.link.get()?;
        self.shadow
            .store_and_write(bus, self.addr, regs[port], value)
            .map_err(Error::Bus)
    }

    fn update_config(&mut self, bit: u8, state: bool) -> Result<(), Error<I2C::Error>> {
        let bus = self.link.get()?;
        self.shadow
            .update_and_write(bus, self.addr, Regs::IOCON, bit, state)
            .map_err(Error::Bus)
    }

    fn read_port_reg(&mut self, regs: [Regs; 2], port: usize) -> Result<u8, Error<I2C::Error>> {
        let bus = self.link.get()?;
        bus.read_reg(self.addr, regs[port]).map_err(Error::Bus)
    }
}

/// Bring the chip and the shadow into a known common state.
fn setup<I2C: crate::I2cBus>(
    shadow: &mut RegisterShadow<Regs, SHADOW_SIZE>,
    bus: &mut I2C,
    addr: u8,
    initialise: bool,
) -> Result<(), I2C::Error> {
    if initialise {
        for (reg, value) in INIT {
            shadow.store_and_write(bus, addr, reg, value)?;
        }
    }
    for reg in SHADOWED {
        if initialise && INIT.iter().any(|(r, _)| *r == reg) {
            continue;
        }
        let value = bus.read_reg(addr, reg)?;
        shadow.resync(reg, value);
    }
    Ok(())
}

impl<I2C: crate::I2cBus> ConnectedDevice for IoPi<I2C> {
    type Handle = I2C;
    type Error = Error<I2C::Error>;

    fn connect(&mut self, handle: Self::Handle) -> Result<(), Self::Error> {
        if !(0x20..=0x27).contains(&self.addr) {
            return Err(Argument::Address.into());
        }
        let bus = self.link.attach(handle)?;
        if let Err(e) = setup(&mut self.shadow, bus, self.addr, self.initialise) {
            warn!("io expander setup failed, staying disconnected");
            self.link.detach();
            return Err(Error::Bus(e));
        }
        debug!("io expander connected at {:#x}", self.addr);
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
    use super::IoPi;
    use crate::{Argument, ConnectedDevice, Error};
    use embedded_hal_mock::eh1::i2c as mock_i2c;

    /// Transactions of an initialising `connect()` on a freshly powered chip.
    fn init_transactions(addr: u8) -> Vec<mock_i2c::Transaction> {
        let mut t = vec![
            mock_i2c::Transaction::write(addr, vec![0x0a, 0x22]),
            mock_i2c::Transaction::write(addr, vec![0x00, 0xff]),
            mock_i2c::Transaction::write(addr, vec![0x01, 0xff]),
            mock_i2c::Transaction::write(addr, vec![0x0c, 0x00]),
            mock_i2c::Transaction::write(addr, vec![0x0d, 0x00]),
            mock_i2c::Transaction::write(addr, vec![0x02, 0x00]),
            mock_i2c::Transaction::write(addr, vec![0x03, 0x00]),
        ];
        // GPINTEN, DEFVAL, INTCON and OLAT are read back
        for reg in [0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x14, 0x15] {
            t.push(mock_i2c::Transaction::write_read(addr, vec![reg], vec![0x00]));
        }
        t
    }

    #[test]
    fn pins_and_ports() {
        let mut expectations = init_transactions(0x20);
        expectations.extend([
            mock_i2c::Transaction::write(0x20, vec![0x00, 0xfe]),
            mock_i2c::Transaction::write(0x20, vec![0x01, 0x7f]),
            mock_i2c::Transaction::write(0x20, vec![0x14, 0x01]),
            mock_i2c::Transaction::write(0x20, vec![0x15, 0x80]),
            mock_i2c::Transaction::write(0x20, vec![0x14, 0x00]),
            mock_i2c::Transaction::write(0x20, vec![0x15, 0xaa]),
            mock_i2c::Transaction::write_read(0x20, vec![0x12], vec![0x04]),
            mock_i2c::Transaction::write_read(0x20, vec![0x13], vec![0x5a]),
            mock_i2c::Transaction::write(0x20, vec![0x0c, 0x10]),
            mock_i2c::Transaction::write(0x20, vec![0x0d, 0xf0]),
            mock_i2c::Transaction::write(0x20, vec![0x02, 0x01]),
            mock_i2c::Transaction::write(0x20, vec![0x03, 0xff]),
        ]);
        let mut bus = mock_i2c::Mock::new(&expectations);

        let mut io = IoPi::default();
        io.connect(bus.clone()).unwrap();

        io.set_pin_direction(1, false).unwrap();
        io.set_pin_direction(16, false).unwrap();
        io.write_pin(1, true).unwrap();
        io.write_pin(16, true).unwrap();
        io.write_pin(1, false).unwrap();
        io.write_port(1, 0xaa).unwrap();
        assert!(io.read_pin(3).unwrap());
        assert_eq!(io.read_port(1).unwrap(), 0x5a);
        io.set_pin_pullup(5, true).unwrap();
        io.set_port_pullups(1, 0xf0).unwrap();
        io.invert_pin(1, true).unwrap();
        io.invert_port(1, 0xff).unwrap();

        bus.done();
    }

    #[test]
    fn interrupts() {
        let mut expectations = init_transactions(0x21);
        expectations.extend([
            mock_i2c::Transaction::write(0x21, vec![0x0a, 0x62]),
            mock_i2c::Transaction::write(0x21, vec![0x0a, 0x60]),
            mock_i2c::Transaction::write(0x21, vec![0x08, 0x0f]),
            mock_i2c::Transaction::write(0x21, vec![0x07, 0x03]),
            mock_i2c::Transaction::write(0x21, vec![0x05, 0x02]),
            mock_i2c::Transaction::write(0x21, vec![0x04, 0xff]),
            mock_i2c::Transaction::write_read(0x21, vec![0x0e], vec![0x01]),
            mock_i2c::Transaction::write_read(0x21, vec![0x11], vec![0x40]),
            mock_i2c::Transaction::write_read(0x21, vec![0x10], vec![0x00]),
            mock_i2c::Transaction::write_read(0x21, vec![0x11], vec![0x00]),
        ]);
        let mut bus = mock_i2c::Mock::new(&expectations);

        let mut io = IoPi::from_address_pins(true, false, false);
        io.connect(bus.clone()).unwrap();

        io.mirror_interrupts(true).unwrap();
        io.set_interrupt_polarity(false).unwrap();
        io.set_interrupt_type(0, 0x0f).unwrap();
        io.set_interrupt_defaults(1, 0x03).unwrap();
        io.set_interrupt_on_pin(10, true).unwrap();
        io.set_interrupt_on_port(0, 0xff).unwrap();
        assert_eq!(io.read_interrupt_status(0).unwrap(), 0x01);
        assert_eq!(io.read_interrupt_capture(1).unwrap(), 0x40);
        io.reset_interrupts().unwrap();

        bus.done();
    }

    #[test]
    fn connect_without_initialisation_reads_configuration() {
        // IOCON, IODIR, IPOL, GPINTEN, DEFVAL, INTCON, GPPU, OLAT
        let state = [
            (0x0a, 0x22),
            (0x00, 0xf0),
            (0x01, 0xff),
            (0x02, 0x00),
            (0x03, 0x00),
            (0x04, 0x00),
            (0x05, 0x00),
            (0x06, 0x00),
            (0x07, 0x00),
            (0x08, 0x00),
            (0x09, 0x00),
            (0x0c, 0x00),
            (0x0d, 0x00),
            (0x14, 0x05),
            (0x15, 0x00),
        ];
        let mut expectations: Vec<_> = state
            .iter()
            .map(|(reg, value)| mock_i2c::Transaction::write_read(0x20, vec![*reg], vec![*value]))
            .collect();
        // the output latch keeps the pins that were already high
        expectations.push(mock_i2c::Transaction::write(0x20, vec![0x14, 0x07]));
        let mut bus = mock_i2c::Mock::new(&expectations);

        let mut io = IoPi::default().with_initialisation(false);
        io.connect(bus.clone()).unwrap();
        io.write_pin(2, true).unwrap();

        bus.done();
    }

    #[test]
    fn failed_setup_stays_disconnected() {
        use embedded_hal::i2c::ErrorKind;

        let mut expectations = vec![
            mock_i2c::Transaction::write(0x20, vec![0x0a, 0x22]).with_error(ErrorKind::Other),
        ];
        expectations.extend(init_transactions(0x20));
        let mut bus = mock_i2c::Mock::new(&expectations);

        let mut io = IoPi::default();
        assert_eq!(io.connect(bus.clone()), Err(Error::Bus(ErrorKind::Other)));
        assert!(!io.is_connected());
        assert_eq!(io.write_pin(1, true), Err(Error::NotConnected));

        // the failed handle is gone, a new one brings the board up
        io.connect(bus.clone()).unwrap();
        assert!(io.is_connected());

        bus.done();
    }

    #[test]
    fn arguments_are_checked_before_the_bus() {
        let mut bus = mock_i2c::Mock::new(&init_transactions(0x20));

        let mut io = IoPi::default();
        io.connect(bus.clone()).unwrap();

        assert_eq!(
            io.write_pin(0, true),
            Err(Error::InvalidArgument(Argument::Pin))
        );
        assert_eq!(
            io.read_pin(17),
            Err(Error::InvalidArgument(Argument::Pin))
        );
        assert_eq!(
            io.set_port_direction(2, 0x00),
            Err(Error::InvalidArgument(Argument::Port))
        );
        assert_eq!(
            io.read_interrupt_status(2),
            Err(Error::InvalidArgument(Argument::Port))
        );

        bus.done();
    }

    #[test]
    fn lifecycle() {
        let mut bus = mock_i2c::Mock::new(&init_transactions(0x20));

        let mut io: IoPi<mock_i2c::Mock> = IoPi::new(0x28);
        assert_eq!(
            io.connect(bus.clone()),
            Err(Error::InvalidArgument(Argument::Address))
        );

        let mut io = IoPi::default();
        assert_eq!(io.read_port(0), Err(Error::NotConnected));
        io.connect(bus.clone()).unwrap();
        assert_eq!(io.connect(bus.clone()), Err(Error::AlreadyConnected));
        assert!(io.release().is_some());
        assert!(io.release().is_none());
        assert_eq!(io.read_port(0), Err(Error::Released));

        bus.done();
    }
}
