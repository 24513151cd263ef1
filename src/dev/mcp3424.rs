//! Support for the `ADC Pi` and `ADC Differential Pi` boards, two `MCP3424` "18-Bit, Multi-Channel
//! ΔΣ Analog-to-Digital Converter with I2C Interface"
//!
//! Datasheet: https://ww1.microchip.com/downloads/en/DeviceDoc/22088c.pdf
//!
//! Both boards carry two converters with four inputs each.  Channels 1-4 belong to chip U1,
//! channels 5-8 to chip U2.  The converters have no register map: the single configuration byte
//! is written directly and a read returns the result followed by a copy of it.
//!
//! Configuration byte:
//! - Bit 7: RDY: on read 0=result is fresh; on write in one-shot mode 1=start a conversion
//! - Bit 6-5: C1/C0: input channel within the chip
//! - Bit 4: O/C: 1=continuous conversion; 0=one-shot
//! - Bit 3-2: S1/S0: sample rate / resolution (12, 14, 16, 18 bit)
//! - Bit 1-0: G1/G0: PGA gain (x1, x2, x4, x8)
use crate::bits::BitField;
use crate::bus::I2cExt;
use crate::link::{ConnectedDevice, Link};
use crate::poll::{ConversionPoller, PollError};
use crate::sample::{conversion_ready, to_voltage, BitDepth, Gain, Sample};
use crate::shadow::{RegisterShadow, ShadowRegister};
use crate::{Argument, Error};
use core::marker::PhantomData;

pub const DEFAULT_ADDRESS_U1: u8 = 0x68;
pub const DEFAULT_ADDRESS_U2: u8 = 0x69;

/// Reset configuration: PGA x1, 18 bit, continuous conversion, channel 1.
const CONFIG_RESET: u8 = 0x9c;

const BIT_RDY: u8 = 7;
const BIT_C0: u8 = 5;
const BIT_C1: u8 = 6;
const BIT_OC: u8 = 4;
const BIT_S0: u8 = 2;
const BIT_S1: u8 = 3;
const BIT_G0: u8 = 0;
const BIT_G1: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Chip {
    U1,
    U2,
}

impl ShadowRegister for Chip {
    fn slot(self) -> usize {
        match self {
            Chip::U1 => 0,
            Chip::U2 => 1,
        }
    }
}

/// Conversion mode of both converters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConversionMode {
    /// Each read starts a conversion and waits for it.
    OneShot,
    /// The converters sample continuously, a read fetches the latest result.
    Continuous,
}

/// How a board turns a sample into volts.
pub trait InputStage {
    /// Volts for `sample` at the given gain.
    fn voltage(sample: &Sample, gain: Gain) -> f64;
}

/// Single-ended inputs behind the `ADC Pi` input divider.
#[derive(Debug, Clone, Copy)]
pub struct SingleEnded;

impl SingleEnded {
    /// Correction for the on-board input divider.
    pub const CALIBRATION: f64 = 2.471;
}

impl InputStage for SingleEnded {
    fn voltage(sample: &Sample, gain: Gain) -> f64 {
        // The board is built for a single supply, a negative reading is reported as 0 V.
        if sample.negative {
            return 0.0;
        }
        to_voltage(
            sample.magnitude as i32,
            sample.depth,
            gain,
            Self::CALIBRATION,
        )
    }
}

/// Differential inputs of the `ADC Differential Pi`.
#[derive(Debug, Clone, Copy)]
pub struct Differential;

impl InputStage for Differential {
    fn voltage(sample: &Sample, gain: Gain) -> f64 {
        to_voltage(sample.signed(), sample.depth, gain, 1.0)
    }
}

/// `ADC Pi` board: 8 single-ended channels.
pub type AdcPi<I2C> = Mcp3424Pair<I2C, SingleEnded>;

/// `ADC Differential Pi` board: 8 differential channels.
pub type AdcDifferentialPi<I2C> = Mcp3424Pair<I2C, Differential>;

/// Two `MCP3424` converters forming one 8-channel board.
///
/// The handle passed to [`ConnectedDevice::connect`] is a pair of bus handles, one per chip.
/// When both chips sit on the same bus, use a bus sharing wrapper (e.g. from `embedded-hal-bus`)
/// to hand out two handles.
pub struct Mcp3424Pair<I2C, IN> {
    link: Link<(I2C, I2C)>,
    addresses: [u8; 2],
    config: RegisterShadow<Chip, 2>,
    depth: BitDepth,
    gain: Gain,
    mode: ConversionMode,
    poller: ConversionPoller,
    _in: PhantomData<IN>,
}

impl<I2C, IN> Mcp3424Pair<I2C, IN> {
    /// Create a driver for the converters at `address1` (channels 1-4) and `address2`
    /// (channels 5-8).
    pub fn new(address1: u8, address2: u8) -> Self {
        Self {
            link: Link::new(),
            addresses: [address1, address2],
            config: RegisterShadow::new([CONFIG_RESET; 2]),
            depth: BitDepth::Bits18,
            gain: Gain::X1,
            mode: ConversionMode::Continuous,
            poller: ConversionPoller::default(),
            _in: PhantomData,
        }
    }

    /// Change how many reads are attempted before a conversion times out.
    pub fn with_poll_budget(mut self, budget: u32) -> Self {
        self.poller = ConversionPoller::new(budget);
        self
    }

    /// Bus addresses of chip U1 and U2.
    pub fn addresses(&self) -> (u8, u8) {
        (self.addresses[0], self.addresses[1])
    }

    pub fn bit_depth(&self) -> BitDepth {
        self.depth
    }

    /// Select the resolution of both converters.  Takes effect with the next read.
    pub fn set_bit_depth(&mut self, depth: BitDepth) {
        let bits = depth.rate_bits();
        self.config.update_all(|c| {
            c.with_bit(BIT_S0, bits.bit(0))
                .with_bit(BIT_S1, bits.bit(1))
        });
        self.depth = depth;
    }

    pub fn gain(&self) -> Gain {
        self.gain
    }

    /// Select the PGA gain of both converters.  Takes effect with the next read.
    pub fn set_gain(&mut self, gain: Gain) {
        let bits = gain.gain_bits();
        self.config.update_all(|c| {
            c.with_bit(BIT_G0, bits.bit(0))
                .with_bit(BIT_G1, bits.bit(1))
        });
        self.gain = gain;
    }

    pub fn conversion_mode(&self) -> ConversionMode {
        self.mode
    }

    /// Select one-shot or continuous conversion.  Takes effect with the next read.
    pub fn set_conversion_mode(&mut self, mode: ConversionMode) {
        let continuous = mode == ConversionMode::Continuous;
        self.config.update_all(|c| c.with_bit(BIT_OC, continuous));
        self.mode = mode;
    }

    /// Map channel 1-8 to its chip and the input bits within that chip.
    fn resolve(channel: u8) -> Result<(Chip, u8), Argument> {
        match channel {
            1..=4 => Ok((Chip::U1, channel - 1)),
            5..=8 => Ok((Chip::U2, channel - 5)),
            _ => Err(Argument::Channel),
        }
    }
}

impl<I2C, IN> Default for Mcp3424Pair<I2C, IN> {
    fn default() -> Self {
        Self::new(DEFAULT_ADDRESS_U1, DEFAULT_ADDRESS_U2)
    }
}

impl<I2C: crate::I2cBus, IN: InputStage> Mcp3424Pair<I2C, IN> {
    /// Read the conversion result of `channel` (1-8).
    pub fn read_sample(&mut self, channel: u8) -> Result<Sample, Error<I2C::Error>> {
        let (chip, input) = Self::resolve(channel)?;
        let (bus1, bus2) = self.link.get()?;

        self.config.update_bit(chip, BIT_C0, input.bit(0));
        self.config.update_bit(chip, BIT_C1, input.bit(1));
        let config = self.config.get(chip);
        let addr = self.addresses[chip.slot()];
        let bus = match chip {
            Chip::U1 => bus1,
            Chip::U2 => bus2,
        };

        let command = match self.mode {
            ConversionMode::OneShot => {
                bus.write_byte(addr, config.with_bit(BIT_RDY, true))
                    .map_err(Error::Bus)?;
                config.with_bit(BIT_RDY, false)
            }
            ConversionMode::Continuous => config,
        };

        let depth = self.depth;
        let len = depth.read_len();
        let raw = self
            .poller
            .run(|| {
                let mut buf = [0x00; 4];
                bus.read_block(addr, command, &mut buf[..len])
                    .map(|()| (buf, conversion_ready(buf[len - 1])))
            })
            .map_err(|e| match e {
                PollError::Timeout => Error::Timeout,
                PollError::Bus(e) => Error::Bus(e),
            })?;

        Ok(Sample::decode(depth, [raw[0], raw[1], raw[2]]))
    }

    /// Two's complement value of the conversion result of `channel` (1-8).
    pub fn read_raw(&mut self, channel: u8) -> Result<i32, Error<I2C::Error>> {
        Ok(self.read_sample(channel)?.signed())
    }

    /// Voltage on `channel` (1-8).
    pub fn read_voltage(&mut self, channel: u8) -> Result<f64, Error<I2C::Error>> {
        let sample = self.read_sample(channel)?;
        Ok(IN::voltage(&sample, self.gain))
    }
}

impl<I2C: crate::I2cBus, IN> ConnectedDevice for Mcp3424Pair<I2C, IN> {
    type Handle = (I2C, I2C);
    type Error = Error<I2C::Error>;

    fn connect(&mut self, handle: Self::Handle) -> Result<(), Self::Error> {
        if !self.addresses.iter().all(|a| (0x68..=0x6f).contains(a)) {
            return Err(Argument::Address.into());
        }
        self.link.attach(handle)?;
        debug!(
            "adc connected at {:#x}/{:#x}",
            self.addresses[0],
            self.addresses[1]
        );
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.link.is_connected()
    }

    fn release(&mut self) -> Option<Self::Handle> {
        self.link.release()
    }
}
