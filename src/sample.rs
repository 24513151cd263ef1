//! Decoding of raw MCP342x conversion results.
//!
//! The converter returns its result big-endian, followed by the configuration/status byte.  At
//! 18 bit the result spans three bytes (only the lowest two bits of the first byte are data), at
//! 12/14/16 bit it spans two bytes with the unused top bits of the high byte masked off.
use crate::bits::BitField;

/// Sample resolution.  Higher resolutions convert slower (240, 60, 15 and 3.75 samples/s).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BitDepth {
    Bits12,
    Bits14,
    Bits16,
    Bits18,
}

impl BitDepth {
    /// Resolution in bits.
    pub const fn bits(self) -> u8 {
        match self {
            BitDepth::Bits12 => 12,
            BitDepth::Bits14 => 14,
            BitDepth::Bits16 => 16,
            BitDepth::Bits18 => 18,
        }
    }

    /// Look up a bit depth from its resolution in bits.
    pub const fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            12 => Some(BitDepth::Bits12),
            14 => Some(BitDepth::Bits14),
            16 => Some(BitDepth::Bits16),
            18 => Some(BitDepth::Bits18),
            _ => None,
        }
    }

    /// Volts per count at PGA x1 for the converter's 2.048 V reference.
    pub const fn lsb(self) -> f64 {
        match self {
            BitDepth::Bits12 => 0.0005,
            BitDepth::Bits14 => 0.000125,
            BitDepth::Bits16 => 0.00003125,
            BitDepth::Bits18 => 0.0000078125,
        }
    }

    /// Number of bytes returned for one read, status byte included.
    pub const fn read_len(self) -> usize {
        match self {
            BitDepth::Bits18 => 4,
            _ => 3,
        }
    }

    /// Mask applied to the first data byte.
    const fn high_mask(self) -> u8 {
        match self {
            BitDepth::Bits12 => 0x0f,
            BitDepth::Bits14 => 0x3f,
            BitDepth::Bits16 => 0xff,
            BitDepth::Bits18 => 0x03,
        }
    }

    /// S1/S0 sample rate bits (config bits 3 and 2).
    pub(crate) const fn rate_bits(self) -> u8 {
        match self {
            BitDepth::Bits12 => 0b00,
            BitDepth::Bits14 => 0b01,
            BitDepth::Bits16 => 0b10,
            BitDepth::Bits18 => 0b11,
        }
    }
}

/// Programmable gain amplifier setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Gain {
    X1,
    X2,
    X4,
    X8,
}

impl Gain {
    /// Gain as a multiplier.
    pub const fn multiplier(self) -> u8 {
        match self {
            Gain::X1 => 1,
            Gain::X2 => 2,
            Gain::X4 => 4,
            Gain::X8 => 8,
        }
    }

    /// Look up a gain from its multiplier.
    pub const fn from_multiplier(gain: u8) -> Option<Self> {
        match gain {
            1 => Some(Gain::X1),
            2 => Some(Gain::X2),
            4 => Some(Gain::X4),
            8 => Some(Gain::X8),
            _ => None,
        }
    }

    /// Divisor applied to the LSB step.  The board's input divider halves the signal, so x1
    /// corresponds to 0.5.
    pub const fn pga(self) -> f64 {
        match self {
            Gain::X1 => 0.5,
            Gain::X2 => 1.0,
            Gain::X4 => 2.0,
            Gain::X8 => 4.0,
        }
    }

    /// G1/G0 bits (config bits 1 and 0).
    pub(crate) const fn gain_bits(self) -> u8 {
        match self {
            Gain::X1 => 0b00,
            Gain::X2 => 0b01,
            Gain::X4 => 0b10,
            Gain::X8 => 0b11,
        }
    }
}

/// A decoded conversion result.
///
/// `magnitude` never contains the sign bit: after extraction it is cleared, so the value always
/// fits into `depth.bits() - 1` bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Sample {
    pub magnitude: u32,
    pub negative: bool,
    pub depth: BitDepth,
}

impl Sample {
    /// Decode the first three bytes of a read.
    ///
    /// At 18 bit all three are data.  At 12/14/16 bit the third byte is the status byte and is
    /// ignored.
    pub fn decode(depth: BitDepth, raw: [u8; 3]) -> Self {
        let high = u32::from(raw[0] & depth.high_mask());
        let value = match depth {
            BitDepth::Bits18 => (high << 16) | (u32::from(raw[1]) << 8) | u32::from(raw[2]),
            _ => (high << 8) | u32::from(raw[1]),
        };

        let sign_bit = depth.bits() - 1;
        let negative = value.bit(sign_bit);
        let magnitude = if negative {
            value.with_bit(sign_bit, false)
        } else {
            value
        };

        Self {
            magnitude,
            negative,
            depth,
        }
    }

    /// Two's complement value of the sample.
    pub fn signed(&self) -> i32 {
        let magnitude = self.magnitude as i32;
        if self.negative {
            magnitude - (1 << (self.depth.bits() - 1))
        } else {
            magnitude
        }
    }
}

/// Whether the status byte (last byte of a read) reports a finished conversion.
///
/// The ready flag is active low: bit 7 stays set while a conversion is still in progress.
pub fn conversion_ready(status: u8) -> bool {
    !status.bit(7)
}

/// Convert a count into volts: `raw * (lsb / pga) * calibration`.
pub fn to_voltage(raw: i32, depth: BitDepth, gain: Gain, calibration: f64) -> f64 {
    f64::from(raw) * (depth.lsb() / gain.pga()) * calibration
}
