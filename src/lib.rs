//! Drivers for the AB Electronics family of Raspberry Pi expansion boards.
//!
//! Every board is a plain struct configured with its bus address(es).  It owns nothing until it
//! is handed a bus through [`ConnectedDevice::connect`] and gives the bus back on
//! [`ConnectedDevice::release`].
#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod bcd;
pub mod bits;
mod bus;
pub mod dev;
mod error;
mod gpio;
mod link;
pub mod poll;
pub mod pwm;
pub mod sample;
pub mod shadow;

pub use bus::{I2cBus, SpiBus};
pub use error::{Argument, Error};
pub use gpio::{GpioController, NoGpio, NoPin};
pub use link::ConnectedDevice;

pub use bits::BitField;
pub use poll::ConversionPoller;
pub use sample::{BitDepth, Gain, Sample};
pub use shadow::{RegisterShadow, ShadowRegister};

pub use dev::ds1307::{RtcPi, SquareWave};
pub use dev::expanderpi::{BusError, ExpanderPi};
pub use dev::mcp23017::IoPi;
pub use dev::mcp3202::{AdcDacPi, AdcMode};
pub use dev::mcp3208::Mcp3208;
pub use dev::mcp4822::{DacGain, Mcp4822};
pub use dev::mcp3424::{AdcDifferentialPi, AdcPi, ConversionMode};
pub use dev::pca9546a::I2cSwitch;
pub use dev::pca9685::ServoPi;
