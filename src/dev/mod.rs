//! The device module contains the driver for each of the supported boards, one file per chip.
//!
//! In most cases you will not need anything from here explicitly, the exposed types at the root of
//! the crate should be enough.

pub mod ds1307;
pub mod expanderpi;
pub mod mcp23017;
pub mod mcp3202;
pub mod mcp3208;
pub mod mcp3424;
pub mod mcp4822;
pub mod pca9546a;
pub mod pca9685;
