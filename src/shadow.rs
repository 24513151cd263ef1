//! In-memory mirror of write-only (or expensive to read) configuration registers.
//!
//! Drivers keep the last value they wrote to each configuration register in a
//! [`RegisterShadow`].  Single-bit changes are applied to the shadow with [`BitField`] and then
//! the whole byte is written to the chip, so no read-before-write round trip is needed.  The
//! shadow is only resynchronised from hardware where a driver explicitly reads a register back.
use crate::bits::BitField;
use crate::bus::I2cExt;
use core::marker::PhantomData;

/// A register that has a slot in a [`RegisterShadow`].
pub trait ShadowRegister: Copy {
    /// Index of this register inside the shadow array.
    fn slot(self) -> usize;
}

/// Shadow copy of `N` byte-wide configuration registers, indexed by `R`.
#[derive(Debug, Clone)]
pub struct RegisterShadow<R, const N: usize> {
    values: [u8; N],
    _r: PhantomData<R>,
}

impl<R: ShadowRegister, const N: usize> RegisterShadow<R, N> {
    /// Create a shadow holding the power-on (or driver default) values of the registers.
    pub const fn new(initial: [u8; N]) -> Self {
        Self {
            values: initial,
            _r: PhantomData,
        }
    }

    /// Last value written to `reg`.
    pub fn get(&self, reg: R) -> u8 {
        self.values[reg.slot()]
    }

    /// Replace the shadow value of `reg`.  Returns whether the value changed.
    pub fn set(&mut self, reg: R, value: u8) -> bool {
        let slot = &mut self.values[reg.slot()];
        let changed = *slot != value;
        *slot = value;
        changed
    }

    /// Set or clear a single bit of `reg` without touching the bus.  Returns whether the value
    /// changed.
    pub fn update_bit(&mut self, reg: R, position: u8, state: bool) -> bool {
        let value = self.get(reg).with_bit(position, state);
        self.set(reg, value)
    }

    /// Apply `f` to every shadowed register value.
    pub fn update_all(&mut self, mut f: impl FnMut(u8) -> u8) {
        for v in self.values.iter_mut() {
            *v = f(*v);
        }
    }

    /// Overwrite the shadow of `reg` with a value read back from hardware.
    pub fn resync(&mut self, reg: R, hardware: u8) {
        if self.set(reg, hardware) {
            debug!("shadow resynchronised from hardware: {:#x}", hardware);
        }
    }
}

impl<R: ShadowRegister + Into<u8>, const N: usize> RegisterShadow<R, N> {
    /// Write the shadow value of `reg` to the chip at `addr`.
    pub(crate) fn write_back<B: I2cExt>(
        &self,
        bus: &mut B,
        addr: u8,
        reg: R,
    ) -> Result<(), B::Error> {
        let value = self.get(reg);
        let reg: u8 = reg.into();
        trace!("write back {:#x} = {:#x} (device {:#x})", reg, value, addr);
        bus.write_reg(addr, reg, value)
    }

    /// Store `value` for `reg` and write it to the chip.
    pub(crate) fn store_and_write<B: I2cExt>(
        &mut self,
        bus: &mut B,
        addr: u8,
        reg: R,
        value: u8,
    ) -> Result<(), B::Error> {
        self.set(reg, value);
        self.write_back(bus, addr, reg)
    }

    /// Set or clear a single bit of `reg` and write the full byte to the chip.
    ///
    /// This is always exactly one bus write; a transport failure is returned to the caller as is
    /// and the shadow keeps the new value.
    pub(crate) fn update_and_write<B: I2cExt>(
        &mut self,
        bus: &mut B,
        addr: u8,
        reg: R,
        position: u8,
        state: bool,
    ) -> Result<(), B::Error> {
        self.update_bit(reg, position, state);
        self.write_back(bus, addr, reg)
    }
}
