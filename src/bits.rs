/// Single-bit helpers for register values.
///
/// `position` counts from the LSB.  It is not range checked: a position at or beyond the width of
/// the integer overflows the shift, so callers must only pass positions that exist in the type.
pub trait BitField: Copy {
    /// Return `self` with the bit at `position` set to `state`.
    fn with_bit(self, position: u8, state: bool) -> Self;

    /// Whether the bit at `position` is set.
    fn bit(self, position: u8) -> bool;
}

macro_rules! impl_bitfield {
    ($($t:ty),*) => {
        $(
            impl BitField for $t {
                #[inline]
                fn with_bit(self, position: u8, state: bool) -> Self {
                    if state {
                        self | (1 << position)
                    } else {
                        self & !(1 << position)
                    }
                }

                #[inline]
                fn bit(self, position: u8) -> bool {
                    self & (1 << position) != 0
                }
            }
        )*
    };
}

impl_bitfield!(u8, u16, u32, i32);

/// Set or clear the bit at `position` of `value`.
#[inline]
pub fn set_bit<T: BitField>(value: T, position: u8, state: bool) -> T {
    value.with_bit(position, state)
}

/// Check the bit at `position` of `value`.
#[inline]
pub fn test_bit<T: BitField>(value: T, position: u8) -> bool {
    value.bit(position)
}
