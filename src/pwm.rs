//! PCA9685 register arithmetic: prescaler and the per-channel LED register quads.

/// Internal oscillator frequency.
pub const OSC_CLOCK: u32 = 25_000_000;
/// Counter steps per PWM period (12 bit).
pub const STEPS: u32 = 4096;
/// Largest on/off time.
pub const MAX_TIME: u16 = 4095;

pub const MIN_FREQUENCY: u16 = 40;
pub const MAX_FREQUENCY: u16 = 1000;

/// First register of channel 1 (LED0_ON_L).
pub const LED0_ON_L: u8 = 0x06;
/// First register of the all-channel broadcast quad (ALL_LED_ON_L).
pub const ALL_LED_ON_L: u8 = 0xfa;

/// Prescale value for a PWM frequency: `round(25 MHz / 4096 / freq) - 1`, clamped to a byte.
///
/// `freq` must not be zero.
pub fn prescale(freq: u16) -> u8 {
    let steps = f64::from(OSC_CLOCK) / f64::from(STEPS) / f64::from(freq);
    // round half up, the value is always positive
    let rounded = (steps + 0.5) as u32;
    rounded.saturating_sub(1).min(u32::from(u8::MAX)) as u8
}

/// Register quad (ON_L, ON_H, OFF_L, OFF_H) of `channel`, which counts from 1.
///
/// `None` for channels outside 1-16.
pub const fn channel_base(channel: u8) -> Option<u8> {
    match channel {
        1..=16 => Some(LED0_ON_L + 4 * (channel - 1)),
        _ => None,
    }
}

/// Split a 12-bit time into its low and high register bytes.
pub const fn split_time(time: u16) -> [u8; 2] {
    [(time & 0xff) as u8, (time >> 8) as u8 & 0x0f]
}

/// Offset of the ON_L register inside a quad.
pub const ON: u8 = 0;
/// Offset of the OFF_L register inside a quad.
pub const OFF: u8 = 2;
