//! Binary-coded-decimal conversion for the DS1307 clock registers.
use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

/// Date returned when the clock registers do not hold a valid calendar date.
pub const FALLBACK_DATE: (i32, u32, u32, u32, u32, u32) = (1990, 1, 1, 1, 1, 1);

/// Decode one packed BCD byte.
pub const fn decode(bcd: u8) -> u8 {
    bcd - 6 * (bcd >> 4)
}

/// Encode `value` (0-99) as packed BCD.  Larger values wrap and give a meaningless byte.
pub const fn encode(value: u8) -> u8 {
    (value / 10).wrapping_mul(16).wrapping_add(value % 10)
}

/// The seven time-keeping registers of the clock, seconds first.
pub type ClockRegisters = [u8; 7];

/// Assemble a date from the clock registers.
///
/// The chip only stores a two digit year, `century` is added to it.  Register contents that do
/// not form a valid date (month 13, February 30, ...) yield [`fallback_date()`] instead of an
/// error.
pub fn decode_date_time(regs: &ClockRegisters, century: i32) -> NaiveDateTime {
    let year = i32::from(decode(regs[6])) + century;
    let month = u32::from(decode(regs[5]));
    let day = u32::from(decode(regs[4]));
    let hours = u32::from(decode(regs[2]));
    let minutes = u32::from(decode(regs[1]));
    let seconds = u32::from(decode(regs[0]));

    match NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(hours, minutes, seconds))
    {
        Some(dt) => dt,
        None => {
            warn!("clock registers hold an invalid date, using fallback");
            fallback_date()
        }
    }
}

/// Encode a date into the clock registers.
///
/// Returns `None` when the year is not within `century..century + 100`.  The day of week
/// register counts 1-7 starting on Sunday.  The hours are written in 24 hour mode and the
/// clock-halt bit is cleared.
pub fn encode_date_time(date: &NaiveDateTime, century: i32) -> Option<ClockRegisters> {
    let year = date.year().checked_sub(century)?;
    if !(0..=99).contains(&year) {
        return None;
    }

    Some([
        encode(date.second() as u8),
        encode(date.minute() as u8),
        encode(date.hour() as u8),
        encode(date.weekday().number_from_sunday() as u8),
        encode(date.day() as u8),
        encode(date.month() as u8),
        encode(year as u8),
    ])
}

/// The fixed date reported for unreadable clock contents, 1990-01-01 01:01:01.
pub fn fallback_date() -> NaiveDateTime {
    let (y, mo, d, h, mi, s) = FALLBACK_DATE;
    NaiveDate::from_ymd_opt(y, mo, d)
        .and_then(|d| d.and_hms_opt(h, mi, s))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        for n in 0..=99 {
            assert_eq!(decode(encode(n)), n);
        }
        assert_eq!(encode(59), 0x59);
        assert_eq!(decode(0x23), 23);
    }

    #[test]
    fn out_of_range_values_wrap() {
        // 16 * 16 wraps to 0x00
        assert_eq!(encode(160), 0x00);
        assert_eq!(encode(255), 0x95);
    }

    #[test]
    fn decode_registers() {
        // 2024-02-29 13:45:07, a Thursday
        let regs = [0x07, 0x45, 0x13, 0x05, 0x29, 0x02, 0x24];
        let dt = decode_date_time(&regs, 2000);
        assert_eq!(
            dt,
            NaiveDate::from_ymd_opt(2024, 2, 29)
                .unwrap()
                .and_hms_opt(13, 45, 7)
                .unwrap()
        );

        let dt = decode_date_time(&regs, 1900);
        assert_eq!(dt.year(), 1924);
    }

    #[test]
    fn invalid_month_falls_back() {
        let regs = [0x00, 0x00, 0x00, 0x01, 0x01, 0x13, 0x24];
        let dt = decode_date_time(&regs, 2000);
        assert_eq!(
            dt,
            NaiveDate::from_ymd_opt(1990, 1, 1)
                .unwrap()
                .and_hms_opt(1, 1, 1)
                .unwrap()
        );

        // February 30
        let regs = [0x00, 0x00, 0x00, 0x01, 0x30, 0x02, 0x24];
        assert_eq!(decode_date_time(&regs, 2000), fallback_date());
    }

    #[test]
    fn encode_registers() {
        let dt = NaiveDate::from_ymd_opt(2024, 2, 29)
            .unwrap()
            .and_hms_opt(13, 45, 7)
            .unwrap();
        assert_eq!(
            encode_date_time(&dt, 2000),
            Some([0x07, 0x45, 0x13, 0x05, 0x29, 0x02, 0x24])
        );
        assert_eq!(encode_date_time(&dt, 2100), None);
        assert_eq!(encode_date_time(&dt, 1900), None);
    }
}
