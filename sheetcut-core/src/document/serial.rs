//! Conversion between spreadsheet serial numbers and calendar timestamps

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};

const SECONDS_PER_DAY: f64 = 86_400.0;
/// 9999-12-31, the last day Excel can represent
const MAX_SERIAL: f64 = 2_958_465.0;

fn epoch(date1904: bool) -> NaiveDateTime {
    let date = if date1904 {
        NaiveDate::from_ymd_opt(1904, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(1899, 12, 30)
    };
    date.unwrap_or_default().and_hms_opt(0, 0, 0).unwrap_or_default()
}

/// Convert a serial number to a timestamp.
///
/// The 1900 system counts the nonexistent 1900-02-29 as day 60, so serials
/// below 61 are shifted by one day. Returns `None` for negative, non-finite or
/// out-of-range serials.
pub fn serial_to_datetime(serial: f64, date1904: bool) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 || serial > MAX_SERIAL + 1.0 {
        return None;
    }
    let mut days = serial.floor();
    let seconds = ((serial - days) * SECONDS_PER_DAY).round() as i64;
    if !date1904 && days < 61.0 {
        days += 1.0;
    }
    let delta = TimeDelta::try_days(days as i64)? + TimeDelta::try_seconds(seconds)?;
    epoch(date1904).checked_add_signed(delta)
}

/// Convert a timestamp to its serial number
pub fn datetime_to_serial(value: NaiveDateTime, date1904: bool) -> f64 {
    let delta = value - epoch(date1904);
    let mut serial = delta.num_seconds() as f64 / SECONDS_PER_DAY;
    if !date1904 && serial < 61.0 {
        serial -= 1.0;
    }
    serial
}
