//! Time and number formatting for widgets.

use std::fmt::Display;

use chrono::{DateTime, Local, TimeZone, Utc};

/// Formats epoch seconds as local wall-clock `HH:MM:SS` (24 hour).
pub fn format_epoch_time(epoch_secs: f64) -> String {
    format_epoch_time_in(&Local, epoch_secs)
}

/// Formats epoch seconds as `HH:MM:SS` in the given zone.
///
/// Returns an empty string for values chrono cannot represent (NaN, far out of range).
pub fn format_epoch_time_in<Tz>(tz: &Tz, epoch_secs: f64) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    match to_utc(epoch_secs) {
        Some(utc) => utc.with_timezone(tz).format("%H:%M:%S").to_string(),
        None => String::new(),
    }
}

/// Formats the clock face, e.g. `Oct 19, 14:03:22`.
pub fn format_clock<Tz>(now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    now.format("%b %-d, %H:%M:%S").to_string()
}

/// Parses epoch seconds into UTC, keeping millisecond precision.
pub fn to_utc(epoch_secs: f64) -> Option<DateTime<Utc>> {
    if !epoch_secs.is_finite() {
        return None;
    }
    let millis = (epoch_secs * 1000.0).floor();
    if millis.abs() > i64::MAX as f64 {
        return None;
    }
    DateTime::from_timestamp_millis(millis as i64)
}

/// Groups a counter with `,` every three digits: `1234567` -> `1,234,567`.
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
