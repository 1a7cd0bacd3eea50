//! Timestamp utilities
//!
//! Container formats express chapter positions in several units:
//! nanoseconds (Matroska), 100 ns ticks (Nero `chpl`), media timescale
//! ticks (MP4 sample tables) and textual `HH:MM:SS.mmm` (Vorbis comments).
//! Everything is converted to signed milliseconds.

use chrono::{DateTime, NaiveTime, Timelike, Utc};
use std::time::SystemTime;

/// Convert a file system timestamp to milliseconds since the Unix epoch
pub fn system_time_to_ms(time: SystemTime) -> i64 {
    DateTime::<Utc>::from(time).timestamp_millis()
}

/// Nanoseconds to milliseconds (truncating)
pub fn ns_to_ms(ns: u64) -> i64 {
    (ns / 1_000_000) as i64
}

/// 100-nanosecond units to milliseconds (truncating)
pub fn hundred_ns_to_ms(units: u64) -> i64 {
    (units / 10_000) as i64
}

/// Media timescale ticks to milliseconds
///
/// Returns `None` for a zero timescale.
pub fn ticks_to_ms(ticks: u64, timescale: u32) -> Option<i64> {
    if timescale == 0 {
        return None;
    }
    let ms = u128::from(ticks) * 1000 / u128::from(timescale);
    Some(i64::try_from(ms).unwrap_or(i64::MAX))
}

/// Parse `HH:MM:SS.mmm` (fraction optional, any precision) into milliseconds
pub fn parse_timestamp(text: &str) -> Option<i64> {
    let text = text.trim();
    let (clock, fraction) = match text.split_once('.') {
        Some((clock, fraction)) => (clock, Some(fraction)),
        None => (text, None),
    };

    let mut fields = clock.split(':');
    let hours: i64 = fields.next()?.parse().ok()?;
    let rest = format!("00:{}:{}", fields.next()?, fields.next()?);
    if fields.next().is_some() || hours < 0 {
        return None;
    }
    // minutes and seconds must be in range, hours may exceed a day
    let time = NaiveTime::parse_from_str(&rest, "%H:%M:%S").ok()?;

    let millis = match fraction {
        Some(digits) if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) => {
            let padded: String = digits.chars().chain("000".chars()).take(3).collect();
            padded.parse::<i64>().ok()?
        }
        Some(_) => return None,
        None => 0,
    };

    Some(
        hours * 3_600_000
            + i64::from(time.minute()) * 60_000
            + i64::from(time.second()) * 1000
            + millis,
    )
}
