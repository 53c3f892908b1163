//! Datetime decoding and day-boundary helpers.
//!
//! Request datetimes travel in a constrained ISO-8601 encoding that survives URL
//! transport: the `:` separators of the time part may arrive as `-`, and the
//! date/time separator may arrive as `+` or a space. A `±HHMM` zone suffix is
//! accepted and normalized to UTC; all datetimes are naive UTC from there on.

use chrono::{DateTime, Days, NaiveDateTime, NaiveTime};

/// Length of `2019-03-01 18:56:16+1100`.
const LEN_WITH_ZONE: usize = 24;
/// Length of `2019-03-01 18:56:16`.
const LEN_PLAIN: usize = 19;

/// Decodes a URL-mangled ISO-8601 datetime.
///
/// Returns `None` for anything that doesn't parse; the options layer treats that
/// as "unset", never as an error.
pub fn decode_datetime(raw: &str) -> Option<NaiveDateTime> {
    if raw.len() != LEN_WITH_ZONE && raw.len() != LEN_PLAIN {
        return None;
    }
    if !raw.is_ascii() {
        return None;
    }

    let mut buf = raw.as_bytes().to_vec();

    // A `+` introducing the zone arrives as a space once URL-decoded.
    if buf.len() == LEN_WITH_ZONE && buf[LEN_WITH_ZONE - 5] == b' ' {
        buf[LEN_WITH_ZONE - 5] = b'+';
    }

    // The time separators may have been sent as `-` to dodge the reserved `:`.
    if buf[13] == b'-' {
        buf[13] = b':';
    }
    if buf[16] == b'-' {
        buf[16] = b':';
    }

    // The date/time separator may arrive as `+`, `T` or a space.
    if buf[10] == b'+' || buf[10] == b'T' {
        buf[10] = b' ';
    }

    let s = std::str::from_utf8(&buf).ok()?;

    if s.len() == LEN_WITH_ZONE {
        DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%z")
            .ok()
            .map(|dt| dt.naive_utc())
    } else {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").ok()
    }
}

/// Formats a datetime in the wire format accepted by [`decode_datetime`].
pub fn encode_datetime(dt: NaiveDateTime) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Returns the start of an `num_days`-long window ending on the calendar day of
/// `latest`.
///
/// The boundary is the day-aligned instant right after `latest` (midnight of the
/// next day), minus the window length. Returns `None` on date overflow, in which
/// case the window is simply not applied.
pub fn day_window_start(latest: NaiveDateTime, num_days: u32) -> Option<NaiveDateTime> {
    latest
        .date()
        .succ_opt()
        .map(|day| day.and_time(NaiveTime::MIN))
        .and_then(|bound| bound.checked_sub_days(Days::new(num_days as u64)))
}

/// Returns the instant `num_days` days before `latest`.
pub fn days_before(latest: NaiveDateTime, num_days: u32) -> Option<NaiveDateTime> {
    latest.checked_sub_days(Days::new(num_days as u64))
}
