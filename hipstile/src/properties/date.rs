//! Release dates in the restricted HiPS profile `YYYY-MM-DDThh:mmZ`.

use chrono::{DateTime, NaiveDateTime};

/// Modified Julian Date of the Unix epoch.
const MJD_UNIX_EPOCH: f64 = 40587.0;

const SECONDS_PER_DAY: f64 = 86400.0;

const DATE_FORMAT: &str = "%Y-%m-%dT%H:%MZ";

/// Parse a HiPS release date into a Modified Julian Date.
///
/// Only the exact `YYYY-MM-DDThh:mmZ` profile is accepted. Any deviation
/// returns `None`, meaning "unknown date": callers treat the survey as
/// always current rather than failing.
///
/// # Example
///
/// ```
/// use hipstile::properties::parse_date;
///
/// assert_eq!(parse_date("1970-01-02T00:00Z"), Some(40588.0));
/// assert_eq!(parse_date("2019-01-02"), None);
/// ```
pub fn parse_date(s: &str) -> Option<f64> {
    let bytes = s.as_bytes();
    if bytes.len() != 17 {
        return None;
    }
    let shape_ok = bytes.iter().enumerate().all(|(i, b)| match i {
        4 | 7 => *b == b'-',
        10 => *b == b'T',
        13 => *b == b':',
        16 => *b == b'Z',
        _ => b.is_ascii_digit(),
    });
    if !shape_ok {
        return None;
    }

    let parsed = NaiveDateTime::parse_from_str(s, DATE_FORMAT).ok()?;
    let secs = parsed.and_utc().timestamp() as f64;
    Some(MJD_UNIX_EPOCH + secs / SECONDS_PER_DAY)
}

/// Format a Modified Julian Date back into the HiPS date profile.
pub fn format_date(mjd: f64) -> Option<String> {
    let secs = ((mjd - MJD_UNIX_EPOCH) * SECONDS_PER_DAY).round() as i64;
    let dt = DateTime::from_timestamp(secs, 0)?;
    Some(dt.format(DATE_FORMAT).to_string())
}
