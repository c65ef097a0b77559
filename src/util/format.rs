use chrono::{DateTime, Utc};

const SECS_PER_MINUTE: i64 = 60;
const SECS_PER_HOUR: i64 = 60 * SECS_PER_MINUTE;
const SECS_PER_DAY: i64 = 24 * SECS_PER_HOUR;
const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Formats the age of a feed item relative to `now`.
///
/// `time` is the item's publication time in epoch seconds as reported by the
/// server; `tz_correction_hours` shifts it into the operator's zone. A zero
/// time means the feed carried no date and yields an empty string.
///
/// Output granularity: days when older than a day, hours when older than an
/// hour, minutes otherwise. Items dated in the future report `0 m`.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use nzbfeed::util::format_age;
///
/// let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
/// assert_eq!(format_age(1_700_000_000 - 3 * 86_400, 0, now), "3 d");
/// assert_eq!(format_age(1_700_000_000 - 2 * 3_600, 0, now), "2 h");
/// assert_eq!(format_age(0, 0, now), "");
/// ```
pub fn format_age(time: i64, tz_correction_hours: i32, now: DateTime<Utc>) -> String {
    if time == 0 {
        return String::new();
    }

    let adjusted = time.saturating_add(i64::from(tz_correction_hours) * SECS_PER_HOUR);
    let diff = now.timestamp().saturating_sub(adjusted).max(0);

    let rounded = |unit: i64| (diff as f64 / unit as f64).round() as i64;
    if diff > SECS_PER_DAY {
        format!("{} d", rounded(SECS_PER_DAY))
    } else if diff > SECS_PER_HOUR {
        format!("{} h", rounded(SECS_PER_HOUR))
    } else {
        format!("{} m", rounded(SECS_PER_MINUTE))
    }
}

/// Formats an item size given in megabytes.
///
/// Precision shrinks as the value grows so columns stay narrow.
pub fn format_size_mb(size_mb: f64) -> String {
    if size_mb > 10240.0 {
        format!("{:.1} GB", size_mb / 1024.0)
    } else if size_mb > 1024.0 {
        format!("{:.2} GB", size_mb / 1024.0)
    } else if size_mb > 100.0 {
        format!("{:.0} MB", size_mb)
    } else if size_mb > 10.0 {
        format!("{:.1} MB", size_mb)
    } else {
        format!("{:.2} MB", size_mb)
    }
}

/// Formats an item size from its two encodings.
///
/// The exact byte count (`bytes`, joined from the server's hi/lo words) wins
/// when present; otherwise the rounded megabyte figure is used. Returns an
/// empty string when both are zero, meaning the feed did not report a size.
pub fn format_item_size(size_mb: f64, bytes: u64) -> String {
    if bytes > 0 {
        format_size_mb(bytes as f64 / BYTES_PER_MB)
    } else if size_mb > 0.0 {
        format_size_mb(size_mb)
    } else {
        String::new()
    }
}
