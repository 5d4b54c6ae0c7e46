use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use tracing::warn;

/// All displayed timestamps use this fixed offset (UTC+8).
fn display_offset() -> FixedOffset {
    FixedOffset::east_opt(8 * 3600).expect("UTC+8 is a valid offset")
}

/// Render an absolute instant in the display timezone as `YYYY-MM-DD HH:MM`.
pub fn format_fixed(dt: DateTime<Utc>) -> String {
    dt.with_timezone(&display_offset())
        .format("%Y-%m-%d %H:%M")
        .to_string()
}

/// Current wall-clock time in the display format, used for run statistics.
pub fn now_display() -> String {
    format_fixed(Utc::now())
}

/// Normalize a heterogeneous feed timestamp string to `YYYY-MM-DD HH:MM`
/// in UTC+8. Values without an offset are assumed UTC. A bare date stays a
/// calendar date and is rendered as midnight without timezone conversion.
/// Unparseable input yields an empty string; callers substitute "Unknown".
pub fn normalize(time_str: &str) -> String {
    let trimmed = time_str.trim();

    if let Ok(dt) = DateTime::parse_from_rfc2822(trimmed) {
        return format_fixed(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return format_fixed(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return format_fixed(Utc.from_utc_datetime(&naive));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return format!("{} 00:00", date.format("%Y-%m-%d"));
    }

    warn!(time = %time_str, "unparseable timestamp");
    String::new()
}
