//! Publish-date normalization.
//!
//! Feeds carry RFC 822 dates (RSS) or ISO 8601 dates (Atom). Both are
//! rendered in a fixed UTC+8 offset as `YYYY-MM-DD HH:MM:SS`. Anything that
//! cannot be parsed is passed through unchanged.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Offset every timestamp is converted to.
pub const DISPLAY_OFFSET_SECS: i32 = 8 * 3600;

pub const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
];

const OFFSET_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"];

/// Normalize a raw feed date, returning the input unchanged when it cannot be parsed.
pub fn normalize_timestamp(raw: &str) -> String {
    match parse_timestamp(raw) {
        Some(dt) => format_timestamp(dt).unwrap_or_else(|| raw.to_string()),
        None => {
            tracing::debug!("Keeping unparseable date as-is: {:?}", raw);
            raw.to_string()
        }
    }
}

/// Parse an RFC 822 or ISO 8601 date. Values without an offset are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    parse_rfc822(s).or_else(|| parse_iso8601(s))
}

fn parse_rfc822(s: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc2822(s).ok()
}

fn parse_iso8601(s: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt);
    }

    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }

    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })?;

    Some(Utc.from_utc_datetime(&naive).fixed_offset())
}

fn format_timestamp(dt: DateTime<FixedOffset>) -> Option<String> {
    let offset = FixedOffset::east_opt(DISPLAY_OFFSET_SECS)?;
    Some(dt.with_timezone(&offset).format(DISPLAY_FORMAT).to_string())
}
