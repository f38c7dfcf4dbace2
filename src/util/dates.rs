//! Date parsing and the fixed `YYYY-MM-DD HH:mm:ss` local-time rendering.
use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, TimeZone};

/// Display format for `{{publishedTime}}`, `{{savedTime}}` and `{{published}}`.
pub const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parses the date formats seen in feeds and in rendered front matter.
///
/// Accepts RFC 2822 (RSS `pubDate`), RFC 3339 (Atom, `savedDate`), and naive
/// `YYYY-MM-DD HH:mm:ss` / `YYYY-MM-DDTHH:mm:ss` / `YYYY-MM-DD`, which are
/// taken as local time. Surrounding quotes and whitespace are ignored.
pub fn parse_date(raw: &str) -> Option<DateTime<FixedOffset>> {
    let s = raw.trim().trim_matches(|c| c == '"' || c == '\'').trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt);
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt);
    }

    for fmt in [DISPLAY_FORMAT, "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return local(naive);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .and_then(local)
}

fn local(naive: NaiveDateTime) -> Option<DateTime<FixedOffset>> {
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.fixed_offset())
}

/// Renders a timestamp in local time using [`DISPLAY_FORMAT`].
pub fn format_local<Tz: TimeZone>(dt: &DateTime<Tz>) -> String {
    dt.with_timezone(&Local).format(DISPLAY_FORMAT).to_string()
}

/// Parses and re-renders a source date string; unparseable input is
/// returned trimmed but otherwise unchanged.
pub fn display_date(raw: &str) -> String {
    match parse_date(raw) {
        Some(dt) => format_local(&dt),
        None => raw.trim().to_string(),
    }
}
