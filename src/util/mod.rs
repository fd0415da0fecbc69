use chrono::{DateTime, SecondsFormat, Utc};

pub(crate) fn now_ms() -> i64 {
    js_sys::Date::now().round() as i64
}

/// `createdAt` value for a note created at `now_ms`, in the same
/// `YYYY-MM-DDTHH:MM:SS.mmmZ` form browsers produce.
pub(crate) fn iso_timestamp(now_ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(now_ms)
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// First non-empty line of `content`, cut to `max_chars` characters.
pub(crate) fn preview_line(content: &str, max_chars: usize) -> String {
    let line = content
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("");

    if line.chars().count() <= max_chars {
        return line.to_string();
    }

    let mut out: String = line.chars().take(max_chars).collect();
    out.push('…');
    out
}
