//! Parsing loosely typed event times into seconds.
//!
//! Imported rows carry times as numbers, as `"M:S"` or `"H:M:S"` strings, or as
//! decimal strings that may use a comma separator. Anything else is treated
//! as missing rather than as an error.

use serde_json::Value;

/// Values above this many seconds are read as milliseconds by default.
pub const DEFAULT_MILLIS_THRESHOLD: f64 = 10_000.0;

/// Parse a JSON value into non-negative seconds.
#[must_use]
pub fn parse_seconds(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|s| s.is_finite() && *s >= 0.0),
        Value::String(s) => parse_seconds_str(s),
        _ => None,
    }
}

/// Parse a time string into non-negative seconds.
///
/// ```
/// use matchtag::analytics::time::parse_seconds_str;
///
/// assert_eq!(parse_seconds_str("2:38"), Some(158.0));
/// assert_eq!(parse_seconds_str("1:02:03"), Some(3723.0));
/// assert_eq!(parse_seconds_str("12,5"), Some(12.5));
/// assert_eq!(parse_seconds_str("soon"), None);
/// ```
#[must_use]
pub fn parse_seconds_str(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    let seconds = if s.contains(':') {
        let parts: Vec<&str> = s.split(':').map(str::trim).collect();
        let tail = &parts[parts.len().saturating_sub(3)..];
        let mut total = 0.0;
        for part in tail {
            total = total * 60.0 + parse_decimal(part)?;
        }
        total
    } else {
        parse_decimal(s)?
    };

    (seconds.is_finite() && seconds >= 0.0).then_some(seconds)
}

fn parse_decimal(part: &str) -> Option<f64> {
    if part.is_empty() {
        return None;
    }
    part.replace(',', ".").parse::<f64>().ok()
}

/// Treat implausibly large values as a millisecond encoding.
#[must_use]
pub fn normalize_seconds(seconds: f64, millis_threshold: f64) -> f64 {
    if seconds > millis_threshold {
        seconds / 1000.0
    } else {
        seconds
    }
}

/// Render seconds as `m:ss`, the format used in exports.
#[must_use]
pub fn format_clock(seconds: f64) -> String {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // clamped to >= 0 and floored
    let whole = seconds.max(0.0).floor() as u64;
    format!("{}:{:02}", whole / 60, whole % 60)
}
