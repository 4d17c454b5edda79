// Utility helpers for parsing and basic statistics.
//
// Source spreadsheets are filled in by hand, so every numeric column goes
// through these forgiving parsers: anything that is not a clean number becomes
// `None` instead of an error.
use num_format::{Locale, ToFormattedString};

/// Parse a cell value into `f64`.
///
/// - Accepts `Option<&str>` so callers can pass through optional fields.
/// - Trims whitespace.
/// - Returns `None` for empty text, text that is not a number, and
///   non-finite values (`NaN`, `inf`).
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a cell value into a nullable integer.
///
/// Spreadsheet exports often write counts as `12.0`; integral floats are
/// accepted, anything with a fractional part is not.
pub fn parse_i64_safe(s: Option<&str>) -> Option<i64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(v) = s.parse::<i64>() {
        return Some(v);
    }
    let v = parse_f64_safe(Some(s))?;
    if v.fract() == 0.0 && v.abs() < i64::MAX as f64 {
        Some(v as i64)
    } else {
        None
    }
}

pub fn parse_i32_safe(s: Option<&str>) -> Option<i32> {
    parse_i64_safe(s).and_then(|v| i32::try_from(v).ok())
}

/// Arithmetic mean of the present values; `None` when there are none.
pub fn average(values: impl IntoIterator<Item = Option<f64>>) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .flatten()
        .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Format a ratio as a percentage with one decimal (`0.125` → `12.5%`).
pub fn format_percent(v: Option<f64>) -> String {
    match v {
        Some(v) => format!("{:.1}%", v * 100.0),
        None => "N/D".to_string(),
    }
}

/// Same as [`format_percent`] but always carries a sign; used for deltas.
pub fn format_percent_delta(v: f64) -> String {
    format!("{:+.1}%", v * 100.0)
}

pub fn format_int(v: Option<i64>) -> String {
    // Counts are shown with Spanish thousands separators (`12.345`).
    match v {
        Some(n) => n.to_formatted_string(&Locale::es),
        None => "N/D".to_string(),
    }
}
