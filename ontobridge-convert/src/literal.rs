//! Type coercion of data property values.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use ontobridge_model::ScalarKind;
use serde_json::Value;

/// Output form of `date` literals.
pub const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S.000Z";

const OFFSET_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%z",
    "%Y-%m-%d %H:%M:%S%z",
];

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%Y%m%d", "%B %d, %Y", "%d %B %Y"];

/// Textual form of a scalar JSON value: strings verbatim, numbers in their
/// JSON form, booleans as `true`/`false`. `None` for null, arrays, and objects.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Coerces `value` to the lexical form of `kind`, or `None` if it cannot be.
pub fn lexical_form(kind: ScalarKind, value: &Value) -> Option<String> {
    match kind {
        ScalarKind::Boolean => boolean(value),
        ScalarKind::Integer => integer(value),
        ScalarKind::Float => float(value),
        ScalarKind::Double => double(value),
        ScalarKind::String => scalar_text(value),
        ScalarKind::Date => value.as_str().and_then(parse_date).map(|dt| dt.format(DATE_FORMAT).to_string()),
    }
}

fn boolean(value: &Value) -> Option<String> {
    match value {
        Value::Bool(b) => Some(b.to_string()),
        Value::String(s) if s.trim().eq_ignore_ascii_case("true") => Some("true".to_string()),
        Value::String(s) if s.trim().eq_ignore_ascii_case("false") => Some("false".to_string()),
        _ => None,
    }
}

fn integer(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i.to_string())
            } else if let Some(u) = n.as_u64() {
                Some(u.to_string())
            } else {
                let f = n.as_f64()?;
                (f.fract() == 0.0 && f.abs() < i64::MAX as f64).then(|| (f as i64).to_string())
            }
        }
        Value::String(s) => s.trim().parse::<i64>().ok().map(|i| i.to_string()),
        _ => None,
    }
}

fn float(value: &Value) -> Option<String> {
    let f = match value {
        Value::Number(n) => n.as_f64()? as f32,
        Value::String(s) => s.trim().parse::<f32>().ok()?,
        _ => return None,
    };
    Some(format!("{f:?}"))
}

fn double(value: &Value) -> Option<String> {
    let f = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    Some(format!("{f:?}"))
}

/// Parses free-form date text into a UTC timestamp. Values without an offset
/// are taken as UTC; plain dates as midnight.
pub fn parse_date(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in OFFSET_DATETIME_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(text, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
        }
    }
    None
}
