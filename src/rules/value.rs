//! Value coercion helpers for clause evaluation.
//!
//! Clause operands come from a JSON variable bag, so evaluation follows the
//! loose coercion rules of the wire format: numbers parse from strings,
//! truthiness treats empty/zero/null as false, and array operators wrap
//! scalars. A variable that is absent from the bag behaves differently from
//! an explicit `null` in numeric context, mirroring undefined vs null.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

/// Coerce a looked-up value to a number. `None` (absent variable) is
/// non-finite; explicit `null` coerces to zero.
pub(crate) fn to_number(value: Option<&Value>) -> f64 {
    let Some(value) = value else {
        return f64::NAN;
    };
    match value {
        Value::Null => 0.0,
        Value::Bool(true) => 1.0,
        Value::Bool(false) => 0.0,
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse::<f64>().unwrap_or(f64::NAN)
            }
        }
        Value::Array(_) | Value::Object(_) => f64::NAN,
    }
}

/// Coerce a looked-up value to epoch milliseconds for date comparison.
///
/// Numbers pass through as millis. Strings parse as RFC 3339, as a naive
/// `YYYY-MM-DDTHH:MM:SS` timestamp, or as a bare `YYYY-MM-DD` date at
/// midnight UTC. Anything else is non-finite.
pub(crate) fn to_epoch_millis(value: Option<&Value>) -> f64 {
    let Some(value) = value else {
        return f64::NAN;
    };
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => parse_date_millis(s.trim()).unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}

fn parse_date_millis(s: &str) -> Option<f64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_millis() as f64);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(naive.and_utc().timestamp_millis() as f64);
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        let midnight = date.and_hms_opt(0, 0, 0)?;
        return Some(midnight.and_utc().timestamp_millis() as f64);
    }
    s.parse::<f64>().ok()
}

/// Ordinary truthiness: null, absent, false, zero, NaN, and the empty
/// string are false; everything else is true.
pub(crate) fn truthy(value: Option<&Value>) -> bool {
    let Some(value) = value else {
        return false;
    };
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Coerce to an array for set operators: arrays pass through, absent and
/// `null` become empty, scalars are wrapped.
pub(crate) fn to_array(value: Option<&Value>) -> Vec<Value> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.clone(),
        Some(other) => vec![other.clone()],
    }
}

/// Deep equality with numeric normalization, so `1` and `1.0` compare equal
/// the way they would after a JSON round-trip through a loosely typed
/// runtime.
pub(crate) fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        _ => a == b,
    }
}

/// Membership with the same numeric normalization as [`values_equal`].
pub(crate) fn array_contains(haystack: &[Value], needle: &Value) -> bool {
    haystack.iter().any(|item| values_equal(item, needle))
}
