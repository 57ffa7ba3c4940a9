//! A total order over JSON attribute values.
//!
//! Sort keys compare attribute values after they have been converted to
//! JSON. Values of different kinds order by kind:
//! `null` < booleans < numbers < strings < arrays < objects.

use std::cmp::Ordering;

use serde_json::{Number, Value};

/// Compare two JSON values. Total and deterministic.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => x
            .iter()
            .zip(y.iter())
            .map(|(l, r)| compare_values(l, r))
            .find(|o| o.is_ne())
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        (Value::Object(_), Value::Object(_)) => a.to_string().cmp(&b.to_string()),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// The string a filter value is matched against.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn compare_numbers(x: &Number, y: &Number) -> Ordering {
    if let (Some(l), Some(r)) = (x.as_i64(), y.as_i64()) {
        return l.cmp(&r);
    }
    if let (Some(l), Some(r)) = (x.as_u64(), y.as_u64()) {
        return l.cmp(&r);
    }
    let l = x.as_f64().unwrap_or(f64::NAN);
    let r = y.as_f64().unwrap_or(f64::NAN);
    l.total_cmp(&r)
}

fn rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}
