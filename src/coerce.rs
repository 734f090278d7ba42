// 🔧 Coercion - best-effort conversion of untyped values
//
// A failed coercion is `None`, never an error. Callers fall through to the
// next alias or to the field default.

use serde_json::Value;

/// Largest magnitude an f64 can hold while still being an exact integer
const MAX_EXACT_F64: f64 = 9_007_199_254_740_992.0;

/// Shared "treat as missing" predicate.
///
/// A value is missing when it is absent, null, an empty (or blank) string,
/// `false`, or anything that coerces to the number zero. A present zero is
/// therefore resolved through aliases and defaults exactly like an absent field.
pub fn is_missing(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::Bool(b)) => !b,
        Some(Value::String(s)) if s.trim().is_empty() => true,
        Some(other) => coerce_integer(other) == Some(0),
    }
}

/// Coerce to an integer: integral finite numbers, or strings holding one
pub fn coerce_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i)
            } else {
                n.as_f64().and_then(integral_f64)
            }
        }
        Value::String(s) => parse_integer(s),
        _ => None,
    }
}

/// Coerce to a non-zero integer. Zero counts as a failed coercion.
pub fn coerce_nonzero_integer(value: &Value) -> Option<i64> {
    coerce_integer(value).filter(|n| *n != 0)
}

/// Coerce to a strictly positive integer
pub fn coerce_positive_integer(value: &Value) -> Option<i64> {
    coerce_integer(value).filter(|n| *n > 0)
}

/// Coerce to a trimmed, non-empty string. Only JSON strings qualify.
pub fn coerce_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        _ => None,
    }
}

fn parse_integer(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(i) = trimmed.parse::<i64>() {
        return Some(i);
    }

    trimmed.parse::<f64>().ok().and_then(integral_f64)
}

fn integral_f64(f: f64) -> Option<i64> {
    if f.is_finite() && f.fract() == 0.0 && f.abs() <= MAX_EXACT_F64 {
        Some(f as i64)
    } else {
        None
    }
}
