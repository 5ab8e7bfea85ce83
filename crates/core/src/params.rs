//! Pure helper functions for extracting typed parameters from a `serde_json::Value` object.
//!
//! Each helper takes a JSON value, a key name, and a default. If the key is
//! missing or the value is not the expected type, the default is returned.
//! These never fail; they always produce a usable value.

use serde_json::Value;

use crate::color::Rgba;

/// Extracts an `f64` from `params[name]`, returning `default` if missing or wrong type.
///
/// Accepts both JSON numbers (including integers) and converts them to f64.
pub fn param_f64(params: &Value, name: &str, default: f64) -> f64 {
    params.get(name).and_then(Value::as_f64).unwrap_or(default)
}

/// Extracts a `usize` from `params[name]`, returning `default` if missing or wrong type.
///
/// Only succeeds if the JSON value is a non-negative integer that fits in `u64`,
/// then converts to `usize`.
pub fn param_usize(params: &Value, name: &str, default: usize) -> usize {
    params
        .get(name)
        .and_then(Value::as_u64)
        .map(|v| v as usize)
        .unwrap_or(default)
}

/// Extracts a `bool` from `params[name]`, returning `default` if missing or wrong type.
pub fn param_bool(params: &Value, name: &str, default: bool) -> bool {
    params.get(name).and_then(Value::as_bool).unwrap_or(default)
}

/// Extracts a `String` from `params[name]`, returning `default` if missing or wrong type.
pub fn param_string(params: &Value, name: &str, default: &str) -> String {
    params
        .get(name)
        .and_then(Value::as_str)
        .map(String::from)
        .unwrap_or_else(|| default.to_owned())
}

/// Extracts a color from `params[name]`.
///
/// Accepts a hex string (`"#d97706"`, `"#d9770680"`) or an array of three or
/// four integers in `0..=255`.
pub fn param_color(params: &Value, name: &str, default: Rgba) -> Rgba {
    params.get(name).and_then(color_value).unwrap_or(default)
}

fn color_value(value: &Value) -> Option<Rgba> {
    match value {
        Value::String(s) => Rgba::from_hex(s).ok(),
        Value::Array(items) => {
            let channels: Option<Vec<u8>> = items
                .iter()
                .map(|v| v.as_u64().and_then(|n| u8::try_from(n).ok()))
                .collect();
            match channels.as_deref() {
                Some(&[r, g, b]) => Some(Rgba::rgb(r, g, b)),
                Some(&[r, g, b, a]) => Some(Rgba::new(r, g, b, a)),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Extracts a non-empty array of numbers. Any non-number entry rejects the whole list.
pub fn param_f64_list(params: &Value, name: &str, default: &[f64]) -> Vec<f64> {
    params
        .get(name)
        .and_then(Value::as_array)
        .filter(|items| !items.is_empty())
        .and_then(|items| items.iter().map(Value::as_f64).collect::<Option<Vec<_>>>())
        .unwrap_or_else(|| default.to_vec())
}

/// Extracts a non-empty array of colors, each in any form [`param_color`] accepts.
pub fn param_color_list(params: &Value, name: &str, default: &[Rgba]) -> Vec<Rgba> {
    params
        .get(name)
        .and_then(Value::as_array)
        .filter(|items| !items.is_empty())
        .and_then(|items| items.iter().map(color_value).collect::<Option<Vec<_>>>())
        .unwrap_or_else(|| default.to_vec())
}

/// Extracts a `[start, end]` pair of numbers from `params[name]`.
pub fn param_range(params: &Value, name: &str, default: (f64, f64)) -> (f64, f64) {
    match params.get(name).and_then(Value::as_array).map(Vec::as_slice) {
        Some([a, b]) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => (a, b),
            _ => default,
        },
        _ => default,
    }
}
