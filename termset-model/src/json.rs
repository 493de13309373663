//! Helpers for layering JSON fragments onto typed fields.
//!
//! A key that is absent or `null` leaves the target untouched. A value of the
//! wrong type is skipped and logged at debug level.

use serde_json::{Map, Value};

pub(crate) type JsonObject = Map<String, Value>;

/// Borrow `value` as an object, or `None` for any other JSON type.
pub(crate) fn as_object(value: &Value) -> Option<&JsonObject> {
    value.as_object()
}

/// Lookup that treats `null` the same as a missing key.
pub(crate) fn get<'a>(json: &'a JsonObject, key: &str) -> Option<&'a Value> {
    json.get(key).filter(|v| !v.is_null())
}

pub(crate) fn layer_string(json: &JsonObject, key: &str, target: &mut Option<String>) {
    if let Some(value) = get(json, key) {
        match value.as_str() {
            Some(s) => *target = Some(s.to_string()),
            None => log::debug!("Ignoring non-string value for \"{key}\": {value}"),
        }
    }
}

pub(crate) fn layer_bool(json: &JsonObject, key: &str, target: &mut Option<bool>) {
    if let Some(value) = get(json, key) {
        match value.as_bool() {
            Some(b) => *target = Some(b),
            None => log::debug!("Ignoring non-boolean value for \"{key}\": {value}"),
        }
    }
}

/// Layer an array of strings. Non-string elements are dropped.
pub(crate) fn layer_string_list(json: &JsonObject, key: &str, target: &mut Option<Vec<String>>) {
    if let Some(value) = get(json, key) {
        match value.as_array() {
            Some(items) => {
                *target = Some(
                    items
                        .iter()
                        .filter_map(|item| item.as_str().map(str::to_string))
                        .collect(),
                )
            }
            None => log::debug!("Ignoring non-array value for \"{key}\": {value}"),
        }
    }
}

pub(crate) fn get_str<'a>(json: &'a JsonObject, key: &str) -> Option<&'a str> {
    get(json, key).and_then(Value::as_str)
}

pub(crate) fn get_array<'a>(json: &'a JsonObject, key: &str) -> Option<&'a Vec<Value>> {
    get(json, key).and_then(Value::as_array)
}
