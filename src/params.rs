// ABOUTME: Parameter helpers for handler implementations
// ABOUTME: Uniform precondition checks and attribute whitelisting over task descriptors

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::engine::{Descriptor, TaskError};

/// Check that every key in `required` is present and not null.
///
/// An explicit JSON `null` counts as missing, so `{ "title": null }` fails
/// for `title` the same way as `{}` does. Fails with [`TaskError::KeyError`]
/// naming the first missing key and echoing the whole descriptor. Returns the
/// descriptor unchanged otherwise.
pub fn ensure_parameters<'a>(
    descriptor: &'a Descriptor,
    required: &[&str],
) -> Result<&'a Descriptor, TaskError> {
    for key in required {
        if descriptor.get(*key).map_or(true, Value::is_null) {
            return Err(TaskError::KeyError {
                key: key.to_string(),
                descriptor: Value::Object(descriptor.clone()),
            });
        }
    }
    Ok(descriptor)
}

/// Keep only the `allowed` keys that are present and not null.
///
/// Keys whose value is an explicit JSON `null` are dropped from the result.
pub fn extract_attributes(descriptor: &Descriptor, allowed: &[&str]) -> Descriptor {
    allowed
        .iter()
        .filter_map(|key| match descriptor.get(*key) {
            Some(value) if !value.is_null() => Some((key.to_string(), value.clone())),
            _ => None,
        })
        .collect()
}

/// Deserialize a descriptor into a typed parameter struct.
pub fn deserialize_parameters<T: DeserializeOwned>(
    descriptor: &Descriptor,
) -> Result<T, TaskError> {
    let value = Value::Object(descriptor.clone());
    serde_json::from_value(value.clone()).map_err(|e| TaskError::InvalidParameters {
        message: e.to_string(),
        descriptor: value,
    })
}
