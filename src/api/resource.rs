//! Accessors for the handful of metadata fields the reflector relies on.
//!
//! Object documents stay opaque `serde_json::Value`s; only `metadata.uid`
//! (cache identity) and `metadata.resourceVersion` (change-log position)
//! have meaning here.

use serde_json::Value;

/// Stable identity of an object document.
#[must_use]
pub fn uid(object: &Value) -> Option<&str> {
    object.pointer("/metadata/uid").and_then(Value::as_str)
}

/// Human-readable name, used only for logging.
#[must_use]
pub fn name(object: &Value) -> Option<&str> {
    object.pointer("/metadata/name").and_then(Value::as_str)
}

/// Change-log position of a single object document.
#[must_use]
pub fn resource_version(object: &Value) -> Option<&str> {
    object.pointer("/metadata/resourceVersion").and_then(Value::as_str)
}

/// Change-log position of a list response.
///
/// Some servers put it at the top level rather than under `metadata`, so
/// both locations are accepted.
#[must_use]
pub fn list_resource_version(list: &Value) -> Option<&str> {
    list.get("resourceVersion")
        .and_then(Value::as_str)
        .or_else(|| list.pointer("/metadata/resourceVersion").and_then(Value::as_str))
}
