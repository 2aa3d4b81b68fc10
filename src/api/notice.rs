//! One change record from a watch stream.

use crate::error::Result;
use serde::Deserialize;
use serde_json::Value;

/// A single notice from a watch stream, one JSON document per line on the
/// wire: `{"type": "ADDED"|"MODIFIED"|"DELETED"|"ERROR", "object": ...}`.
///
/// Types the server may grow that this client does not understand are kept
/// as `Unknown` so callers can log them without aborting the stream.
#[derive(Debug, Clone, PartialEq)]
pub enum WatchEvent {
    Added(Value),
    Modified(Value),
    Deleted(Value),
    /// Server-side error notice; the optional status object carries details
    Error(Option<Value>),
    Unknown { kind: String, object: Option<Value> },
}

#[derive(Deserialize)]
struct RawNotice {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    object: Option<Value>,
}

impl WatchEvent {
    /// Parses one line of a watch stream.
    ///
    /// # Errors
    ///
    /// Returns `Error::Json` if the line is not a valid notice document.
    pub fn parse(line: &str) -> Result<Self> {
        let raw: RawNotice = serde_json::from_str(line)?;
        let object = raw.object;
        Ok(match raw.kind.as_str() {
            "ADDED" => Self::Added(object.unwrap_or(Value::Null)),
            "MODIFIED" => Self::Modified(object.unwrap_or(Value::Null)),
            "DELETED" => Self::Deleted(object.unwrap_or(Value::Null)),
            "ERROR" => Self::Error(object),
            _ => Self::Unknown { kind: raw.kind, object },
        })
    }

    /// Wire name of the event type, for logging.
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Self::Added(_) => "ADDED",
            Self::Modified(_) => "MODIFIED",
            Self::Deleted(_) => "DELETED",
            Self::Error(_) => "ERROR",
            Self::Unknown { kind, .. } => kind,
        }
    }

    /// The affected object document, when the notice carries one.
    #[must_use]
    pub const fn object(&self) -> Option<&Value> {
        match self {
            Self::Added(object) | Self::Modified(object) | Self::Deleted(object) => Some(object),
            Self::Error(object) | Self::Unknown { object, .. } => object.as_ref(),
        }
    }
}
