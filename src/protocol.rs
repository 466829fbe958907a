//! Wire protocol — the JSON shapes accepted by `/init` and `/run`.
//!
//! Init bodies are a fixed envelope and parse with serde. Run bodies are
//! parsed by hand: the `value` payload must survive as a generic document,
//! and the flat metadata fields next to it are tolerant of non-string
//! primitives (a numeric deadline is stringified, not rejected).

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::RunError;

/// `POST /init` envelope: `{"value": {...}}`.
#[derive(Debug, Deserialize)]
pub struct InitRequest {
    pub value: InitValue,
}

/// The packaged action submitted at init.
#[derive(Debug, Deserialize)]
pub struct InitValue {
    #[serde(default)]
    pub name: String,
    /// Accepted for wire compatibility; the artifact is always binary here.
    #[serde(default)]
    pub binary: bool,
    /// `"Container#method"` specifier; either side may be empty.
    #[serde(default)]
    pub main: String,
    /// Base64-encoded artifact.
    pub code: String,
}

/// Activation metadata carried flat next to `value` in a run body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunMetadata {
    pub api_key: Option<String>,
    pub namespace: Option<String>,
    pub action_name: Option<String>,
    pub activation_id: Option<String>,
    pub deadline: Option<String>,
}

/// A parsed `POST /run` body.
#[derive(Debug)]
pub struct RunRequest {
    /// The payload handed to the action.
    pub value: Map<String, Value>,
    pub metadata: RunMetadata,
}

impl RunRequest {
    /// Parse a raw run body. The body must be a JSON object with an object
    /// under `value`; metadata fields are optional.
    pub fn from_body(body: &str) -> Result<Self, RunError> {
        let doc: Value = serde_json::from_str(body).map_err(|_| RunError::BodyParse)?;
        let obj = doc.as_object().ok_or(RunError::BodyParse)?;

        let value = obj
            .get("value")
            .and_then(Value::as_object)
            .cloned()
            .ok_or(RunError::MissingValue)?;

        let metadata = RunMetadata {
            api_key: metadata_field(obj, "api_key"),
            namespace: metadata_field(obj, "namespace"),
            action_name: metadata_field(obj, "action_name"),
            activation_id: metadata_field(obj, "activation_id"),
            deadline: metadata_field(obj, "deadline"),
        };

        Ok(Self { value, metadata })
    }
}

/// Read a metadata field as a string. Primitives other than strings are
/// stringified; objects, arrays, and null are treated as absent.
fn metadata_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
