//! Invocation dispatcher — picks the calling convention and shapes the
//! response body.
//!
//! Classic mode (document in, document out) passes the payload through
//! unconverted and requires a JSON object back. Typed mode re-serializes
//! the payload to canonical text first — the document representation and
//! the typed deserializer are not interchangeable — and lets the backend
//! convert in both directions. Faults from the action never escape as
//! anything but a [`RunError`].

use serde_json::{Map, Value};

use crate::context::InvocationContext;
use crate::error::RunError;
use crate::module::{ActionCallable, CallError, InputKind};

/// Invoke the resolved callable with a payload and produce the response
/// body text.
pub fn dispatch(
    callable: &dyn ActionCallable,
    ctx: &InvocationContext,
    value: &Map<String, Value>,
) -> Result<String, RunError> {
    match callable.input_kind() {
        InputKind::Document => {
            let returned = callable
                .invoke_document(ctx, value)
                .map_err(call_error_to_run_error)?;
            match returned {
                Value::Object(obj) => serde_json::to_string(&Value::Object(obj))
                    .map_err(|e| RunError::Serialization(e.to_string())),
                other => Err(RunError::InvalidReturn(format!(
                    "the action did not return a JSON object (got {})",
                    json_kind(&other)
                ))),
            }
        }
        InputKind::Typed => {
            let value_text = serde_json::to_string(&Value::Object(value.clone()))
                .map_err(|e| RunError::Serialization(e.to_string()))?;
            callable
                .invoke_typed(ctx, &value_text)
                .map_err(call_error_to_run_error)
        }
    }
}

fn call_error_to_run_error(err: CallError) -> RunError {
    match err {
        CallError::ArgumentMismatch(msg) => RunError::ArgumentMismatch(msg),
        CallError::InvalidReturn(msg) => RunError::InvalidReturn(msg),
        CallError::Serialization(msg) => RunError::Serialization(msg),
        CallError::Fault(msg) => RunError::Fault(msg),
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
