//! Wire-level error taxonomy for the two proxy operations.
//!
//! Every variant maps to a 502 response with an `{"error": "..."}` body;
//! none of them is fatal to the host process. A failed init leaves the
//! proxy uninitialized and retryable.

use thiserror::Error;

/// Errors surfaced by `POST /init`.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("Cannot initialize the action more than once")]
    AlreadyInitialized,

    #[error("Initialization failed, unable to parse input: {0}")]
    BodyParse(String),

    #[error("Unable to decode the provided action artifact: {0}")]
    Decode(String),

    #[error("Unable to load the provided action artifact: {0}")]
    Load(String),

    #[error("Failed to find specified container: {0} in the provided artifact")]
    TypeNotFound(String),

    #[error("Failed to find specified method: {method} in {type_name}")]
    MethodNotFound { method: String, type_name: String },
}

/// Errors surfaced by `POST /run`.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Cannot invoke an uninitialized action")]
    Uninitialized,

    #[error("Run failed, unable to parse input")]
    BodyParse,

    #[error("Run failed, unable to find value entry in input")]
    MissingValue,

    #[error("Provided arguments do not match the action's parameter: {0}")]
    ArgumentMismatch(String),

    #[error("The action failed to return a valid result: {0}")]
    InvalidReturn(String),

    #[error("The action's response could not be converted to JSON: {0}")]
    Serialization(String),

    #[error("{0}")]
    Fault(String),
}
