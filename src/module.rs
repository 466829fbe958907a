//! The loaded-module seam — traits the lifecycle and dispatcher talk to.
//!
//! The concrete loading mechanism (wasmtime, see `crate::wasm`) stays behind
//! these traits so the resolution and dispatch logic is independent of any
//! particular artifact format. A module exposes `resolve`; a resolved
//! callable exposes its declared input kind plus one invoke method per
//! calling convention.

use std::path::Path;
use std::sync::Arc;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::context::InvocationContext;
use crate::entry::EntryPoint;

/// Loads an executable module from a staged artifact file.
pub trait ModuleLoader: Send + Sync {
    fn load(&self, artifact: &Path) -> Result<Box<dyn ActionModule>, LoadError>;
}

/// A loaded module: a lookup capability from entry-point specifier to
/// callable. Created once per process, at init.
pub trait ActionModule: Send + Sync {
    fn resolve(&self, entry: &EntryPoint) -> Result<Arc<dyn ActionCallable>, ResolveError>;
}

/// The resolved entry point. Immutable once created; shared by every run.
pub trait ActionCallable: Send + Sync {
    /// Declared kind of the callable's single input parameter. Decides the
    /// calling convention: [`InputKind::Document`] is JSON-in/JSON-out.
    fn input_kind(&self) -> InputKind;

    /// Classic mode: pass the payload object through unconverted and return
    /// whatever the action produced, parsed back into a document.
    fn invoke_document(
        &self,
        ctx: &InvocationContext,
        value: &Map<String, Value>,
    ) -> Result<Value, CallError>;

    /// Typed mode: deserialize canonical JSON text into the declared input
    /// type, invoke, and render the declared result type back to canonical
    /// JSON text.
    fn invoke_typed(&self, ctx: &InvocationContext, value_text: &str) -> Result<String, CallError>;
}

/// What the callable declares as its single input parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// The generic structured-document type; wire JSON passes through as-is.
    Document,
    /// A concrete user-defined type; the payload is converted on the way in
    /// and the result on the way out.
    Typed,
}

/// Artifact could not be turned into a module.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct LoadError(pub String);

/// Entry-point lookup failed inside a loaded module.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("container not found: {0}")]
    TypeNotFound(String),

    #[error("method {method} not found in {type_name}")]
    MethodNotFound { method: String, type_name: String },
}

/// Invocation-time failures reported by a callable.
#[derive(Debug, Error)]
pub enum CallError {
    #[error("argument mismatch: {0}")]
    ArgumentMismatch(String),

    #[error("invalid return: {0}")]
    InvalidReturn(String),

    #[error("serialization failed: {0}")]
    Serialization(String),

    /// A fault raised by the action itself, including intercepted attempts
    /// to terminate the host.
    #[error("{0}")]
    Fault(String),
}
