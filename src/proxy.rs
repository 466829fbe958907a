//! Lifecycle state machine — initialize once, invoke many.
//!
//! The proxy owns the single slot that every request consults: empty until
//! the first well-formed init, then holding the resolved callable for the
//! rest of the process lifetime. Check-then-set happens under one mutex, so
//! two racing inits cannot both load; runs clone the Arc out and invoke
//! outside the lock, so they proceed concurrently.

use std::io::Write;
use std::sync::{Arc, Mutex};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use tracing::{info, warn};

use crate::context::InvocationContext;
use crate::dispatch::dispatch;
use crate::entry::EntryPoint;
use crate::error::{InitError, RunError};
use crate::module::{ActionCallable, ModuleLoader, ResolveError};
use crate::protocol::{InitValue, RunRequest};

/// The single-action execution host.
pub struct ActionProxy {
    loader: Box<dyn ModuleLoader>,
    slot: Mutex<Option<Arc<dyn ActionCallable>>>,
}

impl ActionProxy {
    pub fn new(loader: Box<dyn ModuleLoader>) -> Self {
        Self {
            loader,
            slot: Mutex::new(None),
        }
    }

    /// Stage and load the packaged action, then resolve its entry point.
    /// Fails without touching the slot on any error, so a corrected init
    /// can be retried.
    ///
    /// The lifecycle lock is held across staging and compilation, so
    /// concurrent requests briefly block on their eligibility check while
    /// an init is in flight — during that window every run would be
    /// rejected as uninitialized anyway.
    pub fn init(&self, value: &InitValue) -> Result<(), InitError> {
        let mut slot = self.slot.lock().expect("lifecycle lock poisoned");
        if slot.is_some() {
            return Err(InitError::AlreadyInitialized);
        }

        let artifact = stage_artifact(&value.code)?;
        let module = self
            .loader
            .load(&artifact)
            .map_err(|e| InitError::Load(e.to_string()))?;

        let entry = EntryPoint::parse(&value.main);
        let callable = module.resolve(&entry).map_err(|e| match e {
            ResolveError::TypeNotFound(t) => InitError::TypeNotFound(t),
            ResolveError::MethodNotFound { method, type_name } => {
                InitError::MethodNotFound { method, type_name }
            }
        })?;

        info!(
            action = %value.name,
            container = %entry.type_name,
            method = %entry.method,
            "action initialized"
        );
        *slot = Some(callable);
        Ok(())
    }

    /// Invoke the resolved callable with a run request's payload.
    pub fn run(&self, request: &RunRequest) -> Result<String, RunError> {
        let callable = {
            let slot = self.slot.lock().expect("lifecycle lock poisoned");
            slot.as_ref().cloned().ok_or(RunError::Uninitialized)?
        };

        let ctx = InvocationContext::from_metadata(&request.metadata);
        dispatch(callable.as_ref(), &ctx, &request.value).inspect_err(|e| {
            warn!(error = %e, "invocation failed");
        })
    }

    /// Whether the action has been initialized.
    pub fn is_initialized(&self) -> bool {
        self.slot.lock().expect("lifecycle lock poisoned").is_some()
    }
}

/// Decode the base64 artifact and persist it to a uniquely named temp file.
/// The file is deliberately kept for the process lifetime and never cleaned
/// up; the module loader may map it lazily.
fn stage_artifact(code: &str) -> Result<std::path::PathBuf, InitError> {
    let bytes = BASE64
        .decode(code.trim())
        .map_err(|e| InitError::Decode(e.to_string()))?;

    let mut file = tempfile::Builder::new()
        .prefix("useraction")
        .suffix(".wasm")
        .tempfile()
        .map_err(|e| InitError::Load(e.to_string()))?;
    file.write_all(&bytes)
        .map_err(|e| InitError::Load(e.to_string()))?;

    let (_, path) = file.keep().map_err(|e| InitError::Load(e.to_string()))?;
    Ok(path)
}
