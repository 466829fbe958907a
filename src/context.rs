//! Invocation context — the per-request environment patch.
//!
//! The run protocol carries optional activation metadata next to the
//! payload. Each present field becomes an `__OW_<FIELD>` environment
//! variable visible to the action. The patch is invocation-scoped: it is
//! built per request and handed to the backend, which injects it into that
//! call's isolated environment. Nothing process-wide is ever mutated, so
//! concurrent runs cannot observe each other's metadata.

use crate::protocol::RunMetadata;

/// Context threaded through a single invocation.
#[derive(Debug, Clone, Default)]
pub struct InvocationContext {
    env: Vec<(String, String)>,
}

impl InvocationContext {
    /// Build the context from whichever metadata fields the request carried.
    pub fn from_metadata(meta: &RunMetadata) -> Self {
        let mut env = Vec::new();
        for (field, value) in [
            ("api_key", &meta.api_key),
            ("namespace", &meta.namespace),
            ("action_name", &meta.action_name),
            ("activation_id", &meta.activation_id),
            ("deadline", &meta.deadline),
        ] {
            if let Some(value) = value {
                env.push((format!("__OW_{}", field.to_uppercase()), value.clone()));
            }
        }
        Self { env }
    }

    /// Environment variables to expose to the action for this call.
    pub fn env(&self) -> &[(String, String)] {
        &self.env
    }
}
