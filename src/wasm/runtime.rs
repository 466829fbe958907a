//! WASM runtime — engine construction and artifact compilation.
//!
//! One Engine for the process lifetime. Loading compiles the staged
//! component once; instantiation happens per invocation in `component.rs`.

use std::path::Path;

use wasmtime::component::Component;
use wasmtime::{Config, Engine};

use super::component::ComponentModule;
use crate::module::{ActionModule, LoadError, ModuleLoader};

/// The WASM engine wrapper; the production [`ModuleLoader`].
pub struct WasmRuntime {
    engine: Engine,
}

impl WasmRuntime {
    /// Create a new runtime with the component model enabled.
    pub fn new() -> Result<Self, LoadError> {
        let mut config = Config::new();
        config.wasm_component_model(true);
        let engine =
            Engine::new(&config).map_err(|e| LoadError(format!("engine creation failed: {e}")))?;
        Ok(Self { engine })
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }
}

impl ModuleLoader for WasmRuntime {
    fn load(&self, artifact: &Path) -> Result<Box<dyn ActionModule>, LoadError> {
        let component = Component::from_file(&self.engine, artifact).map_err(|e| {
            LoadError(format!(
                "component compilation failed for {}: {e}",
                artifact.display()
            ))
        })?;
        Ok(Box::new(ComponentModule::new(self.engine.clone(), component)))
    }
}
