//! Component-backed module: entry-point resolution and invocation.
//!
//! Containers map onto the component's exports: an exported instance is a
//! named container, and the component's top level is the synthetic default
//! container. Resolution walks the declared exports and keeps the first
//! function whose name starts with the requested method — the lookup itself
//! happens against the compiled type information, so no instantiation is
//! needed until the first run.
//!
//! Every invocation instantiates against a fresh Store whose WASI context
//! carries exactly that call's environment patch. A guest `exit` traps the
//! Store, not the host.

use std::sync::Arc;

use serde_json::{Map, Value};
use wasmtime::component::types::{ComponentFunc, ComponentItem, Type};
use wasmtime::component::{Component, Func, Linker, ResourceTable, Val};
use wasmtime::{Engine, Store};
use wasmtime_wasi::{WasiCtx, WasiCtxBuilder, WasiCtxView, WasiView};

use super::convert::{json_to_val, val_to_json};
use crate::context::InvocationContext;
use crate::entry::EntryPoint;
use crate::module::{ActionCallable, ActionModule, CallError, InputKind, ResolveError};

/// A compiled action component exposing entry-point lookup.
pub struct ComponentModule {
    engine: Engine,
    component: Component,
}

impl ComponentModule {
    pub fn new(engine: Engine, component: Component) -> Self {
        Self { engine, component }
    }

    /// Declared functions of the requested container, in declaration order,
    /// together with the export name of the backing instance (None for the
    /// synthetic top-level container).
    fn container_functions(
        &self,
        entry: &EntryPoint,
    ) -> Result<(Option<String>, Vec<(String, ComponentFunc)>), ResolveError> {
        let root = self.component.component_type();

        let mut funcs = Vec::new();
        if entry.is_default_container() {
            for (name, item) in root.exports(&self.engine) {
                if let ComponentItem::ComponentFunc(f) = item {
                    funcs.push((name.to_string(), f));
                }
            }
            return Ok((None, funcs));
        }

        let (export_name, instance) = root
            .exports(&self.engine)
            .find_map(|(name, item)| match item {
                ComponentItem::ComponentInstance(ci) if matches_container(name, &entry.type_name) => {
                    Some((name.to_string(), ci))
                }
                _ => None,
            })
            .ok_or_else(|| ResolveError::TypeNotFound(entry.type_name.clone()))?;
        for (name, item) in instance.exports(&self.engine) {
            if let ComponentItem::ComponentFunc(f) = item {
                funcs.push((name.to_string(), f));
            }
        }
        Ok((Some(export_name), funcs))
    }
}

/// Whether an exported instance backs a container name. Export names are
/// kebab-case while container names carry the compiled `...Kt` form, so the
/// comparison drops separators and case, and a suffixless export also
/// counts: `foo-kt` and a bare `foo` both back `FooKt`.
fn matches_container(export: &str, type_name: &str) -> bool {
    fn canon(s: &str) -> String {
        s.chars()
            .filter(char::is_ascii_alphanumeric)
            .map(|c| c.to_ascii_lowercase())
            .collect()
    }
    let export = canon(export);
    let container = canon(type_name);
    export == container || container.strip_suffix("kt").is_some_and(|bare| bare == export)
}

impl ActionModule for ComponentModule {
    fn resolve(&self, entry: &EntryPoint) -> Result<Arc<dyn ActionCallable>, ResolveError> {
        let (instance_name, funcs) = self.container_functions(entry)?;

        // First declared function matching the method name as a prefix.
        let (func_name, func) = funcs
            .into_iter()
            .find(|(name, _)| name.starts_with(&entry.method))
            .ok_or_else(|| ResolveError::MethodNotFound {
                method: entry.method.clone(),
                type_name: entry.type_name.clone(),
            })?;

        let param_ty = func.params().next().map(|(_, ty)| ty);
        let result_arity = func.results().len();
        let input = match (func.params().len(), &param_ty) {
            (1, Some(Type::String)) => InputKind::Document,
            _ => InputKind::Typed,
        };

        Ok(Arc::new(ComponentCallable {
            engine: self.engine.clone(),
            component: self.component.clone(),
            instance_name,
            func_name,
            input,
            param_ty,
            result_arity,
        }))
    }
}

/// Store data for an invocation.
struct ActionState {
    ctx: WasiCtx,
    table: ResourceTable,
}

impl WasiView for ActionState {
    fn ctx(&mut self) -> WasiCtxView<'_> {
        WasiCtxView {
            ctx: &mut self.ctx,
            table: &mut self.table,
        }
    }
}

/// The resolved entry point, bound to its component and engine.
pub struct ComponentCallable {
    engine: Engine,
    component: Component,
    instance_name: Option<String>,
    func_name: String,
    input: InputKind,
    param_ty: Option<Type>,
    result_arity: usize,
}

impl ComponentCallable {
    /// Fresh Store + instance for one call. The WASI context gets the
    /// invocation's environment patch and inherited stdio for action logs.
    fn instantiate(&self, ctx: &InvocationContext) -> Result<(Store<ActionState>, Func), CallError> {
        let mut builder = WasiCtxBuilder::new();
        builder.inherit_stdout();
        builder.inherit_stderr();
        for (key, value) in ctx.env() {
            builder.env(key, value);
        }
        let state = ActionState {
            ctx: builder.build(),
            table: ResourceTable::new(),
        };
        let mut store = Store::new(&self.engine, state);

        let mut linker = Linker::new(&self.engine);
        wasmtime_wasi::p2::add_to_linker_sync(&mut linker)
            .map_err(|e| CallError::Fault(format!("WASI link failed: {e}")))?;

        let instance = linker
            .instantiate(&mut store, &self.component)
            .map_err(|e| CallError::Fault(format!("instantiation failed: {e}")))?;

        let func = match &self.instance_name {
            None => instance.get_func(&mut store, self.func_name.as_str()),
            Some(container) => self
                .component
                .get_export_index(None, container)
                .and_then(|idx| self.component.get_export_index(Some(&idx), &self.func_name))
                .and_then(|idx| instance.get_func(&mut store, idx)),
        }
        .ok_or_else(|| {
            CallError::Fault(format!(
                "resolved export {} not present at instantiation",
                self.func_name
            ))
        })?;

        Ok((store, func))
    }

    fn call(
        &self,
        store: &mut Store<ActionState>,
        func: Func,
        args: &[Val],
    ) -> Result<Vec<Val>, CallError> {
        let mut results = vec![Val::Bool(false); self.result_arity];
        func.call(&mut *store, args, &mut results).map_err(trap_to_fault)?;
        Ok(results)
    }
}

impl ActionCallable for ComponentCallable {
    fn input_kind(&self) -> InputKind {
        self.input
    }

    fn invoke_document(
        &self,
        ctx: &InvocationContext,
        value: &Map<String, Value>,
    ) -> Result<Value, CallError> {
        let text = serde_json::to_string(&Value::Object(value.clone()))
            .map_err(|e| CallError::Serialization(e.to_string()))?;

        let (mut store, func) = self.instantiate(ctx)?;
        let results = self.call(&mut store, func, &[Val::String(text)])?;

        match results.first() {
            Some(Val::String(s)) => serde_json::from_str(s).map_err(|e| {
                CallError::InvalidReturn(format!("the returned document is not valid JSON: {e}"))
            }),
            Some(other) => Err(CallError::InvalidReturn(format!(
                "expected a document, the action returned {other:?}"
            ))),
            None => Err(CallError::InvalidReturn("the action returned nothing".into())),
        }
    }

    fn invoke_typed(&self, ctx: &InvocationContext, value_text: &str) -> Result<String, CallError> {
        let value: Value = serde_json::from_str(value_text)
            .map_err(|e| CallError::ArgumentMismatch(e.to_string()))?;

        let args = match &self.param_ty {
            Some(ty) => vec![json_to_val(ty, &value).map_err(CallError::ArgumentMismatch)?],
            None => Vec::new(),
        };

        let (mut store, func) = self.instantiate(ctx)?;
        let results = self.call(&mut store, func, &args)?;

        match results.first() {
            Some(val) => {
                let rendered = val_to_json(val).map_err(CallError::Serialization)?;
                serde_json::to_string(&rendered).map_err(|e| CallError::Serialization(e.to_string()))
            }
            None => Err(CallError::InvalidReturn("the action returned nothing".into())),
        }
    }
}

/// Convert a wasmtime call error into an action fault. An intercepted exit
/// gets its own message so the caller can tell the action tried to bring
/// the host down.
fn trap_to_fault(err: anyhow::Error) -> CallError {
    if let Some(exit) = err.downcast_ref::<wasmtime_wasi::I32Exit>() {
        return CallError::Fault(format!("exit({}) called from within an action", exit.0));
    }
    CallError::Fault(format!("the action raised a fault: {err:#}"))
}
