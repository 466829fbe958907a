//! WASM action backend — the concrete module loader behind the trait seam.
//!
//! Actions are WebAssembly components. The artifact staged at init is
//! compiled once (expensive); every invocation gets a fresh Store and WASI
//! context (cheap), which is what makes the sandbox and environment patch
//! invocation-scoped: nothing process-wide changes, and a guest attempt to
//! exit surfaces as a trap on its own Store, never as host termination.
//!
//! - `runtime.rs` — engine construction, artifact compilation
//! - `component.rs` — export enumeration, entry-point resolution, invocation
//! - `convert.rs` — JSON ↔ component-value conversion for typed mode

pub mod component;
pub mod convert;
pub mod runtime;

pub use runtime::WasmRuntime;
