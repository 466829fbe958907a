//! actionhost — single-action execution host.
//!
//! One process, one packaged action: `/init` stages, loads, and resolves it
//! exactly once; `/run` invokes it once per request, translating between
//! the JSON wire protocol and the action's native calling convention.

pub mod context;
pub mod dispatch;
pub mod entry;
pub mod error;
pub mod module;
pub mod protocol;
pub mod proxy;
pub mod server;
pub mod wasm;
