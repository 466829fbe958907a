//! End-to-end protocol tests over the HTTP transport.
//!
//! The module loader is an in-memory fake implementing the same trait seam
//! as the wasm backend, so every lifecycle, resolution, dispatch, and
//! sandboxing behavior is exercised through real request/response cycles
//! without compiled fixtures. The fake hosts two containers:
//!
//! - `MainKt`, function `main`: document convention, doubles `n`; a `die`
//!   field makes it fault like an intercepted exit.
//! - `FooKt`, functions `barbell` then `barbaz` in declaration order:
//!   typed convention over a record with an integer `n`, increments it.

use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde_json::{json, Map, Value};
use tower::util::ServiceExt;

use actionhost::context::InvocationContext;
use actionhost::entry::EntryPoint;
use actionhost::module::{
    ActionCallable, ActionModule, CallError, InputKind, LoadError, ModuleLoader, ResolveError,
};
use actionhost::proxy::ActionProxy;
use actionhost::server::router;

/// Document-convention function: `{"n": x}` → `{"n": 2x}`, faulting on a
/// `die` field the way an intercepted exit does.
struct Doubler;

impl ActionCallable for Doubler {
    fn input_kind(&self) -> InputKind {
        InputKind::Document
    }

    fn invoke_document(
        &self,
        _ctx: &InvocationContext,
        value: &Map<String, Value>,
    ) -> Result<Value, CallError> {
        if value.contains_key("die") {
            return Err(CallError::Fault("exit(1) called from within an action".into()));
        }
        let n = value
            .get("n")
            .and_then(Value::as_i64)
            .ok_or_else(|| CallError::Fault("missing n".into()))?;
        Ok(json!({ "n": n * 2 }))
    }

    fn invoke_typed(&self, _: &InvocationContext, _: &str) -> Result<String, CallError> {
        unreachable!("document callable")
    }
}

/// Typed-convention function over a record with an integer `n`.
struct Incrementer {
    selected: &'static str,
}

impl ActionCallable for Incrementer {
    fn input_kind(&self) -> InputKind {
        InputKind::Typed
    }

    fn invoke_document(
        &self,
        _: &InvocationContext,
        _: &Map<String, Value>,
    ) -> Result<Value, CallError> {
        unreachable!("typed callable")
    }

    fn invoke_typed(&self, _ctx: &InvocationContext, value_text: &str) -> Result<String, CallError> {
        let value: Value = serde_json::from_str(value_text)
            .map_err(|e| CallError::ArgumentMismatch(e.to_string()))?;
        let n = value
            .get("n")
            .and_then(Value::as_i64)
            .ok_or_else(|| CallError::ArgumentMismatch("n must be an integer".into()))?;
        Ok(json!({ "n": n + 1, "by": self.selected }).to_string())
    }
}

struct FakeModule;

impl ActionModule for FakeModule {
    fn resolve(&self, entry: &EntryPoint) -> Result<Arc<dyn ActionCallable>, ResolveError> {
        let methods: &[&'static str] = match entry.type_name.as_str() {
            "MainKt" => &["main"],
            "FooKt" => &["barbell", "barbaz"],
            _ => return Err(ResolveError::TypeNotFound(entry.type_name.clone())),
        };

        let selected = methods
            .iter()
            .find(|name| name.starts_with(entry.method.as_str()))
            .copied()
            .ok_or_else(|| ResolveError::MethodNotFound {
                method: entry.method.clone(),
                type_name: entry.type_name.clone(),
            })?;

        Ok(match entry.type_name.as_str() {
            "MainKt" => Arc::new(Doubler),
            _ => Arc::new(Incrementer { selected }),
        })
    }
}

struct FakeLoader;

impl ModuleLoader for FakeLoader {
    fn load(&self, artifact: &Path) -> Result<Box<dyn ActionModule>, LoadError> {
        let bytes = std::fs::read(artifact).map_err(|e| LoadError(e.to_string()))?;
        if bytes != b"fake action artifact" {
            return Err(LoadError("unrecognized artifact".into()));
        }
        Ok(Box::new(FakeModule))
    }
}

fn app() -> Router {
    router(Arc::new(ActionProxy::new(Box::new(FakeLoader))))
}

fn init_body(main: &str) -> String {
    json!({
        "value": {
            "name": "test-action",
            "binary": true,
            "main": main,
            "code": BASE64.encode(b"fake action artifact"),
        }
    })
    .to_string()
}

async fn post(app: &Router, path: &str, body: String) -> (StatusCode, String) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(path)
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

fn error_message(body: &str) -> String {
    let doc: Value = serde_json::from_str(body).expect("error body must be JSON");
    doc.get("error")
        .and_then(Value::as_str)
        .expect("error body must carry an error string")
        .to_string()
}

#[tokio::test]
async fn init_succeeds_with_ok_body() {
    let app = app();
    let (status, body) = post(&app, "/init", init_body("")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "OK");
}

#[tokio::test]
async fn run_before_init_returns_502() {
    let app = app();
    let (status, body) = post(&app, "/run", json!({"value": {"n": 2}}).to_string()).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(error_message(&body).contains("uninitialized action"));
}

#[tokio::test]
async fn second_init_returns_already_initialized() {
    let app = app();
    let (status, _) = post(&app, "/init", init_body("")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = post(&app, "/init", init_body("")).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(error_message(&body).contains("more than once"));
}

#[tokio::test]
async fn second_init_rejected_even_when_malformed() {
    let app = app();
    post(&app, "/init", init_body("")).await;

    let (status, body) = post(&app, "/init", "this is not json".to_string()).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(error_message(&body).contains("more than once"));
}

#[tokio::test]
async fn malformed_init_leaves_proxy_retryable() {
    let app = app();
    let (status, _) = post(&app, "/init", "this is not json".to_string()).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);

    let (status, body) = post(&app, "/init", init_body("")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "OK");
}

#[tokio::test]
async fn bad_base64_reports_decode_failure() {
    let app = app();
    let body = json!({
        "value": {"name": "x", "binary": true, "main": "", "code": "%%% not base64 %%%"}
    })
    .to_string();
    let (status, body) = post(&app, "/init", body).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(error_message(&body).contains("decode"));
}

#[tokio::test]
async fn unknown_container_reports_type_not_found() {
    let app = app();
    let (status, body) = post(&app, "/init", init_body("Nope#main")).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(error_message(&body).contains("NopeKt"));
}

#[tokio::test]
async fn unknown_method_reports_method_not_found() {
    let app = app();
    let (status, body) = post(&app, "/init", init_body("Foo#zzz")).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    let msg = error_message(&body);
    assert!(msg.contains("zzz"));
    assert!(msg.contains("FooKt"));
}

#[tokio::test]
async fn classic_round_trip() {
    let app = app();
    post(&app, "/init", init_body("")).await;

    let (status, body) = post(&app, "/run", json!({"value": {"n": 2}}).to_string()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"n":4}"#);
}

#[tokio::test]
async fn typed_round_trip_selects_first_prefix_match() {
    let app = app();
    // "Foo#bar" normalizes to FooKt and must pick barbell, the first
    // declared function starting with "bar".
    post(&app, "/init", init_body("Foo#bar")).await;

    let (status, body) = post(&app, "/run", json!({"value": {"n": 2}}).to_string()).await;
    assert_eq!(status, StatusCode::OK);
    let doc: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(doc["n"], 3);
    assert_eq!(doc["by"], "barbell");
}

#[tokio::test]
async fn typed_mismatch_returns_502() {
    let app = app();
    post(&app, "/init", init_body("Foo#bar")).await;

    let (status, body) = post(&app, "/run", json!({"value": {"n": "x"}}).to_string()).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(error_message(&body).contains("n must be an integer"));
}

#[tokio::test]
async fn lowercase_specifier_resolves_via_normalization() {
    let app = app();
    let (status, _) = post(&app, "/init", init_body("foo#barbell")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn run_body_without_value_returns_502() {
    let app = app();
    post(&app, "/init", init_body("")).await;

    let (status, body) = post(&app, "/run", json!({"namespace": "guest"}).to_string()).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(error_message(&body).contains("value"));
}

#[tokio::test]
async fn run_body_unparsable_returns_502() {
    let app = app();
    post(&app, "/init", init_body("")).await;

    let (status, body) = post(&app, "/run", "garbage".to_string()).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(error_message(&body).contains("parse"));
}

#[tokio::test]
async fn fault_returns_502_and_host_stays_servable() {
    let app = app();
    post(&app, "/init", init_body("")).await;

    let (status, body) = post(&app, "/run", json!({"value": {"die": true}}).to_string()).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(error_message(&body).contains("exit(1)"));

    // The host survived the fault and keeps serving.
    let (status, body) = post(&app, "/run", json!({"value": {"n": 5}}).to_string()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"n":10}"#);
}

#[tokio::test]
async fn concurrent_runs_succeed_independently() {
    let app = app();
    post(&app, "/init", init_body("")).await;

    let mut handles = Vec::new();
    for n in 1..=8i64 {
        let app = app.clone();
        handles.push(tokio::spawn(async move {
            post(&app, "/run", json!({"value": {"n": n}}).to_string()).await
        }));
    }
    for (i, handle) in handles.into_iter().enumerate() {
        let (status, body) = handle.await.unwrap();
        assert_eq!(status, StatusCode::OK);
        let doc: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(doc["n"], (i as i64 + 1) * 2);
    }
}
