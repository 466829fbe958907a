//! HTTP transport — the `/init` and `/run` endpoints.
//!
//! Bodies are read raw and parsed here so that malformed input maps onto
//! the proxy's error taxonomy instead of a framework rejection. Every
//! failure answers 502 with an `{"error": "..."}` body; the status split is
//! all a caller gets, there is no other signaling. Invocations run under
//! `spawn_blocking`: the action is synchronous code and must not stall the
//! accept loop.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use serde_json::json;
use tracing::warn;

use crate::error::{InitError, RunError};
use crate::protocol::{InitRequest, RunRequest};
use crate::proxy::ActionProxy;

/// Build the two-endpoint router over a shared proxy.
pub fn router(proxy: Arc<ActionProxy>) -> Router {
    Router::new()
        .route("/init", post(init_handler))
        .route("/run", post(run_handler))
        .with_state(proxy)
}

async fn init_handler(State(proxy): State<Arc<ActionProxy>>, body: String) -> Response {
    // Checked before parsing: a second init is rejected no matter how
    // malformed its body is.
    if proxy.is_initialized() {
        return error_response(InitError::AlreadyInitialized.to_string());
    }

    let request: InitRequest = match serde_json::from_str(&body) {
        Ok(request) => request,
        Err(_) => return error_response(InitError::BodyParse(body).to_string()),
    };

    let outcome = tokio::task::spawn_blocking(move || proxy.init(&request.value)).await;
    match outcome {
        Ok(Ok(())) => (StatusCode::OK, "OK").into_response(),
        Ok(Err(e)) => error_response(e.to_string()),
        Err(e) => {
            warn!(error = %e, "init task panicked");
            error_response(InitError::Load("initialization did not complete".into()).to_string())
        }
    }
}

async fn run_handler(State(proxy): State<Arc<ActionProxy>>, body: String) -> Response {
    // Same ordering as init: eligibility first, body second.
    if !proxy.is_initialized() {
        return error_response(RunError::Uninitialized.to_string());
    }

    let request = match RunRequest::from_body(&body) {
        Ok(request) => request,
        Err(e) => return error_response(e.to_string()),
    };

    let outcome = tokio::task::spawn_blocking(move || proxy.run(&request)).await;
    match outcome {
        Ok(Ok(result)) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            result,
        )
            .into_response(),
        Ok(Err(e)) => error_response(e.to_string()),
        Err(e) => {
            warn!(error = %e, "run task panicked");
            error_response(RunError::Fault("the invocation did not complete".into()).to_string())
        }
    }
}

/// 502 with the wire error shape. Bad Gateway is deliberate: the proxy is
/// fine, the thing behind it failed.
fn error_response(message: String) -> Response {
    (
        StatusCode::BAD_GATEWAY,
        [(header::CONTENT_TYPE, "application/json")],
        json!({ "error": message }).to_string(),
    )
        .into_response()
}
