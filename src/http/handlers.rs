//! Demonstration endpoints.
//!
//! Routes without a wrapper run under the global policy; the others carry their
//! own policy via [`with_timeout`].
//!
//! ```text
//! GET  /                 global
//! GET  /health           global
//! GET  /fast             global, 0.5s of work
//! GET  /slow             global, 2s of work
//! GET  /delay/{seconds}  global, caller-chosen delay
//! GET  /quick            2s policy, 1s of work
//! GET  /medium           5s policy, 3s of work
//! GET  /slow-op          3s policy (503), 6s of work
//! GET  /vip              2s policy with custom responder, 5s of work
//! POST /upload           30s policy, 2s of work
//! ```

use std::net::SocketAddr;
use std::time::Duration;

use axum::extract::{ConnectInfo, Path, Request};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use crate::http::middleware::with_timeout;
use crate::http::request::RequestContext;
use crate::resilience::policy::{PolicyError, TimeoutPolicy};

/// Build the demonstration routes with their handler-level policies.
pub fn demo_routes() -> Result<Router, PolicyError> {
    let quick_policy = TimeoutPolicy::new(Duration::from_secs(2))?;
    let medium_policy = TimeoutPolicy::builder(Duration::from_secs(5))
        .message("Medium operation timed out")
        .build()?;
    let slow_op_policy = TimeoutPolicy::builder(Duration::from_secs(3))
        .status(StatusCode::SERVICE_UNAVAILABLE)
        .message("Slow operation unavailable")
        .build()?;
    let vip_policy = TimeoutPolicy::builder(Duration::from_secs(2))
        .responder(vip_timeout_response)
        .build()?;
    let upload_policy = TimeoutPolicy::builder(Duration::from_secs(30))
        .message("File upload timeout")
        .build()?;

    Ok(Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/fast", get(fast))
        .route("/slow", get(slow))
        .route("/delay/{seconds}", get(delay))
        .route("/quick", get(with_timeout(quick, quick_policy)))
        .route("/medium", get(with_timeout(medium, medium_policy)))
        .route("/slow-op", get(with_timeout(slow_op, slow_op_policy)))
        .route("/vip", get(with_timeout(vip, vip_policy)))
        .route("/upload", post(with_timeout(upload, upload_policy))))
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "Hello World" }))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

async fn fast() -> Json<Value> {
    tokio::time::sleep(Duration::from_millis(500)).await;
    Json(json!({ "message": "This is a fast response" }))
}

async fn slow() -> Json<Value> {
    tokio::time::sleep(Duration::from_secs(2)).await;
    Json(json!({ "message": "This response will timeout" }))
}

async fn delay(Path(seconds): Path<f64>) -> Response {
    let Ok(duration) = Duration::try_from_secs_f64(seconds) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "detail": "delay must be a non-negative number of seconds" })),
        )
            .into_response();
    };
    tokio::time::sleep(duration).await;
    Json(json!({ "message": format!("Completed after {seconds} seconds") })).into_response()
}

async fn quick() -> Json<Value> {
    tokio::time::sleep(Duration::from_secs(1)).await;
    Json(json!({ "message": "Quick response", "timeout": "2 seconds", "delay": 1.0 }))
}

async fn medium() -> Json<Value> {
    tokio::time::sleep(Duration::from_secs(3)).await;
    Json(json!({ "message": "Medium response", "timeout": "5 seconds", "delay": 3.0 }))
}

async fn slow_op() -> Json<Value> {
    tokio::time::sleep(Duration::from_secs(6)).await;
    Json(json!({ "message": "This will never be reached", "timeout": "3 seconds", "delay": 6.0 }))
}

async fn vip() -> Json<Value> {
    tokio::time::sleep(Duration::from_secs(5)).await;
    Json(json!({ "message": "VIP response" }))
}

async fn upload(request: Request) -> Response {
    let client = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let bytes = match axum::body::to_bytes(request.into_body(), 10 * 1024 * 1024).await {
        Ok(bytes) => bytes,
        Err(_) => return (StatusCode::PAYLOAD_TOO_LARGE, "Upload too large").into_response(),
    };

    tokio::time::sleep(Duration::from_secs(2)).await;
    Json(json!({
        "message": "File uploaded successfully",
        "bytes": bytes.len(),
        "client": client,
    }))
    .into_response()
}

/// Timeout response for the VIP endpoint: 503 with retry hints.
fn vip_timeout_response(context: &RequestContext, elapsed: Duration) -> Response {
    let processing_time = (elapsed.as_secs_f64() * 1000.0).round() / 1000.0;
    (
        StatusCode::SERVICE_UNAVAILABLE,
        [(header::RETRY_AFTER, "30"), (header::HeaderName::from_static("x-service"), "VIP")],
        Json(json!({
            "error": "VIP service temporarily unavailable",
            "message": "Please try again in a moment",
            "path": context.path(),
            "processing_time": processing_time,
            "support": "contact@example.com",
        })),
    )
        .into_response()
}
