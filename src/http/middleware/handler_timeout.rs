//! Per-handler timeout wrapper.
//!
//! Wrap a handler at registration time to give it its own deadline:
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use axum::{routing::get, Router};
//! use request_timeout::{with_timeout, TimeoutPolicy};
//!
//! async fn report() -> &'static str {
//!     "done"
//! }
//!
//! # fn build() -> Result<Router, request_timeout::PolicyError> {
//! let policy = TimeoutPolicy::builder(Duration::from_secs(2))
//!     .message("Report generation timed out")
//!     .build()?;
//! let app: Router = Router::new().route("/report", get(with_timeout(report, policy)));
//! # Ok(app)
//! # }
//! ```
//!
//! A wrapped handler replaces any global policy for the requests it serves: it
//! claims the enclosing [`DeadlineScope`](super::timeout::DeadlineScope), so the
//! global timer is never armed for them.

use std::future::Future;
use std::pin::Pin;

use axum::extract::Request;
use axum::handler::Handler;
use axum::response::Response;

use super::timeout::claim_enclosing;
use crate::http::request::RequestContext;
use crate::resilience::policy::TimeoutPolicy;
use crate::resilience::timeouts::{self, Scope};

/// Wrap `handler` so every call is raced against `policy`.
pub fn with_timeout<H>(handler: H, policy: TimeoutPolicy) -> TimedHandler<H> {
    TimedHandler { handler, policy }
}

/// Handler produced by [`with_timeout`].
#[derive(Debug, Clone)]
pub struct TimedHandler<H> {
    handler: H,
    policy: TimeoutPolicy,
}

impl<H> TimedHandler<H> {
    pub fn policy(&self) -> &TimeoutPolicy {
        &self.policy
    }
}

impl<H, T, S> Handler<T, S> for TimedHandler<H>
where
    H: Handler<T, S>,
{
    type Future = Pin<Box<dyn Future<Output = Response> + Send>>;

    fn call(self, req: Request, state: S) -> Self::Future {
        claim_enclosing(&req);

        // The context is taken here because the request moves into the handler,
        // whatever shape of arguments it extracts.
        let context = RequestContext::from_request(&req);
        let policy = self.policy;
        let work = self.handler.call(req, state);

        Box::pin(async move {
            let started = tokio::time::Instant::now();
            let result = timeouts::execute_from(Scope::Handler, &policy, &context, started, async {
                Ok::<_, std::convert::Infallible>(work.await)
            })
            .await;
            match result {
                Ok(response) => response,
                Err(never) => match never {},
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use axum::body::Body;
    use axum::extract::{Path, State};
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use axum::routing::{get, post};
    use axum::Router;
    use tower::ServiceExt;

    use crate::http::middleware::timeout::RequestTimeoutLayer;

    fn policy(seconds: u64, message: &str) -> TimeoutPolicy {
        TimeoutPolicy::builder(Duration::from_secs(seconds))
            .message(message)
            .build()
            .unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn sleep_three() -> &'static str {
        tokio::time::sleep(Duration::from_secs(3)).await;
        "finished"
    }

    async fn get_path(app: Router, uri: &str) -> Response {
        app.oneshot(axum::http::Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn handler_policy_fires_under_longer_global() {
        let app = Router::new()
            .route("/op", get(with_timeout(sleep_three, policy(2, "handler"))))
            .layer(RequestTimeoutLayer::new(policy(5, "global")));

        let response = get_path(app, "/op").await;
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        let json = body_json(response).await;
        assert_eq!(json["detail"], "handler");
        assert_eq!(json["timeoutSeconds"], 2.0);
    }

    #[tokio::test(start_paused = true)]
    async fn shorter_global_does_not_fire_for_wrapped_handler() {
        let app = Router::new()
            .route("/op", get(with_timeout(sleep_three, policy(4, "handler"))))
            .layer(RequestTimeoutLayer::new(policy(1, "global")));

        let response = get_path(app, "/op").await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test(start_paused = true)]
    async fn unwrapped_routes_keep_global_policy() {
        let app = Router::new()
            .route("/wrapped", get(with_timeout(sleep_three, policy(4, "handler"))))
            .route("/plain", get(sleep_three))
            .layer(RequestTimeoutLayer::new(policy(1, "global")));

        let response = get_path(app, "/plain").await;
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(body_json(response).await["detail"], "global");
    }

    #[tokio::test(start_paused = true)]
    async fn custom_responder_sees_request_without_request_argument() {
        let vip = TimeoutPolicy::builder(Duration::from_secs(2))
            .responder(|ctx, _elapsed| {
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    [("retry-after", "30")],
                    format!("{} {}", ctx.method(), ctx.path()),
                )
                    .into_response()
            })
            .build()
            .unwrap();

        let app = Router::new().route(
            "/vip",
            get(with_timeout(
                || async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    "vip"
                },
                vip,
            )),
        );

        let response = get_path(app, "/vip").await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.headers().get("retry-after").unwrap(), "30");
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"GET /vip");
    }

    #[tokio::test(start_paused = true)]
    async fn extractors_and_state_still_work() {
        async fn delayed(State(prefix): State<&'static str>, Path(secs): Path<u64>) -> String {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            format!("{prefix}{secs}")
        }

        let app = Router::new()
            .route("/delay/{secs}", get(with_timeout(delayed, policy(4, "delay"))))
            .with_state("waited ");

        let ok = get_path(app.clone(), "/delay/1").await;
        assert_eq!(ok.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(ok.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"waited 1");

        let late = get_path(app, "/delay/6").await;
        assert_eq!(late.status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[tokio::test(start_paused = true)]
    async fn request_body_handlers_are_supported() {
        let app = Router::new().route(
            "/upload",
            post(with_timeout(
                |body: String| async move { format!("received {} bytes", body.len()) },
                policy(30, "upload"),
            )),
        );

        let response = app
            .oneshot(axum::http::Request::post("/upload").body(Body::from("hello")).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"received 5 bytes");
    }
}
