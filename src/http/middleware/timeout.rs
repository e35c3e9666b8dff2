//! Global request timeout interceptor.
//!
//! # Responsibilities
//! - Apply one timeout policy to every request passing through the pipeline
//! - Step aside for requests claimed by a handler-level policy
//! - Forward WebSocket handshakes without timing them
//!
//! # Design Decisions
//! - Works as a plain tower `Layer`, so it can wrap a whole `Router` or be
//!   installed with `Router::layer`; [`timeout_middleware`] is the same logic
//!   for `axum::middleware::from_fn_with_state`
//! - Routing happens inside the first poll of the inner future; the deadline is
//!   only armed after that poll, once it is known whether a more specific
//!   policy has taken the request over
//! - The deadline is still absolute from the moment the request entered the layer

use std::convert::Infallible;
use std::future::Future;
use std::pin::{pin, Pin};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use tokio::time::Instant;
use tower::{Layer, Service};

use crate::http::request::{is_websocket_handshake, RequestContext};
use crate::resilience::policy::TimeoutPolicy;
use crate::resilience::timeouts::{self, Scope};

/// Marker placed in request extensions by the global interceptor.
///
/// A more specific timeout scope further down the stack claims it, which turns
/// the outer deadline off for that request.
#[derive(Debug, Clone, Default)]
pub struct DeadlineScope {
    claimed: Arc<AtomicBool>,
}

impl DeadlineScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the request over; the scope that inserted this marker will not time it.
    pub fn claim(&self) {
        self.claimed.store(true, Ordering::Release);
    }

    pub fn is_claimed(&self) -> bool {
        self.claimed.load(Ordering::Acquire)
    }
}

/// Claim the enclosing global scope, if any.
pub(crate) fn claim_enclosing<B>(request: &Request<B>) {
    if let Some(scope) = request.extensions().get::<DeadlineScope>() {
        scope.claim();
    }
}

/// Layer applying [`RequestTimeout`] to a service.
#[derive(Debug, Clone)]
pub struct RequestTimeoutLayer {
    policy: TimeoutPolicy,
}

impl RequestTimeoutLayer {
    pub fn new(policy: TimeoutPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &TimeoutPolicy {
        &self.policy
    }
}

impl<S> Layer<S> for RequestTimeoutLayer {
    type Service = RequestTimeout<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestTimeout {
            inner,
            policy: self.policy.clone(),
        }
    }
}

/// Service enforcing a global timeout policy on every request.
#[derive(Debug, Clone)]
pub struct RequestTimeout<S> {
    inner: S,
    policy: TimeoutPolicy,
}

impl<S> RequestTimeout<S> {
    pub fn new(inner: S, policy: TimeoutPolicy) -> Self {
        Self { inner, policy }
    }
}

/// Response future of [`RequestTimeout`].
pub type ResponseFuture<E> = Pin<Box<dyn Future<Output = Result<Response, E>> + Send>>;

impl<S, B> Service<Request<B>> for RequestTimeout<S>
where
    S: Service<Request<B>, Response = Response>,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = ResponseFuture<S::Error>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<B>) -> Self::Future {
        if is_websocket_handshake(request.method(), request.headers()) {
            tracing::trace!(path = %request.uri().path(), "WebSocket handshake bypasses timeout");
            return Box::pin(self.inner.call(request));
        }

        let started = Instant::now();
        let scope = enter_scope(&mut request);
        let context = RequestContext::from_request(&request);
        let policy = self.policy.clone();
        let work = self.inner.call(request);

        Box::pin(async move { guard(&policy, &context, &scope, started, work).await })
    }
}

/// Function-style form of [`RequestTimeoutLayer`], for `axum::middleware::from_fn_with_state`.
///
/// ```rust,no_run
/// use std::time::Duration;
/// use axum::{middleware, routing::get, Router};
/// use request_timeout::http::middleware::timeout_middleware;
/// use request_timeout::TimeoutPolicy;
///
/// # fn build() -> Result<Router, request_timeout::PolicyError> {
/// let policy = TimeoutPolicy::new(Duration::from_secs(5))?;
/// let app: Router = Router::new()
///     .route("/", get(|| async { "hello" }))
///     .layer(middleware::from_fn_with_state(policy, timeout_middleware));
/// # Ok(app)
/// # }
/// ```
pub async fn timeout_middleware(
    State(policy): State<TimeoutPolicy>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    if is_websocket_handshake(request.method(), request.headers()) {
        return next.run(request).await;
    }

    let started = Instant::now();
    let scope = enter_scope(&mut request);
    let context = RequestContext::from_request(&request);
    let work = async move { Ok::<_, Infallible>(next.run(request).await) };

    match guard(&policy, &context, &scope, started, work).await {
        Ok(response) => response,
        Err(never) => match never {},
    }
}

/// Claim any enclosing scope and open a fresh one for this request.
///
/// Nested interceptors: the innermost one governs.
fn enter_scope<B>(request: &mut Request<B>) -> DeadlineScope {
    claim_enclosing(request);
    let scope = DeadlineScope::new();
    request.extensions_mut().insert(scope.clone());
    scope
}

/// Apply the global deadline to `work` unless a more specific scope claims the request.
async fn guard<F, E>(
    policy: &TimeoutPolicy,
    context: &RequestContext,
    scope: &DeadlineScope,
    started: Instant,
    work: F,
) -> Result<Response, E>
where
    F: Future<Output = Result<Response, E>>,
{
    let mut work = pin!(work);

    // Drive routing and handler dispatch before deciding on a deadline.
    if let Poll::Ready(result) = futures_util::poll!(work.as_mut()) {
        timeouts::completed(Scope::Global, context, started);
        return result;
    }
    if scope.is_claimed() {
        return work.await;
    }

    let deadline = started.checked_add(policy.duration());
    match timeouts::race(started, deadline, work.as_mut()).await {
        timeouts::Outcome::Completed(result) => {
            timeouts::completed(Scope::Global, context, started);
            result
        }
        // Claimed after dispatch (e.g. behind an async middleware): keep waiting.
        timeouts::Outcome::Expired(_) if scope.is_claimed() => work.await,
        timeouts::Outcome::Expired(elapsed) => {
            Ok(timeouts::expired(Scope::Global, policy, context, elapsed))
        }
    }
}
