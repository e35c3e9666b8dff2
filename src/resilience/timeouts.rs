//! Timeout enforcement.
//!
//! # Responsibilities
//! - Race a unit of work against an absolute deadline
//! - Produce exactly one response per invocation
//! - Cancel the losing side cleanly
//!
//! # Design Decisions
//! - Uses Tokio's timer; cancellation is dropping the work future, which
//!   aborts it at whatever `.await` it is suspended on
//! - The deadline is measured from the start of the scope, never reset on progress
//! - Ties go to the deadline: once it has fired, a late completion is discarded
//! - Errors from the work itself are returned untouched; only timing is intercepted

use std::future::Future;
use std::time::Duration;

use axum::response::Response;
use tokio::time::Instant;

use crate::http::request::RequestContext;
use crate::observability::metrics;
use crate::resilience::policy::TimeoutPolicy;

/// Which registration a timeout scope belongs to. Used in logs and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Global,
    Handler,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Global => "global",
            Scope::Handler => "handler",
        }
    }
}

/// Result of racing work against a deadline. Exactly one variant per invocation.
#[derive(Debug)]
pub enum Outcome<T> {
    /// Work finished before the deadline.
    Completed(T),
    /// Deadline fired first; carries the time elapsed since the scope started.
    Expired(Duration),
}

/// Race `work` against `deadline`.
///
/// `None` means the deadline is beyond the clock's range and never fires.
pub async fn race<F>(started: Instant, deadline: Option<Instant>, work: F) -> Outcome<F::Output>
where
    F: Future,
{
    let Some(deadline) = deadline else {
        return Outcome::Completed(work.await);
    };

    tokio::select! {
        biased;
        () = tokio::time::sleep_until(deadline) => Outcome::Expired(started.elapsed()),
        output = work => Outcome::Completed(output),
    }
}

/// Run `work` under `policy`, replacing it with the timeout response if it overruns.
pub async fn execute<F, E>(
    policy: &TimeoutPolicy,
    context: &RequestContext,
    work: F,
) -> Result<Response, E>
where
    F: Future<Output = Result<Response, E>>,
{
    execute_from(Scope::Handler, policy, context, Instant::now(), work).await
}

/// Same as [`execute`] with an explicit scope label and start instant.
pub(crate) async fn execute_from<F, E>(
    scope: Scope,
    policy: &TimeoutPolicy,
    context: &RequestContext,
    started: Instant,
    work: F,
) -> Result<Response, E>
where
    F: Future<Output = Result<Response, E>>,
{
    let deadline = started.checked_add(policy.duration());
    match race(started, deadline, work).await {
        Outcome::Completed(result) => {
            completed(scope, context, started);
            result
        }
        Outcome::Expired(elapsed) => Ok(expired(scope, policy, context, elapsed)),
    }
}

pub(crate) fn completed(scope: Scope, context: &RequestContext, started: Instant) {
    let elapsed = started.elapsed();
    tracing::debug!(
        scope = scope.as_str(),
        method = %context.method(),
        path = %context.path(),
        elapsed_ms = elapsed.as_millis() as u64,
        "Request completed within deadline"
    );
    metrics::record_completed(scope, elapsed);
}

pub(crate) fn expired(
    scope: Scope,
    policy: &TimeoutPolicy,
    context: &RequestContext,
    elapsed: Duration,
) -> Response {
    tracing::warn!(
        scope = scope.as_str(),
        method = %context.method(),
        path = %context.path(),
        request_id = context.request_id().unwrap_or("unknown"),
        timeout_ms = policy.duration().as_millis() as u64,
        elapsed_ms = elapsed.as_millis() as u64,
        "Request timed out"
    );
    let response = policy.respond(context, elapsed);
    metrics::record_timeout(scope, response.status().as_u16(), elapsed);
    response
}
