//! Timeout policy definition and construction-time validation.
//!
//! # Responsibilities
//! - Hold the immutable settings of one timeout scope (global or per-handler)
//! - Reject forbidden or malformed settings before any request sees them
//! - Pick the responder used when the deadline fires
//!
//! # Design Decisions
//! - 408 Request Timeout is refused: clients retry it automatically, which
//!   multiplies load on a server that is already too slow
//! - Zero, negative and non-finite durations are refused as well
//! - Policies are `Arc`-backed so every request clones a pointer, not the config

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::response::Response;
use thiserror::Error;

use crate::http::request::RequestContext;
use crate::http::response::build_timeout_response;

/// Message placed in the default timeout body.
pub const DEFAULT_TIMEOUT_MESSAGE: &str = "Request processing time exceeded limit";

/// Status emitted when no status is configured.
pub const DEFAULT_TIMEOUT_STATUS: StatusCode = StatusCode::GATEWAY_TIMEOUT;

/// Caller-supplied function building the response of a timed-out request.
///
/// Receives the request context and the time elapsed since the timeout scope started.
pub type TimeoutResponder = Arc<dyn Fn(&RequestContext, Duration) -> Response + Send + Sync>;

/// Errors raised while building a [`TimeoutPolicy`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PolicyError {
    #[error("HTTP 408 Request Timeout should not be used as a timeout status: clients retry it automatically")]
    ForbiddenStatusCode,

    #[error("invalid HTTP status code: {0}")]
    InvalidStatusCode(u16),

    #[error("timeout duration must be a positive, finite number of seconds (got {0})")]
    InvalidDuration(f64),
}

struct PolicyInner {
    duration: Duration,
    status: StatusCode,
    message: String,
    include_elapsed: bool,
    responder: Option<TimeoutResponder>,
}

/// Immutable configuration for one timeout-enforcement scope.
///
/// Built once with [`TimeoutPolicy::builder`] and shared by every request that
/// flows through the interceptor or handler it was registered with.
#[derive(Clone)]
pub struct TimeoutPolicy {
    inner: Arc<PolicyInner>,
}

impl TimeoutPolicy {
    /// Start building a policy with the given deadline.
    pub fn builder(duration: Duration) -> TimeoutPolicyBuilder {
        TimeoutPolicyBuilder {
            duration,
            status: DEFAULT_TIMEOUT_STATUS,
            message: DEFAULT_TIMEOUT_MESSAGE.to_string(),
            include_elapsed: true,
            responder: None,
        }
    }

    /// Policy with every optional setting left at its default.
    pub fn new(duration: Duration) -> Result<Self, PolicyError> {
        Self::builder(duration).build()
    }

    /// Start building a policy from a number of seconds, as found in config files.
    pub fn from_secs_f64(seconds: f64) -> Result<TimeoutPolicyBuilder, PolicyError> {
        if !seconds.is_finite() || seconds <= 0.0 {
            return Err(PolicyError::InvalidDuration(seconds));
        }
        match Duration::try_from_secs_f64(seconds) {
            // Below nanosecond resolution the deadline collapses to zero.
            Ok(duration) if !duration.is_zero() => Ok(Self::builder(duration)),
            _ => Err(PolicyError::InvalidDuration(seconds)),
        }
    }

    pub fn duration(&self) -> Duration {
        self.inner.duration
    }

    pub fn status(&self) -> StatusCode {
        self.inner.status
    }

    pub fn message(&self) -> &str {
        &self.inner.message
    }

    pub fn include_elapsed(&self) -> bool {
        self.inner.include_elapsed
    }

    /// Whether a custom responder replaces the default JSON body.
    pub fn has_custom_responder(&self) -> bool {
        self.inner.responder.is_some()
    }

    /// Build the response for a request whose deadline fired.
    ///
    /// The custom responder, when present, is used verbatim. A panic inside it
    /// propagates to the caller; there is no fallback to the default body.
    pub fn respond(&self, context: &RequestContext, elapsed: Duration) -> Response {
        match &self.inner.responder {
            Some(responder) => responder(context, elapsed),
            None => build_timeout_response(self, elapsed),
        }
    }
}

impl fmt::Debug for TimeoutPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimeoutPolicy")
            .field("duration", &self.inner.duration)
            .field("status", &self.inner.status)
            .field("message", &self.inner.message)
            .field("include_elapsed", &self.inner.include_elapsed)
            .field("custom_responder", &self.inner.responder.is_some())
            .finish()
    }
}

/// Builder for [`TimeoutPolicy`]; validation happens in [`build`](Self::build).
pub struct TimeoutPolicyBuilder {
    duration: Duration,
    status: StatusCode,
    message: String,
    include_elapsed: bool,
    responder: Option<TimeoutResponder>,
}

impl TimeoutPolicyBuilder {
    /// Status emitted on expiry. Defaults to 504 Gateway Timeout.
    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Message placed in the `detail` field of the default body.
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Whether the default body reports `processingTime`. Defaults to `true`.
    pub fn include_elapsed(mut self, include: bool) -> Self {
        self.include_elapsed = include;
        self
    }

    /// Replace the default JSON body with a caller-built response.
    pub fn responder<F>(mut self, responder: F) -> Self
    where
        F: Fn(&RequestContext, Duration) -> Response + Send + Sync + 'static,
    {
        self.responder = Some(Arc::new(responder));
        self
    }

    /// Validate and freeze the policy.
    pub fn build(self) -> Result<TimeoutPolicy, PolicyError> {
        if self.duration.is_zero() {
            return Err(PolicyError::InvalidDuration(0.0));
        }
        if self.status == StatusCode::REQUEST_TIMEOUT {
            return Err(PolicyError::ForbiddenStatusCode);
        }

        Ok(TimeoutPolicy {
            inner: Arc::new(PolicyInner {
                duration: self.duration,
                status: self.status,
                message: self.message,
                include_elapsed: self.include_elapsed,
                responder: self.responder,
            }),
        })
    }
}

/// Convert a numeric status from configuration, applying the same rules as the builder.
pub fn status_from_u16(code: u16) -> Result<StatusCode, PolicyError> {
    if code == StatusCode::REQUEST_TIMEOUT.as_u16() {
        return Err(PolicyError::ForbiddenStatusCode);
    }
    StatusCode::from_u16(code).map_err(|_| PolicyError::InvalidStatusCode(code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_gateway_timeout() {
        let policy = TimeoutPolicy::new(Duration::from_secs(30)).unwrap();
        assert_eq!(policy.duration(), Duration::from_secs(30));
        assert_eq!(policy.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(policy.message(), DEFAULT_TIMEOUT_MESSAGE);
        assert!(policy.include_elapsed());
        assert!(!policy.has_custom_responder());
    }

    #[test]
    fn request_timeout_status_is_rejected() {
        let err = TimeoutPolicy::builder(Duration::from_secs(1))
            .status(StatusCode::REQUEST_TIMEOUT)
            .build()
            .unwrap_err();
        assert_eq!(err, PolicyError::ForbiddenStatusCode);
        assert!(err.to_string().contains("HTTP 408"));
        assert!(err.to_string().contains("should not be used"));
    }

    #[test]
    fn any_other_status_is_accepted() {
        for code in [200u16, 404, 407, 409, 429, 500, 503, 504, 599] {
            let status = StatusCode::from_u16(code).unwrap();
            let policy = TimeoutPolicy::builder(Duration::from_secs(1))
                .status(status)
                .build()
                .unwrap();
            assert_eq!(policy.status().as_u16(), code);
        }
    }

    #[test]
    fn zero_duration_is_rejected() {
        let err = TimeoutPolicy::new(Duration::ZERO).unwrap_err();
        assert_eq!(err, PolicyError::InvalidDuration(0.0));
    }

    #[test]
    fn non_positive_and_non_finite_seconds_are_rejected() {
        for seconds in [0.0, -1.0, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(matches!(
                TimeoutPolicy::from_secs_f64(seconds),
                Err(PolicyError::InvalidDuration(_))
            ));
        }
        assert!(TimeoutPolicy::from_secs_f64(f64::NAN).is_err());
        assert!(TimeoutPolicy::from_secs_f64(f64::MAX).is_err());
    }

    #[test]
    fn sub_nanosecond_seconds_report_the_given_value() {
        assert_eq!(
            TimeoutPolicy::from_secs_f64(1e-12).err(),
            Some(PolicyError::InvalidDuration(1e-12))
        );
    }

    #[test]
    fn tiny_and_huge_durations_are_accepted() {
        let tiny = TimeoutPolicy::from_secs_f64(0.001).unwrap().build().unwrap();
        assert_eq!(tiny.duration(), Duration::from_millis(1));

        let huge = TimeoutPolicy::new(Duration::from_secs(60 * 60 * 24 * 365)).unwrap();
        assert_eq!(huge.duration().as_secs(), 31_536_000);
    }

    #[test]
    fn numeric_status_conversion() {
        assert_eq!(status_from_u16(503).unwrap(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(status_from_u16(408).unwrap_err(), PolicyError::ForbiddenStatusCode);
        assert_eq!(status_from_u16(42).unwrap_err(), PolicyError::InvalidStatusCode(42));
        assert_eq!(status_from_u16(1000).unwrap_err(), PolicyError::InvalidStatusCode(1000));
    }

    #[test]
    fn clones_share_settings() {
        let policy = TimeoutPolicy::builder(Duration::from_millis(250))
            .message("too slow")
            .include_elapsed(false)
            .responder(|_, _| Response::default())
            .build()
            .unwrap();
        let copy = policy.clone();
        assert_eq!(copy.message(), "too slow");
        assert!(!copy.include_elapsed());
        assert!(copy.has_custom_responder());
        assert!(format!("{copy:?}").contains("custom_responder: true"));
    }
}
