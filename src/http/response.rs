//! Default timeout response.
//!
//! # Responsibilities
//! - Build the JSON body emitted when a deadline fires and no custom responder is set
//!
//! # Design Decisions
//! - Pure function of policy and elapsed time
//! - `processingTime` is rounded to milliseconds and omitted entirely when disabled

use std::time::Duration;

use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::resilience::policy::TimeoutPolicy;

/// Body of the default timeout response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeoutBody {
    pub detail: String,
    pub timeout_seconds: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_time: Option<f64>,
}

impl TimeoutBody {
    pub fn new(policy: &TimeoutPolicy, elapsed: Duration) -> Self {
        Self {
            detail: policy.message().to_string(),
            timeout_seconds: policy.duration().as_secs_f64(),
            processing_time: policy
                .include_elapsed()
                .then(|| round_millis(elapsed.as_secs_f64())),
        }
    }
}

fn round_millis(seconds: f64) -> f64 {
    (seconds * 1000.0).round() / 1000.0
}

/// Build the default timeout response for `policy`.
pub fn build_timeout_response(policy: &TimeoutPolicy, elapsed: Duration) -> Response {
    (policy.status(), Json(TimeoutBody::new(policy, elapsed))).into_response()
}
