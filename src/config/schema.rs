//! Configuration schema definitions.
//!
//! This module defines the configuration structure for the timeout server.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::resilience::policy::{
    status_from_u16, PolicyError, TimeoutPolicy, DEFAULT_TIMEOUT_MESSAGE, DEFAULT_TIMEOUT_STATUS,
};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Global timeout policy, applied to every request without a handler-level policy.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
        }
    }
}

/// Global timeout policy settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Maximum processing time in seconds.
    pub timeout_seconds: f64,

    /// Status emitted on expiry. 408 is rejected.
    pub status_code: u16,

    /// Message in the `detail` field of the timeout body.
    pub message: String,

    /// Report the actual processing time in the timeout body.
    pub include_process_time: bool,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30.0,
            status_code: DEFAULT_TIMEOUT_STATUS.as_u16(),
            message: DEFAULT_TIMEOUT_MESSAGE.to_string(),
            include_process_time: true,
        }
    }
}

impl TimeoutConfig {
    /// Build the policy described by this section.
    pub fn to_policy(&self) -> Result<TimeoutPolicy, PolicyError> {
        TimeoutPolicy::from_secs_f64(self.timeout_seconds)?
            .status(status_from_u16(self.status_code)?)
            .message(self.message.clone())
            .include_elapsed(self.include_process_time)
            .build()
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
