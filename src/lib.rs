//! Request timeout middleware for Axum services.
//!
//! Two ways to bound how long a request may take:
//! - [`RequestTimeoutLayer`] applies one policy to every request that passes through it
//!   ([`timeout_middleware`] does the same through `axum::middleware::from_fn_with_state`).
//! - [`with_timeout`] gives a single handler its own policy, replacing the global one.
//!
//! On expiry the in-flight work is dropped and the client receives the policy's
//! timeout response (504 with a JSON body unless configured otherwise).

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::AppConfig;
pub use http::middleware::{
    timeout_middleware, with_timeout, RequestTimeout, RequestTimeoutLayer, TimedHandler,
};
pub use http::{HttpServer, RequestContext};
pub use lifecycle::Shutdown;
pub use resilience::{execute, Outcome, PolicyError, TimeoutPolicy, TimeoutPolicyBuilder};
