//! Timeout middleware.
//!
//! # Composition
//! ```text
//! Request
//!     → timeout.rs (global interceptor: one policy for the whole pipeline,
//!       as a tower layer or a from_fn middleware)
//!     → routing
//!     → handler_timeout.rs (per-handler wrapper: claims the request, own policy)
//!     → handler
//! ```
//!
//! Both delegate the actual race to `resilience::timeouts`.

pub mod handler_timeout;
pub mod timeout;

pub use handler_timeout::{with_timeout, TimedHandler};
pub use timeout::{timeout_middleware, DeadlineScope, RequestTimeout, RequestTimeoutLayer};
