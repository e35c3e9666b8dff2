//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing)
//!     → middleware/timeout.rs (global deadline)
//!     → [router picks the handler]
//!     → middleware/handler_timeout.rs (handler-level deadline, if wrapped)
//!     → handlers.rs
//!     → response.rs (timeout body, only when a deadline fires)
//!     → Send to client
//! ```

pub mod handlers;
pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use middleware::{with_timeout, RequestTimeoutLayer};
pub use request::{RequestContext, X_REQUEST_ID};
pub use response::{build_timeout_response, TimeoutBody};
pub use server::HttpServer;
