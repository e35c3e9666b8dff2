//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Timeout scopes produce:
//!     → logging.rs (structured log events: completions at debug, expiries at warn)
//!     → metrics.rs (timeout counter, duration histogram)
//!
//! Consumers:
//!     → Log aggregation (stdout, pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```

pub mod logging;
pub mod metrics;
