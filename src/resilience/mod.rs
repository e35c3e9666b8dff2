//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request reaches a timeout boundary:
//!     → policy.rs (how long, and what to answer on expiry)
//!     → timeouts.rs (race the work against the deadline, drop the loser)
//! ```
//!
//! # Design Decisions
//! - Policies are immutable once built and shared by every request
//! - Expiry cancels the work; nothing keeps running after the response is sent
//! - The deadline wins a tie with completion

pub mod policy;
pub mod timeouts;

pub use policy::{PolicyError, TimeoutPolicy, TimeoutPolicyBuilder, TimeoutResponder};
pub use timeouts::{execute, race, Outcome, Scope};
