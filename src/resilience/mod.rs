//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Chain health check / receipt poll:
//!     → retries.rs (bounded attempts, exponential backoff + jitter)
//!     → lifecycle::Shutdown observed between attempts
//!     → exhausted budget escalates to a fatal setup error
//! ```
//!
//! # Design Decisions
//! - Every wait is bounded by an attempt count and a deadline
//! - Retry parameters come from configuration, never inline constants
//! - Cancellation wins over backoff sleeps

pub mod retries;

pub use retries::{calculate_backoff, retry_with_backoff, InclusionPolicy, RetryError, RetryPolicy};
