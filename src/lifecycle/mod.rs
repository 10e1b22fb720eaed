//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Suite abort / SIGINT / SIGTERM / tear_down():
//!     Shutdown::trigger()
//!     → every ShutdownListener wakes
//!     → health checks, receipt polls and backoff sleeps return Cancelled
//!     → orchestrator stops every chain it started
//! ```
//!
//! # Design Decisions
//! - Cancellation is level-triggered: listeners created after the trigger
//!   still observe it
//! - One coordinator per network; clones share the same signal

pub mod shutdown;
pub mod signals;

pub use shutdown::{Shutdown, ShutdownListener};
pub use signals::{trigger_on_signal, wait_for_termination};
