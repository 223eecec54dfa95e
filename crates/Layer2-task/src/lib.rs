//! # tether-task
//!
//! Background task bookkeeping for Tether.
//!
//! ## Features
//!
//! - Timeout utility racing an operation against a deadline and a cancellation signal
//! - In-memory task store with forward-only status transitions
//! - Append-only, paginated task logs with live subscription
//! - Cancellation and age-based eviction of finished tasks

pub mod log;
pub mod state;
pub mod store;
pub mod task;
pub mod timeout;

// Task system
pub use state::TaskStatus;
pub use store::{CancelOutcome, TaskStore, TaskUpdate, CANCELLED_MESSAGE};
pub use task::{Task, TaskId, TaskSummary};

// Log system
pub use log::{output_lines, LogEntry, LogPage};

// Timeout utility
pub use timeout::with_timeout;
