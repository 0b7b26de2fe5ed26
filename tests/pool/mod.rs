//! Worker pool tests.
//!
//! - admission.rs: queue capacity and rejection
//! - execution.rs: job outcomes, panics and concurrency
//! - shutdown.rs: stop, graceful stop and the stop latch
//! - deadlines.rs: job and worker timeouts

mod execution;
