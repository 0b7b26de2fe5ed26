//! Logging seam for the executor.
//!
//! The executor reports panics, skipped tasks and interval back-pressure
//! through a [`TaskLogger`]. The default, [`TracingLogger`], forwards every
//! message to `tracing` with the executor name attached as a field.

use std::fmt;

/// Receives the executor's log output.
pub trait TaskLogger: Send + Sync {
    /// A contained failure, such as a panic.
    fn error(&self, message: &str);
    /// Something was skipped or degraded.
    fn warn(&self, message: &str);
    /// Lifecycle information.
    fn info(&self, message: &str);
    /// Diagnostics.
    fn debug(&self, message: &str);
}

/// Forwards log output to `tracing`.
#[derive(Clone)]
pub struct TracingLogger {
    executor: String,
}

impl TracingLogger {
    /// Creates a logger that tags events with `executor`.
    pub fn new(executor: impl Into<String>) -> Self {
        Self {
            executor: executor.into(),
        }
    }
}

impl fmt::Debug for TracingLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TracingLogger")
            .field("executor", &self.executor)
            .finish()
    }
}

impl TaskLogger for TracingLogger {
    fn error(&self, message: &str) {
        tracing::error!(executor = %self.executor, "{message}");
    }

    fn warn(&self, message: &str) {
        tracing::warn!(executor = %self.executor, "{message}");
    }

    fn info(&self, message: &str) {
        tracing::info!(executor = %self.executor, "{message}");
    }

    fn debug(&self, message: &str) {
        tracing::debug!(executor = %self.executor, "{message}");
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLogger;

impl TaskLogger for NoopLogger {
    fn error(&self, _message: &str) {}
    fn warn(&self, _message: &str) {}
    fn info(&self, _message: &str) {}
    fn debug(&self, _message: &str) {}
}
