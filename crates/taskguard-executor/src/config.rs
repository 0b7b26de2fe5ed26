use crate::events::ExecutorEvent;
use crate::executor::SafeExecutor;
use crate::handle::TaskId;
use std::time::Duration;
use taskguard_core::{EventListeners, FnListener};
use tokio::runtime::Handle;

/// Configuration for a [`SafeExecutor`].
pub struct ExecutorConfig {
    pub(crate) name: String,
    pub(crate) max_interval_in_flight: Option<usize>,
    pub(crate) event_listeners: EventListeners<ExecutorEvent>,
}

impl ExecutorConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> ExecutorConfigBuilder {
        ExecutorConfigBuilder::new()
    }
}

/// Builder for [`SafeExecutor`].
pub struct ExecutorConfigBuilder {
    name: String,
    max_interval_in_flight: Option<usize>,
    event_listeners: EventListeners<ExecutorEvent>,
}

impl ExecutorConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self {
            name: String::from("<unnamed>"),
            max_interval_in_flight: None,
            event_listeners: EventListeners::new(),
        }
    }

    /// Name used in logs, events and metric labels.
    ///
    /// Default: `<unnamed>`
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Caps how many runs of one interval may be in flight at once. Ticks
    /// arriving while the cap is reached are skipped with a warning.
    /// A cap of zero is treated as one.
    ///
    /// Default: unbounded
    pub fn max_interval_in_flight(mut self, max: usize) -> Self {
        self.max_interval_in_flight = Some(max.max(1));
        self
    }

    /// Registers a callback invoked when a task is spawned.
    pub fn on_task_spawned<F>(mut self, f: F) -> Self
    where
        F: Fn(TaskId) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &ExecutorEvent| {
                if let ExecutorEvent::TaskSpawned { task, .. } = event {
                    f(*task);
                }
            }));
        self
    }

    /// Registers a callback invoked when a task finishes without panicking.
    pub fn on_task_completed<F>(mut self, f: F) -> Self
    where
        F: Fn(TaskId, Duration) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &ExecutorEvent| {
                if let ExecutorEvent::TaskCompleted { task, duration, .. } = event {
                    f(*task, *duration);
                }
            }));
        self
    }

    /// Registers a callback invoked when a task panics.
    ///
    /// Runs before the recovery handler.
    pub fn on_task_panicked<F>(mut self, f: F) -> Self
    where
        F: Fn(TaskId, &str) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &ExecutorEvent| {
                if let ExecutorEvent::TaskPanicked { task, message, .. } = event {
                    f(*task, message);
                }
            }));
        self
    }

    /// Registers a callback invoked when a cancellable task is skipped.
    pub fn on_task_skipped<F>(mut self, f: F) -> Self
    where
        F: Fn(TaskId) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &ExecutorEvent| {
                if let ExecutorEvent::TaskSkipped { task, .. } = event {
                    f(*task);
                }
            }));
        self
    }

    /// Builds the configuration without binding it to a runtime.
    pub fn into_config(self) -> ExecutorConfig {
        ExecutorConfig {
            name: self.name,
            max_interval_in_flight: self.max_interval_in_flight,
            event_listeners: self.event_listeners,
        }
    }

    /// Builds an executor on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime. Use
    /// [`build_with_handle`](Self::build_with_handle) otherwise.
    pub fn build(self) -> SafeExecutor {
        SafeExecutor::with_config(self.into_config(), Handle::current())
    }

    /// Builds an executor that spawns onto `handle`.
    pub fn build_with_handle(self, handle: Handle) -> SafeExecutor {
        SafeExecutor::with_config(self.into_config(), handle)
    }
}

impl Default for ExecutorConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
