//! Typed lifecycle events.
//!
//! Each component defines its own event enum (`ExecutorEvent`, `PoolEvent`,
//! `CircuitBreakerEvent` and so on) and publishes it through an
//! [`EventListeners`] list owned by its configuration. Builder callbacks such
//! as `on_task_panicked` or `on_job_rejected` are registered as
//! [`FnListener`]s.
//!
//! Listeners are called inline, on whichever thread settled the task or job,
//! before the component moves on. Keep them short.
//!
//! ```rust
//! use std::sync::atomic::{AtomicU64, Ordering};
//! use std::sync::Arc;
//! use std::time::{Duration, Instant};
//! use taskguard_core::{EventListeners, FnListener, TaskEvent};
//!
//! #[derive(Debug)]
//! struct JobFinished {
//!     pool: String,
//!     at: Instant,
//!     took: Duration,
//! }
//!
//! impl TaskEvent for JobFinished {
//!     fn event_type(&self) -> &'static str {
//!         "job_finished"
//!     }
//!     fn timestamp(&self) -> Instant {
//!         self.at
//!     }
//!     fn source_name(&self) -> &str {
//!         &self.pool
//!     }
//! }
//!
//! let busy_ms = Arc::new(AtomicU64::new(0));
//! let sink = Arc::clone(&busy_ms);
//!
//! let mut listeners = EventListeners::new();
//! listeners.add(FnListener::new(move |e: &JobFinished| {
//!     sink.fetch_add(e.took.as_millis() as u64, Ordering::Relaxed);
//! }));
//! listeners.add(FnListener::new(|_: &JobFinished| panic!("broken exporter")));
//!
//! let panicked = listeners.emit(&JobFinished {
//!     pool: "thumbnails".into(),
//!     at: Instant::now(),
//!     took: Duration::from_millis(40),
//! });
//!
//! assert_eq!(busy_ms.load(Ordering::Relaxed), 40);
//! assert_eq!(panicked, 1);
//! ```

use std::fmt;
use std::marker::PhantomData;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

/// An event published by an executor, pool, breaker, limiter, retry or
/// monitor.
pub trait TaskEvent: Send + Sync + fmt::Debug {
    /// Stable snake_case tag, such as `"task_panicked"` or `"job_rejected"`.
    fn event_type(&self) -> &'static str;

    /// When the event was raised.
    fn timestamp(&self) -> Instant;

    /// Name of the executor, pool or other instance that raised it.
    fn source_name(&self) -> &str;
}

/// Receives events of one type.
pub trait EventListener<E: TaskEvent>: Send + Sync {
    fn on_event(&self, event: &E);
}

/// Shared handle to a listener.
pub type BoxedEventListener<E> = Arc<dyn EventListener<E>>;

/// Listeners for one event type, called in registration order.
///
/// Cloning is cheap: the listeners themselves are shared.
pub struct EventListeners<E: TaskEvent> {
    listeners: Vec<BoxedEventListener<E>>,
}

impl<E: TaskEvent> EventListeners<E> {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    pub fn add<L>(&mut self, listener: L)
    where
        L: EventListener<E> + 'static,
    {
        self.push(Arc::new(listener));
    }

    /// Adds a listener that is already shared with other lists.
    pub fn push(&mut self, listener: BoxedEventListener<E>) {
        self.listeners.push(listener);
    }

    /// Calls every listener with `event` and returns how many of them
    /// panicked.
    ///
    /// A listener panic is contained: the listeners after it still run.
    /// The caller decides whether to log the count.
    pub fn emit(&self, event: &E) -> usize {
        self.listeners
            .iter()
            .filter(|listener| catch_unwind(AssertUnwindSafe(|| listener.on_event(event))).is_err())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }
}

impl<E: TaskEvent> Clone for EventListeners<E> {
    fn clone(&self) -> Self {
        Self {
            listeners: self.listeners.clone(),
        }
    }
}

impl<E: TaskEvent> Default for EventListeners<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: TaskEvent> fmt::Debug for EventListeners<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventListeners")
            .field("len", &self.listeners.len())
            .finish()
    }
}

/// Adapts a closure into an [`EventListener`].
pub struct FnListener<E, F> {
    f: F,
    _event: PhantomData<fn(&E)>,
}

impl<E, F> FnListener<E, F>
where
    F: Fn(&E) + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self {
            f,
            _event: PhantomData,
        }
    }
}

impl<E, F> EventListener<E> for FnListener<E, F>
where
    E: TaskEvent,
    F: Fn(&E) + Send + Sync,
{
    fn on_event(&self, event: &E) {
        (self.f)(event)
    }
}
