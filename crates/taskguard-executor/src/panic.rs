//! Panic containment for executor tasks.
//!
//! [`Guarded`] wraps a task future and turns a panic raised while polling it
//! into a value. A process-wide panic hook, installed once and chained in
//! front of whatever hook was already registered, records the panic location
//! and a backtrace while a guarded future is being polled on the current
//! thread. Panics raised anywhere else go straight to the previous hook.

use crate::handle::TaskId;
use pin_project_lite::pin_project;
use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::Once;
use std::task::{Context, Poll};
use std::time::SystemTime;

thread_local! {
    static GUARD_DEPTH: Cell<usize> = const { Cell::new(0) };
    static CAPTURED: RefCell<Option<Captured>> = const { RefCell::new(None) };
}

static INSTALL_HOOK: Once = Once::new();

struct Captured {
    location: Option<String>,
    backtrace: String,
}

/// Installs the capturing panic hook. Safe to call any number of times.
pub(crate) fn install_capture_hook() {
    INSTALL_HOOK.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            if GUARD_DEPTH.with(Cell::get) > 0 {
                let captured = Captured {
                    location: info.location().map(ToString::to_string),
                    backtrace: Backtrace::force_capture().to_string(),
                };
                CAPTURED.with(|slot| *slot.borrow_mut() = Some(captured));
            } else {
                previous(info);
            }
        }));
    });
}

/// Details of a panic caught inside an executor task.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PanicReport {
    /// Task that panicked.
    pub task_id: TaskId,
    /// Panic payload rendered as text.
    pub message: String,
    /// `file:line:column` of the panic, when the hook could record it.
    pub location: Option<String>,
    /// Rendered backtrace.
    pub backtrace: String,
    /// Wall-clock time the panic was caught.
    pub timestamp: SystemTime,
}

impl PanicReport {
    pub(crate) fn new(task_id: TaskId, panic: CaughtPanic) -> Self {
        Self {
            task_id,
            message: panic.message,
            location: panic.location,
            backtrace: panic.backtrace,
            timestamp: SystemTime::now(),
        }
    }
}

/// A panic converted to data, before it is attributed to a task.
#[derive(Debug)]
pub(crate) struct CaughtPanic {
    pub(crate) message: String,
    pub(crate) location: Option<String>,
    pub(crate) backtrace: String,
}

impl CaughtPanic {
    fn from_payload(payload: Box<dyn Any + Send>) -> Self {
        let message = payload_message(payload.as_ref());
        match CAPTURED.with(|slot| slot.borrow_mut().take()) {
            Some(captured) => Self {
                message,
                location: captured.location,
                backtrace: captured.backtrace,
            },
            // Someone replaced our hook after it was installed.
            None => Self {
                message,
                location: None,
                backtrace: Backtrace::force_capture().to_string(),
            },
        }
    }
}

/// Renders a panic payload the way the standard library's hook does.
pub(crate) fn payload_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Box<dyn Any>".to_string()
    }
}

pin_project! {
    /// Future adapter that catches a panic raised while polling `inner`.
    pub(crate) struct Guarded<F> {
        #[pin]
        inner: F,
    }
}

impl<F> Guarded<F> {
    pub(crate) fn new(inner: F) -> Self {
        Self { inner }
    }
}

impl<F: Future> Future for Guarded<F> {
    type Output = Result<F::Output, CaughtPanic>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let inner = self.project().inner;

        GUARD_DEPTH.with(|depth| depth.set(depth.get() + 1));
        let polled = catch_unwind(AssertUnwindSafe(|| inner.poll(cx)));
        GUARD_DEPTH.with(|depth| depth.set(depth.get() - 1));

        match polled {
            Ok(Poll::Pending) => Poll::Pending,
            Ok(Poll::Ready(output)) => Poll::Ready(Ok(output)),
            Err(payload) => Poll::Ready(Err(CaughtPanic::from_payload(payload))),
        }
    }
}
