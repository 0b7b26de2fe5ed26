//! Core infrastructure for taskguard.
//!
//! Shared by every taskguard crate:
//! - Event system for observability (panic-safe listener fan-out)
//! - [`GuardError`], a unified error type for composing several guards
//! - [`BoxError`], the boxed error type job bodies return

pub mod error;
pub mod events;

pub use error::{BoxError, GuardError};
pub use events::{EventListener, EventListeners, FnListener, TaskEvent};
