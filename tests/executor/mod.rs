//! Executor tests.
//!
//! - panics.rs: panic containment, recovery handler and stats
//! - cancellation.rs: tokens, deadlines and delays
//! - interval.rs: periodic tasks and back-pressure
//! - groups.rs: wait groups and batches
