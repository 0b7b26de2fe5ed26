//! Retry tests.
//!
//! - behavior.rs: attempt counting, success and exhaustion
//! - backoff.rs: delays between attempts
//! - predicates.rs: retry_on filtering
//! - events.rs: callbacks and background execution

mod backoff;
mod behavior;
