//! Stress tests for taskguard patterns
//!
//! These tests are marked with `#[ignore]` and must be run explicitly:
//!
//! ```bash
//! cargo test --test stress -- --ignored --nocapture
//! ```
//!
//! ## What We Test
//!
//! - **High volume**: hundreds of thousands of tasks and calls
//! - **High concurrency**: thousands of concurrent callers
//! - **Panic storms**: containment when most tasks fail
//! - **State consistency**: counters that still balance afterwards
//! - **Resource cleanup**: workers and background loops exit

pub mod circuitbreaker;
pub mod pool;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use taskguard_executor::SafeExecutor;
use taskguard_monitor::Monitor;

/// Utility: Track peak concurrent operations
pub struct ConcurrencyTracker {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl ConcurrencyTracker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            current: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        })
    }

    pub fn enter(&self) {
        let current = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(current, Ordering::SeqCst);
    }

    pub fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// Utility: Resident memory of this process in MiB, read through a monitor
/// snapshot.
pub fn get_memory_usage_mb(executor: &SafeExecutor) -> f64 {
    let monitor = Monitor::new(executor, Duration::from_secs(3600));
    monitor.force_collect().memory.resident_bytes as f64 / (1024.0 * 1024.0)
}
