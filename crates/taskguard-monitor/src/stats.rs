use crate::alloc::AllocationStats;
use std::collections::HashMap;
use std::fmt;
use std::time::SystemTime;
use taskguard_executor::ExecutionStats;

/// One snapshot taken by a [`Monitor`](crate::Monitor).
///
/// Snapshots are immutable; each collection replaces the previous one.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct MonitorStats {
    /// When the snapshot was taken. `UNIX_EPOCH` before the first collection.
    pub timestamp: SystemTime,
    /// Task counts from the executor and the tokio runtime.
    pub tasks: TaskMetrics,
    /// Process memory.
    pub memory: MemoryMetrics,
    /// Allocator counters, when a [`TrackingAllocator`](crate::TrackingAllocator) is installed.
    pub allocations: Option<AllocationStats>,
    /// The executor's counters at snapshot time.
    pub executor: ExecutionStats,
    /// User-defined values set with [`Monitor::set_custom_stat`](crate::Monitor::set_custom_stat).
    pub custom: HashMap<String, CustomValue>,
}

impl Default for MonitorStats {
    fn default() -> Self {
        Self {
            timestamp: SystemTime::UNIX_EPOCH,
            tasks: TaskMetrics::default(),
            memory: MemoryMetrics::default(),
            allocations: None,
            executor: ExecutionStats::default(),
            custom: HashMap::new(),
        }
    }
}

/// Task counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TaskMetrics {
    /// Executor tasks currently running.
    pub executor_active: u64,
    /// Executor tasks spawned since the last reset.
    pub executor_total: u64,
    /// Executor tasks that finished normally.
    pub executor_completed: u64,
    /// Executor tasks that panicked.
    pub executor_panics: u64,
    /// Worker threads of the tokio runtime.
    pub runtime_workers: usize,
    /// Tasks alive on the tokio runtime, from any spawner.
    pub runtime_alive_tasks: usize,
    /// Tasks waiting in the runtime's global queue.
    pub runtime_global_queue_depth: usize,
}

/// Process memory figures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct MemoryMetrics {
    /// Resident set size in bytes.
    pub resident_bytes: u64,
    /// Virtual memory size in bytes.
    pub virtual_bytes: u64,
    /// Live heap bytes, when the tracking allocator is installed.
    pub heap_bytes: Option<u64>,
    /// Live heap allocations, when the tracking allocator is installed.
    pub live_allocations: Option<u64>,
}

impl MemoryMetrics {
    /// Heap bytes, falling back to resident memory without a tracking
    /// allocator.
    pub fn heap_or_resident(&self) -> u64 {
        self.heap_bytes.unwrap_or(self.resident_bytes)
    }
}

/// A user-defined statistic.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize), serde(untagged))]
pub enum CustomValue {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
}

impl fmt::Display for CustomValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CustomValue::Bool(v) => write!(f, "{v}"),
            CustomValue::Int(v) => write!(f, "{v}"),
            CustomValue::UInt(v) => write!(f, "{v}"),
            CustomValue::Float(v) => write!(f, "{v}"),
            CustomValue::Text(v) => f.write_str(v),
        }
    }
}

macro_rules! custom_value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for CustomValue {
                fn from(v: $ty) -> Self {
                    CustomValue::$variant(v.into())
                }
            }
        )*
    };
}

custom_value_from! {
    bool => Bool,
    i32 => Int,
    i64 => Int,
    u32 => UInt,
    u64 => UInt,
    f32 => Float,
    f64 => Float,
    String => Text,
    &str => Text,
}

impl From<usize> for CustomValue {
    fn from(v: usize) -> Self {
        CustomValue::UInt(v as u64)
    }
}
