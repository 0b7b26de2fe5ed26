//! Threshold alerts.

use crate::stats::MonitorStats;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// Callback receiving alerts.
pub type AlertHandler = Arc<dyn Fn(&Alert) + Send + Sync>;

/// Which threshold was breached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize), serde(rename_all = "snake_case"))]
pub enum AlertKind {
    /// Too many tasks alive on the runtime.
    HighTasks,
    /// Heap (or resident memory without a tracking allocator) above limit.
    HighHeapAlloc,
    /// Resident memory above limit.
    HighResidentMemory,
}

impl AlertKind {
    /// Stable name used in logs and metric labels.
    pub fn as_str(self) -> &'static str {
        match self {
            AlertKind::HighTasks => "high_tasks",
            AlertKind::HighHeapAlloc => "high_heap_alloc",
            AlertKind::HighResidentMemory => "high_resident_memory",
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How urgent an alert is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize), serde(rename_all = "snake_case"))]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// A breached threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Alert {
    pub kind: AlertKind,
    pub message: String,
    /// Observed value.
    pub value: u64,
    /// Configured limit.
    pub threshold: u64,
    pub timestamp: SystemTime,
    pub severity: Severity,
}

/// Alert thresholds.
#[derive(Clone)]
pub struct AlertConfig {
    pub(crate) max_tasks: usize,
    pub(crate) max_heap_alloc: u64,
    pub(crate) max_resident_memory: u64,
    pub(crate) check_interval: Duration,
    pub(crate) alert_handler: Option<AlertHandler>,
}

impl Default for AlertConfig {
    fn default() -> Self {
        AlertConfigBuilder::new().build()
    }
}

impl AlertConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> AlertConfigBuilder {
        AlertConfigBuilder::new()
    }

    /// Minimum time between two alert evaluations.
    pub fn check_interval(&self) -> Duration {
        self.check_interval
    }

    /// Returns every threshold `stats` breaches.
    pub fn evaluate(&self, stats: &MonitorStats) -> Vec<Alert> {
        let now = SystemTime::now();
        let mut alerts = Vec::new();

        let tasks = stats.tasks.runtime_alive_tasks as u64;
        if tasks > self.max_tasks as u64 {
            alerts.push(Alert {
                kind: AlertKind::HighTasks,
                message: format!("{tasks} live tasks exceed the limit of {}", self.max_tasks),
                value: tasks,
                threshold: self.max_tasks as u64,
                timestamp: now,
                severity: Severity::High,
            });
        }

        let heap = stats.memory.heap_or_resident();
        if heap > self.max_heap_alloc {
            alerts.push(Alert {
                kind: AlertKind::HighHeapAlloc,
                message: format!(
                    "heap usage of {heap} bytes exceeds the limit of {}",
                    self.max_heap_alloc
                ),
                value: heap,
                threshold: self.max_heap_alloc,
                timestamp: now,
                severity: Severity::High,
            });
        }

        let resident = stats.memory.resident_bytes;
        if resident > self.max_resident_memory {
            alerts.push(Alert {
                kind: AlertKind::HighResidentMemory,
                message: format!(
                    "resident memory of {resident} bytes exceeds the limit of {}",
                    self.max_resident_memory
                ),
                value: resident,
                threshold: self.max_resident_memory,
                timestamp: now,
                severity: Severity::Medium,
            });
        }

        alerts
    }
}

impl fmt::Debug for AlertConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlertConfig")
            .field("max_tasks", &self.max_tasks)
            .field("max_heap_alloc", &self.max_heap_alloc)
            .field("max_resident_memory", &self.max_resident_memory)
            .field("check_interval", &self.check_interval)
            .field("alert_handler", &self.alert_handler.is_some())
            .finish()
    }
}

/// Builder for [`AlertConfig`].
pub struct AlertConfigBuilder {
    max_tasks: usize,
    max_heap_alloc: u64,
    max_resident_memory: u64,
    check_interval: Duration,
    alert_handler: Option<AlertHandler>,
}

impl Default for AlertConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertConfigBuilder {
    /// Creates a new builder with defaults.
    ///
    /// Defaults:
    /// - max_tasks: 1000
    /// - max_heap_alloc: 100 MiB
    /// - max_resident_memory: 512 MiB
    /// - check_interval: 30 seconds
    /// - no alert handler
    pub fn new() -> Self {
        Self {
            max_tasks: 1000,
            max_heap_alloc: 100 * 1024 * 1024,
            max_resident_memory: 512 * 1024 * 1024,
            check_interval: Duration::from_secs(30),
            alert_handler: None,
        }
    }

    /// Live runtime tasks above which a `High` alert fires.
    pub fn max_tasks(mut self, max: usize) -> Self {
        self.max_tasks = max;
        self
    }

    /// Heap bytes above which a `High` alert fires. Compared against resident
    /// memory when no tracking allocator is installed.
    pub fn max_heap_alloc(mut self, bytes: u64) -> Self {
        self.max_heap_alloc = bytes;
        self
    }

    /// Resident bytes above which a `Medium` alert fires.
    pub fn max_resident_memory(mut self, bytes: u64) -> Self {
        self.max_resident_memory = bytes;
        self
    }

    /// Minimum time between alert evaluations. Snapshots taken in between
    /// are not checked.
    pub fn check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval;
        self
    }

    /// Sets the callback receiving alerts. Without one, thresholds are not
    /// evaluated.
    pub fn alert_handler<F>(mut self, f: F) -> Self
    where
        F: Fn(&Alert) + Send + Sync + 'static,
    {
        self.alert_handler = Some(Arc::new(f));
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> AlertConfig {
        AlertConfig {
            max_tasks: self.max_tasks,
            max_heap_alloc: self.max_heap_alloc,
            max_resident_memory: self.max_resident_memory,
            check_interval: self.check_interval,
            alert_handler: self.alert_handler,
        }
    }
}
