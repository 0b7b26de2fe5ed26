use crate::alert::AlertConfig;
use crate::monitor::{Monitor, SnapshotHandler};
use crate::stats::MonitorStats;
use std::sync::Arc;
use std::time::Duration;
use taskguard_executor::SafeExecutor;

/// Builder for a [`Monitor`].
pub struct MonitorBuilder {
    pub(crate) name: String,
    pub(crate) interval: Duration,
    pub(crate) alert_config: AlertConfig,
    pub(crate) handlers: Vec<SnapshotHandler>,
}

impl Default for MonitorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MonitorBuilder {
    /// Creates a new builder with defaults.
    ///
    /// Defaults:
    /// - interval: 10 seconds
    /// - alert config: [`AlertConfig::default`]
    /// - name: `"<unnamed>"`
    pub fn new() -> Self {
        Self {
            name: "<unnamed>".to_string(),
            interval: Duration::from_secs(10),
            alert_config: AlertConfig::default(),
            handlers: Vec::new(),
        }
    }

    /// Sets the time between snapshots. Values under a millisecond are
    /// raised to one millisecond.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Sets the alert thresholds.
    pub fn alert_config(mut self, config: AlertConfig) -> Self {
        self.alert_config = config;
        self
    }

    /// Registers a handler receiving every snapshot.
    pub fn on_snapshot<F>(mut self, f: F) -> Self
    where
        F: Fn(&MonitorStats) + Send + Sync + 'static,
    {
        self.handlers.push(Arc::new(f));
        self
    }

    /// Sets the name used in logs and metric labels.
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// Builds a stopped monitor sampling `executor`. Call
    /// [`Monitor::start`] to begin collecting.
    pub fn build(self, executor: &SafeExecutor) -> Monitor {
        Monitor::from_builder(self, executor)
    }
}
