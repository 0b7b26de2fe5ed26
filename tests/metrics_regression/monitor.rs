//! Monitor metrics regression tests

use super::helpers::*;
use serial_test::serial;

use std::time::Duration;
use taskguard_executor::SafeExecutor;
use taskguard_monitor::{AlertConfig, Monitor};

#[tokio::test]
#[serial]
async fn monitor_metrics_exist() {
    init_recorder();

    let executor = SafeExecutor::new();
    let monitor = Monitor::builder()
        .name("test_monitor")
        .interval(Duration::from_secs(3600))
        .build(&executor);

    monitor.force_collect();

    assert_gauge_exists("monitor_runtime_alive_tasks");
    assert_metric_has_label("monitor_runtime_alive_tasks", "monitor", "test_monitor");
    assert_gauge_exists("monitor_executor_active_tasks");
    assert_gauge_exists("monitor_resident_memory_bytes");
}

#[tokio::test]
#[serial]
async fn monitor_alert_metrics() {
    init_recorder();

    let executor = SafeExecutor::new();
    let monitor = Monitor::builder()
        .name("alerting_monitor")
        .interval(Duration::from_secs(3600))
        .alert_config(
            AlertConfig::builder()
                .max_resident_memory(1)
                .alert_handler(|_| {})
                .build(),
        )
        .build(&executor);

    monitor.force_collect();

    assert_counter_exists("monitor_alerts_total");
    assert_metric_has_label("monitor_alerts_total", "monitor", "alerting_monitor");
    assert_metric_has_label("monitor_alerts_total", "kind", "high_resident_memory");
}
