use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use taskguard_executor::{SafeExecutor, TaskKind};
use taskguard_monitor::{CustomValue, Monitor, MonitorStats};
use taskguard_pool::{Pool, PoolConfig};

#[tokio::test]
async fn snapshot_reflects_executor_counters() {
    let executor = SafeExecutor::new();
    let monitor = Monitor::new(&executor, Duration::from_secs(60));

    executor.spawn(async {}).join().await.unwrap();
    let _ = executor.spawn(async { panic!("bad frame") }).join().await;

    let stats = monitor.force_collect();
    assert_eq!(stats.tasks.executor_total, 2);
    assert_eq!(stats.tasks.executor_completed, 1);
    assert_eq!(stats.tasks.executor_panics, 1);
    assert_eq!(stats.tasks.executor_active, 0);
    assert!(stats.memory.resident_bytes > 0);
}

#[tokio::test]
async fn task_profile_lists_pool_workers() {
    let executor = SafeExecutor::new();
    let pool = Pool::new(PoolConfig::builder().max_workers(3).build(), &executor);
    let monitor = Monitor::new(&executor, Duration::from_secs(60));
    tokio::task::yield_now().await;

    let profile = monitor.task_profile();
    // Three workers and the dispatcher.
    assert_eq!(profile.len(), 4);
    assert!(profile.iter().all(|task| task.kind == TaskKind::Plain));
    assert!(profile.windows(2).all(|w| w[0].id < w[1].id));

    pool.stop().await;
    assert!(monitor.task_profile().is_empty());
}

#[tokio::test]
async fn custom_stats_carry_into_snapshots() {
    let executor = SafeExecutor::new();
    let monitor = Monitor::new(&executor, Duration::from_secs(60));

    monitor.set_custom_stat("queue", "ingest");
    monitor.set_custom_stat("backlog", 42u64);
    monitor.set_custom_stat("healthy", true);
    assert_eq!(monitor.stats().custom.len(), 3);

    let stats = monitor.force_collect();
    assert_eq!(stats.custom["backlog"], CustomValue::UInt(42));
    assert_eq!(stats.custom["queue"].to_string(), "ingest");
    assert_eq!(monitor.custom_stat("healthy"), Some(CustomValue::Bool(true)));
    assert_eq!(monitor.custom_stat("missing"), None);

    monitor.set_custom_stat("backlog", 7u64);
    assert_eq!(monitor.force_collect().custom["backlog"], CustomValue::UInt(7));
}

#[tokio::test(start_paused = true)]
async fn restart_resumes_collection() {
    let executor = SafeExecutor::new();
    let snapshots = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&snapshots);
    let monitor = Monitor::builder()
        .name("api")
        .interval(Duration::from_millis(20))
        .on_snapshot(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .build(&executor);

    monitor.start();
    monitor.start();
    tokio::time::sleep(Duration::from_millis(50)).await;
    monitor.stop();
    monitor.stop();
    assert!(!monitor.is_running());
    assert_eq!(snapshots.load(Ordering::SeqCst), 2);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(snapshots.load(Ordering::SeqCst), 2);

    monitor.start();
    assert!(monitor.is_running());
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(snapshots.load(Ordering::SeqCst), 4);
    assert_eq!(monitor.name(), "api");
}

#[tokio::test(start_paused = true)]
async fn dropping_the_monitor_ends_its_loop() {
    let executor = SafeExecutor::new();
    let monitor = Monitor::new(&executor, Duration::from_millis(10));
    monitor.start();
    tokio::time::sleep(Duration::from_millis(25)).await;
    assert_eq!(executor.stats().active_count, 1);

    drop(monitor);
    tokio::time::sleep(Duration::from_millis(25)).await;
    assert_eq!(executor.stats().active_count, 0);
}

#[tokio::test]
async fn handlers_receive_the_same_snapshot() {
    let executor = SafeExecutor::new();
    let monitor = Monitor::new(&executor, Duration::from_secs(60));
    let received: Arc<Mutex<Vec<MonitorStats>>> = Arc::new(Mutex::new(Vec::new()));
    for _ in 0..2 {
        let sink = Arc::clone(&received);
        monitor.add_handler(move |stats| sink.lock().push(stats.clone()));
    }

    let stats = monitor.force_collect();
    let received = received.lock();
    assert_eq!(received.len(), 2);
    assert!(received.iter().all(|s| *s == stats));
}

async fn collect_twice(executor: &SafeExecutor) -> Vec<(std::thread::ThreadId, MonitorStats)> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let monitor = Monitor::builder()
        .interval(Duration::from_millis(10))
        .on_snapshot(move |stats| sink.lock().push((std::thread::current().id(), stats.clone())))
        .build(executor);
    monitor.start();

    tokio::time::timeout(Duration::from_secs(5), async {
        while seen.lock().len() < 2 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("periodic snapshots arrive");
    monitor.stop();

    seen.lock().clone()
}

#[tokio::test(flavor = "current_thread")]
async fn periodic_sampling_leaves_the_runtime_thread() {
    let executor = SafeExecutor::new();
    let runtime_thread = std::thread::current().id();

    let seen = collect_twice(&executor).await;
    for (thread, stats) in &seen {
        assert_ne!(*thread, runtime_thread);
        assert!(stats.memory.resident_bytes > 0);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn periodic_sampling_on_a_multi_thread_runtime() {
    let executor = SafeExecutor::new();
    executor.spawn(async {}).join().await.unwrap();

    let seen = collect_twice(&executor).await;
    assert!(seen.len() >= 2);
    let (_, last) = seen.last().unwrap();
    assert_eq!(last.tasks.executor_completed, 1);
    assert_eq!(last.tasks.runtime_workers, 2);
}
