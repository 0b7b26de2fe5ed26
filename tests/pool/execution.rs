use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use taskguard_executor::SafeExecutor;
use taskguard_pool::{Pool, PoolConfig, SimpleJob};

#[tokio::test]
async fn counts_successes_errors_and_panics() {
    let executor = SafeExecutor::new();
    let pool = Pool::new(PoolConfig::builder().max_workers(3).build(), &executor);

    pool.submit_fn("ok", |_| async { Ok(()) }).unwrap();
    pool.submit_fn("err", |_| async { Err("checksum mismatch".into()) })
        .unwrap();
    pool.submit_fn("panic", |_| async { panic!("null pointer in codec") })
        .unwrap();

    pool.stop_gracefully(Duration::from_secs(1)).await;

    let stats = pool.stats();
    assert_eq!(stats.total_jobs, 3);
    assert_eq!(stats.completed_jobs, 1);
    assert_eq!(stats.failed_jobs, 2);
    assert_eq!(stats.finished_jobs(), 3);
    assert!(stats.last_job_time.is_some());
    assert_eq!(pool.executor_stats().panic_count, 1);
}

#[tokio::test]
async fn worker_survives_a_panicking_job() {
    let executor = SafeExecutor::new();
    let pool = Pool::new(PoolConfig::builder().max_workers(1).build(), &executor);
    let ran = Arc::new(AtomicUsize::new(0));

    pool.submit_fn("bad", |_| async { panic!("bad input") }).unwrap();
    for i in 0..5 {
        let ran = Arc::clone(&ran);
        pool.submit_fn(format!("good-{i}"), move |_| async move {
            ran.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();
    }

    pool.stop_gracefully(Duration::from_secs(1)).await;
    assert_eq!(ran.load(Ordering::SeqCst), 5);
    assert_eq!(pool.stats().completed_jobs, 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn never_more_busy_workers_than_configured() {
    let executor = SafeExecutor::new();
    let pool = Pool::new(
        PoolConfig::builder().max_workers(3).queue_size(50).build(),
        &executor,
    );
    let current = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    for i in 0..30 {
        let current = Arc::clone(&current);
        let peak = Arc::clone(&peak);
        pool.submit(SimpleJob::new(format!("job-{i}"), move |_| async move {
            let now = current.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            current.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        }))
        .unwrap();
    }

    pool.stop_gracefully(Duration::from_secs(5)).await;
    assert_eq!(pool.stats().completed_jobs, 30);
    assert!(peak.load(Ordering::SeqCst) <= 3);
    assert!(pool.stats().active_workers <= 3);
}

#[tokio::test]
async fn completion_callbacks_see_each_job() {
    let executor = SafeExecutor::new();
    let completed = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let (c, f) = (Arc::clone(&completed), Arc::clone(&failed));
    let pool = Pool::new(
        PoolConfig::builder()
            .on_job_completed(move |_, _| {
                c.fetch_add(1, Ordering::SeqCst);
            })
            .on_job_failed(move |id, error| {
                assert_eq!(id, "broken");
                assert!(error.contains("no route to host"));
                f.fetch_add(1, Ordering::SeqCst);
            })
            .build(),
        &executor,
    );

    pool.submit_fn("fine", |_| async { Ok(()) }).unwrap();
    pool.submit_fn("broken", |_| async { Err("no route to host".into()) })
        .unwrap();
    pool.stop_gracefully(Duration::from_secs(1)).await;

    assert_eq!(completed.load(Ordering::SeqCst), 1);
    assert_eq!(failed.load(Ordering::SeqCst), 1);
}
