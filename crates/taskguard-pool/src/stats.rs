use std::time::{Duration, SystemTime};

/// Snapshot of a [`Pool`](crate::Pool)'s counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PoolStats {
    /// Jobs accepted into the queue.
    pub total_jobs: u64,
    /// Jobs that returned `Ok`.
    pub completed_jobs: u64,
    /// Jobs that returned an error, panicked or never started.
    pub failed_jobs: u64,
    /// Finished jobs, successful or not, that ran past their deadline.
    pub timed_out_jobs: u64,
    /// Workers currently running a job.
    pub active_workers: usize,
    /// Workers still alive.
    pub live_workers: usize,
    /// Jobs waiting in the queue.
    pub queued_jobs: usize,
    /// When the most recent job finished.
    pub last_job_time: Option<SystemTime>,
    /// Mean duration of finished jobs.
    pub average_job_time: Duration,
}

impl PoolStats {
    /// Jobs that have finished, one way or another.
    pub fn finished_jobs(&self) -> u64 {
        self.completed_jobs + self.failed_jobs
    }

    pub(crate) fn record(&mut self, duration: Duration, succeeded: bool, timed_out: bool) {
        let n = u128::from(self.finished_jobs());
        let average = (self.average_job_time.as_nanos() * n + duration.as_nanos()) / (n + 1);
        self.average_job_time = Duration::from_nanos(u64::try_from(average).unwrap_or(u64::MAX));

        if succeeded {
            self.completed_jobs += 1;
        } else {
            self.failed_jobs += 1;
        }
        if timed_out {
            self.timed_out_jobs += 1;
        }
        self.last_job_time = Some(SystemTime::now());
    }
}
