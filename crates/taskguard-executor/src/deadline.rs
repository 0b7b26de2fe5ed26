use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Output of a future run under [`run_with_deadline`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadlineOutcome<T> {
    /// What the future returned.
    pub output: T,
    /// Whether the deadline passed before the future returned.
    pub exceeded: bool,
}

/// Drives `fut` to completion, cancelling `token` once `deadline` elapses.
///
/// Cancellation is cooperative: the future keeps running after the deadline
/// until it observes the token or finishes on its own.
pub async fn run_with_deadline<F>(
    fut: F,
    token: CancellationToken,
    deadline: Duration,
) -> DeadlineOutcome<F::Output>
where
    F: Future,
{
    tokio::pin!(fut);
    let timer = tokio::time::sleep(deadline);
    tokio::pin!(timer);

    tokio::select! {
        biased;
        output = &mut fut => {
            return DeadlineOutcome { output, exceeded: false };
        }
        _ = &mut timer => token.cancel(),
    }

    DeadlineOutcome {
        output: fut.await,
        exceeded: true,
    }
}
