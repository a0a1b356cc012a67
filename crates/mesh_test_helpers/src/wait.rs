//! Polling helpers for asynchronous assertions
//!
//! Mesh nodes run on their own tasks, so tests observe convergence by
//! polling a condition until it holds or a deadline passes.

use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Generous upper bound for in-memory mesh convergence
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Poll `check` until it returns `true` or `timeout` elapses.
///
/// Returns whether the condition was met, so callers can attach their own
/// assertion message.
///
/// # Example
///
/// ```rust,no_run
/// use mesh_test_helpers::wait::eventually;
/// use std::time::Duration;
///
/// # async fn demo() {
/// let met = eventually(Duration::from_millis(50), || async { true }).await;
/// assert!(met);
/// # }
/// ```
pub async fn eventually<F, Fut>(timeout: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if check().await {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        sleep(POLL_INTERVAL).await;
    }
}

/// Let spawned tasks drain their queues without asserting anything.
pub async fn settle() {
    sleep(Duration::from_millis(50)).await;
}
