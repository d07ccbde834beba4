//! Recurring job scheduler.
//!
//! Thin abstraction over tokio interval tasks. Jobs are independent: they
//! share nothing but the store handles their closures capture, so
//! overlapping runs are tolerated. A stopped job finishes its current
//! iteration; there is no mid-sweep cancellation.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::info;

/// Handle to a spawned recurring job.
pub struct JobHandle {
    name: &'static str,
    running: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl JobHandle {
    /// Signal the job to stop after its current iteration.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        info!(job = self.name, "recurring job stop requested");
    }

    /// Whether the job loop is still scheduled.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst) && !self.handle.is_finished()
    }

    /// Abort the task outright. Tests only; production jobs stop
    /// cooperatively via [`stop`](Self::stop).
    pub fn abort(&self) {
        self.handle.abort();
    }
}

/// Spawn a job that runs `job` every `interval`.
///
/// The first tick fires immediately, matching `tokio::time::interval`
/// semantics.
pub fn spawn_recurring<F, Fut>(name: &'static str, interval: Duration, job: F) -> JobHandle
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    let running = Arc::new(AtomicBool::new(true));
    let flag = running.clone();

    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            if !flag.load(Ordering::SeqCst) {
                break;
            }
            job().await;
        }
    });

    info!(job = name, interval_secs = interval.as_secs(), "recurring job started");
    JobHandle {
        name,
        running,
        handle,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test]
    async fn job_runs_repeatedly_until_stopped() {
        let counter = Arc::new(AtomicUsize::new(0));
        let seen = counter.clone();
        let handle = spawn_recurring("test", Duration::from_millis(10), move || {
            let seen = seen.clone();
            async move {
                seen.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_millis(55)).await;
        handle.stop();
        let after_stop = counter.load(Ordering::SeqCst);
        assert!(after_stop >= 2, "expected at least 2 runs, got {after_stop}");

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(counter.load(Ordering::SeqCst) <= after_stop + 1);
        handle.abort();
    }
}
