//! One-shot, cancellable timeout.

use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Default time a client waits for a job: queue wait plus run time.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1_200_000);

/// Fires once after a fixed duration unless cancelled first.
///
/// The sleep runs on its own task, like any other timer on the event loop.
/// Cancelling aborts that task and drops the receiving end, so a fire that
/// raced with the cancel is never observed.
#[derive(Debug)]
pub struct TimeoutTimer {
    task: Option<JoinHandle<()>>,
    fired_rx: Option<oneshot::Receiver<()>>,
    fired: bool,
}

impl TimeoutTimer {
    /// Start the timer. Must be called from within a tokio runtime.
    pub fn start(duration: Duration) -> Self {
        let (tx, rx) = oneshot::channel();
        let task = tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            let _ = tx.send(());
        });
        Self {
            task: Some(task),
            fired_rx: Some(rx),
            fired: false,
        }
    }

    /// Resolves once when the timer fires. Never resolves after `cancel`, and
    /// never resolves a second time.
    ///
    /// Cancel-safe: dropping the future before it resolves keeps the timer armed.
    pub async fn fired(&mut self) {
        let Some(rx) = self.fired_rx.as_mut() else {
            return std::future::pending().await;
        };
        match rx.await {
            Ok(()) => {
                self.fired = true;
                self.fired_rx = None;
                self.task = None;
            }
            // Sender dropped without firing: the task was aborted
            Err(_) => {
                self.fired_rx = None;
                std::future::pending::<()>().await
            }
        }
    }

    /// Cancel the timer. Idempotent, and a no-op once it has fired.
    pub fn cancel(&mut self) {
        if self.fired {
            return;
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.fired_rx = None;
    }

    pub fn has_fired(&self) -> bool {
        self.fired
    }

    pub fn is_armed(&self) -> bool {
        self.fired_rx.is_some()
    }
}

impl Drop for TimeoutTimer {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_fires_after_duration() {
        let mut timer = TimeoutTimer::start(Duration::from_secs(5));
        assert!(timer.is_armed());

        let early = tokio::time::timeout(Duration::from_secs(4), timer.fired()).await;
        assert!(early.is_err());
        assert!(!timer.has_fired());

        timer.fired().await;
        assert!(timer.has_fired());
        assert!(!timer.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_timer_never_fires() {
        let mut timer = TimeoutTimer::start(Duration::from_secs(5));
        timer.cancel();
        assert!(!timer.is_armed());

        let waited = tokio::time::timeout(Duration::from_secs(60), timer.fired()).await;
        assert!(waited.is_err());
        assert!(!timer.has_fired());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_after_elapsed_but_unobserved_suppresses_fire() {
        let mut timer = TimeoutTimer::start(Duration::from_secs(1));
        tokio::time::sleep(Duration::from_secs(2)).await;

        // The sleep task has sent, but nobody observed it yet
        timer.cancel();
        let waited = tokio::time::timeout(Duration::from_secs(10), timer.fired()).await;
        assert!(waited.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_after_fire_is_noop() {
        let mut timer = TimeoutTimer::start(Duration::from_millis(10));
        timer.fired().await;
        timer.cancel();
        timer.cancel();
        assert!(timer.has_fired());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_only_once() {
        let mut timer = TimeoutTimer::start(Duration::from_millis(10));
        timer.fired().await;
        let again = tokio::time::timeout(Duration::from_secs(10), timer.fired()).await;
        assert!(again.is_err());
    }

    #[test]
    fn test_default_timeout_is_twenty_minutes() {
        assert_eq!(DEFAULT_TIMEOUT, Duration::from_secs(20 * 60));
    }
}
