//! Deadline + cancellation race for a single async operation
//!
//! `with_timeout` settles exactly once. Whichever of the operation, the
//! deadline, or the cancellation signal finishes first wins; the other two
//! futures are dropped on the spot, which disarms the timer, detaches the
//! cancellation listener, and discards any late result of the operation.

use std::future::Future;
use std::time::Duration;
use tether_foundation::{CancellationToken, Error, Result};

/// Run `operation` with a deadline and an optional cancellation signal.
///
/// - `Ok` / tool error: whatever the operation produced, if it settled first
/// - `Error::Timeout`: the deadline elapsed first
/// - `Error::Aborted`: `signal` fired first. An already-cancelled signal
///   fails immediately without invoking `operation` or arming the timer.
pub async fn with_timeout<F, Fut, T>(
    operation: F,
    timeout: Duration,
    signal: Option<&CancellationToken>,
) -> Result<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    if signal.is_some_and(|s| s.is_cancelled()) {
        return Err(Error::Aborted);
    }

    let operation = operation();

    match signal {
        Some(signal) => {
            tokio::select! {
                biased;
                _ = signal.cancelled() => Err(Error::Aborted),
                result = operation => result,
                _ = tokio::time::sleep(timeout) => Err(Error::timeout(timeout)),
            }
        }
        None => tokio::time::timeout(timeout, operation)
            .await
            .unwrap_or_else(|_| Err(Error::timeout(timeout))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tokio::time::{sleep, Instant};

    const MS: Duration = Duration::from_millis(1);

    #[tokio::test(start_paused = true)]
    async fn test_resolves_before_deadline() {
        let result = with_timeout(
            || async {
                sleep(20 * MS).await;
                Ok(42)
            },
            100 * MS,
            None,
        )
        .await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test(start_paused = true)]
    async fn test_propagates_operation_error() {
        let result: Result<()> = with_timeout(
            || async { Err(Error::Tool("broken".into())) },
            100 * MS,
            None,
        )
        .await;
        assert!(matches!(result, Err(Error::Tool(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_at_deadline_and_discards_late_result() {
        let finished = Arc::new(AtomicBool::new(false));
        let flag = finished.clone();
        let start = Instant::now();

        let result = with_timeout(
            move || async move {
                sleep(150 * MS).await;
                flag.store(true, Ordering::SeqCst);
                Ok("late")
            },
            100 * MS,
            None,
        )
        .await;

        let elapsed = start.elapsed();
        assert!(matches!(result, Err(Error::Timeout { after_ms: 100 })));
        assert!(elapsed >= 100 * MS && elapsed < 150 * MS);

        // The operation future was dropped; it never runs to completion.
        sleep(200 * MS).await;
        assert!(!finished.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_with_signal_present() {
        let signal = CancellationToken::new();
        let result: Result<()> = with_timeout(
            || async {
                sleep(Duration::from_secs(5)).await;
                Ok(())
            },
            50 * MS,
            Some(&signal),
        )
        .await;
        assert!(result.unwrap_err().is_timeout());
    }

    #[tokio::test]
    async fn test_already_cancelled_signal_skips_operation() {
        let signal = CancellationToken::new();
        signal.cancel();
        let invoked = AtomicBool::new(false);

        let result: Result<()> = with_timeout(
            || {
                invoked.store(true, Ordering::SeqCst);
                async { Ok(()) }
            },
            Duration::from_secs(10),
            Some(&signal),
        )
        .await;

        assert!(matches!(result, Err(Error::Aborted)));
        assert!(!invoked.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_signal_during_wait_aborts() {
        let signal = CancellationToken::new();
        let trigger = signal.clone();
        tokio::spawn(async move {
            sleep(30 * MS).await;
            trigger.cancel();
        });

        let start = Instant::now();
        let result: Result<()> = with_timeout(
            || async {
                sleep(Duration::from_secs(5)).await;
                Ok(())
            },
            Duration::from_secs(1),
            Some(&signal),
        )
        .await;

        assert!(result.unwrap_err().is_abort());
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
