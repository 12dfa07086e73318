use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

/// Whether an error should be retried or treated as fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDisposition {
    Retry,
    Stop,
}

/// The outcome of running an operation under `RetryHarness::run`.
#[derive(Debug)]
pub enum RetryOutcome<T, E> {
    /// The operation succeeded.
    Success(T),
    /// The error was fatal and bubbled up immediately.
    Fatal(E),
    /// The error was retryable but the attempt budget was exhausted.
    AttemptsExceeded(E),
    /// The supplied cancellation token fired before the operation
    /// succeeded or exhausted its attempts.
    Cancelled,
}

/// Executes a unit of work under exponential backoff bounded by attempt
/// count and a wall-clock cap, cancellable by an externally supplied token.
/// The harness never retries an operation that has already
/// partially succeeded — callers must design each retried unit to be
/// idempotent, which the commit protocol achieves via the per-attempt
/// batch id, the event-id uniqueness constraint, and the offset upsert's
/// non-regressing position.
#[derive(Debug, Clone)]
pub struct RetryHarness {
    pub max_attempts: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryHarness {
    fn default() -> Self {
        Self::new(5, Duration::from_millis(100), Duration::from_secs(10))
    }
}

impl RetryHarness {
    pub fn new(max_attempts: usize, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay: if max_delay.is_zero() { base_delay } else { max_delay },
        }
    }

    /// Runs `op` at most `max_attempts + 1` times (an initial try plus up
    /// to `max_attempts` retries), sleeping `min(base*2^i, max_delay)`
    /// between attempts.
    pub async fn run<F, Fut, T, E, Classifier>(
        &self,
        cancel: &CancellationToken,
        mut op: F,
        classify: Classifier,
    ) -> RetryOutcome<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        Classifier: Fn(&E) -> RetryDisposition,
    {
        let mut attempt = 0usize;

        loop {
            if cancel.is_cancelled() {
                return RetryOutcome::Cancelled;
            }

            match op().await {
                Ok(value) => return RetryOutcome::Success(value),
                Err(err) => match classify(&err) {
                    RetryDisposition::Stop => return RetryOutcome::Fatal(err),
                    RetryDisposition::Retry => {
                        if attempt + 1 >= self.max_attempts {
                            return RetryOutcome::AttemptsExceeded(err);
                        }

                        let delay = self.backoff_delay(attempt);
                        tokio::select! {
                            _ = cancel.cancelled() => return RetryOutcome::Cancelled,
                            _ = sleep(delay) => {}
                        }
                        attempt += 1;
                    }
                },
            }
        }
    }

    fn backoff_delay(&self, attempt: usize) -> Duration {
        if self.base_delay.is_zero() {
            return Duration::from_millis(0);
        }

        let factor = 1u128 << attempt.min(10);
        let delay_ms = self.base_delay.as_millis().saturating_mul(factor);
        Duration::from_millis(delay_ms.min(self.max_delay.as_millis()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Debug, Clone)]
    struct TestError(&'static str);

    #[tokio::test]
    async fn retries_transient_failure_then_succeeds() {
        let harness = RetryHarness::new(5, Duration::from_millis(0), Duration::from_millis(0));
        let attempts = Arc::new(AtomicUsize::new(0));
        let cancel = CancellationToken::new();
        let op_attempts = attempts.clone();

        let result = harness
            .run(
                &cancel,
                move || {
                    let op_attempts = op_attempts.clone();
                    async move {
                        let attempt = op_attempts.fetch_add(1, Ordering::SeqCst);
                        if attempt < 3 {
                            Err(TestError("transient"))
                        } else {
                            Ok::<&'static str, TestError>("done")
                        }
                    }
                },
                |_| RetryDisposition::Retry,
            )
            .await;

        assert!(matches!(result, RetryOutcome::Success("done")));
        assert_eq!(attempts.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn exhausts_attempts_on_permanent_transient_failure() {
        let harness = RetryHarness::new(3, Duration::from_millis(0), Duration::from_millis(0));
        let cancel = CancellationToken::new();
        let attempts = Arc::new(AtomicUsize::new(0));
        let op_attempts = attempts.clone();

        let result = harness
            .run(
                &cancel,
                move || {
                    let op_attempts = op_attempts.clone();
                    async move {
                        op_attempts.fetch_add(1, Ordering::SeqCst);
                        Err::<(), TestError>(TestError("transient"))
                    }
                },
                |_| RetryDisposition::Retry,
            )
            .await;

        assert!(matches!(result, RetryOutcome::AttemptsExceeded(TestError("transient"))));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn stops_immediately_on_terminal_error() {
        let harness = RetryHarness::default();
        let cancel = CancellationToken::new();
        let attempts = Arc::new(AtomicUsize::new(0));
        let op_attempts = attempts.clone();

        let result = harness
            .run(
                &cancel,
                move || {
                    let op_attempts = op_attempts.clone();
                    async move {
                        op_attempts.fetch_add(1, Ordering::SeqCst);
                        Err::<(), TestError>(TestError("terminal"))
                    }
                },
                |_| RetryDisposition::Stop,
            )
            .await;

        assert!(matches!(result, RetryOutcome::Fatal(TestError("terminal"))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancellation_short_circuits_retries() {
        let harness = RetryHarness::new(5, Duration::from_secs(30), Duration::from_secs(30));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result: RetryOutcome<(), TestError> = harness
            .run(&cancel, || async { Err(TestError("transient")) }, |_| RetryDisposition::Retry)
            .await;

        assert!(matches!(result, RetryOutcome::Cancelled));
    }
}
