use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::types::ProbeError;

/// Retry configuration for a single dispatch.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryConfig {
    /// Backoff before retry number `attempt` (0-indexed).
    ///
    /// `base * (2^attempt + jitter)` with jitter in [0, 1), capped at
    /// `max_delay`. Because `2^n + 1 <= 2^(n+1)` the sequence never
    /// decreases, jitter included.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let base = self.base_delay.as_secs_f64();
        let exp: f64 = 2.0_f64.powi(attempt.min(30) as i32);
        let jitter: f64 = rand::random::<f64>();
        let secs = (base * (exp + jitter)).min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(secs.max(0.0))
    }
}

/// What a retried operation produced, and how many tries it took.
#[derive(Debug)]
pub struct RetryOutcome<T> {
    pub result: Result<T, ProbeError>,
    pub tries: u32,
}

/// Execute an async operation with retry logic.
///
/// Retries only if the error is classified as retryable and `max_retries`
/// has not been exceeded. A cancelled token aborts the backoff wait with
/// [`ProbeError::Cancelled`].
pub async fn with_retry<F, Fut, T>(
    operation_name: &str,
    config: &RetryConfig,
    cancel: &CancellationToken,
    mut factory: F,
) -> RetryOutcome<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, ProbeError>>,
{
    let max_attempts = config.max_retries + 1;
    let mut attempt = 0;

    loop {
        let err = match factory(attempt).await {
            Ok(result) => return RetryOutcome { result: Ok(result), tries: attempt + 1 },
            Err(e) => e,
        };

        let classification = err.classify();
        if !classification.retryable || attempt + 1 >= max_attempts {
            if !classification.retryable {
                warn!(
                    operation = operation_name,
                    error_type = classification.error_type,
                    error = %err,
                    "Non-retryable error, failing immediately"
                );
            } else {
                warn!(
                    operation = operation_name,
                    attempt = attempt + 1,
                    max = max_attempts,
                    error = %err,
                    "Max retries exhausted"
                );
            }
            return RetryOutcome { result: Err(err), tries: attempt + 1 };
        }

        let delay = config.backoff_delay(attempt);
        warn!(
            operation = operation_name,
            attempt = attempt + 1,
            max = max_attempts,
            error_type = classification.error_type,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "Retrying after error"
        );

        tokio::select! {
            _ = cancel.cancelled() => {
                return RetryOutcome { result: Err(ProbeError::Cancelled), tries: attempt + 1 };
            }
            _ = tokio::time::sleep(delay) => {}
        }
        attempt += 1;
    }
}
