use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::errors::ProbeError;

/// Single arbiter of dispatch timing, shared by every worker.
///
/// The lock is held across the wait and the slot is stamped after waking,
/// so consecutive grants are at least `interval` apart no matter how many
/// workers contend or how long their responses take.
#[derive(Clone)]
pub struct RateGate {
    interval: Duration,
    last_grant: Arc<Mutex<Option<Instant>>>,
}

impl RateGate {
    /// `interval` is the minimum spacing between grants, usually
    /// [`RuntimePolicy::dispatch_interval`](crate::config::RuntimePolicy::dispatch_interval).
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_grant: Arc::new(Mutex::new(None)),
        }
    }

    /// Wait for the next dispatch slot. Returns the instant the slot was
    /// granted, or [`ProbeError::Cancelled`] if a stop was requested before
    /// or during the wait.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Result<Instant, ProbeError> {
        if cancel.is_cancelled() {
            return Err(ProbeError::Cancelled);
        }

        let mut last = tokio::select! {
            _ = cancel.cancelled() => return Err(ProbeError::Cancelled),
            guard = self.last_grant.lock() => guard,
        };

        if let Some(previous) = *last {
            let ready_at = previous + self.interval;
            if Instant::now() < ready_at {
                tokio::select! {
                    _ = cancel.cancelled() => return Err(ProbeError::Cancelled),
                    _ = tokio::time::sleep_until(ready_at) => {}
                }
            }
        }

        // Stop requests that land while queued on the lock still win.
        if cancel.is_cancelled() {
            return Err(ProbeError::Cancelled);
        }

        let granted = Instant::now();
        *last = Some(granted);
        Ok(granted)
    }
}
