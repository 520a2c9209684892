use std::time::Duration;
use tokio::time::sleep;

/// Fixed delay between consecutive delete calls
///
/// Purely time based; the caller yields to the runtime while waiting.
#[derive(Debug, Clone, Copy)]
pub struct RateLimiter {
    interval: Duration,
}

impl RateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Suspend the caller for the configured interval
    pub async fn wait(&self) {
        if !self.interval.is_zero() {
            sleep(self.interval).await;
        }
    }
}
