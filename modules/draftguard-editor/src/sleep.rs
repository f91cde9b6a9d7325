use std::time::Duration;

use async_trait::async_trait;

/// Suspends the single execution path of a run. Backoff between generation
/// attempts and pauses between reachability probes both go through this seam.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real wall-clock sleeping on the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}

/// Convert a configured number of seconds into a `Duration`. Negative and
/// non-finite values clamp to zero, values too large for a `Duration`
/// saturate.
pub fn secs(value: f64) -> Duration {
    if !value.is_finite() || value <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(value).unwrap_or(Duration::MAX)
}
