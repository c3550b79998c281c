//! Token-bucket rate limiter
//!
//! Throttles call submission independently of worker count: raising the
//! thread count never raises the remote request rate past the configured
//! ceiling.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

/// Shared token bucket; one token per remote call
pub struct RateLimiter {
    rate_per_second: f64,
    burst: f64,
    state: Mutex<BucketState>,
}

impl RateLimiter {
    /// Limiter allowing `rate_per_second` sustained calls with a burst of
    /// the same size (minimum one).
    pub fn new(rate_per_second: f64) -> Self {
        let rate = rate_per_second.max(0.001);
        let burst = rate.max(1.0);
        Self {
            rate_per_second: rate,
            burst,
            state: Mutex::new(BucketState {
                tokens: burst,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Wait until a token is available, then consume it
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut state = self.state.lock().await;
                let now = Instant::now();
                let elapsed = now.duration_since(state.last_refill).as_secs_f64();
                state.tokens = (state.tokens + elapsed * self.rate_per_second).min(self.burst);
                state.last_refill = now;
                if state.tokens >= 1.0 {
                    state.tokens -= 1.0;
                    return;
                }
                Duration::from_secs_f64((1.0 - state.tokens) / self.rate_per_second)
            };
            tokio::time::sleep(wait).await;
        }
    }
}
