//! Token bucket rate limiter for gateway request throttling.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

/// Token bucket rate limiter.
///
/// Tokens refill continuously based on elapsed time; capacity equals
/// the refill rate, allowing a one-second burst.
#[derive(Clone)]
pub struct TokenBucketRateLimiter {
    /// Current number of available tokens
    tokens: Arc<Mutex<f64>>,
    /// Maximum token capacity
    capacity: f64,
    /// Tokens added per second
    refill_rate: f64,
    /// Last time tokens were refilled
    last_refill: Arc<Mutex<Instant>>,
}

impl TokenBucketRateLimiter {
    /// Create a new rate limiter allowing `rate_limit_rps` sustained
    /// requests per second.
    pub fn new(rate_limit_rps: f64) -> Self {
        assert!(rate_limit_rps > 0.0, "Rate limit must be positive");

        Self {
            tokens: Arc::new(Mutex::new(rate_limit_rps)),
            capacity: rate_limit_rps,
            refill_rate: rate_limit_rps,
            last_refill: Arc::new(Mutex::new(Instant::now())),
        }
    }

    /// Acquire a token from the bucket, waiting if necessary.
    pub async fn acquire(&self) {
        loop {
            let mut tokens = self.tokens.lock().await;
            let mut last_refill = self.last_refill.lock().await;

            let now = Instant::now();
            let elapsed = now.duration_since(*last_refill).as_secs_f64();
            let new_tokens = (*tokens + elapsed * self.refill_rate).min(self.capacity);

            if new_tokens >= 1.0 {
                *tokens = new_tokens - 1.0;
                *last_refill = now;
                break;
            }

            let tokens_needed = 1.0 - new_tokens;
            let wait_time_secs = tokens_needed / self.refill_rate;
            let wait_duration = Duration::from_secs_f64(wait_time_secs.max(0.01));

            // Release locks before sleeping
            drop(tokens);
            drop(last_refill);

            sleep(wait_duration).await;
        }
    }

    /// Get the current number of available tokens (for testing/monitoring)
    pub async fn available_tokens(&self) -> f64 {
        let tokens = self.tokens.lock().await;
        let last_refill = self.last_refill.lock().await;

        let now = Instant::now();
        let elapsed = now.duration_since(*last_refill).as_secs_f64();
        (*tokens + elapsed * self.refill_rate).min(self.capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rate_limiter_allows_initial_requests() {
        let rate_limiter = TokenBucketRateLimiter::new(10.0);

        rate_limiter.acquire().await;
        rate_limiter.acquire().await;
        rate_limiter.acquire().await;

        let tokens = rate_limiter.available_tokens().await;
        assert!(tokens < 10.0);
    }

    #[tokio::test]
    async fn test_rate_limiter_enforces_delay() {
        let rate_limiter = TokenBucketRateLimiter::new(2.0);

        rate_limiter.acquire().await;
        rate_limiter.acquire().await;

        let start = Instant::now();
        rate_limiter.acquire().await;
        let elapsed = start.elapsed();

        // Should wait approximately 0.5 seconds (1/rate)
        assert!(
            elapsed >= Duration::from_millis(400),
            "Expected delay >= 400ms, got {elapsed:?}"
        );
    }

    #[tokio::test]
    async fn test_rate_limiter_respects_capacity() {
        let rate_limiter = TokenBucketRateLimiter::new(5.0);

        sleep(Duration::from_millis(1200)).await;

        let tokens = rate_limiter.available_tokens().await;
        assert!(tokens <= 5.0, "Tokens ({tokens}) exceeded capacity (5.0)");
    }
}
