//! Outbound send throttling.
//!
//! A sliding-log limiter: the instants of the last `max_per_period` grants
//! are kept, and a new grant is only handed out once the oldest of them is
//! at least `period` in the past. Any window of length `period` therefore
//! contains at most `max_per_period` grants.
//!
//! Callers wait on a FIFO-fair async mutex, so grants are handed out in
//! arrival order and no worker starves.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, trace};

/// Throttle configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Sends allowed per period
    pub max_per_period: u32,
    /// Window length
    pub period: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_per_period: 1,
            period: Duration::from_millis(1000),
        }
    }
}

impl RateLimitConfig {
    pub fn new(max_per_period: u32, period: Duration) -> Self {
        Self {
            max_per_period,
            period,
        }
    }
}

/// Blocking rate limiter shared by all outbound workers.
#[derive(Debug)]
pub struct RateLimiter {
    limit: usize,
    period: Duration,
    grants: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// A limit of zero is treated as one.
    pub fn new(config: RateLimitConfig) -> Self {
        let limit = config.max_per_period.max(1) as usize;
        Self {
            limit,
            period: config.period,
            grants: Mutex::new(VecDeque::with_capacity(limit)),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Wait until a send slot is free and take it.
    pub async fn acquire(&self) {
        let mut grants = self.grants.lock().await;

        loop {
            let now = Instant::now();
            while let Some(&oldest) = grants.front() {
                if now.duration_since(oldest) >= self.period {
                    grants.pop_front();
                } else {
                    break;
                }
            }

            if grants.len() < self.limit {
                grants.push_back(now);
                trace!(in_window = grants.len(), "send slot granted");
                return;
            }

            if let Some(&oldest) = grants.front() {
                let ready_at = oldest + self.period;
                debug!(
                    wait_ms = ready_at.duration_since(now).as_millis() as u64,
                    "throttling send"
                );
                sleep_until(ready_at).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_spacing_with_single_slot() {
        let limiter = RateLimiter::new(RateLimitConfig::new(1, Duration::from_millis(1000)));
        let start = Instant::now();

        let mut granted = Vec::new();
        for _ in 0..3 {
            limiter.acquire().await;
            granted.push(start.elapsed());
        }

        assert_eq!(granted[0], Duration::ZERO);
        assert!(granted[1] >= Duration::from_millis(1000));
        assert!(granted[2] - granted[1] >= Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_within_limit() {
        let limiter = RateLimiter::new(RateLimitConfig::new(3, Duration::from_millis(500)));
        let start = Instant::now();

        for _ in 0..3 {
            limiter.acquire().await;
        }
        assert_eq!(start.elapsed(), Duration::ZERO);

        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_bound_across_tasks() {
        let limiter = Arc::new(RateLimiter::new(RateLimitConfig::new(
            2,
            Duration::from_millis(1000),
        )));
        let start = Instant::now();

        let mut handles = Vec::new();
        for _ in 0..6 {
            let limiter = limiter.clone();
            handles.push(tokio::spawn(async move {
                limiter.acquire().await;
                start.elapsed()
            }));
        }

        let mut times = Vec::new();
        for handle in handles {
            times.push(handle.await.unwrap());
        }
        times.sort();

        // no three grants fit inside one window
        for w in times.windows(3) {
            assert!(w[2] - w[0] >= Duration::from_millis(1000));
        }
    }

    #[test]
    fn test_zero_limit_clamped() {
        let limiter = RateLimiter::new(RateLimitConfig::new(0, Duration::from_millis(10)));
        assert_eq!(limiter.limit(), 1);
    }
}
