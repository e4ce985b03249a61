use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Token bucket shared by every clone.
///
/// The bucket holds at most one token, so requests are spaced evenly at
/// `requests_per_min` from the very first call instead of bursting.
#[derive(Clone, Debug)]
pub struct RateLimiter {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    requests_per_min: Option<u64>,
    // tokens available and time of last refill
    rpm_tokens: Mutex<(f64, Instant)>,
}

const BURST: f64 = 1.0;

impl RateLimiter {
    /// 0 means unlimited.
    pub fn per_minute(requests_per_min: u64) -> Self {
        Self {
            inner: Arc::new(Inner {
                requests_per_min: (requests_per_min > 0).then_some(requests_per_min),
                rpm_tokens: Mutex::new((BURST, Instant::now())),
            }),
        }
    }

    /// Waits until the next request may go out.
    pub async fn acquire(&self) {
        if let Some(rpm) = self.inner.requests_per_min {
            self.consume_token(rpm as f64 / 60.0).await;
        }
    }

    async fn consume_token(&self, refill_per_sec: f64) {
        // Refill continuously, wait until a whole token has accumulated
        loop {
            let mut guard = self.inner.rpm_tokens.lock().await;
            let (ref mut tokens, ref mut last) = *guard;
            let now = Instant::now();
            let elapsed = now.duration_since(*last).as_secs_f64();
            *tokens = (*tokens + elapsed * refill_per_sec).min(BURST);
            *last = now;
            if *tokens >= 1.0 {
                *tokens -= 1.0;
                break;
            }
            let secs = (1.0 - *tokens) / refill_per_sec;
            drop(guard);
            tokio::time::sleep(Duration::from_secs_f64(secs.max(0.001))).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unlimited_never_waits() {
        let limiter = RateLimiter::per_minute(0);
        let start = Instant::now();
        for _ in 0..100 {
            limiter.acquire().await;
        }
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_first_request_is_immediate() {
        let limiter = RateLimiter::per_minute(60);
        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_requests_are_spaced_from_the_start() {
        // 120/min is one token every 500ms; three requests need two refills
        let limiter = RateLimiter::per_minute(120);
        let start = Instant::now();
        for _ in 0..3 {
            limiter.acquire().await;
        }
        assert!(start.elapsed() >= Duration::from_millis(950));
    }

    #[tokio::test]
    async fn test_clones_share_one_bucket() {
        let limiter = RateLimiter::per_minute(120);
        let other = limiter.clone();
        let start = Instant::now();
        limiter.acquire().await;
        other.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(450));
    }

    #[tokio::test]
    async fn test_idle_time_does_not_bank_a_burst() {
        let limiter = RateLimiter::per_minute(120);
        limiter.acquire().await;
        tokio::time::sleep(Duration::from_millis(1200)).await;
        let start = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(450));
    }
}
