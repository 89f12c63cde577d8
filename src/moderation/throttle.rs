// Request spacing for the remote classifier.
//
// Hosted moderation endpoints rate-limit per API key. This throttle spaces
// outgoing requests to at most `requests_per_second`: each request waits
// until the previous one is at least one interval old. The orchestrator's
// timeout covers the wait, so a saturated throttle degrades to the local
// verdict instead of stalling a send.

use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

/// Shared request spacer. Cloning shares the same schedule.
#[derive(Clone)]
pub struct Throttle {
    inner: Arc<Mutex<ThrottleInner>>,
}

struct ThrottleInner {
    interval: Duration,
    last_request: Option<Instant>,
}

impl Throttle {
    /// A throttle allowing `requests_per_second` requests. Non-positive or
    /// non-finite rates disable spacing.
    pub fn new(requests_per_second: f64) -> Self {
        let interval = if requests_per_second.is_finite() && requests_per_second > 0.0 {
            Duration::from_secs_f64(1.0 / requests_per_second)
        } else {
            Duration::ZERO
        };
        Self {
            inner: Arc::new(Mutex::new(ThrottleInner {
                interval,
                last_request: None,
            })),
        }
    }

    /// Wait for this request's slot.
    pub async fn acquire(&self) {
        let mut inner = self.inner.lock().await;

        if let Some(last) = inner.last_request {
            let elapsed = last.elapsed();
            if elapsed < inner.interval {
                // Holding the lock while sleeping keeps later callers queued
                // behind this one in order
                tokio::time::sleep(inner.interval - elapsed).await;
            }
        }

        inner.last_request = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_request_is_immediate() {
        let throttle = Throttle::new(1.0);
        let start = Instant::now();
        throttle.acquire().await;
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_second_request_is_spaced() {
        let throttle = Throttle::new(10.0); // 100ms apart
        throttle.acquire().await;
        let start = Instant::now();
        throttle.acquire().await;
        let elapsed = start.elapsed();
        assert!(
            elapsed >= Duration::from_millis(80),
            "Expected ~100ms spacing, got {:?}",
            elapsed
        );
    }

    #[tokio::test]
    async fn test_zero_rate_disables_spacing() {
        let throttle = Throttle::new(0.0);
        let start = Instant::now();
        for _ in 0..20 {
            throttle.acquire().await;
        }
        assert!(start.elapsed() < Duration::from_millis(50));
    }
}
