use std::num::NonZeroU32;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use governor::clock::DefaultClock;
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};

use crate::provider_policy::ProviderPolicy;

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Per-adapter outbound request gate.
///
/// Combines a sliding-window quota (governor) with a minimum inter-request
/// spacing, and hands out the backoff delay for the single retry an adapter
/// is allowed after an upstream HTTP 429. One gate instance is owned by one
/// adapter; the spacing bookkeeping is serialized behind a mutex.
#[derive(Clone)]
pub struct RateGate {
    limiter: Arc<DirectRateLimiter>,
    last_request: Arc<Mutex<Option<Instant>>>,
    min_spacing: Duration,
    rate_limit_backoff: Duration,
}

impl RateGate {
    pub fn new(quota_window: Duration, quota_limit: u32, min_spacing: Duration, rate_limit_backoff: Duration) -> Self {
        let quota = quota_from_window(quota_window, quota_limit);
        Self {
            limiter: Arc::new(RateLimiter::direct(quota)),
            last_request: Arc::new(Mutex::new(None)),
            min_spacing,
            rate_limit_backoff,
        }
    }

    pub fn from_policy(policy: &ProviderPolicy) -> Self {
        Self::new(
            policy.quota_window,
            policy.quota_limit,
            policy.min_spacing,
            policy.rate_limit_backoff,
        )
    }

    /// Waits out the minimum inter-request spacing, then acquires quota.
    /// Returns the recommended retry delay when the window is exhausted.
    pub async fn acquire(&self) -> Result<(), Duration> {
        let wait = {
            let mut last = self
                .last_request
                .lock()
                .expect("rate gate lock is not poisoned");
            let now = Instant::now();
            // `prev` is the slot granted to the previous request, which may
            // still be in the future when callers queue up faster than the
            // spacing allows.
            let wait = match *last {
                Some(prev) => (prev + self.min_spacing).saturating_duration_since(now),
                None => Duration::ZERO,
            };
            *last = Some(now + wait);
            wait
        };

        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }

        if self.limiter.check().is_ok() {
            Ok(())
        } else {
            Err(self.rate_limit_backoff)
        }
    }

    /// Delay before the one retry allowed after an upstream 429.
    pub const fn retry_backoff(&self) -> Duration {
        self.rate_limit_backoff
    }
}

fn quota_from_window(quota_window: Duration, quota_limit: u32) -> Quota {
    let safe_limit = quota_limit.max(1);
    let burst = NonZeroU32::new(safe_limit).expect("safe limit must be non-zero");

    let seconds_per_cell = (quota_window.as_secs_f64() / f64::from(safe_limit)).max(0.001);
    let period = Duration::from_secs_f64(seconds_per_cell);

    Quota::with_period(period)
        .expect("period is always greater than zero")
        .allow_burst(burst)
}
