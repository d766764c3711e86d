//! Client-side rate limiting and rate-limit header parsing.
//!
//! The API advertises its request budget in `X-RateLimit-Limit`. The client
//! turns that into a token bucket (two thirds of the limit as the sustained
//! rate, one third as burst) which every outgoing attempt draws from.

use std::num::NonZeroU32;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter as Governor};
use reqwest::header::HeaderMap;

/// Header carrying the advertised requests-per-second limit.
pub const HEADER_RATE_LIMIT: &str = "x-ratelimit-limit";

/// Header carrying the seconds until the current rate-limit window resets.
pub const HEADER_RATE_RESET: &str = "x-ratelimit-reset";

/// Information extracted from rate limit headers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateLimitInfo {
    /// Advertised request limit per second.
    pub limit: Option<f64>,
    /// Time until the rate-limit window resets.
    pub reset_after: Option<Duration>,
}

impl RateLimitInfo {
    /// Extracts rate limit information from HTTP response headers.
    ///
    /// Unparseable or non-positive values are treated as absent.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let limit = parse_positive_float(headers, HEADER_RATE_LIMIT);
        let reset_after = parse_positive_float(headers, HEADER_RATE_RESET)
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok());

        Self { limit, reset_after }
    }
}

fn parse_positive_float(headers: &HeaderMap, name: &str) -> Option<f64> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite() && *v > 0.0)
}

/// A configured limiter and the settings it was built from.
struct Active {
    rate: f64,
    burst: u32,
    governor: Arc<DefaultDirectRateLimiter>,
}

impl std::fmt::Debug for Active {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Active")
            .field("rate", &self.rate)
            .field("burst", &self.burst)
            .finish_non_exhaustive()
    }
}

/// Token-bucket limiter shared by every request of a client.
///
/// An unconfigured limiter never blocks. Reconfiguring swaps in a fresh
/// bucket; waiters already queued on the old one finish against it.
#[derive(Debug, Default)]
pub struct RateLimiter {
    active: Mutex<Option<Active>>,
}

impl RateLimiter {
    /// Create an unlimited limiter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a limiter for an advertised limit of `limit` requests per second.
    pub fn with_limit(limit: f64) -> Self {
        Self {
            active: Mutex::new(Self::build(limit)),
        }
    }

    /// Reconfigure from an advertised limit.
    ///
    /// A missing or non-positive limit makes the limiter unlimited.
    pub fn configure(&self, limit: Option<f64>) {
        let active = limit.and_then(Self::build);
        match &active {
            Some(a) => tracing::debug!(rate = a.rate, burst = a.burst, "configured rate limiter"),
            None => tracing::debug!("rate limiter disabled"),
        }
        *self.lock() = active;
    }

    /// Two thirds of the limit as the sustained rate, a third as burst.
    fn build(limit: f64) -> Option<Active> {
        if !limit.is_finite() || limit <= 0.0 {
            return None;
        }
        let rate = limit * 2.0 / 3.0;
        let burst = NonZeroU32::new((limit / 3.0).floor() as u32).unwrap_or(NonZeroU32::MIN);

        let period = Duration::try_from_secs_f64(1.0 / rate).ok()?;
        let quota = Quota::with_period(period)?.allow_burst(burst);

        Some(Active {
            rate,
            burst: burst.get(),
            governor: Arc::new(Governor::direct(quota)),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Option<Active>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The `(rate, burst)` pair in effect, or `None` when unlimited.
    pub fn settings(&self) -> Option<(f64, f64)> {
        self.lock().as_ref().map(|a| (a.rate, f64::from(a.burst)))
    }

    /// Wait until a request slot is available, then take it.
    pub async fn acquire(&self) {
        let governor = self.lock().as_ref().map(|a| Arc::clone(&a.governor));
        if let Some(governor) = governor {
            governor.until_ready().await;
        }
    }
}
