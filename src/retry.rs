//! Retry decisions and backoff for failed requests.
//!
//! Rate-limited responses (429) are always retried, waiting at least as long
//! as the server's `X-RateLimit-Reset` hint. Server errors (5xx) and
//! transport failures are retried only when enabled in [`crate::Config`].
//! Everything else is surfaced to the caller straight away.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;

use crate::cancel::CancellationToken;
use crate::rate_limit::RateLimitInfo;

/// Default lower bound of the backoff window.
pub const DEFAULT_RETRY_WAIT_MIN: Duration = Duration::from_millis(100);

/// Default upper bound of the backoff window.
pub const DEFAULT_RETRY_WAIT_MAX: Duration = Duration::from_millis(400);

/// Default number of retries after the first attempt.
pub const DEFAULT_RETRY_MAX: u32 = 30;

/// What happened on one HTTP round trip.
#[derive(Debug, Clone, Copy)]
pub enum AttemptOutcome<'a> {
    /// The server answered with this status and headers.
    Response {
        status: StatusCode,
        headers: &'a HeaderMap,
    },
    /// No response was received (connection failure, timeout, ...).
    TransportError,
}

impl AttemptOutcome<'_> {
    fn status(&self) -> Option<StatusCode> {
        match self {
            AttemptOutcome::Response { status, .. } => Some(*status),
            AttemptOutcome::TransportError => None,
        }
    }
}

/// The verdict for a completed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry,
    Stop,
    /// The caller cancelled; return immediately without retrying.
    Cancelled,
}

/// Passed to the retry hook before each wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryEvent {
    /// The retry about to happen (1 for the first retry).
    pub attempt: u32,
    /// Status of the failed attempt, `None` for a transport error.
    pub status: Option<StatusCode>,
    /// How long the client will wait before retrying.
    pub delay: Duration,
}

/// Observer invoked before every retry. It cannot change the decision.
#[derive(Clone)]
pub struct RetryLogHook(Arc<dyn Fn(&RetryEvent) + Send + Sync>);

impl RetryLogHook {
    pub fn new<F>(hook: F) -> Self
    where
        F: Fn(&RetryEvent) + Send + Sync + 'static,
    {
        Self(Arc::new(hook))
    }

    pub fn call(&self, event: &RetryEvent) {
        (self.0)(event)
    }
}

impl fmt::Debug for RetryLogHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RetryLogHook")
    }
}

/// Retry configuration shared by every request of a client.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retry 5xx responses and transport errors.
    pub retry_server_errors: bool,
    /// Lower bound of the backoff window.
    pub wait_min: Duration,
    /// Upper bound of the backoff window.
    pub wait_max: Duration,
    /// Maximum number of retries after the first attempt.
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retry_server_errors: false,
            wait_min: DEFAULT_RETRY_WAIT_MIN,
            wait_max: DEFAULT_RETRY_WAIT_MAX,
            max_retries: DEFAULT_RETRY_MAX,
        }
    }
}

impl RetryPolicy {
    /// Decide whether the attempt that produced `outcome` should be retried.
    ///
    /// Does not look at the attempt count; the caller enforces
    /// [`RetryPolicy::max_retries`].
    pub fn decide(
        &self,
        cancel: Option<&CancellationToken>,
        outcome: &AttemptOutcome<'_>,
    ) -> RetryDecision {
        if cancel.is_some_and(CancellationToken::is_cancelled) {
            return RetryDecision::Cancelled;
        }

        match outcome {
            AttemptOutcome::TransportError if self.retry_server_errors => RetryDecision::Retry,
            AttemptOutcome::TransportError => RetryDecision::Stop,
            AttemptOutcome::Response { status, .. } => {
                if *status == StatusCode::TOO_MANY_REQUESTS
                    || (self.retry_server_errors && status.is_server_error())
                {
                    RetryDecision::Retry
                } else {
                    RetryDecision::Stop
                }
            }
        }
    }

    /// How long to wait before retry number `attempt` (1-indexed).
    pub fn backoff(&self, attempt: u32, outcome: &AttemptOutcome<'_>) -> Duration {
        match outcome {
            AttemptOutcome::Response { status, headers }
                if *status == StatusCode::TOO_MANY_REQUESTS =>
            {
                self.rate_limit_backoff(headers)
            }
            _ => self.linear_jitter_backoff(attempt),
        }
    }

    /// Wait for a 429: the reset hint (if longer than `wait_min`) plus jitter.
    fn rate_limit_backoff(&self, headers: &HeaderMap) -> Duration {
        let mut min = self.wait_min;
        if let Some(reset) = RateLimitInfo::from_headers(headers).reset_after {
            if reset > min {
                min = reset;
            }
        }
        min + jitter(self.wait_max.saturating_sub(self.wait_min))
    }

    /// `wait_min * attempt` plus up to `(wait_max - wait_min) * attempt` of jitter.
    fn linear_jitter_backoff(&self, attempt: u32) -> Duration {
        let attempt = attempt.max(1);
        let base = self.wait_min.saturating_mul(attempt);
        if self.wait_max <= self.wait_min {
            return base;
        }
        base + jitter(self.wait_max - self.wait_min).saturating_mul(attempt)
    }

    /// Build the event reported to the retry hook.
    pub fn event(&self, attempt: u32, outcome: &AttemptOutcome<'_>, delay: Duration) -> RetryEvent {
        RetryEvent {
            attempt,
            status: outcome.status(),
            delay,
        }
    }
}

fn jitter(window: Duration) -> Duration {
    if window.is_zero() {
        return Duration::ZERO;
    }
    window.mul_f64(rand::thread_rng().gen_range(0.0..1.0))
}
