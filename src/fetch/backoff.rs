//! Linear backoff for the origin's rate-limit signal.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

/// Something that can suspend the caller for a while.
///
/// Production code sleeps on the tokio timer; tests substitute an
/// implementation that records the requested durations and returns at once.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Records requested sleeps without waiting.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    slept: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every duration requested so far, in order.
    #[must_use]
    pub fn slept(&self) -> Vec<Duration> {
        self.slept
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        if let Ok(mut guard) = self.slept.lock() {
            guard.push(duration);
        }
    }
}

/// How a fetch reacts to the rate-limit signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Added to the wait on every consecutive throttle of one call.
    pub step: Duration,
    /// Give up after this many throttles. `None` retries forever.
    pub max_retries: Option<u32>,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            step: Duration::from_secs(10),
            max_retries: None,
        }
    }
}

/// Wait accumulated by one fetch call while the origin keeps throttling it.
///
/// The wait only grows: each throttle adds one `step`, so consecutive
/// throttles wait `step`, `2 * step`, `3 * step`, and so on.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    step: Duration,
    wait: Duration,
    throttles: u32,
}

impl RateLimitState {
    #[must_use]
    pub fn new(step: Duration) -> Self {
        Self {
            step,
            wait: Duration::ZERO,
            throttles: 0,
        }
    }

    /// Register one throttle signal and return how long to wait before retrying.
    pub fn throttled(&mut self) -> Duration {
        self.throttles = self.throttles.saturating_add(1);
        self.wait = self.wait.saturating_add(self.step);
        self.wait
    }

    /// Current wait.
    #[must_use]
    pub fn wait(&self) -> Duration {
        self.wait
    }

    /// Number of throttle signals seen so far.
    #[must_use]
    pub fn throttles(&self) -> u32 {
        self.throttles
    }

    /// Whether `policy` allows another retry.
    #[must_use]
    pub fn may_retry(&self, policy: &BackoffPolicy) -> bool {
        policy.max_retries.map_or(true, |max| self.throttles <= max)
    }
}
