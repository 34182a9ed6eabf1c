//! Linear backoff policy
//!
//! Provides the delay schedule used when an upstream call fails and the
//! caller wants to slow down before trying the next unit of work.
//!
//! # Examples
//!
//! ```
//! use gifguess_core::retry::BackoffPolicy;
//! use std::time::Duration;
//!
//! let policy = BackoffPolicy::default();
//! assert_eq!(policy.delay(1), Duration::from_millis(500));
//! assert_eq!(policy.delay(2), Duration::from_millis(1000));
//! assert_eq!(policy.delay(5), Duration::from_millis(1500));
//! ```

use std::time::Duration;
use tokio::time::sleep;

/// Backoff policy: `delay = min(base * attempts, cap)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Delay added per consecutive failed attempt
    pub base: Duration,

    /// Upper bound on any single delay
    pub cap: Duration,
}

impl Default for BackoffPolicy {
    /// - base: 500ms
    /// - cap: 1500ms
    fn default() -> Self {
        Self {
            base: Duration::from_millis(500),
            cap: Duration::from_millis(1500),
        }
    }
}

impl BackoffPolicy {
    /// Creates a new backoff policy
    ///
    /// # Examples
    ///
    /// ```
    /// use gifguess_core::retry::BackoffPolicy;
    /// use std::time::Duration;
    ///
    /// let policy = BackoffPolicy::new(Duration::from_millis(200), Duration::from_secs(1));
    /// assert_eq!(policy.delay(3), Duration::from_millis(600));
    /// ```
    pub fn new(base: Duration, cap: Duration) -> Self {
        Self { base, cap }
    }

    /// Builds a policy from millisecond values, as stored in configuration
    pub fn from_millis(base_ms: u64, cap_ms: u64) -> Self {
        Self::new(Duration::from_millis(base_ms), Duration::from_millis(cap_ms))
    }

    /// Delay after `attempts` consecutive failures
    ///
    /// Zero attempts means no delay.
    pub fn delay(&self, attempts: u32) -> Duration {
        self.base.saturating_mul(attempts).min(self.cap)
    }

    /// Suspend for the delay matching `attempts`
    pub async fn sleep(&self, attempts: u32) {
        let delay = self.delay(attempts);
        if delay.is_zero() {
            return;
        }

        tracing::debug!(
            attempts = attempts,
            delay_ms = delay.as_millis() as u64,
            "Backing off"
        );
        sleep(delay).await;
    }
}
