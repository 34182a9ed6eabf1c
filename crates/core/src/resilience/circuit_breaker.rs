//! Consecutive-failure circuit breaker
//!
//! The breaker trips after a run of consecutive failures and stays tripped
//! for the lifetime of the value. It is owned by a single run of work and is
//! never shared between tasks, so it needs no locking.

use std::fmt;

/// Current state of a [`FailureBreaker`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    /// Calls may proceed
    Closed,
    /// Threshold reached; the owner should stop issuing calls
    Tripped,
}

impl fmt::Display for BreakerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BreakerState::Closed => write!(f, "Closed"),
            BreakerState::Tripped => write!(f, "Tripped"),
        }
    }
}

/// Counts consecutive failures and trips once `threshold` is reached
#[derive(Debug, Clone)]
pub struct FailureBreaker {
    name: String,
    threshold: u32,
    consecutive: u32,
}

impl FailureBreaker {
    /// Create a closed breaker
    ///
    /// A threshold of zero is treated as one.
    pub fn new(name: impl Into<String>, threshold: u32) -> Self {
        Self {
            name: name.into(),
            threshold: threshold.max(1),
            consecutive: 0,
        }
    }

    /// Record a successful call, clearing the failure run
    ///
    /// Has no effect once the breaker has tripped.
    pub fn record_success(&mut self) {
        if self.is_tripped() {
            return;
        }
        self.consecutive = 0;
    }

    /// Record a failed call and report the resulting state
    pub fn record_failure(&mut self) -> BreakerState {
        if !self.is_tripped() {
            self.consecutive += 1;
        }

        let state = self.state();
        if state == BreakerState::Tripped {
            tracing::warn!(
                breaker = %self.name,
                consecutive_failures = self.consecutive,
                threshold = self.threshold,
                "Circuit breaker tripped"
            );
        }
        state
    }

    /// Current state
    pub fn state(&self) -> BreakerState {
        if self.consecutive >= self.threshold {
            BreakerState::Tripped
        } else {
            BreakerState::Closed
        }
    }

    pub fn is_tripped(&self) -> bool {
        self.state() == BreakerState::Tripped
    }

    /// Length of the current failure run
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}
