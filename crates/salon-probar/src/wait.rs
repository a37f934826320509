//! Bounded Retry-Poll
//!
//! Re-attempts an operation whose effect may not be observable yet because
//! the backend is eventually consistent. The loop is bounded by
//! [`RetryPolicy::max_attempts`] and sleeps on the tokio timer between
//! attempts, so other tasks keep running while it waits.
//!
//! Only [`PollOutcome::NotYet`] consumes a retry. An `Err` returned by the
//! attempt ends the poll immediately.

use crate::result::{SalonError, SalonResult};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default number of attempts
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default interval between attempts (1 second)
pub const DEFAULT_INTERVAL_MS: u64 = 1_000;

// =============================================================================
// RETRY POLICY
// =============================================================================

/// How many times to attempt and how long to sleep in between
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    interval_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            interval_ms: DEFAULT_INTERVAL_MS,
        }
    }
}

impl RetryPolicy {
    /// Create a policy.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when `max_attempts` is zero.
    pub fn new(max_attempts: u32, interval_ms: u64) -> SalonResult<Self> {
        if max_attempts == 0 {
            return Err(SalonError::config("retry policy needs at least one attempt"));
        }
        Ok(Self {
            max_attempts,
            interval_ms,
        })
    }

    /// Policy for `const` items.
    ///
    /// # Panics
    ///
    /// Panics when `max_attempts` is zero; in a `const` item that is a
    /// compile error.
    #[must_use]
    pub const fn fixed(max_attempts: u32, interval_ms: u64) -> Self {
        assert!(max_attempts > 0, "retry policy needs at least one attempt");
        Self {
            max_attempts,
            interval_ms,
        }
    }

    /// Set the interval, keeping the attempt budget
    #[must_use]
    pub const fn with_interval(mut self, interval_ms: u64) -> Self {
        self.interval_ms = interval_ms;
        self
    }

    /// Maximum number of attempts (always >= 1)
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Interval between attempts in milliseconds
    #[must_use]
    pub const fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    /// Interval between attempts as Duration
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Worst-case time spent sleeping when every attempt reports `NotYet`
    #[must_use]
    pub const fn max_sleep(&self) -> Duration {
        let gaps = (self.max_attempts as u64).saturating_sub(1);
        Duration::from_millis(self.interval_ms.saturating_mul(gaps))
    }
}

// =============================================================================
// POLL OUTCOME
// =============================================================================

/// Outcome of a single attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
    /// The condition holds; polling stops with this value
    Ready(T),
    /// Not observable yet; `observed` describes what was seen instead
    NotYet {
        /// Observed state, reported if the budget runs out
        observed: String,
    },
}

impl<T> PollOutcome<T> {
    /// Shorthand for a `NotYet` outcome
    pub fn not_yet(observed: impl Into<String>) -> Self {
        Self::NotYet {
            observed: observed.into(),
        }
    }

    /// Check if the outcome is ready
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

// =============================================================================
// POLL LOOP
// =============================================================================

/// Attempt `attempt` until it is ready or `policy` runs out.
///
/// Attempts run strictly one after another. Sleeping happens only between
/// two attempts, never before the first or after the last.
///
/// # Errors
///
/// - whatever `attempt` returns as `Err`, unchanged and immediately
/// - [`SalonError::RetryExhausted`] after `max_attempts` `NotYet` outcomes
pub async fn poll<T, F, Fut>(label: &str, policy: RetryPolicy, mut attempt: F) -> SalonResult<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = SalonResult<PollOutcome<T>>>,
{
    let mut last_observed = String::from("nothing observed");

    for index in 1..=policy.max_attempts {
        match attempt(index).await? {
            PollOutcome::Ready(value) => {
                debug!(operation = label, attempt = index, "poll ready");
                return Ok(value);
            }
            PollOutcome::NotYet { observed } => {
                last_observed = not_yet(label, policy, index, observed).await;
            }
        }
    }

    Err(exhausted(label, policy, last_observed))
}

/// A stateful attempt, for polls that need `&mut` access to a page driver
#[async_trait]
pub trait Pollable: Send {
    /// Value produced once the condition holds
    type Output: Send;

    /// Run attempt number `attempt` (1-based)
    async fn attempt(&mut self, attempt: u32) -> SalonResult<PollOutcome<Self::Output>>;
}

/// [`poll`] over a [`Pollable`], with the same budget and sleep rules.
///
/// # Errors
///
/// - whatever `target` returns as `Err`, unchanged and immediately
/// - [`SalonError::RetryExhausted`] after `max_attempts` `NotYet` outcomes
pub async fn poll_until<P>(label: &str, policy: RetryPolicy, target: &mut P) -> SalonResult<P::Output>
where
    P: Pollable + ?Sized,
{
    let mut last_observed = String::from("nothing observed");

    for index in 1..=policy.max_attempts {
        match target.attempt(index).await? {
            PollOutcome::Ready(value) => {
                debug!(operation = label, attempt = index, "poll ready");
                return Ok(value);
            }
            PollOutcome::NotYet { observed } => {
                last_observed = not_yet(label, policy, index, observed).await;
            }
        }
    }

    Err(exhausted(label, policy, last_observed))
}

/// Log a `NotYet` and sleep unless it was the last attempt
async fn not_yet(label: &str, policy: RetryPolicy, index: u32, observed: String) -> String {
    debug!(
        operation = label,
        attempt = index,
        max_attempts = policy.max_attempts,
        observed = %observed,
        "not observable yet"
    );
    if index < policy.max_attempts {
        tokio::time::sleep(policy.interval()).await;
    }
    observed
}

fn exhausted(label: &str, policy: RetryPolicy, last_observed: String) -> SalonError {
    SalonError::RetryExhausted {
        operation: label.to_string(),
        attempts: policy.max_attempts,
        last_observed,
    }
}

// =============================================================================
// TESTS
// =============================================================================
