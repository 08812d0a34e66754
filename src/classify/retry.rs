//! Bounded exponential backoff for transient classifier failures

use std::time::Duration;

use super::ClassificationFailure;

/// Retry schedule applied at the classification boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no retries
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Whether another attempt should follow failed attempt number `attempt` (1-based)
    pub fn should_retry(&self, attempt: u32, failure: &ClassificationFailure) -> bool {
        failure.is_retryable() && attempt < self.max_attempts
    }

    /// Delay before the attempt after `attempt`. A provider `Retry-After`
    /// replaces the computed backoff; both are capped at `max_delay`.
    pub fn delay_for(&self, attempt: u32, failure: &ClassificationFailure) -> Duration {
        let delay = match failure {
            ClassificationFailure::RateLimited {
                retry_after_secs: Some(secs),
            } => Duration::from_secs(*secs),
            _ => {
                let exponent = attempt.saturating_sub(1).min(16);
                self.base_delay.saturating_mul(1u32 << exponent)
            }
        };
        delay.min(self.max_delay)
    }
}
