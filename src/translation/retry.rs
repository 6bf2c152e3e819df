use crate::utils::config::TranslationConfig;
use crate::utils::TranslatorError;
use std::time::Duration;

/// Policy parameters for retrying one row's translation.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, the first one included.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub base_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
    pub exponential: bool,
}

/// What to do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    RetryAfter(Duration),
    GiveUp,
    /// The session is gone; nothing more can be attempted.
    Abort,
}

impl RetryPolicy {
    pub const fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay: delay,
            max_delay: delay,
            exponential: false,
        }
    }

    pub fn from_config(config: &TranslationConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.retry_backoff_ms),
            max_delay: Duration::from_millis(config.max_backoff_ms.max(config.retry_backoff_ms)),
            exponential: config.exponential_backoff,
        }
    }

    /// `attempts_made` counts attempts already run, the failed one included.
    pub fn evaluate(&self, error: &TranslatorError, attempts_made: u32) -> RetryDecision {
        if error.is_session_fatal() {
            return RetryDecision::Abort;
        }
        if !error.is_transient() || attempts_made >= self.max_attempts {
            return RetryDecision::GiveUp;
        }
        RetryDecision::RetryAfter(self.delay_for(attempts_made))
    }

    pub fn delay_for(&self, attempts_made: u32) -> Duration {
        if !self.exponential || self.base_delay.is_zero() {
            return self.base_delay.min(self.max_delay);
        }

        let mut multiplier: u32 = 1;
        for _ in 1..attempts_made {
            multiplier = multiplier.saturating_mul(2);
        }
        self.base_delay.saturating_mul(multiplier).min(self.max_delay)
    }
}

/// Bounded polling: sample every `interval` until `timeout` elapses.
#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    pub timeout: Duration,
    pub interval: Duration,
}

impl PollPolicy {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self {
            timeout,
            interval: interval.max(Duration::from_millis(1)),
        }
    }
}
