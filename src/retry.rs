//! Exponential backoff bounded by an attempt budget and a run deadline.

use std::time::{Duration, Instant};

use log::warn;

use crate::errors::FetchError;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 15;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(100);
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);

/// Wall-clock limit for one reconciliation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunDeadline {
    at: Option<Instant>,
}

impl RunDeadline {
    pub fn after(budget: Duration) -> Self {
        Self {
            at: Instant::now().checked_add(budget),
        }
    }

    pub fn unbounded() -> Self {
        Self { at: None }
    }

    pub fn is_expired(&self) -> bool {
        self.at.is_some_and(|at| Instant::now() >= at)
    }

    pub fn remaining(&self) -> Option<Duration> {
        self.at.map(|at| at.saturating_duration_since(Instant::now()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (0-based): `base * 2^retry`, capped.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry.min(31)).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Runs `operation` until it succeeds, the attempt budget is spent, or
    /// the deadline passes. `label` only decorates log lines.
    pub fn run<T, F>(&self, label: &str, deadline: &RunDeadline, mut operation: F) -> Result<T, FetchError>
    where
        F: FnMut() -> Result<T, String>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut last_error = String::new();
        for attempt in 1..=max_attempts {
            if deadline.is_expired() {
                return Err(FetchError::DeadlineExceeded);
            }
            match operation() {
                Ok(value) => return Ok(value),
                Err(error) => last_error = error,
            }
            if attempt == max_attempts {
                break;
            }

            let mut delay = self.delay_for(attempt - 1);
            if let Some(remaining) = deadline.remaining() {
                if remaining.is_zero() {
                    return Err(FetchError::DeadlineExceeded);
                }
                delay = delay.min(remaining);
            }
            warn!(
                "{label}: attempt {attempt}/{max_attempts} failed, retrying in {delay:?}: {last_error}"
            );
            if !delay.is_zero() {
                std::thread::sleep(delay);
            }
        }
        Err(FetchError::FetchExhausted {
            attempts: max_attempts,
            last_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{RetryPolicy, RunDeadline};
    use crate::errors::FetchError;
    use std::time::Duration;

    fn instant_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    #[test]
    fn test_delay_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 15,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(1),
        };
        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(800));
        assert_eq!(policy.delay_for(4), Duration::from_secs(1));
        assert_eq!(policy.delay_for(40), Duration::from_secs(1));
    }

    #[test]
    fn test_run_returns_first_success() {
        let mut calls = 0;
        let result = instant_policy(15).run("test", &RunDeadline::unbounded(), || {
            calls += 1;
            if calls < 4 {
                Err(format!("failure {calls}"))
            } else {
                Ok(calls)
            }
        });
        assert_eq!(result, Ok(4));
        assert_eq!(calls, 4);
    }

    #[test]
    fn test_run_exhausts_attempt_budget() {
        let mut calls = 0;
        let result: Result<(), FetchError> =
            instant_policy(15).run("test", &RunDeadline::unbounded(), || {
                calls += 1;
                Err("still down".to_string())
            });
        assert_eq!(calls, 15);
        assert_eq!(
            result,
            Err(FetchError::FetchExhausted {
                attempts: 15,
                last_error: "still down".to_string()
            })
        );
    }

    #[test]
    fn test_run_stops_at_expired_deadline() {
        let mut calls = 0;
        let deadline = RunDeadline::after(Duration::ZERO);
        let result: Result<(), FetchError> = instant_policy(15).run("test", &deadline, || {
            calls += 1;
            Err("unreachable".to_string())
        });
        assert_eq!(calls, 0);
        assert_eq!(result, Err(FetchError::DeadlineExceeded));
    }
}
