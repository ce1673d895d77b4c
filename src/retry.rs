//! Bounded retry with exponential backoff
//!
//! Used where another process may briefly hold a resource: concurrent build
//! agents writing the same cache entry, or git holding `index.lock` while a
//! repository is opened.

use std::thread;
use std::time::Duration;
use tracing::debug;

/// Retry schedule: `max_attempts` tries, sleeping `base_delay * 2^n` between them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 6,
            base_delay: Duration::from_millis(10),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        RetryPolicy {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Delay before retry number `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }

    /// Run `op` until it succeeds, fails with a non-transient error, or the
    /// attempts run out. The last error is returned on exhaustion.
    pub fn run<T, E, F, P>(&self, mut op: F, is_transient: P) -> Result<T, E>
    where
        F: FnMut() -> Result<T, E>,
        P: Fn(&E) -> bool,
        E: std::fmt::Display,
    {
        let mut attempt = 1;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(err) if attempt < self.max_attempts && is_transient(&err) => {
                    let delay = self.delay_for(attempt);
                    debug!(attempt, ?delay, error = %err, "transient failure, retrying");
                    thread::sleep(delay);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn fast() -> RetryPolicy {
        RetryPolicy::new(4, Duration::from_millis(0))
    }

    #[test]
    fn test_delay_doubles() {
        let policy = RetryPolicy::new(5, Duration::from_millis(10));
        assert_eq!(policy.delay_for(1), Duration::from_millis(10));
        assert_eq!(policy.delay_for(2), Duration::from_millis(20));
        assert_eq!(policy.delay_for(4), Duration::from_millis(80));
    }

    #[test]
    fn test_succeeds_after_transient_failures() {
        let calls = Cell::new(0);
        let result: Result<u32, String> = fast().run(
            || {
                calls.set(calls.get() + 1);
                if calls.get() < 3 {
                    Err("locked".to_string())
                } else {
                    Ok(7)
                }
            },
            |_| true,
        );
        assert_eq!(result, Ok(7));
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_gives_up_after_max_attempts() {
        let calls = Cell::new(0);
        let result: Result<(), String> = fast().run(
            || {
                calls.set(calls.get() + 1);
                Err("locked".to_string())
            },
            |_| true,
        );
        assert!(result.is_err());
        assert_eq!(calls.get(), 4);
    }

    #[test]
    fn test_permanent_errors_are_not_retried() {
        let calls = Cell::new(0);
        let result: Result<(), String> = fast().run(
            || {
                calls.set(calls.get() + 1);
                Err("corrupt".to_string())
            },
            |err| err == "locked",
        );
        assert!(result.is_err());
        assert_eq!(calls.get(), 1);
    }
}
