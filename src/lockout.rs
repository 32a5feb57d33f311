//! Rate limiting for master-password verification.
//!
//! Tracks consecutive failed attempts and enforces an exponential backoff
//! window before the next attempt may touch bcrypt at all.

use std::time::{Duration, Instant};

/// Failures older than this reset the counter before evaluation.
pub const FAILURE_WINDOW: Duration = Duration::from_secs(15 * 60);

/// Backoff ceiling.
pub const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Failed-attempt throttle for unlock attempts.
#[derive(Debug, Default)]
pub struct AuthThrottle {
    failed_attempts: u32,
    last_failed: Option<Instant>,
}

impl AuthThrottle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Required wait after `failed_attempts` consecutive failures:
    /// `min(30s, 1s * 2^(n-1))`.
    fn required_wait(failed_attempts: u32) -> Duration {
        if failed_attempts == 0 {
            return Duration::ZERO;
        }
        // Cap the exponent to avoid overflow before applying the ceiling.
        let backoff = Duration::from_secs(1 << (failed_attempts - 1).min(6));
        backoff.min(MAX_BACKOFF)
    }

    /// Check whether a verification attempt may proceed.
    ///
    /// Resets the counter if the last failure fell outside the 15-minute
    /// window. Returns the remaining wait in whole seconds (rounded up) when
    /// the attempt is still inside the backoff window; such a rejection does
    /// not consume an attempt.
    pub fn check(&mut self) -> Result<(), u64> {
        let Some(last) = self.last_failed else {
            return Ok(());
        };

        let elapsed = last.elapsed();
        if elapsed > FAILURE_WINDOW {
            self.reset();
            return Ok(());
        }

        let wait = Self::required_wait(self.failed_attempts);
        if elapsed < wait {
            let remaining = wait - elapsed;
            Err(remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0))
        } else {
            Ok(())
        }
    }

    /// Record a failed verification.
    pub fn record_failure(&mut self) {
        self.failed_attempts += 1;
        self.last_failed = Some(Instant::now());
    }

    /// Clear all failure state (after a successful unlock).
    pub fn reset(&mut self) {
        self.failed_attempts = 0;
        self.last_failed = None;
    }

    pub fn failed_attempts(&self) -> u32 {
        self.failed_attempts
    }

    #[cfg(test)]
    fn backdate(&mut self, by: Duration) {
        if let Some(t) = self.last_failed.as_mut() {
            *t -= by;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_wait_schedule() {
        assert_eq!(AuthThrottle::required_wait(0), Duration::ZERO);
        assert_eq!(AuthThrottle::required_wait(1), Duration::from_secs(1));
        assert_eq!(AuthThrottle::required_wait(2), Duration::from_secs(2));
        assert_eq!(AuthThrottle::required_wait(3), Duration::from_secs(4));
        assert_eq!(AuthThrottle::required_wait(5), Duration::from_secs(16));
        // Ceiling
        assert_eq!(AuthThrottle::required_wait(6), Duration::from_secs(30));
        assert_eq!(AuthThrottle::required_wait(100), Duration::from_secs(30));
    }

    #[test]
    fn test_first_attempt_is_allowed() {
        let mut throttle = AuthThrottle::new();
        assert!(throttle.check().is_ok());
    }

    #[test]
    fn test_backoff_after_failures() {
        let mut throttle = AuthThrottle::new();
        for _ in 0..3 {
            throttle.record_failure();
        }

        // Immediate 4th attempt sits inside the 4s window.
        let remaining = throttle.check().unwrap_err();
        assert!(remaining >= 1 && remaining <= 4);
        // The rejection must not have consumed an attempt.
        assert_eq!(throttle.failed_attempts(), 3);
    }

    #[test]
    fn test_backoff_elapses() {
        let mut throttle = AuthThrottle::new();
        throttle.record_failure();
        throttle.backdate(Duration::from_secs(2));
        assert!(throttle.check().is_ok());
        assert_eq!(throttle.failed_attempts(), 1);
    }

    #[test]
    fn test_window_reset_after_15_minutes() {
        let mut throttle = AuthThrottle::new();
        for _ in 0..10 {
            throttle.record_failure();
        }
        throttle.backdate(FAILURE_WINDOW + Duration::from_secs(1));

        assert!(throttle.check().is_ok());
        assert_eq!(throttle.failed_attempts(), 0);
    }

    #[test]
    fn test_reset_clears_state() {
        let mut throttle = AuthThrottle::new();
        throttle.record_failure();
        throttle.reset();
        assert_eq!(throttle.failed_attempts(), 0);
        assert!(throttle.check().is_ok());
    }
}
