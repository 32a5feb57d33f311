//! Idle-timeout auto-lock.

use std::time::{Duration, Instant};

/// Idle timer behind the session manager's auto-lock.
#[derive(Debug)]
pub struct AutoLock {
    last_activity: Instant,
    timeout: Duration,
    enabled: bool,
}

impl AutoLock {
    pub fn new(timeout: Duration) -> Self {
        Self {
            last_activity: Instant::now(),
            timeout,
            enabled: true,
        }
    }

    /// Reset the idle timer. Called by every vault-touching operation.
    pub fn record_activity(&mut self) {
        self.last_activity = Instant::now();
    }

    /// Whether the idle timeout has expired.
    pub fn should_lock(&self) -> bool {
        self.enabled && self.last_activity.elapsed() > self.timeout
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    /// Time left before auto-lock, if enabled.
    pub fn time_until_lock(&self) -> Option<Duration> {
        if !self.enabled {
            return None;
        }
        self.timeout.checked_sub(self.last_activity.elapsed())
    }
}
