use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// In-memory limiter for failed login and password-reset attempts
pub struct RateLimiter {
    /// Failure timestamps per key (normalized username)
    attempts: Mutex<HashMap<String, Vec<Instant>>>,
    max_attempts: usize,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_attempts: usize, window_secs: u64) -> Self {
        Self {
            attempts: Mutex::new(HashMap::new()),
            max_attempts,
            window: Duration::from_secs(window_secs),
        }
    }

    /// Usernames are case-insensitive, so "Rahim" and "rahim" share a bucket
    pub fn key_for(username: &str) -> String {
        username.trim().to_lowercase()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<Instant>>> {
        // A panic while holding the lock leaves the map usable
        self.attempts
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns true if another attempt is allowed for this key
    pub fn check(&self, key: &str) -> bool {
        let mut attempts = self.lock();
        let now = Instant::now();

        let entry = attempts.entry(key.to_string()).or_default();
        entry.retain(|&time| now.duration_since(time) < self.window);

        entry.len() < self.max_attempts
    }

    /// Record a failed attempt
    pub fn record(&self, key: &str) {
        let mut attempts = self.lock();
        let now = Instant::now();

        let entry = attempts.entry(key.to_string()).or_default();
        entry.retain(|&time| now.duration_since(time) < self.window);
        entry.push(now);
    }

    /// Forget failures after a successful attempt
    pub fn clear(&self, key: &str) {
        self.lock().remove(key);
    }

    pub fn remaining(&self, key: &str) -> usize {
        let attempts = self.lock();
        let now = Instant::now();

        match attempts.get(key) {
            Some(entry) => {
                let recent = entry
                    .iter()
                    .filter(|&&time| now.duration_since(time) < self.window)
                    .count();
                self.max_attempts.saturating_sub(recent)
            }
            None => self.max_attempts,
        }
    }
}
