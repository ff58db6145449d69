use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// In-memory rate limiter guarding the login endpoint against brute force
pub struct RateLimiter {
    /// Attempt timestamps per key (client IP or username)
    attempts: Mutex<HashMap<String, Vec<Instant>>>,
    max_attempts: usize,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_attempts: usize, window: Duration) -> Self {
        Self {
            attempts: Mutex::new(HashMap::new()),
            max_attempts,
            window,
        }
    }

    /// Returns false once a key has exhausted its attempts for the window
    pub fn check(&self, key: &str) -> bool {
        let mut attempts = self.attempts.lock().unwrap();
        let now = Instant::now();

        let entry = attempts.entry(key.to_string()).or_default();
        Self::prune(entry, now, self.window);

        entry.len() < self.max_attempts
    }

    /// Record a failed attempt for a key
    pub fn record(&self, key: &str) {
        let mut attempts = self.attempts.lock().unwrap();
        let now = Instant::now();

        let entry = attempts.entry(key.to_string()).or_default();
        Self::prune(entry, now, self.window);
        entry.push(now);
    }

    /// Forget all attempts for a key (after a successful login)
    pub fn clear(&self, key: &str) {
        let mut attempts = self.attempts.lock().unwrap();
        attempts.remove(key);
    }

    fn prune(entry: &mut Vec<Instant>, now: Instant, window: Duration) {
        entry.retain(|&time| now.duration_since(time) < window);
    }
}
