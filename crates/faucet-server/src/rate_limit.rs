//! Fixed-window rate limiting keyed by client identity.
//!
//! Counters live only in memory and reset on window expiry; a periodic sweep
//! drops entries whose window has long passed.

use dashmap::DashMap;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
#[error("rate limit exceeded: {limit} requests per window")]
pub struct RateLimitExceeded {
    pub limit: u32,
}

#[derive(Debug, Clone)]
struct Window {
    count: u32,
    started: Instant,
}

/// Fixed-window counter per key. Entry-level locking via the map shards.
pub struct FixedWindowLimiter {
    max_requests: u32,
    window: Duration,
    counters: DashMap<String, Window>,
}

impl FixedWindowLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            counters: DashMap::new(),
        }
    }

    /// Count one request for `key`; `Err` when the window's cap is reached.
    pub fn check(&self, key: &str) -> Result<(), RateLimitExceeded> {
        let now = Instant::now();
        let mut entry = self
            .counters
            .entry(key.to_string())
            .or_insert_with(|| Window {
                count: 0,
                started: now,
            });

        if now.duration_since(entry.started) >= self.window {
            entry.count = 0;
            entry.started = now;
        }

        if entry.count >= self.max_requests {
            return Err(RateLimitExceeded {
                limit: self.max_requests,
            });
        }

        entry.count += 1;
        Ok(())
    }

    /// Drop entries whose window expired long ago.
    pub fn sweep(&self) {
        let window = self.window;
        self.counters
            .retain(|_, w| w.started.elapsed() < window * 2);
    }

    #[cfg(test)]
    fn count(&self, key: &str) -> u32 {
        self.counters.get(key).map(|w| w.count).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_the_cap() {
        let limiter = FixedWindowLimiter::new(5, Duration::from_secs(60));
        for i in 0..5 {
            assert!(limiter.check("1.2.3.4").is_ok(), "request {} should pass", i + 1);
        }
        assert_eq!(limiter.count("1.2.3.4"), 5);
        assert_eq!(
            limiter.check("1.2.3.4"),
            Err(RateLimitExceeded { limit: 5 })
        );
    }

    #[test]
    fn window_expiry_resets_the_counter() {
        let limiter = FixedWindowLimiter::new(2, Duration::from_millis(50));
        assert!(limiter.check("k").is_ok());
        assert!(limiter.check("k").is_ok());
        assert!(limiter.check("k").is_err());

        std::thread::sleep(Duration::from_millis(80));
        assert!(limiter.check("k").is_ok());
        assert_eq!(limiter.count("k"), 1);
    }

    #[test]
    fn keys_are_isolated() {
        let limiter = FixedWindowLimiter::new(1, Duration::from_secs(60));
        assert!(limiter.check("a").is_ok());
        assert!(limiter.check("a").is_err());
        assert!(limiter.check("b").is_ok());
    }

    #[test]
    fn sweep_drops_stale_entries() {
        let limiter = FixedWindowLimiter::new(3, Duration::from_millis(20));
        assert!(limiter.check("gone").is_ok());
        std::thread::sleep(Duration::from_millis(60));
        limiter.sweep();
        assert!(limiter.counters.get("gone").is_none());
    }
}
