//! Login attempt rate limiting.
//!
//! Attempts are counted per client key in a fixed window that starts at the
//! first attempt. Once more than `max_attempts` attempts land inside one
//! window, further checks are rejected until the window lapses or the key is
//! reset by a successful login.
//!
//! Counters live in process memory and are not shared between instances.
//! A distributed counter can be plugged in through [`AttemptLimiter`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use moka::future::Cache;

use crate::clock::{Clock, to_delta};
use crate::config::RateLimitConfig;

/// Per-key attempt counter.
#[async_trait]
pub trait AttemptLimiter: Send + Sync {
    /// Count an attempt for `key` and report whether it is admitted.
    ///
    /// The attempt that pushes the count over the limit is itself counted
    /// and rejected.
    async fn check(&self, key: &str) -> bool;

    /// Attempts left for `key` in its current window.
    async fn remaining(&self, key: &str) -> u32;

    /// Time until the window for `key` lapses. Zero when nothing is tracked.
    async fn time_to_reset(&self, key: &str) -> Duration;

    /// Forget all attempts for `key`.
    async fn reset(&self, key: &str);
}

#[derive(Debug, Clone, Copy)]
struct AttemptWindow {
    count: u32,
    first_attempt: DateTime<Utc>,
}

/// In-memory [`AttemptLimiter`].
///
/// Entries idle for a whole window are evicted since they can no longer
/// influence a decision, and the number of tracked keys is capped.
#[derive(Clone)]
pub struct InMemoryRateLimiter {
    windows: Cache<String, AttemptWindow>,
    config: RateLimitConfig,
    clock: Arc<dyn Clock>,
}

impl InMemoryRateLimiter {
    /// Create a limiter for the given policy.
    #[must_use]
    pub fn new(config: RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        let windows = Cache::builder()
            .max_capacity(config.max_tracked_keys)
            .time_to_idle(config.window)
            .build();

        Self {
            windows,
            config,
            clock,
        }
    }

    /// The policy this limiter enforces.
    #[must_use]
    pub const fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    fn is_lapsed(&self, window: &AttemptWindow, now: DateTime<Utc>) -> bool {
        now - window.first_attempt > to_delta(self.config.window)
    }

    async fn live_window(&self, key: &str) -> Option<AttemptWindow> {
        let now = self.clock.now();
        self.windows
            .get(key)
            .await
            .filter(|window| !self.is_lapsed(window, now))
    }
}

#[async_trait]
impl AttemptLimiter for InMemoryRateLimiter {
    async fn check(&self, key: &str) -> bool {
        let now = self.clock.now();
        let entry = self
            .windows
            .entry(key.to_owned())
            .and_upsert_with(|existing| {
                let next = match existing.map(|entry| entry.into_value()) {
                    Some(window) if !self.is_lapsed(&window, now) => AttemptWindow {
                        count: window.count.saturating_add(1),
                        ..window
                    },
                    _ => AttemptWindow {
                        count: 1,
                        first_attempt: now,
                    },
                };
                std::future::ready(next)
            })
            .await;

        let window = entry.into_value();
        let allowed = window.count <= self.config.max_attempts;
        if !allowed {
            tracing::warn!(
                key = %key,
                attempts = window.count,
                max_attempts = self.config.max_attempts,
                "Login attempt rejected by rate limiter"
            );
        }
        allowed
    }

    async fn remaining(&self, key: &str) -> u32 {
        let used = self.live_window(key).await.map_or(0, |window| window.count);
        self.config.max_attempts.saturating_sub(used)
    }

    async fn time_to_reset(&self, key: &str) -> Duration {
        let now = self.clock.now();
        self.live_window(key).await.map_or(Duration::ZERO, |window| {
            let lapses_at = window.first_attempt + to_delta(self.config.window);
            (lapses_at - now).to_std().unwrap_or(Duration::ZERO)
        })
    }

    async fn reset(&self, key: &str) {
        self.windows.invalidate(key).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::TimeDelta;

    fn limiter() -> (InMemoryRateLimiter, ManualClock) {
        let clock = ManualClock::default();
        let limiter = InMemoryRateLimiter::new(RateLimitConfig::default(), Arc::new(clock.clone()));
        (limiter, clock)
    }

    #[tokio::test]
    async fn test_rejects_after_max_attempts() {
        let (limiter, _) = limiter();
        for expected_remaining in [4, 3, 2, 1, 0] {
            assert!(limiter.check("198.51.100.1").await);
            assert_eq!(limiter.remaining("198.51.100.1").await, expected_remaining);
        }
        assert!(!limiter.check("198.51.100.1").await);
        assert_eq!(limiter.remaining("198.51.100.1").await, 0);
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let (limiter, _) = limiter();
        for _ in 0..6 {
            limiter.check("a").await;
        }
        assert!(!limiter.check("a").await);
        assert!(limiter.check("b").await);
        assert_eq!(limiter.remaining("b").await, 4);
    }

    #[tokio::test]
    async fn test_reset_admits_next_check() {
        let (limiter, _) = limiter();
        for _ in 0..10 {
            limiter.check("k").await;
        }
        limiter.reset("k").await;
        assert!(limiter.check("k").await);
        assert_eq!(limiter.remaining("k").await, 4);
    }

    #[tokio::test]
    async fn test_window_lapse_starts_fresh() {
        let (limiter, clock) = limiter();
        for _ in 0..6 {
            limiter.check("k").await;
        }
        assert!(!limiter.check("k").await);

        clock.advance(TimeDelta::minutes(15) + TimeDelta::seconds(1));
        assert_eq!(limiter.remaining("k").await, 5);
        assert!(limiter.check("k").await);
        assert_eq!(limiter.remaining("k").await, 4);
    }

    #[tokio::test]
    async fn test_window_is_not_extended_by_attempts() {
        let (limiter, clock) = limiter();
        limiter.check("k").await;
        clock.advance(TimeDelta::minutes(10));
        limiter.check("k").await;

        assert_eq!(limiter.time_to_reset("k").await, Duration::from_secs(5 * 60));
        clock.advance(TimeDelta::minutes(5) + TimeDelta::seconds(1));
        assert_eq!(limiter.time_to_reset("k").await, Duration::ZERO);
    }

    #[tokio::test]
    async fn test_untracked_key() {
        let (limiter, _) = limiter();
        assert_eq!(limiter.remaining("nobody").await, 5);
        assert_eq!(limiter.time_to_reset("nobody").await, Duration::ZERO);
    }

    #[tokio::test]
    async fn test_concurrent_checks_are_not_lost() {
        let (limiter, _) = limiter();
        let handles: Vec<_> = (0..20)
            .map(|_| {
                let limiter = limiter.clone();
                tokio::spawn(async move { limiter.check("burst").await })
            })
            .collect();

        let mut admitted = 0;
        for handle in handles {
            if handle.await.unwrap_or(false) {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 5);
    }
}
