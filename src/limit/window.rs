//! Fixed-window rate limiting.
//!
//! Counts requests per key in discrete, non-overlapping windows. Boundary
//! imprecision (a burst straddling two windows) is accepted in exchange for
//! O(1) memory per key and no background bookkeeping.
//!
//! Counters live in a per-process map and are NOT synchronized across
//! instances: horizontal scale-out multiplies the effective global limit by
//! instance count. A shared-counter implementation of [`RateLimiter`] can be
//! injected without changing call sites.

use crate::clock::Clock;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// A rate quota: at most `limit` calls per `window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateQuota {
    /// Window length.
    pub window: Duration,
    /// Maximum calls allowed inside one window.
    pub limit: u32,
}

/// Outcome of a rate check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    /// Whether the call is allowed.
    pub allowed: bool,
    /// Whole seconds until the window ends; zero when allowed.
    pub retry_after_seconds: u64,
}

impl RateDecision {
    fn allowed() -> Self {
        Self {
            allowed: true,
            retry_after_seconds: 0,
        }
    }
}

/// Injectable rate-limiter interface.
///
/// Callers choose the key shape (e.g. `issue:{user}:{resource}:{file}`); the
/// limiter is agnostic to key semantics.
pub trait RateLimiter: Send + Sync {
    /// Count one call against `key` and decide whether it is allowed.
    fn check(&self, key: &str, quota: RateQuota, clock: &dyn Clock) -> RateDecision;
}

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    ends_at: DateTime<Utc>,
}

/// In-process fixed-window limiter backed by a mutex-guarded map.
///
/// The first call for a key opens a window; calls within it increment the
/// counter; once the counter exceeds the limit, calls are denied until the
/// window elapses, at which point the next call resets the count to 1.
#[derive(Debug, Default)]
pub struct FixedWindowLimiter {
    windows: Mutex<HashMap<String, Window>>,
}

impl FixedWindowLimiter {
    /// Create an empty limiter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop windows that have already elapsed.
    ///
    /// Housekeeping for long-lived processes; call it from a low-frequency
    /// maintenance tick. Never required for correctness.
    pub fn purge_expired(&self, clock: &dyn Clock) {
        let now = clock.now_utc();
        if let Ok(mut windows) = self.windows.lock() {
            windows.retain(|_, w| w.ends_at > now);
        }
    }

    /// Number of keys currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.windows.lock().map(|w| w.len()).unwrap_or(0)
    }
}

impl RateLimiter for FixedWindowLimiter {
    fn check(&self, key: &str, quota: RateQuota, clock: &dyn Clock) -> RateDecision {
        let now = clock.now_utc();
        let window_len = chrono::Duration::from_std(quota.window)
            .unwrap_or_else(|_| chrono::Duration::seconds(i64::MAX / 1_000));

        let mut windows = match self.windows.lock() {
            Ok(guard) => guard,
            // A poisoned lock means a panic elsewhere; failing open here would
            // turn that into an unbounded bypass. Deny with a one-second hint.
            Err(_) => {
                return RateDecision {
                    allowed: false,
                    retry_after_seconds: 1,
                }
            }
        };

        let window = windows.entry(key.to_string()).or_insert(Window {
            count: 0,
            ends_at: now + window_len,
        });

        if window.ends_at <= now {
            // Window elapsed: reset and start a new one.
            window.count = 0;
            window.ends_at = now + window_len;
        }

        window.count += 1;

        if window.count <= quota.limit {
            return RateDecision::allowed();
        }

        let remaining_ms = (window.ends_at - now).num_milliseconds().max(0) as u64;
        // Ceiling to whole seconds, minimum 1 so Retry-After is never 0.
        let retry_after_seconds = ((remaining_ms + 999) / 1000).max(1);

        RateDecision {
            allowed: false,
            retry_after_seconds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;

    fn quota(limit: u32, secs: u64) -> RateQuota {
        RateQuota {
            window: Duration::from_secs(secs),
            limit,
        }
    }

    #[test]
    fn test_first_n_allowed_then_denied() {
        let limiter = FixedWindowLimiter::new();
        let clock = MockClock::from_rfc3339("2025-06-01T12:00:00Z");
        let q = quota(3, 60);

        for _ in 0..3 {
            assert!(limiter.check("k", q, &clock).allowed);
        }

        let denied = limiter.check("k", q, &clock);
        assert!(!denied.allowed);
        assert!(denied.retry_after_seconds > 0);
    }

    #[test]
    fn test_retry_after_is_remaining_window_ceiling() {
        let limiter = FixedWindowLimiter::new();
        let clock = MockClock::from_rfc3339("2025-06-01T12:00:00Z");
        let q = quota(1, 60);

        assert!(limiter.check("k", q, &clock).allowed);

        // 10.5 seconds into the window: 49.5s remain, ceiling is 50
        clock.advance(chrono::Duration::milliseconds(10_500));
        let denied = limiter.check("k", q, &clock);
        assert!(!denied.allowed);
        assert_eq!(denied.retry_after_seconds, 50);
    }

    #[test]
    fn test_window_reset_allows_again() {
        let limiter = FixedWindowLimiter::new();
        let clock = MockClock::from_rfc3339("2025-06-01T12:00:00Z");
        let q = quota(2, 60);

        assert!(limiter.check("k", q, &clock).allowed);
        assert!(limiter.check("k", q, &clock).allowed);
        assert!(!limiter.check("k", q, &clock).allowed);

        clock.advance(chrono::Duration::seconds(61));
        let decision = limiter.check("k", q, &clock);
        assert!(decision.allowed);

        // Reset counted this call as the first of the new window
        assert!(limiter.check("k", q, &clock).allowed);
        assert!(!limiter.check("k", q, &clock).allowed);
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = FixedWindowLimiter::new();
        let clock = MockClock::from_rfc3339("2025-06-01T12:00:00Z");
        let q = quota(1, 60);

        assert!(limiter.check("issue:1:2:3", q, &clock).allowed);
        assert!(!limiter.check("issue:1:2:3", q, &clock).allowed);
        assert!(limiter.check("issue:1:2:4", q, &clock).allowed);
        assert!(limiter.check("redeem:1:3", q, &clock).allowed);
    }

    #[test]
    fn test_purge_expired_drops_only_elapsed_windows() {
        let limiter = FixedWindowLimiter::new();
        let clock = MockClock::from_rfc3339("2025-06-01T12:00:00Z");
        let q = quota(5, 60);

        limiter.check("old", q, &clock);
        clock.advance(chrono::Duration::seconds(30));
        limiter.check("fresh", q, &clock);
        assert_eq!(limiter.tracked_keys(), 2);

        clock.advance(chrono::Duration::seconds(45));
        limiter.purge_expired(&clock);
        assert_eq!(limiter.tracked_keys(), 1);
    }

    #[test]
    fn test_concurrent_increments_are_not_lost() {
        use std::sync::Arc;

        let limiter = Arc::new(FixedWindowLimiter::new());
        let q = quota(1000, 60);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                std::thread::spawn(move || {
                    let clock = MockClock::from_rfc3339("2025-06-01T12:00:00Z");
                    let mut allowed = 0u32;
                    for _ in 0..200 {
                        if limiter.check("shared", q, &clock).allowed {
                            allowed += 1;
                        }
                    }
                    allowed
                })
            })
            .collect();

        let total: u32 = handles.into_iter().map(|h| h.join().unwrap()).sum();
        // 1600 calls against a limit of 1000: exactly 1000 must get through
        assert_eq!(total, 1000);
    }
}
