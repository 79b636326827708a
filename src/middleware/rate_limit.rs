//! Per-IP fixed-window rate limiting.
//!
//! Each limiter tracks one window per client IP: the first request opens the
//! window, subsequent requests increment the counter, and once the window
//! elapses the next request opens a fresh one. Requests without an
//! attributable IP are allowed through.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::warn;

/// Bucket map size at which expired windows are pruned.
const PRUNE_THRESHOLD: usize = 1024;

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Fixed-window per-IP rate limiter.
#[derive(Debug)]
pub struct RateLimiter {
    max: u32,
    window: Duration,
    buckets: Mutex<HashMap<IpAddr, Window>>,
}

impl RateLimiter {
    pub fn new(max: u32, window: Duration) -> Self {
        Self {
            max,
            window,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Record a request from `ip` and decide whether it is allowed.
    pub fn try_acquire(&self, ip: Option<IpAddr>) -> bool {
        match ip {
            Some(ip) => self.check_at(ip, Instant::now()),
            None => true,
        }
    }

    fn check_at(&self, ip: IpAddr, now: Instant) -> bool {
        let mut buckets = match self.buckets.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if buckets.len() >= PRUNE_THRESHOLD {
            let window = self.window;
            buckets.retain(|_, w| now.duration_since(w.started) < window);
        }

        let entry = buckets.entry(ip).or_insert(Window {
            started: now,
            count: 0,
        });

        if now.duration_since(entry.started) >= self.window {
            entry.started = now;
            entry.count = 0;
        }

        entry.count += 1;
        if entry.count > self.max {
            warn!(%ip, count = entry.count, "Rate limit exceeded");
            false
        } else {
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(last: u8) -> IpAddr {
        IpAddr::from([203, 0, 113, last])
    }

    #[test]
    fn allows_up_to_max_then_denies() {
        let limiter = RateLimiter::new(3, Duration::from_secs(900));
        let now = Instant::now();

        assert!(limiter.check_at(ip(1), now));
        assert!(limiter.check_at(ip(1), now));
        assert!(limiter.check_at(ip(1), now));
        assert!(!limiter.check_at(ip(1), now));
    }

    #[test]
    fn window_resets_after_expiry() {
        let limiter = RateLimiter::new(3, Duration::from_secs(900));
        let now = Instant::now();

        for _ in 0..4 {
            limiter.check_at(ip(1), now);
        }
        assert!(!limiter.check_at(ip(1), now + Duration::from_secs(899)));
        assert!(limiter.check_at(ip(1), now + Duration::from_secs(900)));
    }

    #[test]
    fn ips_are_limited_independently() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let now = Instant::now();

        assert!(limiter.check_at(ip(1), now));
        assert!(!limiter.check_at(ip(1), now));
        assert!(limiter.check_at(ip(2), now));
    }

    #[test]
    fn unattributable_requests_pass() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        assert!(limiter.try_acquire(None));
        assert!(limiter.try_acquire(None));
    }

    #[test]
    fn prunes_expired_buckets() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let now = Instant::now();

        for i in 0..PRUNE_THRESHOLD {
            let addr = IpAddr::from([10, 0, (i / 256) as u8, (i % 256) as u8]);
            limiter.check_at(addr, now);
        }
        // A check past the window triggers the prune before inserting.
        assert!(limiter.check_at(ip(9), now + Duration::from_secs(61)));
        let len = limiter.buckets.lock().expect("lock").len();
        assert_eq!(len, 1);
    }
}
