use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub const IP_RATE_LIMIT_PER_MINUTE: u32 = 120;
pub const VIEWER_RATE_LIMIT_PER_MINUTE: u32 = 60;
pub const RATE_LIMIT_WINDOW: Duration = Duration::from_secs(60);

/// Fixed-window request counter keyed by caller-prefixed strings
/// ("ip:1.2.3.4", "viewer:<uuid>").
///
/// Memory-resident only: counters reset on process restart and are not shared
/// across server processes. Expired buckets are swept at most once per window.
pub struct FixedWindowLimiter {
    limit: u32,
    window: Duration,
    state: Mutex<LimiterState>,
}

struct LimiterState {
    buckets: HashMap<String, WindowCounter>,
    last_sweep: Instant,
}

struct WindowCounter {
    count: u32,
    reset_at: Instant,
}

impl FixedWindowLimiter {
    /// A limit of 0 disables the limiter.
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            state: Mutex::new(LimiterState {
                buckets: HashMap::new(),
                last_sweep: Instant::now(),
            }),
        }
    }

    /// Count a hit for `key`. Over the limit, returns the time left until the
    /// key's window resets.
    pub fn check(&self, key: &str) -> Result<(), Duration> {
        self.check_at(key, Instant::now())
    }

    pub fn check_at(&self, key: &str, now: Instant) -> Result<(), Duration> {
        if self.limit == 0 {
            return Ok(());
        }
        let key = if key.is_empty() { "unknown" } else { key };

        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        if now.duration_since(state.last_sweep) >= self.window {
            state.buckets.retain(|_, bucket| now < bucket.reset_at);
            state.last_sweep = now;
        }

        let window = self.window;
        let bucket = state
            .buckets
            .entry(key.to_string())
            .or_insert_with(|| WindowCounter {
                count: 0,
                reset_at: now + window,
            });
        if now >= bucket.reset_at {
            bucket.count = 0;
            bucket.reset_at = now + window;
        }

        if bucket.count >= self.limit {
            return Err(bucket.reset_at - now);
        }
        bucket.count += 1;
        Ok(())
    }
}

/// Retry hint in whole seconds for the Retry-After header: truncate, but
/// never report 0 for a positive wait.
pub fn retry_after_secs(retry: Duration) -> u64 {
    let secs = retry.as_secs();
    if secs == 0 && !retry.is_zero() { 1 } else { secs }
}

/// Both limiters the gatekeeper uses, constructed once at process start and
/// injected as shared app data.
pub struct RateLimits {
    pub ip: FixedWindowLimiter,
    pub viewer: FixedWindowLimiter,
}

impl RateLimits {
    pub fn new() -> Self {
        Self {
            ip: FixedWindowLimiter::new(IP_RATE_LIMIT_PER_MINUTE, RATE_LIMIT_WINDOW),
            viewer: FixedWindowLimiter::new(VIEWER_RATE_LIMIT_PER_MINUTE, RATE_LIMIT_WINDOW),
        }
    }
}

impl Default for RateLimits {
    fn default() -> Self {
        Self::new()
    }
}
