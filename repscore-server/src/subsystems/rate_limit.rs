//! Fixed-window submission limiter, one window per user.
//!
//! State lives in process memory; a restart clears every window. Expired
//! windows are dropped lazily whenever the map is touched.

use repscore_core::config::SentimentConfig;
use repscore_core::{RepscoreError, Result, UserId};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

#[derive(Debug)]
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    windows: Mutex<HashMap<UserId, Window>>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &SentimentConfig) -> Self {
        Self::new(
            config.rate_limit_max_requests,
            Duration::from_secs(config.rate_limit_window_seconds),
        )
    }

    /// Count one request for `user_id`. Fails with `RateLimited` once the
    /// user has used up the current window.
    pub fn check(&self, user_id: &UserId) -> Result<()> {
        self.check_at(user_id, Instant::now())
    }

    fn check_at(&self, user_id: &UserId, now: Instant) -> Result<()> {
        let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());
        windows.retain(|_, w| now.duration_since(w.started) < self.window);

        let entry = windows.entry(user_id.clone()).or_insert(Window {
            started: now,
            count: 0,
        });

        if entry.count >= self.max_requests {
            let remaining = self
                .window
                .saturating_sub(now.duration_since(entry.started));
            // Round up so callers never retry a moment too early.
            let retry_after_secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
            tracing::debug!(user = %user_id, retry_after_secs, "Sentiment submission rate limited");
            return Err(RepscoreError::RateLimited { retry_after_secs });
        }

        entry.count += 1;
        Ok(())
    }

    /// Number of users with a live window.
    pub fn tracked_users(&self) -> usize {
        self.windows.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::from_config(&SentimentConfig::default())
    }
}
