//! Adaptive throttling driven by the API's rate-limit headers.
//!
//! The limiter holds one budget for every call the client makes. It never
//! rejects a request; when the last response reported an exhausted quota it
//! delays the next request until the reported reset time.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use reqwest::header::HeaderMap;
use serde::Serialize;
use tokio::time::Instant;

pub const LIMIT_HEADER: &str = "x-ratelimit-limit";
pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";
pub const RESET_HEADER: &str = "x-ratelimit-reset";

/// Stand-in for a reset so far ahead that `Instant` cannot represent it.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Rate-limit metadata reported by a single response.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RateInfo {
    pub limit: i64,
    pub remaining: i64,
    /// Seconds until the quota resets.
    pub reset_seconds: f64,
}

impl RateInfo {
    /// Reads the rate-limit headers.
    ///
    /// Returns `None` when the reported limit is absent or zero; missing or
    /// malformed remaining/reset values read as zero.
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let limit = header_number(headers, LIMIT_HEADER);
        if limit == 0.0 {
            return None;
        }
        Some(Self {
            limit: limit as i64,
            remaining: header_number(headers, REMAINING_HEADER) as i64,
            reset_seconds: header_number(headers, RESET_HEADER),
        })
    }
}

fn header_number(headers: &HeaderMap, name: &str) -> f64 {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|n| n.is_finite())
        .unwrap_or(0.0)
}

#[derive(Debug, Clone, Copy)]
struct RateLimitState {
    /// `None` until a response reports a budget.
    remaining: Option<i64>,
    reset_at: Option<Instant>,
}

/// Process-wide request budget for one API client.
#[derive(Debug)]
pub struct RateLimiter {
    state: Mutex<RateLimitState>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiter {
    /// Creates a limiter with an unbounded budget.
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(RateLimitState {
                remaining: None,
                reset_at: None,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, RateLimitState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// How long a request issued at `now` must wait, if at all.
    pub fn pending_wait(&self, now: Instant) -> Option<Duration> {
        let state = *self.state();
        match (state.remaining, state.reset_at) {
            (Some(remaining), Some(reset_at)) if remaining <= 0 && reset_at > now => {
                Some(reset_at - now)
            }
            _ => None,
        }
    }

    /// Suspends the caller until the quota resets when it is exhausted;
    /// returns immediately otherwise.
    pub async fn wait_for_quota(&self) {
        if let Some(wait) = self.pending_wait(Instant::now()) {
            tracing::debug!(?wait, "rate limit exhausted, waiting for reset");
            tokio::time::sleep(wait).await;
        }
    }

    /// Overwrites the budget with what a response reported.
    pub fn record(&self, info: &RateInfo) {
        let reset_in = Duration::try_from_secs_f64(info.reset_seconds).unwrap_or_default();
        let now = Instant::now();
        let reset_at = now
            .checked_add(reset_in)
            .unwrap_or_else(|| now + FAR_FUTURE);
        let mut state = self.state();
        state.remaining = Some(info.remaining);
        state.reset_at = Some(reset_at);
        tracing::trace!(
            limit = info.limit,
            remaining = info.remaining,
            reset_seconds = info.reset_seconds,
            "rate limit updated"
        );
    }

    /// Remaining requests as last reported; `None` while unbounded.
    pub fn remaining(&self) -> Option<i64> {
        self.state().remaining
    }
}
