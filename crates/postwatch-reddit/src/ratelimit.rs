//! Reading Reddit's `X-Ratelimit-*` response headers.
//!
//! Reddit reports the requests left in the current window and the seconds
//! until the window resets. Both are sent as decimal strings.

use std::time::Duration;

use reqwest::header::{HeaderMap, RETRY_AFTER};

const REMAINING: &str = "x-ratelimit-remaining";
const RESET: &str = "x-ratelimit-reset";

/// Wait used when a 429 carries no usable reset hint.
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(10);

/// Upper bound on any single sleep.
pub const MAX_BACKOFF: Duration = Duration::from_secs(600);

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RateLimit {
  pub remaining: Option<f64>,
  pub reset:     Option<Duration>,
}

impl RateLimit {
  pub fn from_headers(headers: &HeaderMap) -> Self {
    Self {
      remaining: header_f64(headers, REMAINING),
      reset:     header_f64(headers, RESET).and_then(seconds),
    }
  }

  /// True once the current window has no requests left.
  pub fn exhausted(&self) -> bool { self.remaining.is_some_and(|r| r < 1.0) }

  /// How long to wait before the next request may be sent.
  pub fn wait(&self) -> Duration {
    self.reset.unwrap_or(DEFAULT_BACKOFF).min(MAX_BACKOFF)
  }
}

/// Sleep to apply after a 429: the reset window, else `Retry-After`, else
/// [`DEFAULT_BACKOFF`].
pub fn backoff(headers: &HeaderMap) -> Duration {
  RateLimit::from_headers(headers)
    .reset
    .or_else(|| header_f64(headers, RETRY_AFTER.as_str()).and_then(seconds))
    .unwrap_or(DEFAULT_BACKOFF)
    .min(MAX_BACKOFF)
}

fn header_f64(headers: &HeaderMap, name: &str) -> Option<f64> {
  headers.get(name)?.to_str().ok()?.trim().parse().ok()
}

fn seconds(value: f64) -> Option<Duration> {
  (value.is_finite() && value >= 0.0)
    .then(|| Duration::from_secs_f64(value.min(MAX_BACKOFF.as_secs_f64())))
}
