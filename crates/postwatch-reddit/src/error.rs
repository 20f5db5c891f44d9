//! Error type for `postwatch-reddit`.

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("authentication failed: {0}")]
  Auth(String),

  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("not found: {0}")]
  NotFound(String),

  #[error("invalid community name: {0:?}")]
  InvalidCommunity(String),

  #[error("unexpected status {status} from {endpoint}")]
  Status {
    status:   StatusCode,
    endpoint: String,
  },

  #[error("rate limit still exceeded after {0} retries")]
  RateLimited(u32),

  #[error("malformed response: {0}")]
  Malformed(String),

  #[error("invalid post data: {0}")]
  Post(#[from] postwatch_core::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
