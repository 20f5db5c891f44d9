//! Error types for `postwatch-core`.

use std::fmt;

use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
  #[error("post id must not be empty")]
  EmptyPostId,

  #[error("post {0}: canonical name must not be empty")]
  EmptyCanonicalName(String),

  #[error("post {id}: {field} must be non-negative, got {value}")]
  NegativeCounter {
    id:    String,
    field: &'static str,
    value: i64,
  },

  #[error("timestamp out of range: {0}")]
  InvalidTimestamp(i64),

  #[error("freshness window of {0} seconds is out of range")]
  InvalidWindow(u64),

  #[error("storage error: {0}")]
  Storage(#[source] BoxError),

  #[error("gateway error: {0}")]
  Gateway(#[source] BoxError),
}

impl Error {
  /// Wrap a backend error raised by a [`MonitoringStore`](crate::store::MonitoringStore).
  pub fn storage<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Storage(Box::new(err))
  }

  /// Wrap a client error raised by a [`PlatformGateway`](crate::gateway::PlatformGateway).
  pub fn gateway<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Gateway(Box::new(err))
  }

  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::Storage(_) => ErrorKind::Storage,
      Self::Gateway(_) => ErrorKind::Gateway,
      Self::EmptyPostId
      | Self::EmptyCanonicalName(_)
      | Self::NegativeCounter { .. }
      | Self::InvalidTimestamp(_)
      | Self::InvalidWindow(_) => ErrorKind::Validation,
    }
  }
}

/// Coarse classification reported when a cycle aborts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  Storage,
  Gateway,
  Validation,
}

impl fmt::Display for ErrorKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::Storage => "StorageError",
      Self::Gateway => "GatewayError",
      Self::Validation => "ValidationError",
    })
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
