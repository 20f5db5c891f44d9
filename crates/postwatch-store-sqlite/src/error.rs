//! Error type for `postwatch-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] postwatch_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("counter {0} does not fit in an INTEGER column")]
  CounterOverflow(u64),

  #[error("stored counter is negative: {0}")]
  NegativeCounter(i64),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
