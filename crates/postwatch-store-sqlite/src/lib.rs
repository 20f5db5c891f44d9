//! SQLite backend for the postwatch monitor.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated
//! thread without blocking the async runtime. A [`SqliteStore`] owns a single
//! connection, so a transaction opened with `begin` covers every call made
//! through the same store until `commit` or `rollback`.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
