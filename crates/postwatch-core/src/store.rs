//! The `MonitoringStore` trait.
//!
//! Implemented by storage backends (e.g. `postwatch-store-sqlite`). The
//! update cycle depends on this abstraction, not on any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::post::{PostMetadata, StatsSample};

/// Abstraction over the metadata and stats stores.
///
/// Both record kinds are insert-only. An insert whose key already exists is a
/// successful no-op that leaves the stored row untouched; the returned `bool`
/// reports whether a row was actually written.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes.
pub trait MonitoringStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Transactions ──────────────────────────────────────────────────────

  /// Open a transaction covering every following call until [`commit`] or
  /// [`rollback`].
  ///
  /// [`commit`]: MonitoringStore::commit
  /// [`rollback`]: MonitoringStore::rollback
  fn begin(&self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn commit(&self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn rollback(
    &self,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Metadata ──────────────────────────────────────────────────────────

  /// Point lookup by post id. Returns `None` if the post was never stored.
  fn get_post<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<Option<PostMetadata>, Self::Error>> + Send + 'a;

  /// Persist `meta` unless a post with the same id already exists.
  fn insert_post(
    &self,
    meta: PostMetadata,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// All posts with `created_at >= threshold`, in no particular order.
  fn list_posts_created_since(
    &self,
    threshold: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<PostMetadata>, Self::Error>> + Send + '_;

  // ── Stats ─────────────────────────────────────────────────────────────

  fn get_sample<'a>(
    &'a self,
    post_id: &'a str,
    sampled_at: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<StatsSample>, Self::Error>> + Send + 'a;

  /// Persist `sample` unless one already exists for the same post and time.
  fn insert_sample(
    &self,
    sample: StatsSample,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// The stored time series for a post, oldest first.
  fn list_samples<'a>(
    &'a self,
    post_id: &'a str,
  ) -> impl Future<Output = Result<Vec<StatsSample>, Self::Error>> + Send + 'a;
}
