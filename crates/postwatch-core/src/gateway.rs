//! The `PlatformGateway` trait — the monitor's view of the remote platform.
//!
//! Implementations own authentication, pagination and rate-limit backoff.
//! From the cycle's point of view every call blocks until it yields a
//! snapshot or fails.

use std::future::Future;

use crate::post::PostSnapshot;

pub trait PlatformGateway: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Up to `limit` of the most recently created posts in `community`,
  /// newest first.
  fn list_newest<'a>(
    &'a self,
    community: &'a str,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<PostSnapshot>, Self::Error>> + Send + 'a;

  /// A fresh snapshot of a single post.
  fn fetch_current_stats<'a>(
    &'a self,
    post_id: &'a str,
  ) -> impl Future<Output = Result<PostSnapshot, Self::Error>> + Send + 'a;
}
