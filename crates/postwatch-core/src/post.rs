//! Post types — the records the monitor persists.
//!
//! A post's metadata is written once, on first observation. Engagement
//! counters are captured as a growing series of [`StatsSample`]s, one per
//! observation. Neither record is ever updated or deleted.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── Timestamps ──────────────────────────────────────────────────────────────

/// Convert whole Unix seconds into a UTC timestamp.
///
/// Negative values and values outside chrono's range are rejected.
pub fn from_unix_seconds(secs: i64) -> Result<DateTime<Utc>> {
  if secs < 0 {
    return Err(Error::InvalidTimestamp(secs));
  }
  DateTime::from_timestamp(secs, 0).ok_or(Error::InvalidTimestamp(secs))
}

// ─── PostMetadata ────────────────────────────────────────────────────────────

/// The immutable description of a post. At most one exists per `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostMetadata {
  /// Platform-assigned identifier, e.g. `1abc2d`.
  pub id:             String,
  pub author:         String,
  /// When the post was created on the platform; never changes.
  pub created_at:     DateTime<Utc>,
  /// Fully-qualified platform identifier, e.g. `t3_1abc2d`.
  pub canonical_name: String,
  pub permalink:      String,
  /// Self-post body; empty for link posts.
  pub body_text:      String,
  pub title:          String,
}

// ─── StatsSample ─────────────────────────────────────────────────────────────

/// Engagement counters for one post at one instant. At most one exists per
/// `(post_id, sampled_at)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSample {
  pub post_id:       String,
  pub sampled_at:    DateTime<Utc>,
  pub upvotes:       u64,
  pub downvotes:     u64,
  pub comment_count: u64,
}

// ─── PostSnapshot ────────────────────────────────────────────────────────────

/// A point-in-time read of a post from the platform: the immutable fields
/// plus the counters as reported at fetch time.
///
/// Counters are kept signed here because that is how the platform reports
/// them; they are validated on conversion to a [`StatsSample`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostSnapshot {
  pub id:             String,
  pub author:         String,
  pub created_at:     DateTime<Utc>,
  pub canonical_name: String,
  pub permalink:      String,
  pub body_text:      String,
  pub title:          String,
  pub upvotes:        i64,
  pub downvotes:      i64,
  pub comment_count:  i64,
}

impl PostSnapshot {
  /// The immutable part of the snapshot.
  pub fn metadata(&self) -> Result<PostMetadata> {
    self.check_identity()?;
    Ok(PostMetadata {
      id:             self.id.clone(),
      author:         self.author.clone(),
      created_at:     self.created_at,
      canonical_name: self.canonical_name.clone(),
      permalink:      self.permalink.clone(),
      body_text:      self.body_text.clone(),
      title:          self.title.clone(),
    })
  }

  /// The counters of the snapshot, stamped with `sampled_at` truncated to
  /// whole seconds.
  pub fn sample_at(&self, sampled_at: DateTime<Utc>) -> Result<StatsSample> {
    self.check_identity()?;
    Ok(StatsSample {
      post_id:       self.id.clone(),
      sampled_at:    sampled_at.trunc_subsecs(0),
      upvotes:       self.counter("upvotes", self.upvotes)?,
      downvotes:     self.counter("downvotes", self.downvotes)?,
      comment_count: self.counter("comment_count", self.comment_count)?,
    })
  }

  fn check_identity(&self) -> Result<()> {
    if self.id.is_empty() {
      return Err(Error::EmptyPostId);
    }
    if self.canonical_name.is_empty() {
      return Err(Error::EmptyCanonicalName(self.id.clone()));
    }
    if self.created_at.timestamp() < 0 {
      return Err(Error::InvalidTimestamp(self.created_at.timestamp()));
    }
    Ok(())
  }

  fn counter(&self, field: &'static str, value: i64) -> Result<u64> {
    u64::try_from(value).map_err(|_| Error::NegativeCounter {
      id: self.id.clone(),
      field,
      value,
    })
  }
}
