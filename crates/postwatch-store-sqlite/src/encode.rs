//! Encoding and decoding helpers between domain types and SQLite columns.
//!
//! Timestamps are stored as whole Unix seconds. Counters are stored as
//! INTEGER, so they must fit in an `i64`.

use chrono::{DateTime, Utc};
use postwatch_core::post::{PostMetadata, StatsSample, from_unix_seconds};

use crate::{Error, Result};

// ─── Timestamps ──────────────────────────────────────────────────────────────

pub fn encode_ts(dt: DateTime<Utc>) -> i64 { dt.timestamp() }

pub fn decode_ts(secs: i64) -> Result<DateTime<Utc>> { Ok(from_unix_seconds(secs)?) }

// ─── Counters ────────────────────────────────────────────────────────────────

pub fn encode_counter(n: u64) -> Result<i64> {
  i64::try_from(n).map_err(|_| Error::CounterOverflow(n))
}

pub fn decode_counter(n: i64) -> Result<u64> {
  u64::try_from(n).map_err(|_| Error::NegativeCounter(n))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `submissions` row.
pub struct RawPost {
  pub id:          String,
  pub author:      String,
  pub created_utc: i64,
  pub name:        String,
  pub permalink:   String,
  pub selftext:    Option<String>,
  pub title:       String,
}

impl RawPost {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:          row.get(0)?,
      author:      row.get(1)?,
      created_utc: row.get(2)?,
      name:        row.get(3)?,
      permalink:   row.get(4)?,
      selftext:    row.get(5)?,
      title:       row.get(6)?,
    })
  }

  pub fn into_post(self) -> Result<PostMetadata> {
    Ok(PostMetadata {
      id:             self.id,
      author:         self.author,
      created_at:     decode_ts(self.created_utc)?,
      canonical_name: self.name,
      permalink:      self.permalink,
      body_text:      self.selftext.unwrap_or_default(),
      title:          self.title,
    })
  }
}

/// Raw values read directly from a `stats` row.
pub struct RawSample {
  pub submission_id: String,
  pub time_utc:      i64,
  pub ups:           i64,
  pub downs:         i64,
  pub num_comments:  i64,
}

impl RawSample {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      submission_id: row.get(0)?,
      time_utc:      row.get(1)?,
      ups:           row.get(2)?,
      downs:         row.get(3)?,
      num_comments:  row.get(4)?,
    })
  }

  pub fn into_sample(self) -> Result<StatsSample> {
    Ok(StatsSample {
      post_id:       self.submission_id,
      sampled_at:    decode_ts(self.time_utc)?,
      upvotes:       decode_counter(self.ups)?,
      downvotes:     decode_counter(self.downs)?,
      comment_count: decode_counter(self.num_comments)?,
    })
  }
}
