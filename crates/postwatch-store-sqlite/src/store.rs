//! [`SqliteStore`] — the SQLite implementation of [`MonitoringStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use tracing::{debug, warn};

use postwatch_core::{
  post::{PostMetadata, StatsSample},
  store::MonitoringStore,
};

use crate::{
  Result,
  encode::{RawPost, RawSample, encode_counter, encode_ts},
  schema::SCHEMA,
};

const POST_COLUMNS: &str =
  "id, author, created_utc, name, permalink, selftext, title";

const SAMPLE_COLUMNS: &str =
  "submission_id, time_utc, ups, downs, num_comments";

// ─── Store ───────────────────────────────────────────────────────────────────

/// A monitoring store backed by a single SQLite file.
///
/// Cloning is cheap; clones share the same connection and therefore the same
/// open transaction.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl std::fmt::Debug for SqliteStore {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("SqliteStore").finish_non_exhaustive()
  }
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn execute_batch(&self, sql: &'static str) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute_batch(sql)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── MonitoringStore impl ────────────────────────────────────────────────────

impl MonitoringStore for SqliteStore {
  type Error = crate::Error;

  // ── Transactions ──────────────────────────────────────────────────────────

  async fn begin(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        // A cycle dropped mid-flight leaves its transaction open on the
        // shared connection; its writes must not leak into this one.
        if !conn.is_autocommit() {
          warn!("discarding a transaction left open by an abandoned cycle");
          conn.execute_batch("ROLLBACK")?;
        }
        // Takes the write lock at BEGIN, not at the first write.
        conn.execute_batch("BEGIN IMMEDIATE")?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn commit(&self) -> Result<()> { self.execute_batch("COMMIT").await }

  async fn rollback(&self) -> Result<()> { self.execute_batch("ROLLBACK").await }

  // ── Metadata ──────────────────────────────────────────────────────────────

  async fn get_post(&self, id: &str) -> Result<Option<PostMetadata>> {
    let id = id.to_owned();

    let raw: Option<RawPost> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {POST_COLUMNS} FROM submissions WHERE id = ?1"),
              rusqlite::params![id],
              RawPost::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawPost::into_post).transpose()
  }

  async fn insert_post(&self, meta: PostMetadata) -> Result<bool> {
    let created_utc = encode_ts(meta.created_at);

    let inserted = self
      .conn
      .call(move |conn| {
        let exists = conn
          .query_row(
            "SELECT 1 FROM submissions WHERE id = ?1",
            rusqlite::params![meta.id],
            |_| Ok(()),
          )
          .optional()?
          .is_some();

        if exists {
          return Ok(false);
        }

        conn.execute(
          "INSERT INTO submissions (
             id, author, created_utc, name, permalink, selftext, title
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            meta.id,
            meta.author,
            created_utc,
            meta.canonical_name,
            meta.permalink,
            meta.body_text,
            meta.title,
          ],
        )?;
        Ok(true)
      })
      .await?;

    Ok(inserted)
  }

  async fn list_posts_created_since(
    &self,
    threshold: DateTime<Utc>,
  ) -> Result<Vec<PostMetadata>> {
    let threshold = encode_ts(threshold);

    let raws: Vec<RawPost> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {POST_COLUMNS} FROM submissions WHERE created_utc >= ?1"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![threshold], RawPost::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    debug!(threshold, count = raws.len(), "listed posts in window");
    raws.into_iter().map(RawPost::into_post).collect()
  }

  // ── Stats ─────────────────────────────────────────────────────────────────

  async fn get_sample(
    &self,
    post_id: &str,
    sampled_at: DateTime<Utc>,
  ) -> Result<Option<StatsSample>> {
    let post_id = post_id.to_owned();
    let time_utc = encode_ts(sampled_at);

    let raw: Option<RawSample> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {SAMPLE_COLUMNS} FROM stats
                 WHERE submission_id = ?1 AND time_utc = ?2"
              ),
              rusqlite::params![post_id, time_utc],
              RawSample::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawSample::into_sample).transpose()
  }

  async fn insert_sample(&self, sample: StatsSample) -> Result<bool> {
    let time_utc     = encode_ts(sample.sampled_at);
    let ups          = encode_counter(sample.upvotes)?;
    let downs        = encode_counter(sample.downvotes)?;
    let num_comments = encode_counter(sample.comment_count)?;
    let post_id      = sample.post_id;

    let inserted = self
      .conn
      .call(move |conn| {
        let exists = conn
          .query_row(
            "SELECT 1 FROM stats WHERE submission_id = ?1 AND time_utc = ?2",
            rusqlite::params![post_id, time_utc],
            |_| Ok(()),
          )
          .optional()?
          .is_some();

        if exists {
          return Ok(false);
        }

        conn.execute(
          "INSERT INTO stats (submission_id, time_utc, ups, downs, num_comments)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![post_id, time_utc, ups, downs, num_comments],
        )?;
        Ok(true)
      })
      .await?;

    Ok(inserted)
  }

  async fn list_samples(&self, post_id: &str) -> Result<Vec<StatsSample>> {
    let post_id = post_id.to_owned();

    let raws: Vec<RawSample> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {SAMPLE_COLUMNS} FROM stats
           WHERE submission_id = ?1
           ORDER BY time_utc ASC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![post_id], RawSample::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSample::into_sample).collect()
  }
}
