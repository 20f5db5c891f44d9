//! Wire types for Reddit's `Listing` / `t3` JSON and their conversion into
//! [`PostSnapshot`]s.

use postwatch_core::post::{PostSnapshot, from_unix_seconds};
use serde::Deserialize;

use crate::{Error, Result};

/// Kind tag Reddit uses for posts ("links").
pub const LINK_KIND: &str = "t3";

/// Author recorded when the account behind a post no longer exists.
pub const DELETED_AUTHOR: &str = "[deleted]";

/// The `{"kind": .., "data": ..}` envelope around every Reddit object.
#[derive(Debug, Deserialize)]
pub struct Thing<T> {
  pub kind: String,
  pub data: T,
}

#[derive(Debug, Deserialize)]
pub struct Listing {
  /// Cursor for the next page; `None` once the listing is exhausted.
  pub after:    Option<String>,
  #[serde(default)]
  pub children: Vec<Thing<serde_json::Value>>,
}

impl Listing {
  /// Decode the `t3` children, skipping any other kind.
  pub fn into_links(self) -> Result<Vec<Link>> {
    self
      .children
      .into_iter()
      .filter(|child| child.kind == LINK_KIND)
      .map(|child| {
        serde_json::from_value(child.data)
          .map_err(|e| Error::Malformed(format!("t3 payload: {e}")))
      })
      .collect()
  }
}

/// The fields of a `t3` object the monitor cares about.
#[derive(Debug, Deserialize)]
pub struct Link {
  pub id:           String,
  pub author:       Option<String>,
  /// Seconds since the epoch; Reddit sends it as a float.
  pub created_utc:  f64,
  pub name:         String,
  pub permalink:    String,
  #[serde(default)]
  pub selftext:     String,
  pub title:        String,
  #[serde(default)]
  pub ups:          i64,
  #[serde(default)]
  pub downs:        i64,
  #[serde(default)]
  pub num_comments: i64,
}

impl Link {
  pub fn into_snapshot(self) -> Result<PostSnapshot> {
    if !self.created_utc.is_finite() {
      return Err(Error::Malformed(format!(
        "post {}: created_utc is not a number",
        self.id
      )));
    }
    let created_at = from_unix_seconds(self.created_utc.floor() as i64)?;

    Ok(PostSnapshot {
      id: self.id,
      author: self
        .author
        .filter(|a| !a.is_empty())
        .unwrap_or_else(|| DELETED_AUTHOR.to_owned()),
      created_at,
      canonical_name: self.name,
      permalink: self.permalink,
      body_text: self.selftext,
      title: self.title,
      upvotes: self.ups,
      downvotes: self.downs,
      comment_count: self.num_comments,
    })
  }
}
