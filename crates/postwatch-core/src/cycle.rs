//! The update cycle — one polling pass over a community.
//!
//! A cycle lists the newest posts, stores their metadata and a stats sample
//! each, then re-samples every stored post still inside the freshness window
//! that the listing did not already cover. All writes of a cycle share one
//! transaction: it commits when the pass completes and rolls back on the
//! first error.

use std::collections::HashSet;

use chrono::{DateTime, SubsecRound, TimeDelta, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
  Error, Result,
  gateway::PlatformGateway,
  post::PostMetadata,
  store::MonitoringStore,
};

// ─── Parameters ──────────────────────────────────────────────────────────────

/// What to poll and how long posts stay eligible for re-sampling.
#[derive(Debug, Clone)]
pub struct CycleParams {
  pub community:        String,
  /// How many posts to request from the newest listing.
  pub new_limit:        usize,
  /// Time after creation during which a post is re-sampled.
  pub freshness_window: TimeDelta,
}

impl CycleParams {
  pub fn new(
    community: impl Into<String>,
    new_limit: usize,
    freshness_window_secs: u64,
  ) -> Result<Self> {
    let freshness_window = i64::try_from(freshness_window_secs)
      .ok()
      .and_then(TimeDelta::try_seconds)
      .ok_or(Error::InvalidWindow(freshness_window_secs))?;

    Ok(Self {
      community: community.into(),
      new_limit,
      freshness_window,
    })
  }

  /// The earliest creation time still inside the window at `now`.
  pub fn cutoff(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    now
      .checked_sub_signed(self.freshness_window)
      .ok_or_else(|| {
        Error::InvalidWindow(self.freshness_window.num_seconds().unsigned_abs())
      })
  }
}

// ─── Report ──────────────────────────────────────────────────────────────────

/// Counts describing what a committed cycle did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
  /// Snapshots returned by the newest listing.
  pub listed:      usize,
  /// Metadata rows written (first sightings).
  pub new_posts:   usize,
  /// Stats rows written, from the listing and from re-sampling.
  pub new_samples: usize,
  /// In-window posts fetched individually because the listing missed them.
  pub resampled:   usize,
}

// ─── Dedup ───────────────────────────────────────────────────────────────────

/// Posts from `in_window` whose id is not in `fetched_ids`, each id at most
/// once.
pub fn stale_candidates(
  in_window: Vec<PostMetadata>,
  fetched_ids: &HashSet<String>,
) -> Vec<PostMetadata> {
  let mut seen = HashSet::with_capacity(in_window.len());
  in_window
    .into_iter()
    .filter(|post| !fetched_ids.contains(&post.id) && seen.insert(post.id.clone()))
    .collect()
}

// ─── Cycle ───────────────────────────────────────────────────────────────────

/// Run one update cycle at `now` inside a single store transaction.
///
/// `now` is truncated to whole seconds; every sample written by the cycle
/// carries that timestamp. On error the transaction is rolled back and the
/// original error is returned.
pub async fn run_cycle<S, G>(
  store: &S,
  gateway: &G,
  params: &CycleParams,
  now: DateTime<Utc>,
) -> Result<CycleReport>
where
  S: MonitoringStore,
  G: PlatformGateway,
{
  let now = now.trunc_subsecs(0);
  store.begin().await.map_err(Error::storage)?;

  let outcome = match cycle_body(store, gateway, params, now).await {
    Ok(report) => store.commit().await.map(|()| report).map_err(Error::storage),
    Err(err) => Err(err),
  };

  match outcome {
    Ok(report) => {
      info!(
        community = %params.community,
        listed = report.listed,
        new_posts = report.new_posts,
        new_samples = report.new_samples,
        resampled = report.resampled,
        "cycle committed"
      );
      Ok(report)
    }
    Err(err) => {
      if let Err(rollback_err) = store.rollback().await {
        warn!(error = %rollback_err, "rollback after failed cycle did not complete");
      }
      Err(err)
    }
  }
}

async fn cycle_body<S, G>(
  store: &S,
  gateway: &G,
  params: &CycleParams,
  now: DateTime<Utc>,
) -> Result<CycleReport>
where
  S: MonitoringStore,
  G: PlatformGateway,
{
  let cutoff = params.cutoff(now)?;
  let mut report = CycleReport::default();

  let listing = gateway
    .list_newest(&params.community, params.new_limit)
    .await
    .map_err(Error::gateway)?;
  report.listed = listing.len();
  info!(community = %params.community, listed = listing.len(), "fetched newest posts");

  let mut fetched_ids = HashSet::with_capacity(listing.len());
  for snapshot in &listing {
    let meta = snapshot.metadata()?;
    let sample = snapshot.sample_at(now)?;
    fetched_ids.insert(meta.id.clone());

    if store.insert_post(meta).await.map_err(Error::storage)? {
      report.new_posts += 1;
    }
    if store.insert_sample(sample).await.map_err(Error::storage)? {
      report.new_samples += 1;
    }
  }

  let in_window = store
    .list_posts_created_since(cutoff)
    .await
    .map_err(Error::storage)?;
  let stale = stale_candidates(in_window, &fetched_ids);
  info!(%cutoff, stale = stale.len(), "re-sampling posts inside the freshness window");

  for post in &stale {
    debug!(post_id = %post.id, "fetching current stats");
    let snapshot = gateway
      .fetch_current_stats(&post.id)
      .await
      .map_err(Error::gateway)?;
    let sample = snapshot.sample_at(now)?;

    if store.insert_sample(sample).await.map_err(Error::storage)? {
      report.new_samples += 1;
    }
    report.resampled += 1;
  }

  Ok(report)
}
