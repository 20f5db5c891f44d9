//! [`RedditGateway`] — the HTTP client behind the monitor.

use std::time::{Duration, Instant};

use postwatch_core::{gateway::PlatformGateway, post::PostSnapshot};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, de::DeserializeOwned};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{
  Error, RedditConfig, Result,
  listing::{LINK_KIND, Listing, Thing},
  ratelimit::{RateLimit, backoff},
};

/// Reddit refuses listing pages larger than this.
const PAGE_LIMIT: usize = 100;

/// Tokens are refreshed this long before Reddit would expire them.
const TOKEN_MARGIN: Duration = Duration::from_secs(60);

/// Longest community name Reddit allows.
const MAX_COMMUNITY_LEN: usize = 21;

// ─── Token ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct TokenResponse {
  access_token: Option<String>,
  expires_in:   Option<u64>,
  error:        Option<String>,
}

#[derive(Debug)]
struct AccessToken {
  value:      String,
  expires_at: Instant,
}

impl AccessToken {
  fn from_response(resp: TokenResponse, now: Instant) -> Result<Self> {
    if let Some(err) = resp.error {
      return Err(Error::Auth(err));
    }
    let value = resp
      .access_token
      .filter(|t| !t.is_empty())
      .ok_or_else(|| Error::Auth("token response carried no access_token".into()))?;
    let lifetime = Duration::from_secs(resp.expires_in.unwrap_or(3600));

    Ok(Self {
      value,
      expires_at: now + lifetime.saturating_sub(TOKEN_MARGIN),
    })
  }

  fn is_fresh(&self, now: Instant) -> bool { now < self.expires_at }
}

// ─── Gateway ─────────────────────────────────────────────────────────────────

/// A [`PlatformGateway`] talking to Reddit's OAuth API.
///
/// The bearer token is fetched lazily and shared by all requests until it
/// nears expiry.
pub struct RedditGateway {
  http:       Client,
  config:     RedditConfig,
  token:      Mutex<Option<AccessToken>>,
  /// Earliest instant the next request may go out, set when the rate-limit
  /// window is used up.
  not_before: Mutex<Option<Instant>>,
}

impl RedditGateway {
  pub fn new(config: RedditConfig) -> Result<Self> {
    let http = Client::builder()
      .user_agent(config.user_agent.clone())
      .timeout(Duration::from_secs(30))
      .build()?;

    Ok(Self {
      http,
      config,
      token: Mutex::new(None),
      not_before: Mutex::new(None),
    })
  }

  fn url(&self, path: &str) -> String {
    format!("{}{}", self.config.api_base.trim_end_matches('/'), path)
  }

  async fn access_token(&self) -> Result<String> {
    let mut cached = self.token.lock().await;
    if let Some(token) = cached.as_ref()
      && token.is_fresh(Instant::now())
    {
      return Ok(token.value.clone());
    }

    let token = self.request_token().await?;
    let value = token.value.clone();
    *cached = Some(token);
    Ok(value)
  }

  async fn request_token(&self) -> Result<AccessToken> {
    let resp = self
      .http
      .post(&self.config.auth_url)
      .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
      .form(&[("grant_type", "client_credentials")])
      .send()
      .await?;

    let status = resp.status();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
      return Err(Error::Auth(format!("token endpoint returned {status}")));
    }
    if !status.is_success() {
      return Err(Error::Status {
        status,
        endpoint: self.config.auth_url.clone(),
      });
    }

    let body: TokenResponse = resp.json().await?;
    let token = AccessToken::from_response(body, Instant::now())?;
    info!("obtained reddit access token");
    Ok(token)
  }

  async fn forget_token(&self) { *self.token.lock().await = None; }

  /// Sleep out an exhausted rate-limit window, if one was recorded.
  async fn pace(&self) {
    let pending = self.not_before.lock().await.take();

    if let Some(until) = pending {
      let wait = until.saturating_duration_since(Instant::now());
      if !wait.is_zero() {
        warn!(wait_secs = wait.as_secs_f64(), "rate-limit window used up; waiting");
        tokio::time::sleep(wait).await;
      }
    }
  }

  async fn record_limits(&self, limits: &RateLimit) {
    if limits.exhausted() {
      *self.not_before.lock().await = Some(Instant::now() + limits.wait());
    }
  }

  /// `GET` an API path and decode the JSON body, retrying through rate
  /// limiting and one token expiry.
  async fn get_json<T: DeserializeOwned>(
    &self,
    path: &str,
    query: &[(&str, String)],
  ) -> Result<T> {
    let url = self.url(path);
    let mut throttled = 0;
    let mut reauthenticated = false;

    loop {
      self.pace().await;
      let token = self.access_token().await?;

      debug!(%url, "GET");
      let resp = self
        .http
        .get(&url)
        .bearer_auth(&token)
        .query(query)
        .send()
        .await?;

      self
        .record_limits(&RateLimit::from_headers(resp.headers()))
        .await;
      let wait = backoff(resp.headers());

      match resp.status() {
        status if status.is_success() => return Ok(resp.json().await?),
        StatusCode::TOO_MANY_REQUESTS => {
          if throttled >= self.config.max_retries {
            return Err(Error::RateLimited(self.config.max_retries));
          }
          throttled += 1;
          warn!(%url, attempt = throttled, wait_secs = wait.as_secs_f64(), "rate limited");
          tokio::time::sleep(wait).await;
        }
        StatusCode::UNAUTHORIZED if !reauthenticated => {
          debug!("access token rejected; requesting a new one");
          reauthenticated = true;
          self.forget_token().await;
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
          return Err(Error::Auth(format!("{path} returned {}", resp.status())));
        }
        StatusCode::NOT_FOUND => return Err(Error::NotFound(path.to_owned())),
        status => {
          return Err(Error::Status {
            status,
            endpoint: path.to_owned(),
          });
        }
      }
    }
  }
}

/// Reject names that could not be a community and would escape the URL path.
fn check_community(name: &str) -> Result<()> {
  let valid = !name.is_empty()
    && name.len() <= MAX_COMMUNITY_LEN
    && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
  if valid {
    Ok(())
  } else {
    Err(Error::InvalidCommunity(name.to_owned()))
  }
}

// ─── PlatformGateway impl ────────────────────────────────────────────────────

impl PlatformGateway for RedditGateway {
  type Error = Error;

  async fn list_newest(
    &self,
    community: &str,
    limit: usize,
  ) -> Result<Vec<PostSnapshot>> {
    check_community(community)?;
    let path = format!("/r/{community}/new");

    let mut posts = Vec::with_capacity(limit.min(PAGE_LIMIT * 10));
    let mut after: Option<String> = None;

    while posts.len() < limit {
      let page_size = (limit - posts.len()).min(PAGE_LIMIT);
      let mut query = vec![
        ("limit", page_size.to_string()),
        ("raw_json", "1".to_owned()),
      ];
      if let Some(cursor) = &after {
        query.push(("after", cursor.clone()));
      }

      let page: Thing<Listing> = self.get_json(&path, &query).await?;
      let next = page.data.after.clone();
      let links = page.data.into_links()?;
      let fetched = links.len();

      for link in links {
        posts.push(link.into_snapshot()?);
      }
      debug!(community, fetched, total = posts.len(), "listing page");

      match next {
        Some(cursor) if fetched > 0 => after = Some(cursor),
        _ => break,
      }
    }

    posts.truncate(limit);
    Ok(posts)
  }

  async fn fetch_current_stats(&self, post_id: &str) -> Result<PostSnapshot> {
    let id = post_id
      .strip_prefix(&format!("{LINK_KIND}_"))
      .unwrap_or(post_id);

    let page: Thing<Listing> = self
      .get_json("/api/info", &[
        ("id", format!("{LINK_KIND}_{id}")),
        ("raw_json", "1".to_owned()),
      ])
      .await?;

    page
      .data
      .into_links()?
      .into_iter()
      .find(|link| link.id == id)
      .ok_or_else(|| Error::NotFound(format!("post {id}")))?
      .into_snapshot()
  }
}
