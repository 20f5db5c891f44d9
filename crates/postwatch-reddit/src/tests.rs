//! `RedditGateway` against a local stand-in for Reddit's OAuth API.

use std::{
  collections::{HashMap, VecDeque},
  sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
  },
  time::{Duration, Instant},
};

use axum::{
  Json, Router,
  extract::{Query, State},
  http::{HeaderMap, StatusCode, Uri, header::AUTHORIZATION},
  response::{IntoResponse, Response},
  routing::post,
};
use postwatch_core::gateway::PlatformGateway;
use serde_json::{Value, json};

use crate::{Error, RedditConfig, RedditGateway};

// ─── Fake Reddit ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct Seen {
  path:   String,
  query:  HashMap<String, String>,
  bearer: String,
}

/// Issues numbered tokens and answers API calls from a queue of replies,
/// recording each call.
#[derive(Default)]
struct FakeReddit {
  tokens:   AtomicUsize,
  replies:  Mutex<VecDeque<Response>>,
  requests: Mutex<Vec<Seen>>,
}

impl FakeReddit {
  fn requests(&self) -> Vec<Seen> { self.requests.lock().unwrap().clone() }

  fn tokens(&self) -> usize { self.tokens.load(Ordering::SeqCst) }
}

async fn token(State(fake): State<Arc<FakeReddit>>) -> Json<Value> {
  let n = fake.tokens.fetch_add(1, Ordering::SeqCst) + 1;
  Json(json!({
    "access_token": format!("tok-{n}"),
    "token_type": "bearer",
    "expires_in": 3600,
  }))
}

async fn api(
  State(fake): State<Arc<FakeReddit>>,
  uri: Uri,
  Query(query): Query<HashMap<String, String>>,
  headers: HeaderMap,
) -> Response {
  let bearer = headers
    .get(AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .unwrap_or_default()
    .trim_start_matches("Bearer ")
    .to_owned();
  fake.requests.lock().unwrap().push(Seen {
    path: uri.path().to_owned(),
    query,
    bearer,
  });
  fake
    .replies
    .lock()
    .unwrap()
    .pop_front()
    .unwrap_or_else(|| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

/// Start the fake on an ephemeral port and point a config at it.
async fn serve(replies: Vec<Response>) -> (Arc<FakeReddit>, RedditConfig) {
  let fake = Arc::new(FakeReddit {
    replies: Mutex::new(replies.into()),
    ..FakeReddit::default()
  });
  let app = Router::new()
    .route("/token", post(token))
    .fallback(api)
    .with_state(fake.clone());

  let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

  let mut config = RedditConfig::new("id", "secret");
  config.api_base = format!("http://{addr}");
  config.auth_url = format!("http://{addr}/token");
  (fake, config)
}

// ─── Replies ─────────────────────────────────────────────────────────────────

fn ids(prefix: &str, n: usize) -> Vec<String> {
  (0..n).map(|i| format!("{prefix}{i}")).collect()
}

fn listing(ids: Vec<String>, after: Option<&str>) -> Value {
  let children: Vec<Value> = ids
    .into_iter()
    .map(|id| {
      json!({
        "kind": "t3",
        "data": {
          "id": id,
          "author": "someone",
          "created_utc": 1_700_000_000.0,
          "name": format!("t3_{id}"),
          "permalink": format!("/r/dndnext/comments/{id}/"),
          "title": "a post",
          "ups": 3,
          "downs": 0,
          "num_comments": 1,
        }
      })
    })
    .collect();
  json!({ "kind": "Listing", "data": { "after": after, "children": children } })
}

fn page(ids: Vec<String>, after: Option<&str>) -> Response {
  Json(listing(ids, after)).into_response()
}

fn throttled() -> Response {
  (StatusCode::TOO_MANY_REQUESTS, [("x-ratelimit-reset", "0")]).into_response()
}

// ─── Listings ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn listing_follows_cursor_and_truncates_to_limit() {
  let (fake, config) = serve(vec![
    page(ids("a", 100), Some("t3_a99")),
    page(ids("b", 60), Some("t3_b59")),
  ])
  .await;
  let gw = RedditGateway::new(config).unwrap();

  let posts = gw.list_newest("dndnext", 150).await.unwrap();

  assert_eq!(posts.len(), 150);
  assert_eq!(posts[0].id, "a0");
  assert_eq!(posts[149].id, "b49");

  let seen = fake.requests();
  assert_eq!(seen.len(), 2);
  assert_eq!(seen[0].path, "/r/dndnext/new");
  assert_eq!(seen[0].query["limit"], "100");
  assert!(!seen[0].query.contains_key("after"));
  assert_eq!(seen[1].query["limit"], "50");
  assert_eq!(seen[1].query["after"], "t3_a99");
  assert!(seen.iter().all(|s| s.bearer == "tok-1"));
  assert_eq!(fake.tokens(), 1);
}

#[tokio::test]
async fn listing_stops_on_an_empty_page() {
  let (fake, config) = serve(vec![
    page(ids("a", 3), Some("t3_a2")),
    page(vec![], Some("t3_zz")),
  ])
  .await;
  let gw = RedditGateway::new(config).unwrap();

  let posts = gw.list_newest("dndnext", 50).await.unwrap();

  assert_eq!(posts.len(), 3);
  let seen = fake.requests();
  assert_eq!(seen.len(), 2);
  assert_eq!(seen[1].query["limit"], "47");
}

#[tokio::test]
async fn listing_stops_without_a_cursor() {
  let (fake, config) = serve(vec![page(ids("a", 2), None)]).await;
  let gw = RedditGateway::new(config).unwrap();

  assert_eq!(gw.list_newest("dndnext", 10).await.unwrap().len(), 2);
  assert_eq!(fake.requests().len(), 1);
}

// ─── Single posts ────────────────────────────────────────────────────────────

#[tokio::test]
async fn single_post_is_looked_up_by_fullname() {
  let (fake, config) = serve(vec![page(ids("a", 1), None)]).await;
  let gw = RedditGateway::new(config).unwrap();

  let snap = gw.fetch_current_stats("a0").await.unwrap();

  assert_eq!(snap.id, "a0");
  assert_eq!(snap.upvotes, 3);
  let seen = fake.requests();
  assert_eq!(seen[0].path, "/api/info");
  assert_eq!(seen[0].query["id"], "t3_a0");
}

#[tokio::test]
async fn missing_post_is_not_found() {
  let (_fake, config) = serve(vec![
    StatusCode::NOT_FOUND.into_response(),
    page(vec![], None),
  ])
  .await;
  let gw = RedditGateway::new(config).unwrap();

  assert!(matches!(gw.fetch_current_stats("gone").await, Err(Error::NotFound(_))));
  assert!(matches!(gw.fetch_current_stats("gone").await, Err(Error::NotFound(_))));
}

// ─── Rate limiting and auth ──────────────────────────────────────────────────

#[tokio::test]
async fn throttled_request_is_retried() {
  let (fake, config) = serve(vec![throttled(), page(ids("a", 1), None)]).await;
  let gw = RedditGateway::new(config).unwrap();

  assert_eq!(gw.fetch_current_stats("a0").await.unwrap().id, "a0");
  assert_eq!(fake.requests().len(), 2);
}

#[tokio::test]
async fn throttling_gives_up_after_max_retries() {
  let (fake, mut config) = serve(vec![throttled(), throttled(), throttled()]).await;
  config.max_retries = 2;
  let gw = RedditGateway::new(config).unwrap();

  assert!(matches!(
    gw.fetch_current_stats("a0").await,
    Err(Error::RateLimited(2))
  ));
  assert_eq!(fake.requests().len(), 3);
}

#[tokio::test]
async fn exhausted_window_delays_the_next_request() {
  let (_fake, config) = serve(vec![
    (
      StatusCode::OK,
      [("x-ratelimit-remaining", "0"), ("x-ratelimit-reset", "0.3")],
      Json(listing(ids("a", 1), None)),
    )
      .into_response(),
    page(ids("a", 1), None),
  ])
  .await;
  let gw = RedditGateway::new(config).unwrap();

  gw.fetch_current_stats("a0").await.unwrap();
  let started = Instant::now();
  gw.fetch_current_stats("a0").await.unwrap();

  assert!(started.elapsed() >= Duration::from_millis(250));
}

#[tokio::test]
async fn rejected_token_is_renewed_once() {
  let (fake, config) = serve(vec![
    StatusCode::UNAUTHORIZED.into_response(),
    page(ids("a", 1), None),
  ])
  .await;
  let gw = RedditGateway::new(config).unwrap();

  gw.fetch_current_stats("a0").await.unwrap();

  assert_eq!(fake.tokens(), 2);
  let bearers: Vec<String> = fake.requests().into_iter().map(|s| s.bearer).collect();
  assert_eq!(bearers, ["tok-1", "tok-2"]);
}

#[tokio::test]
async fn repeated_rejection_is_an_auth_failure() {
  let (fake, config) = serve(vec![
    StatusCode::UNAUTHORIZED.into_response(),
    StatusCode::UNAUTHORIZED.into_response(),
  ])
  .await;
  let gw = RedditGateway::new(config).unwrap();

  assert!(matches!(gw.fetch_current_stats("a0").await, Err(Error::Auth(_))));
  assert_eq!(fake.tokens(), 2);
  assert_eq!(fake.requests().len(), 2);
}
