//! Connection settings for the Reddit API.

/// Credentials and endpoints used by [`RedditGateway`](crate::RedditGateway).
#[derive(Debug, Clone)]
pub struct RedditConfig {
  pub client_id:     String,
  pub client_secret: String,
  /// Sent on every request; Reddit throttles generic user agents hard.
  pub user_agent:    String,
  /// How many times a rate-limited request is retried before failing.
  pub max_retries:   u32,
  pub auth_url:      String,
  pub api_base:      String,
}

impl RedditConfig {
  pub const AUTH_URL: &'static str = "https://www.reddit.com/api/v1/access_token";
  pub const API_BASE: &'static str = "https://oauth.reddit.com";

  pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
    let client_id = client_id.into();
    Self {
      user_agent: user_agent(&client_id, None),
      client_id,
      client_secret: client_secret.into(),
      max_retries: 3,
      auth_url: Self::AUTH_URL.to_owned(),
      api_base: Self::API_BASE.to_owned(),
    }
  }
}

/// Build a user agent in the `<platform>:<app id>:<version> (by /u/<user>)`
/// form Reddit asks API clients to use.
pub fn user_agent(client_id: &str, username: Option<&str>) -> String {
  let base = format!(
    "{}:{client_id}:v{}",
    std::env::consts::OS,
    env!("CARGO_PKG_VERSION")
  );
  match username {
    Some(user) if !user.is_empty() => format!("{base} (by /u/{user})"),
    _ => base,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn user_agent_names_app_and_owner() {
    let ua = user_agent("abc123", Some("someone"));
    assert!(ua.contains(":abc123:v"));
    assert!(ua.ends_with(" (by /u/someone)"));
  }

  #[test]
  fn user_agent_without_owner() {
    let ua = user_agent("abc123", None);
    assert!(!ua.contains("(by"));
    assert_eq!(ua, user_agent("abc123", Some("")));
  }

  #[test]
  fn defaults_point_at_reddit() {
    let cfg = RedditConfig::new("id", "secret");
    assert_eq!(cfg.auth_url, RedditConfig::AUTH_URL);
    assert_eq!(cfg.api_base, RedditConfig::API_BASE);
    assert_eq!(cfg.max_retries, 3);
  }
}
