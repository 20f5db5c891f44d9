//! Layered configuration for the `postwatch` binary.
//!
//! Precedence, lowest first: built-in defaults, the TOML config file,
//! `POSTWATCH_*` environment variables, then command-line flags (which also
//! pick up `REDDIT_CLIENT_ID`, `REDDIT_CLIENT_SECRET` and
//! `MONITORING_DB_PATH`).

use std::path::{Path, PathBuf};

use postwatch_reddit::{RedditConfig, config::user_agent};
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_COMMUNITY: &str = "dndnext";
pub const DEFAULT_NEW_LIMIT: i64 = 20;
/// 48 hours.
pub const DEFAULT_FRESHNESS_WINDOW_SECS: i64 = 172_800;
pub const DEFAULT_MAX_RETRIES: i64 = 3;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("missing {what}; set {env} or `{key}` in the config file")]
  Missing {
    what: &'static str,
    env:  &'static str,
    key:  &'static str,
  },

  #[error("invalid {field}: {reason}")]
  Invalid {
    field:  &'static str,
    reason: String,
  },

  #[error("failed to load configuration: {0}")]
  Load(#[from] config::ConfigError),
}

/// Values supplied on the command line; `None` defers to lower layers.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
  pub community:             Option<String>,
  pub new_limit:             Option<usize>,
  pub freshness_window_secs: Option<u64>,
  pub client_id:             Option<String>,
  pub client_secret:         Option<String>,
  pub db_path:               Option<PathBuf>,
}

/// Fully merged settings. Credentials and the database path stay optional
/// here because not every command needs them.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
  pub community:             String,
  pub new_limit:             usize,
  pub freshness_window_secs: u64,
  pub max_retries:           u32,
  pub client_id:             Option<String>,
  pub client_secret:         Option<String>,
  pub db_path:               Option<PathBuf>,
  /// Reddit account named in the default user agent.
  pub reddit_username:       Option<String>,
  /// Replaces the generated user agent entirely.
  pub user_agent:            Option<String>,
}

pub fn load(file: &Path, overrides: &Overrides) -> Result<Settings, ConfigError> {
  load_with_env(file, overrides, None)
}

/// [`load`] reading `POSTWATCH_*` variables from `env` instead of the process
/// environment when given.
fn load_with_env(
  file: &Path,
  overrides: &Overrides,
  env: Option<config::Map<String, String>>,
) -> Result<Settings, ConfigError> {
  let new_limit = overrides
    .new_limit
    .map(|n| i64::try_from(n).map_err(|_| out_of_range("new_limit", n)))
    .transpose()?;
  let window = overrides
    .freshness_window_secs
    .map(|n| {
      i64::try_from(n).map_err(|_| out_of_range("freshness_window_secs", n))
    })
    .transpose()?;
  let db_path = overrides
    .db_path
    .as_ref()
    .map(|p| p.to_string_lossy().into_owned());

  let settings = config::Config::builder()
    .set_default("community", DEFAULT_COMMUNITY)?
    .set_default("new_limit", DEFAULT_NEW_LIMIT)?
    .set_default("freshness_window_secs", DEFAULT_FRESHNESS_WINDOW_SECS)?
    .set_default("max_retries", DEFAULT_MAX_RETRIES)?
    .add_source(config::File::from(file).required(false))
    .add_source(
      config::Environment::with_prefix("POSTWATCH")
        .try_parsing(true)
        .source(env),
    )
    .set_override_option("community", overrides.community.clone())?
    .set_override_option("new_limit", new_limit)?
    .set_override_option("freshness_window_secs", window)?
    .set_override_option("client_id", overrides.client_id.clone())?
    .set_override_option("client_secret", overrides.client_secret.clone())?
    .set_override_option("db_path", db_path)?
    .build()?;

  let settings: Settings = settings.try_deserialize()?;
  if settings.community.trim().is_empty() {
    return Err(ConfigError::Invalid {
      field:  "community",
      reason: "must not be empty".into(),
    });
  }
  Ok(settings)
}

fn out_of_range(field: &'static str, value: impl std::fmt::Display) -> ConfigError {
  ConfigError::Invalid {
    field,
    reason: format!("{value} is out of range"),
  }
}

impl Settings {
  /// The database location, with a leading `~/` expanded.
  pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
    self
      .db_path
      .as_deref()
      .filter(|p| !p.as_os_str().is_empty())
      .map(expand_tilde)
      .ok_or(ConfigError::Missing {
        what: "database path",
        env:  "MONITORING_DB_PATH",
        key:  "db_path",
      })
  }

  pub fn reddit(&self) -> Result<RedditConfig, ConfigError> {
    let client_id = non_empty(&self.client_id).ok_or(ConfigError::Missing {
      what: "Reddit client id",
      env:  "REDDIT_CLIENT_ID",
      key:  "client_id",
    })?;
    let client_secret = non_empty(&self.client_secret).ok_or(ConfigError::Missing {
      what: "Reddit client secret",
      env:  "REDDIT_CLIENT_SECRET",
      key:  "client_secret",
    })?;

    let mut reddit = RedditConfig::new(client_id, client_secret);
    reddit.max_retries = self.max_retries;
    reddit.user_agent = match non_empty(&self.user_agent) {
      Some(ua) => ua.to_owned(),
      None => user_agent(client_id, self.reddit_username.as_deref()),
    };
    Ok(reddit)
  }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
  value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn no_file() -> PathBuf {
    std::env::temp_dir().join("postwatch-settings-does-not-exist.toml")
  }

  /// Load with a fixed environment so ambient `POSTWATCH_*` variables
  /// cannot leak in.
  fn load_isolated(
    file: &Path,
    overrides: &Overrides,
    env: &[(&str, &str)],
  ) -> Result<Settings, ConfigError> {
    let env = env
      .iter()
      .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
      .collect();
    load_with_env(file, overrides, Some(env))
  }

  #[test]
  fn defaults_apply_without_file() {
    let settings = load_isolated(&no_file(), &Overrides::default(), &[]).unwrap();
    assert_eq!(settings.community, DEFAULT_COMMUNITY);
    assert_eq!(settings.new_limit, 20);
    assert_eq!(settings.freshness_window_secs, 172_800);
    assert_eq!(settings.max_retries, 3);
  }

  #[test]
  fn file_values_are_read_and_flags_win() {
    let path = std::env::temp_dir()
      .join(format!("postwatch-settings-{}.toml", std::process::id()));
    std::fs::write(
      &path,
      "community = \"rust\"\nnew_limit = 50\nclient_id = \"from-file\"\n",
    )
    .unwrap();

    let overrides = Overrides {
      new_limit: Some(5),
      ..Overrides::default()
    };
    let settings = load_isolated(&path, &overrides, &[]).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(settings.community, "rust");
    assert_eq!(settings.new_limit, 5);
    assert_eq!(settings.client_id.as_deref(), Some("from-file"));
  }

  #[test]
  fn empty_community_is_rejected() {
    let overrides = Overrides {
      community: Some("  ".into()),
      ..Overrides::default()
    };
    assert!(matches!(
      load_isolated(&no_file(), &overrides, &[]),
      Err(ConfigError::Invalid { field: "community", .. })
    ));
  }

  #[test]
  fn missing_credentials_are_config_errors() {
    let settings = load_isolated(
      &no_file(),
      &Overrides {
        client_id: Some("id".into()),
        ..Overrides::default()
      },
      &[],
    )
    .unwrap();

    assert!(matches!(
      settings.reddit(),
      Err(ConfigError::Missing { key: "client_secret", .. })
    ));
  }

  #[test]
  fn missing_db_path_is_a_config_error() {
    let settings = load_isolated(&no_file(), &Overrides::default(), &[]).unwrap();
    assert!(settings.db_path.is_none());
    assert!(matches!(
      settings.database_path(),
      Err(ConfigError::Missing { key: "db_path", .. })
    ));

    let blank = Settings {
      db_path: Some(PathBuf::new()),
      ..settings
    };
    assert!(matches!(
      blank.database_path(),
      Err(ConfigError::Missing { key: "db_path", .. })
    ));
  }

  #[test]
  fn environment_overrides_file_and_flags_override_environment() {
    let path = std::env::temp_dir()
      .join(format!("postwatch-settings-env-{}.toml", std::process::id()));
    std::fs::write(&path, "community = \"rust\"\nnew_limit = 50\n").unwrap();

    let env = [
      ("POSTWATCH_COMMUNITY", "dndnext"),
      ("POSTWATCH_NEW_LIMIT", "7"),
      ("POSTWATCH_DB_PATH", "/var/lib/postwatch.db"),
    ];
    let from_env = load_isolated(&path, &Overrides::default(), &env).unwrap();
    let flagged = load_isolated(
      &path,
      &Overrides {
        community: Some("osr".into()),
        ..Overrides::default()
      },
      &env,
    )
    .unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(from_env.community, "dndnext");
    assert_eq!(from_env.new_limit, 7);
    assert_eq!(
      from_env.database_path().unwrap(),
      PathBuf::from("/var/lib/postwatch.db")
    );
    assert_eq!(flagged.community, "osr");
    assert_eq!(flagged.new_limit, 7);
  }

  #[test]
  fn reddit_config_uses_credentials_and_username() {
    let mut settings = load_isolated(
      &no_file(),
      &Overrides {
        client_id: Some("app".into()),
        client_secret: Some("shh".into()),
        ..Overrides::default()
      },
      &[],
    )
    .unwrap();
    settings.reddit_username = Some("watcher".into());
    settings.user_agent = None;

    let reddit = settings.reddit().unwrap();
    assert_eq!(reddit.client_id, "app");
    assert_eq!(reddit.client_secret, "shh");
    assert!(reddit.user_agent.ends_with("(by /u/watcher)"));
  }

  #[test]
  fn tilde_is_expanded() {
    if let Ok(home) = std::env::var("HOME") {
      assert_eq!(
        expand_tilde(Path::new("~/data/monitor.db")),
        PathBuf::from(home).join("data/monitor.db")
      );
    }
    assert_eq!(expand_tilde(Path::new("/abs.db")), PathBuf::from("/abs.db"));
  }
}
