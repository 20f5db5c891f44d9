//! `postwatch` — record engagement of new posts in a Reddit community.
//!
//! Each invocation of `postwatch run` performs one update cycle and exits;
//! schedule it (cron, a systemd timer) to build up a time series.
//!
//! # Usage
//!
//! ```text
//! export REDDIT_CLIENT_ID=... REDDIT_CLIENT_SECRET=... MONITORING_DB_PATH=~/monitor.db
//! postwatch run --community dndnext --limit 20 --window 172800
//! postwatch history 1abc2d
//! ```

mod settings;

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use postwatch_core::{
  ErrorKind,
  cycle::{CycleParams, run_cycle},
  store::MonitoringStore,
};
use postwatch_reddit::RedditGateway;
use postwatch_store_sqlite::SqliteStore;
use settings::{ConfigError, Overrides, Settings};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "postwatch", author, version, about = "Track engagement of new posts in a community")]
struct Cli {
  /// Path to a TOML configuration file.
  #[arg(short, long, global = true, default_value = "postwatch.toml")]
  config: PathBuf,

  /// SQLite database holding posts and stats.
  #[arg(long, global = true, env = "MONITORING_DB_PATH")]
  db_path: Option<PathBuf>,

  /// Reddit application id.
  #[arg(long, global = true, env = "REDDIT_CLIENT_ID", hide_env_values = true)]
  client_id: Option<String>,

  /// Reddit application secret.
  #[arg(long, global = true, env = "REDDIT_CLIENT_SECRET", hide_env_values = true)]
  client_secret: Option<String>,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Run one update cycle (the default).
  Run(RunArgs),
  /// Print the stored stats series of a post as JSON.
  History {
    /// Platform post id, e.g. `1abc2d`.
    post_id: String,
  },
}

#[derive(Args, Default)]
struct RunArgs {
  /// Community to poll.
  #[arg(long)]
  community: Option<String>,

  /// How many of the newest posts to fetch.
  #[arg(long)]
  limit: Option<usize>,

  /// Freshness window in seconds.
  #[arg(long, value_name = "SECONDS")]
  window: Option<u64>,
}

impl Cli {
  fn overrides(&self, run: &RunArgs) -> Overrides {
    Overrides {
      community:             run.community.clone(),
      new_limit:             run.limit,
      freshness_window_secs: run.window,
      client_id:             self.client_id.clone(),
      client_secret:         self.client_secret.clone(),
      db_path:               self.db_path.clone(),
    }
  }
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let mut cli = Cli::parse();
  let command = cli.command.take().unwrap_or(Command::Run(RunArgs::default()));
  let no_run_args = RunArgs::default();
  let run_args = match &command {
    Command::Run(args) => args,
    Command::History { .. } => &no_run_args,
  };

  let settings = settings::load(&cli.config, &cli.overrides(run_args))
    .map_err(config_failure)?;

  match command {
    Command::Run(_) => run(settings).await,
    Command::History { post_id } => history(settings, &post_id).await,
  }
}

fn config_failure(err: ConfigError) -> anyhow::Error {
  tracing::error!(kind = "ConfigError", error = %err, "invalid configuration");
  err.into()
}

/// Log a start-up failure with its kind, the way a failed cycle is logged.
fn setup_failure<E>(kind: ErrorKind, what: &'static str) -> impl FnOnce(E) -> anyhow::Error
where
  E: std::error::Error + Send + Sync + 'static,
{
  move |err| {
    tracing::error!(%kind, error = %err, "{what}");
    anyhow::Error::new(err).context(format!("{kind}: {what}"))
  }
}

async fn open_store(path: &Path) -> anyhow::Result<SqliteStore> {
  SqliteStore::open(path)
    .await
    .map_err(setup_failure(ErrorKind::Storage, "failed to open store"))
    .with_context(|| format!("database at {path:?}"))
}

// ─── Commands ────────────────────────────────────────────────────────────────

async fn run(settings: Settings) -> anyhow::Result<()> {
  let db_path = settings.database_path().map_err(config_failure)?;
  let reddit = settings.reddit().map_err(config_failure)?;
  let params = CycleParams::new(
    settings.community.clone(),
    settings.new_limit,
    settings.freshness_window_secs,
  )
  .context("invalid cycle parameters")?;

  let gateway = RedditGateway::new(reddit)
    .map_err(setup_failure(ErrorKind::Gateway, "failed to build Reddit client"))?;
  let store = open_store(&db_path).await?;

  tracing::info!(
    community = %params.community,
    limit = params.new_limit,
    window_secs = settings.freshness_window_secs,
    "starting update cycle"
  );

  match run_cycle(&store, &gateway, &params, Utc::now()).await {
    Ok(report) => {
      println!("{}", serde_json::to_string(&report)?);
      Ok(())
    }
    Err(err) => {
      let kind = err.kind();
      tracing::error!(%kind, error = %err, "update cycle failed; transaction rolled back");
      Err(anyhow::Error::new(err).context(format!("{kind}: update cycle aborted")))
    }
  }
}

async fn history(settings: Settings, post_id: &str) -> anyhow::Result<()> {
  let db_path = settings.database_path().map_err(config_failure)?;
  let store = open_store(&db_path).await?;

  let post = store
    .get_post(post_id)
    .await
    .context("failed to read post")?
    .with_context(|| format!("post {post_id} has never been recorded"))?;
  let samples = store
    .list_samples(post_id)
    .await
    .context("failed to read stats")?;

  let out = serde_json::json!({ "post": post, "samples": samples });
  println!("{}", serde_json::to_string_pretty(&out)?);
  Ok(())
}
