use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// schemewatch - housing scheme listing watcher
///
/// Compares the schemes currently open on the portal against the last
/// committed snapshot and emails subscribers about new and withdrawn ones.
#[derive(Parser, Debug)]
#[command(name = "schemewatch")]
#[command(about = "Watch a housing-scheme portal and email subscribers when listings change")]
#[command(version)]
pub struct Cli {
  /// Show verbose output
  #[arg(short, long, global = true)]
  pub verbose: bool,

  #[command(subcommand)]
  pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
  /// Fetch the portal, notify on changes and commit the new snapshot
  Run(RunArgs),
  /// Compare two snapshot files offline and print the notification text
  Diff {
    /// Snapshot treated as the previous run
    #[arg(long)]
    previous: PathBuf,
    /// Snapshot treated as the current run
    #[arg(long)]
    current: PathBuf,
  },
  /// List the schemes in the committed snapshot
  Show {
    /// History file (defaults to ~/.schemewatch/history.json)
    #[arg(long, env = "SCHEMEWATCH_HISTORY")]
    history: Option<PathBuf>,
  },
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
  /// Portal landing page (provides the session cookie and CSRF token)
  #[arg(long, env = "SCHEMEWATCH_PORTAL_URL")]
  pub portal_url: String,

  /// Endpoint returning the listing markup (defaults to the portal URL)
  #[arg(long, env = "SCHEMEWATCH_LISTING_URL")]
  pub listing_url: Option<String>,

  /// History file (defaults to ~/.schemewatch/history.json)
  #[arg(long, env = "SCHEMEWATCH_HISTORY")]
  pub history: Option<PathBuf>,

  /// Comma-separated recipient addresses
  #[arg(long, env = "SCHEMEWATCH_RECIPIENTS", default_value = "")]
  pub recipients: String,

  /// Sender address
  #[arg(long, env = "SCHEMEWATCH_SENDER", default_value = "schemewatch@localhost")]
  pub sender: String,

  /// HTTP email relay endpoint
  #[arg(long, env = "SCHEMEWATCH_RELAY_URL")]
  pub relay_url: Option<String>,

  /// Bearer token for the email relay
  #[arg(long, env = "SCHEMEWATCH_RELAY_TOKEN", hide_env_values = true)]
  pub relay_token: Option<String>,

  /// Per-request timeout in seconds
  #[arg(long, env = "SCHEMEWATCH_FETCH_TIMEOUT", default_value_t = 30)]
  pub fetch_timeout: u64,

  /// Limit for the whole run in seconds
  #[arg(long, env = "SCHEMEWATCH_RUN_TIMEOUT", default_value_t = 120)]
  pub run_timeout: u64,

  /// Accept an empty listing even when schemes were listed before
  #[arg(long)]
  pub allow_empty_fetch: bool,

  /// Print the notification instead of sending it; never commits
  #[arg(long)]
  pub dry_run: bool,

  /// Send the notification but leave the history file untouched
  #[arg(long)]
  pub no_commit: bool,
}
