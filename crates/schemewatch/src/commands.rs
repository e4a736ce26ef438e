use anyhow::{Context, Result};
use std::path::Path;

use crate::cli::RunArgs;
use crate::config::{self, ConfigError, WatchConfig};
use crate::controller::{RunController, RunOptions, RunOutcome, RunReport};
use crate::delta;
use crate::fetch::PortalFetcher;
use crate::notify::{self, Notifier, PreviewNotifier, RelayNotifier};
use crate::project::{has_link, or_dash};
use crate::store::{self, SnapshotStore};

/// Exit status for configuration problems; every other failure exits with 1
pub const EXIT_CONFIG: i32 = 2;
pub const EXIT_FAILURE: i32 = 1;

/// Map an error to the process exit status
pub fn exit_code(err: &anyhow::Error) -> i32 {
  if err.downcast_ref::<ConfigError>().is_some() {
    EXIT_CONFIG
  } else {
    EXIT_FAILURE
  }
}

/// `schemewatch run`
pub async fn watch(args: &RunArgs) -> Result<RunReport> {
  let config = WatchConfig::from_args(args)?;
  bentley::verbose!("history file: {}", config.history.display());

  let store = SnapshotStore::new(&config.history);
  let fetcher = PortalFetcher::new(&config.portal_url, config.listing_url.as_deref(), config.fetch_timeout)?;
  let notifier = build_notifier(&config)?;

  let options = RunOptions {
    allow_empty_fetch: config.allow_empty_fetch,
    commit: config.commit,
    run_timeout: config.run_timeout,
  };

  let report = RunController::new(&fetcher, notifier.as_ref(), &store, options).run().await?;

  match report.outcome {
    RunOutcome::Idle => bentley::info!("No changes since the last run"),
    RunOutcome::Committed => bentley::success!("Notified about {} and saved history", report.delta.summary()),
    RunOutcome::NotifiedWithoutCommit => {
      bentley::warn!("Reported {} without saving history", report.delta.summary())
    }
  }

  Ok(report)
}

fn build_notifier(config: &WatchConfig) -> Result<Box<dyn Notifier>> {
  match &config.relay {
    Some(relay) => {
      let notifier = RelayNotifier::new(
        relay.url.clone(),
        relay.token.clone(),
        config.sender.clone(),
        config.recipients.clone(),
        config.fetch_timeout,
      )?;
      Ok(Box::new(notifier))
    }
    None => Ok(Box::new(PreviewNotifier)),
  }
}

/// `schemewatch diff`: offline comparison of two snapshot files
pub fn diff_files(previous: &Path, current: &Path) -> Result<String> {
  let previous = store::read_snapshot_file(previous).context("failed to read previous snapshot")?;
  let current = store::read_snapshot_file(current).context("failed to read current snapshot")?;

  let delta = delta::compute(&previous, &current);
  if !delta.should_commit() {
    return Ok(format!("No changes ({})\n", delta.summary()));
  }

  Ok(notify::render(&delta).text)
}

/// `schemewatch show`: the committed snapshot, one scheme per line
pub fn show_history(history: Option<&Path>) -> Result<String> {
  let path = config::resolve_history(history.map(Path::to_path_buf))?;
  let snapshot = SnapshotStore::new(&path).load()?;

  if snapshot.is_empty() {
    return Ok(format!("No schemes recorded in {}\n", path.display()));
  }

  let id_width = snapshot.ids().map(str::len).max().unwrap_or(0);
  let mut out = format!("{} schemes recorded in {}\n", snapshot.len(), path.display());
  for record in snapshot.sorted_records() {
    let dates = match (or_dash(&record.start_date), or_dash(&record.end_date)) {
      ("-", "-") => String::new(),
      (start, end) => format!("  ({start} to {end})"),
    };
    let docs = if has_link(&record.draw_link) { "  [draw]" } else { "" };
    out.push_str(&format!("• {:>id_width$}  {}{dates}{docs}\n", record.id, record.display_name()));
  }

  Ok(out)
}
