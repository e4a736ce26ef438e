//! One watch run: fetch → diff → (idle | notify → commit).
//!
//! The snapshot is only saved after the notifier reports success, so a failed
//! dispatch leaves history untouched and the next run sees the same delta.

use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;
use tracing::debug;

use crate::delta::{self, Delta};
use crate::fetch::{FetchError, Fetcher};
use crate::notify::{self, DispatchError, Notifier};
use crate::store::{SnapshotStore, StoreError};

pub const DEFAULT_RUN_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
  Fetching,
  Diffing,
  Idle,
  Notifying,
  Committing,
  Done,
  Failed,
}

impl RunState {
  pub fn label(&self) -> &'static str {
    match self {
      RunState::Fetching => "fetching",
      RunState::Diffing => "diffing",
      RunState::Idle => "idle",
      RunState::Notifying => "notifying",
      RunState::Committing => "committing",
      RunState::Done => "done",
      RunState::Failed => "failed",
    }
  }
}

impl fmt::Display for RunState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.label())
  }
}

#[derive(Error, Debug)]
pub enum RunError {
  #[error(transparent)]
  Fetch(#[from] FetchError),

  #[error(transparent)]
  Store(#[from] StoreError),

  #[error(transparent)]
  Dispatch(#[from] DispatchError),

  #[error("Portal returned no schemes while {previous} were previously listed; refusing to report them all as withdrawn")]
  EmptyFetch { previous: usize },

  #[error("Run exceeded its time limit of {seconds}s")]
  Timeout { seconds: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
  /// Nothing changed; no writes, no notification
  Idle,
  /// Notified and saved the new snapshot
  Committed,
  /// Notified but left history alone (`commit` disabled)
  NotifiedWithoutCommit,
}

#[derive(Debug, Clone)]
pub struct RunReport {
  pub outcome: RunOutcome,
  pub delta: Delta,
  pub transitions: Vec<RunState>,
}

#[derive(Debug, Clone)]
pub struct RunOptions {
  /// Accept an empty fetch against a non-empty history (reports everything withdrawn)
  pub allow_empty_fetch: bool,
  /// Save the snapshot after a successful dispatch
  pub commit: bool,
  pub run_timeout: Duration,
}

impl Default for RunOptions {
  fn default() -> Self {
    Self { allow_empty_fetch: false, commit: true, run_timeout: DEFAULT_RUN_TIMEOUT }
  }
}

/// Records state transitions and echoes them as run events
#[derive(Debug, Default)]
struct StateLog {
  transitions: Vec<RunState>,
}

impl StateLog {
  fn enter(&mut self, state: RunState, detail: &str) {
    debug!(state = %state, "run state");
    bentley::event(state.label(), detail);
    self.transitions.push(state);
  }

  fn current(&self) -> Option<RunState> {
    self.transitions.last().copied()
  }
}

pub struct RunController<'a> {
  fetcher: &'a dyn Fetcher,
  notifier: &'a dyn Notifier,
  store: &'a SnapshotStore,
  options: RunOptions,
}

impl<'a> RunController<'a> {
  pub fn new(
    fetcher: &'a dyn Fetcher,
    notifier: &'a dyn Notifier,
    store: &'a SnapshotStore,
    options: RunOptions,
  ) -> Self {
    Self { fetcher, notifier, store, options }
  }

  /// Execute one run. Never retries; any error leaves history as it was.
  pub async fn run(&self) -> Result<RunReport, RunError> {
    let mut log = StateLog::default();

    let result = match timeout(self.options.run_timeout, self.run_stages(&mut log)).await {
      Ok(result) => result,
      Err(_) => Err(RunError::Timeout { seconds: self.options.run_timeout.as_secs() }),
    };

    match result {
      Ok((outcome, delta)) => {
        log.enter(RunState::Done, "");
        Ok(RunReport { outcome, delta, transitions: log.transitions })
      }
      Err(err) => {
        let stage = log.current().map(|s| s.label()).unwrap_or("starting");
        log.enter(RunState::Failed, &format!("during {stage}: {err}"));
        Err(err)
      }
    }
  }

  async fn run_stages(&self, log: &mut StateLog) -> Result<(RunOutcome, Delta), RunError> {
    log.enter(RunState::Fetching, "");
    let current = self.fetcher.fetch_current_projects().await?;

    log.enter(RunState::Diffing, &format!("{} schemes listed", current.len()));
    let previous = self.store.load()?;

    if current.is_empty() && !previous.is_empty() && !self.options.allow_empty_fetch {
      return Err(RunError::EmptyFetch { previous: previous.len() });
    }

    let delta = delta::compute(&previous, &current);
    if !delta.should_commit() {
      log.enter(RunState::Idle, "no changes");
      return Ok((RunOutcome::Idle, delta));
    }

    log.enter(RunState::Notifying, &delta.summary());
    let payload = notify::render(&delta);
    self.notifier.dispatch(&payload).await?;

    if !self.options.commit {
      debug!("commit disabled, history left untouched");
      return Ok((RunOutcome::NotifiedWithoutCommit, delta));
    }

    log.enter(RunState::Committing, &self.store.path().display().to_string());
    self.store.save(&current)?;

    Ok((RunOutcome::Committed, delta))
  }
}
