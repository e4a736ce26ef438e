use async_trait::async_trait;
use schemewatch::fetch::{FetchError, Fetcher};
use schemewatch::notify::{DispatchError, NotificationPayload, Notifier};
use schemewatch::{
  ProjectRecord, RunController, RunError, RunOptions, RunOutcome, Snapshot, SnapshotStore, StoreError,
};
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use tempfile::TempDir;

/// Hands out a prepared snapshot, or fails like an unreachable portal
struct FakeFetcher {
  result: Result<Snapshot, String>,
}

impl FakeFetcher {
  fn listing(snapshot: Snapshot) -> Self {
    Self { result: Ok(snapshot) }
  }

  fn down() -> Self {
    Self { result: Err("connection refused".to_string()) }
  }
}

#[async_trait]
impl Fetcher for FakeFetcher {
  async fn fetch_current_projects(&self) -> Result<Snapshot, FetchError> {
    self.result.clone().map_err(FetchError::network)
  }
}

/// Records every payload; optionally rejects them all
#[derive(Default)]
struct RecordingNotifier {
  fail: bool,
  sent: Mutex<Vec<NotificationPayload>>,
}

impl RecordingNotifier {
  fn failing() -> Self {
    Self { fail: true, ..Self::default() }
  }

  fn sent(&self) -> Vec<NotificationPayload> {
    self.sent.lock().unwrap().clone()
  }
}

#[async_trait]
impl Notifier for RecordingNotifier {
  async fn dispatch(&self, payload: &NotificationPayload) -> Result<(), DispatchError> {
    self.sent.lock().unwrap().push(payload.clone());
    if self.fail {
      return Err(DispatchError::rejected(502, "bad gateway"));
    }
    Ok(())
  }
}

struct Workspace {
  _dir: TempDir,
  history: PathBuf,
}

impl Workspace {
  fn new() -> Self {
    let dir = TempDir::new().unwrap();
    let history = dir.path().join("state").join("history.json");
    Self { _dir: dir, history }
  }

  fn store(&self) -> SnapshotStore {
    SnapshotStore::new(&self.history)
  }

  fn seed(&self, snapshot: &Snapshot) {
    self.store().save(snapshot).unwrap();
  }

  fn raw(&self) -> Vec<u8> {
    fs::read(&self.history).unwrap()
  }
}

fn scheme(id: &str, name: &str) -> ProjectRecord {
  ProjectRecord::new(id, name)
    .with_dates("01-05-2025", "31-05-2025")
    .with_links(format!("https://portal.example/draw/{id}.pdf"), "N/A")
}

fn snapshot(records: &[ProjectRecord]) -> Snapshot {
  records.iter().cloned().collect()
}

async fn run(
  fetcher: &FakeFetcher,
  notifier: &RecordingNotifier,
  store: &SnapshotStore,
) -> Result<schemewatch::RunReport, RunError> {
  RunController::new(fetcher, notifier, store, RunOptions::default()).run().await
}

#[tokio::test]
async fn test_cold_start_announces_everything_and_commits() {
  let ws = Workspace::new();
  let current = snapshot(&[scheme("1", "Alpha"), scheme("2", "Beta")]);
  let notifier = RecordingNotifier::default();

  let report = run(&FakeFetcher::listing(current.clone()), &notifier, &ws.store()).await.unwrap();

  assert_eq!(report.outcome, RunOutcome::Committed);
  assert_eq!(report.delta.added_ids(), vec!["1", "2"]);
  assert!(report.delta.removed.is_empty());

  let sent = notifier.sent();
  assert_eq!(sent.len(), 1);
  assert_eq!(sent[0].subject, "Housing scheme update: 2 added, 0 removed");
  assert_eq!(ws.store().load().unwrap(), current);
}

#[tokio::test]
async fn test_no_change_run_is_side_effect_free() {
  let ws = Workspace::new();
  let previous = snapshot(&[scheme("1", "Alpha"), scheme("2", "Beta")]);
  ws.seed(&previous);
  let before = ws.raw();
  let notifier = RecordingNotifier::default();

  let report = run(&FakeFetcher::listing(previous), &notifier, &ws.store()).await.unwrap();

  assert_eq!(report.outcome, RunOutcome::Idle);
  assert!(notifier.sent().is_empty());
  assert_eq!(ws.raw(), before);
}

#[tokio::test]
async fn test_field_edits_alone_do_not_trigger_a_run() {
  let ws = Workspace::new();
  ws.seed(&snapshot(&[scheme("1", "Alpha")]));
  let before = ws.raw();
  let edited = snapshot(&[ProjectRecord::new("1", "Alpha (extended)").with_dates("01-06-2025", "")]);
  let notifier = RecordingNotifier::default();

  let report = run(&FakeFetcher::listing(edited), &notifier, &ws.store()).await.unwrap();

  assert_eq!(report.outcome, RunOutcome::Idle);
  assert_eq!(ws.raw(), before);
}

#[tokio::test]
async fn test_dispatch_failure_leaves_history_untouched_and_retries_next_run() {
  let ws = Workspace::new();
  ws.seed(&snapshot(&[scheme("1", "Alpha"), scheme("2", "Beta")]));
  let before = ws.raw();
  let current = snapshot(&[scheme("2", "Beta"), scheme("3", "Gamma")]);

  let failing = RecordingNotifier::failing();
  let result = run(&FakeFetcher::listing(current.clone()), &failing, &ws.store()).await;
  assert!(matches!(result, Err(RunError::Dispatch(DispatchError::Rejected { status: 502, .. }))));
  assert_eq!(ws.raw(), before);

  // Next run recomputes the same delta and commits once dispatch works
  let working = RecordingNotifier::default();
  let report = run(&FakeFetcher::listing(current.clone()), &working, &ws.store()).await.unwrap();
  assert_eq!(report.delta.added_ids(), vec!["3"]);
  assert_eq!(report.delta.removed_ids(), vec!["1"]);
  assert_eq!(failing.sent()[0], working.sent()[0]);
  assert_eq!(ws.store().load().unwrap(), current);
}

#[tokio::test]
async fn test_removed_records_are_reported_from_history() {
  let ws = Workspace::new();
  ws.seed(&snapshot(&[scheme("1", "Alpha"), scheme("2", "Beta")]));
  let notifier = RecordingNotifier::default();

  let report = run(&FakeFetcher::listing(snapshot(&[scheme("1", "Alpha")])), &notifier, &ws.store())
    .await
    .unwrap();

  assert!(report.delta.added.is_empty());
  assert_eq!(report.delta.removed_ids(), vec!["2"]);
  let html = &notifier.sent()[0].html;
  assert!(html.contains("Withdrawn schemes (1)"));
  assert!(html.contains("https://portal.example/draw/2.pdf"));
  assert_eq!(ws.store().load().unwrap().len(), 1);
}

#[tokio::test]
async fn test_commit_overwrites_instead_of_merging() {
  let ws = Workspace::new();
  ws.seed(&snapshot(&[scheme("1", "Alpha"), scheme("2", "Beta")]));
  let notifier = RecordingNotifier::default();

  run(&FakeFetcher::listing(snapshot(&[scheme("3", "Gamma")])), &notifier, &ws.store()).await.unwrap();

  let saved = ws.store().load().unwrap();
  assert_eq!(saved.ids().collect::<Vec<_>>(), vec!["3"]);
}

#[tokio::test]
async fn test_fetch_failure_is_fatal_without_side_effects() {
  let ws = Workspace::new();
  ws.seed(&snapshot(&[scheme("1", "Alpha")]));
  let before = ws.raw();
  let notifier = RecordingNotifier::default();

  let result = run(&FakeFetcher::down(), &notifier, &ws.store()).await;

  assert!(matches!(result, Err(RunError::Fetch(FetchError::Network { .. }))));
  assert!(notifier.sent().is_empty());
  assert_eq!(ws.raw(), before);
}

#[tokio::test]
async fn test_corrupt_history_is_fatal_not_a_cold_start() {
  let ws = Workspace::new();
  fs::create_dir_all(ws.history.parent().unwrap()).unwrap();
  fs::write(&ws.history, "{ this is not json").unwrap();
  let notifier = RecordingNotifier::default();

  let result = run(&FakeFetcher::listing(snapshot(&[scheme("1", "Alpha")])), &notifier, &ws.store()).await;

  assert!(matches!(result, Err(RunError::Store(StoreError::Malformed { .. }))));
  assert!(notifier.sent().is_empty());
  assert_eq!(fs::read_to_string(&ws.history).unwrap(), "{ this is not json");
}
