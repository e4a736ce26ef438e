use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

use crate::project::{is_normalized_id, Snapshot};

#[derive(Error, Debug)]
pub enum StoreError {
  #[error("Failed to access history file {}", .path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("History file {} is malformed: {message}", .path.display())]
  Malformed { path: PathBuf, message: String },
}

impl StoreError {
  pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
    Self::Io { path: path.into(), source }
  }

  pub fn malformed(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
    Self::Malformed { path: path.into(), message: message.into() }
  }
}

/// Flat JSON file holding the snapshot committed by the last successful run
#[derive(Debug, Clone)]
pub struct SnapshotStore {
  path: PathBuf,
}

impl SnapshotStore {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  /// Read the persisted snapshot. A missing file is a cold start and yields an empty snapshot.
  pub fn load(&self) -> Result<Snapshot, StoreError> {
    let content = match fs::read_to_string(&self.path) {
      Ok(content) => content,
      Err(e) if e.kind() == io::ErrorKind::NotFound => {
        debug!(path = %self.path.display(), "no history file, starting cold");
        return Ok(Snapshot::new());
      }
      Err(e) => return Err(StoreError::io(&self.path, e)),
    };

    let snapshot = parse_snapshot(&content).map_err(|m| StoreError::malformed(&self.path, m))?;
    debug!(path = %self.path.display(), records = snapshot.len(), "loaded history");
    Ok(snapshot)
  }

  /// Atomically replace the persisted snapshot.
  ///
  /// The JSON is written to a temporary file beside the target and renamed over it,
  /// so a crash mid-write leaves the previous history intact.
  pub fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
    let dir = match self.path.parent() {
      Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
      _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;

    let content = render_snapshot(snapshot);

    let mut staged = NamedTempFile::new_in(&dir).map_err(|e| StoreError::io(&dir, e))?;
    staged.write_all(content.as_bytes()).map_err(|e| StoreError::io(staged.path(), e))?;
    staged.as_file().sync_all().map_err(|e| StoreError::io(staged.path(), e))?;
    staged.persist(&self.path).map_err(|e| StoreError::io(&self.path, e.error))?;

    debug!(path = %self.path.display(), records = snapshot.len(), "saved history");
    Ok(())
  }
}

/// Deterministic pretty JSON: keys sorted, two-space indent, trailing newline
pub fn render_snapshot(snapshot: &Snapshot) -> String {
  // BTreeMap-backed, so key order is stable; serializing a map of strings cannot fail
  let mut content = serde_json::to_string_pretty(snapshot).unwrap_or_else(|_| "{}".to_string());
  content.push('\n');
  content
}

/// Parse snapshot JSON, rejecting non-numeric IDs and entries whose key disagrees with the record ID
pub fn parse_snapshot(content: &str) -> Result<Snapshot, String> {
  if content.trim().is_empty() {
    return Err("file is empty".to_string());
  }

  let snapshot: Snapshot = serde_json::from_str(content).map_err(|e| e.to_string())?;

  for (key, record) in snapshot.entries() {
    if !is_normalized_id(key) {
      return Err(format!("entry '{key}' does not have a numeric project id"));
    }
    if key != &record.id {
      return Err(format!("entry '{key}' holds a record with id '{}'", record.id));
    }
  }

  Ok(snapshot)
}

/// Load a snapshot from an arbitrary file (used by the offline `diff` command)
pub fn read_snapshot_file(path: &Path) -> Result<Snapshot, StoreError> {
  let content = fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
  parse_snapshot(&content).map_err(|m| StoreError::malformed(path, m))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::project::ProjectRecord;
  use tempfile::TempDir;

  fn sample() -> Snapshot {
    vec![
      ProjectRecord::new("12", "Green Meadows")
        .with_dates("01-03-2025", "31-03-2025")
        .with_links("https://portal.example/draw/12.pdf", "https://portal.example/b/12.pdf"),
      ProjectRecord::new("3", "").with_dates("soon", ""),
    ]
    .into_iter()
    .collect()
  }

  #[test]
  fn test_load_missing_file_is_empty() {
    let temp_dir = TempDir::new().unwrap();
    let store = SnapshotStore::new(temp_dir.path().join("history.json"));

    let snapshot = store.load().unwrap();
    assert!(snapshot.is_empty());
  }

  #[test]
  fn test_save_then_load_is_lossless() {
    let temp_dir = TempDir::new().unwrap();
    let store = SnapshotStore::new(temp_dir.path().join("nested").join("history.json"));

    let mut original = sample();
    let mut with_html = ProjectRecord::new("40", "Lake View");
    with_html.full_html = Some("<div class=\"project-card\">Lake View</div>".to_string());
    original.insert(with_html);

    store.save(&original).unwrap();
    let loaded = store.load().unwrap();

    assert_eq!(loaded, original);
  }

  #[test]
  fn test_save_is_deterministic_and_pretty() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("history.json");
    let store = SnapshotStore::new(&path);

    store.save(&sample()).unwrap();
    let first = fs::read_to_string(&path).unwrap();
    store.save(&sample()).unwrap();
    let second = fs::read_to_string(&path).unwrap();

    assert_eq!(first, second);
    assert!(first.ends_with("}\n"));
    assert!(first.contains("\n  \"12\": {\n    \"id\": \"12\","));
    assert!(first.find("\"12\"").unwrap() < first.find("\"3\"").unwrap());
  }

  #[test]
  fn test_save_overwrites_wholesale() {
    let temp_dir = TempDir::new().unwrap();
    let store = SnapshotStore::new(temp_dir.path().join("history.json"));

    store.save(&sample()).unwrap();
    let smaller: Snapshot = vec![ProjectRecord::new("99", "New")].into_iter().collect();
    store.save(&smaller).unwrap();

    let loaded = store.load().unwrap();
    assert_eq!(loaded.len(), 1);
    assert!(loaded.contains("99"));
    assert!(!loaded.contains("12"));
  }

  #[test]
  fn test_save_leaves_no_temporary_files() {
    let temp_dir = TempDir::new().unwrap();
    let store = SnapshotStore::new(temp_dir.path().join("history.json"));
    store.save(&sample()).unwrap();

    let entries: Vec<_> = fs::read_dir(temp_dir.path()).unwrap().collect();
    assert_eq!(entries.len(), 1);
  }

  #[test]
  fn test_corrupt_history_is_fatal() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("history.json");
    fs::write(&path, "<html>not json</html>").unwrap();

    let result = SnapshotStore::new(&path).load();
    match result {
      Err(StoreError::Malformed { path: p, .. }) => assert_eq!(p, path),
      other => panic!("Expected Malformed error, got: {other:?}"),
    }
  }

  #[test]
  fn test_empty_history_file_is_malformed() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("history.json");
    fs::write(&path, "  \n").unwrap();

    assert!(matches!(SnapshotStore::new(&path).load(), Err(StoreError::Malformed { .. })));
  }

  #[test]
  fn test_wrong_shape_is_malformed() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("history.json");
    fs::write(&path, r#"[{"id": "1"}]"#).unwrap();

    assert!(matches!(SnapshotStore::new(&path).load(), Err(StoreError::Malformed { .. })));
  }

  #[test]
  fn test_key_and_id_mismatch_is_malformed() {
    let content = r#"{"5": {"id": "6", "name": "x"}}"#;
    let err = parse_snapshot(content).unwrap_err();
    assert!(err.contains("'5'"));
  }

  #[test]
  fn test_non_numeric_ids_are_malformed() {
    for content in [r#"{"": {"id": ""}}"#, r#"{"A1": {"id": "A1"}}"#, r#"{" 7": {"id": " 7"}}"#] {
      let err = parse_snapshot(content).unwrap_err();
      assert!(err.contains("numeric project id"), "{content}: {err}");
    }

    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("history.json");
    fs::write(&path, r#"{"A1": {"id": "A1", "name": "Hand edited"}}"#).unwrap();
    assert!(matches!(SnapshotStore::new(&path).load(), Err(StoreError::Malformed { .. })));
  }

  #[test]
  fn test_missing_optional_fields_get_defaults() {
    let snapshot = parse_snapshot(r#"{"8": {"id": "8"}}"#).unwrap();
    let record = snapshot.get("8").unwrap();
    assert_eq!(record.name, "");
    assert_eq!(record.draw_link, crate::project::LINK_PLACEHOLDER);
  }
}
