//! Change detection between two snapshots.
//!
//! Identity is the project ID alone: a record whose name, dates or links changed
//! under the same ID is neither added nor removed.

use crate::project::{compare_ids, ProjectRecord, Snapshot};

/// Added and removed records between a previous and a current snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delta {
  /// Present now, absent before; values from the current snapshot
  pub added: Vec<ProjectRecord>,
  /// Present before, absent now; values from the previous snapshot
  pub removed: Vec<ProjectRecord>,
}

impl Delta {
  /// Whether the run should notify and then persist the current snapshot
  pub fn should_commit(&self) -> bool {
    !self.added.is_empty() || !self.removed.is_empty()
  }

  pub fn is_empty(&self) -> bool {
    !self.should_commit()
  }

  /// "N added, M removed"
  pub fn summary(&self) -> String {
    format!("{} added, {} removed", self.added.len(), self.removed.len())
  }

  pub fn added_ids(&self) -> Vec<&str> {
    self.added.iter().map(|r| r.id.as_str()).collect()
  }

  pub fn removed_ids(&self) -> Vec<&str> {
    self.removed.iter().map(|r| r.id.as_str()).collect()
  }
}

/// Compare two snapshots. Pure and total; both lists come back ordered by ID.
pub fn compute(previous: &Snapshot, current: &Snapshot) -> Delta {
  let mut added: Vec<ProjectRecord> =
    current.records().filter(|r| !previous.contains(&r.id)).cloned().collect();
  let mut removed: Vec<ProjectRecord> =
    previous.records().filter(|r| !current.contains(&r.id)).cloned().collect();

  added.sort_by(|a, b| compare_ids(&a.id, &b.id));
  removed.sort_by(|a, b| compare_ids(&a.id, &b.id));

  Delta { added, removed }
}
