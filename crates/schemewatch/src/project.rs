use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Marker stored in a link field when the portal offers no document
pub const LINK_PLACEHOLDER: &str = "N/A";

/// Labels the portal prefixes onto date cells; stripped, never parsed
const DATE_LABELS: &[&str] =
  &["start date", "end date", "last date", "closing date", "opening date", "date"];

/// One housing-scheme listing as advertised on the portal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRecord {
  pub id: String,
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub start_date: String,
  #[serde(default)]
  pub end_date: String,
  #[serde(default = "placeholder_link")]
  pub draw_link: String,
  #[serde(default = "placeholder_link")]
  pub brochure_link: String,

  // Raw listing markup, kept for debugging only
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub full_html: Option<String>,
}

fn placeholder_link() -> String {
  LINK_PLACEHOLDER.to_string()
}

impl ProjectRecord {
  /// Create a record with placeholder links and no dates
  pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      name: name.into(),
      start_date: String::new(),
      end_date: String::new(),
      draw_link: placeholder_link(),
      brochure_link: placeholder_link(),
      full_html: None,
    }
  }

  pub fn with_dates(mut self, start: impl Into<String>, end: impl Into<String>) -> Self {
    self.start_date = start.into();
    self.end_date = end.into();
    self
  }

  pub fn with_links(mut self, draw: impl Into<String>, brochure: impl Into<String>) -> Self {
    self.draw_link = draw.into();
    self.brochure_link = brochure.into();
    self
  }

  /// Name for display; an empty name reads as "Unknown"
  pub fn display_name(&self) -> &str {
    let trimmed = self.name.trim();
    if trimmed.is_empty() {
      "Unknown"
    } else {
      trimmed
    }
  }
}

/// True when the link field holds a real URL rather than the placeholder
pub fn has_link(link: &str) -> bool {
  let link = link.trim();
  !link.is_empty() && link != LINK_PLACEHOLDER
}

/// Trimmed value, or "-" when blank
pub fn or_dash(value: &str) -> &str {
  let value = value.trim();
  if value.is_empty() {
    "-"
  } else {
    value
  }
}

/// Reduce a raw identifier to its digits. Returns `None` when nothing is left.
pub fn normalize_id(raw: &str) -> Option<String> {
  let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
  if digits.is_empty() {
    None
  } else {
    Some(digits)
  }
}

/// True for identifiers that are already in normalized form
pub fn is_normalized_id(id: &str) -> bool {
  !id.is_empty() && id.chars().all(|c| c.is_ascii_digit())
}

/// Collapse whitespace and strip a leading date label such as "Start Date :".
pub fn normalize_date_label(raw: &str) -> String {
  let collapsed = collapse_whitespace(raw);

  for label in DATE_LABELS {
    let Some(head) = collapsed.get(..label.len()) else {
      continue;
    };
    if !head.eq_ignore_ascii_case(label) {
      continue;
    }
    let rest = &collapsed[label.len()..];
    if !rest.is_empty() && !rest.starts_with([':', '-', ' ']) {
      continue;
    }
    return rest.trim_start_matches([':', '-', ' ']).trim().to_string();
  }

  collapsed
}

pub fn collapse_whitespace(raw: &str) -> String {
  raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Order identifiers numerically when both are digit strings, lexically otherwise.
pub fn compare_ids(a: &str, b: &str) -> Ordering {
  if is_normalized_id(a) && is_normalized_id(b) {
    let a_trim = a.trim_start_matches('0');
    let b_trim = b.trim_start_matches('0');
    a_trim.len().cmp(&b_trim.len()).then_with(|| a_trim.cmp(b_trim)).then_with(|| a.cmp(b))
  } else {
    a.cmp(b)
  }
}

/// All schemes advertised at one point in time, keyed by project ID
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
  records: BTreeMap<String, ProjectRecord>,
}

impl Snapshot {
  pub fn new() -> Self {
    Self::default()
  }

  /// Insert a record under its own ID. A later record with the same ID replaces the earlier one.
  pub fn insert(&mut self, record: ProjectRecord) -> Option<ProjectRecord> {
    self.records.insert(record.id.clone(), record)
  }

  pub fn get(&self, id: &str) -> Option<&ProjectRecord> {
    self.records.get(id)
  }

  pub fn contains(&self, id: &str) -> bool {
    self.records.contains_key(id)
  }

  pub fn len(&self) -> usize {
    self.records.len()
  }

  pub fn is_empty(&self) -> bool {
    self.records.is_empty()
  }

  pub fn ids(&self) -> impl Iterator<Item = &str> {
    self.records.keys().map(String::as_str)
  }

  pub fn records(&self) -> impl Iterator<Item = &ProjectRecord> {
    self.records.values()
  }

  /// Records ordered by ID (numeric order for digit IDs)
  pub fn sorted_records(&self) -> Vec<&ProjectRecord> {
    let mut records: Vec<&ProjectRecord> = self.records.values().collect();
    records.sort_by(|a, b| compare_ids(&a.id, &b.id));
    records
  }

  pub(crate) fn entries(&self) -> impl Iterator<Item = (&String, &ProjectRecord)> {
    self.records.iter()
  }
}

impl FromIterator<ProjectRecord> for Snapshot {
  fn from_iter<I: IntoIterator<Item = ProjectRecord>>(iter: I) -> Self {
    let mut snapshot = Snapshot::new();
    for record in iter {
      snapshot.insert(record);
    }
    snapshot
  }
}
