//! Field extraction from the portal's listing markup.
//!
//! Each listing is a block opened by an element carrying the `project-card`
//! class and closed by that element's matching end tag.

use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;
use url::Url;

use super::FetchError;
use crate::project::{
  collapse_whitespace, normalize_date_label, normalize_id, ProjectRecord, Snapshot, LINK_PLACEHOLDER,
};

const CARD_CLASS: &str = "project-card";

static CARD_OPEN: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r#"(?i)<(div|article|section|li|tr)\b[^>]*?\sclass\s*=\s*["']([^"']*)["'][^>]*>"#).expect("card pattern")
});

static CONTAINER_TAG: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(?i)<(/?)(div|article|section|li|tr)\b[^>]*>").expect("container tag pattern"));

static EMPTY_MARKER: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(?i)no-projects|no\s+records?\s+found").expect("empty marker pattern"));

static DATA_ID: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r#"(?i)\bdata-(?:project|scheme)-id\s*=\s*["']([^"']*)["']"#).expect("data id pattern")
});

static LABELLED_ID: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"(?i)\b(?:project|scheme)\s*(?:id|no\.?|number)\s*[:#.\-]*\s*(\d[\d\s]*)").expect("id pattern")
});

static HEADING: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(?is)<h[2-5]\b[^>]*>(.*?)</h[2-5]\s*>").expect("heading pattern"));

static ANCHOR: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"(?is)<a\b([^>]*)>(.*?)</a\s*>").expect("anchor pattern"));

static HREF: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r#"(?i)\bhref\s*=\s*["']([^"']*)["']"#).expect("href pattern"));

static META_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r#"(?i)<meta\b[^>]*\bname\s*=\s*["']csrf-token["'][^>]*>"#).expect("meta token pattern")
});

static INPUT_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r#"(?i)<input\b[^>]*\bname\s*=\s*["']_token["'][^>]*>"#).expect("input token pattern")
});

static CONTENT_ATTR: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r#"(?i)\bcontent\s*=\s*["']([^"']*)["']"#).expect("content pattern"));

static VALUE_ATTR: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r#"(?i)\bvalue\s*=\s*["']([^"']*)["']"#).expect("value pattern"));

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("tag pattern"));

const START_LABELS: &[&str] = &["start date", "opening date"];
const END_LABELS: &[&str] = &["end date", "last date", "closing date"];

/// Session token from `<meta name="csrf-token">` or a hidden `_token` input
pub fn extract_csrf_token(html: &str) -> Option<String> {
  let from_meta = META_TOKEN
    .find(html)
    .and_then(|tag| CONTENT_ATTR.captures(tag.as_str()))
    .map(|c| c[1].trim().to_string());

  let token = from_meta.or_else(|| {
    INPUT_TOKEN
      .find(html)
      .and_then(|tag| VALUE_ATTR.captures(tag.as_str()))
      .map(|c| c[1].trim().to_string())
  })?;

  if token.is_empty() {
    None
  } else {
    Some(token)
  }
}

/// Extract every listing on the page into a snapshot. Later duplicates of an ID win.
///
/// A page with neither listing cards nor an explicit "no records" marker is
/// treated as an unexpected shape rather than an empty portal.
pub fn extract_projects(html: &str, base: &Url) -> Result<Snapshot, FetchError> {
  let cards: Vec<(usize, usize, &str)> = CARD_OPEN
    .captures_iter(html)
    .filter(|c| has_card_class(&c[2]))
    .filter_map(|c| {
      let open = c.get(0)?;
      let element = c.get(1)?.as_str();
      Some((open.start(), open.end(), element))
    })
    .collect();

  if cards.is_empty() {
    if EMPTY_MARKER.is_match(html) {
      debug!("portal reports no open schemes");
      return Ok(Snapshot::new());
    }
    return Err(FetchError::unexpected_shape("no project listings or empty-list marker found"));
  }

  let mut snapshot = Snapshot::new();
  for (i, &(start, open_end, element)) in cards.iter().enumerate() {
    let limit = cards.get(i + 1).map(|next| next.0).unwrap_or(html.len());
    let block = &html[start..card_end(html, open_end, element, limit)];

    match extract_record(block, base) {
      Some(record) => {
        if let Some(replaced) = snapshot.insert(record) {
          debug!(id = %replaced.id, "duplicate project id on page, keeping the later listing");
        }
      }
      None => debug!(offset = start, "skipping listing without a project id"),
    }
  }

  Ok(snapshot)
}

fn has_card_class(class_value: &str) -> bool {
  class_value.split_whitespace().any(|token| token.eq_ignore_ascii_case(CARD_CLASS))
}

/// Offset just past the end tag matching a card opened at `open_end`.
/// An unclosed card runs to `limit` (the next card or the end of the page).
fn card_end(html: &str, open_end: usize, element: &str, limit: usize) -> usize {
  let mut depth = 1usize;
  for tag in CONTAINER_TAG.captures_iter(&html[open_end..limit]) {
    if !tag[2].eq_ignore_ascii_case(element) {
      continue;
    }
    if tag[1].is_empty() {
      depth += 1;
      continue;
    }
    depth -= 1;
    if depth == 0 {
      return tag.get(0).map(|m| open_end + m.end()).unwrap_or(limit);
    }
  }
  limit
}

/// Build one record from a listing block; `None` when it carries no usable ID
pub fn extract_record(block: &str, base: &Url) -> Option<ProjectRecord> {
  let lines = text_lines(block);
  let id = extract_id(block, &lines)?;

  let name = HEADING
    .captures(block)
    .map(|c| collapse_whitespace(&decode_entities(&strip_tags(&c[1]))))
    .unwrap_or_default();

  let mut record = ProjectRecord::new(id, name).with_dates(
    labelled_value(&lines, START_LABELS).unwrap_or_default(),
    labelled_value(&lines, END_LABELS).unwrap_or_default(),
  );
  record.draw_link = anchor_by_text(block, "draw", base);
  record.brochure_link = anchor_by_text(block, "brochure", base);
  record.full_html = Some(block.trim().to_string());

  Some(record)
}

fn extract_id(block: &str, lines: &[String]) -> Option<String> {
  let open_tag_end = block.find('>').map(|i| i + 1).unwrap_or(block.len());
  if let Some(id) = DATA_ID.captures(&block[..open_tag_end]).and_then(|c| normalize_id(&c[1])) {
    return Some(id);
  }

  lines.iter().find_map(|line| LABELLED_ID.captures(line).and_then(|c| normalize_id(&c[1])))
}

/// Value for the first line starting with one of `labels`; falls back to the
/// following line when the label stands alone (label and value in separate cells).
fn labelled_value(lines: &[String], labels: &[&str]) -> Option<String> {
  for (i, line) in lines.iter().enumerate() {
    let lower = line.to_lowercase();
    if !labels.iter().any(|label| lower.starts_with(label)) {
      continue;
    }

    let value = normalize_date_label(line);
    if !value.is_empty() {
      return Some(value);
    }
    return lines.get(i + 1).map(|next| normalize_date_label(next));
  }
  None
}

fn anchor_by_text(block: &str, needle: &str, base: &Url) -> String {
  for anchor in ANCHOR.captures_iter(block) {
    let text = strip_tags(&anchor[2]).to_lowercase();
    if !text.contains(needle) {
      continue;
    }
    if let Some(href) = HREF.captures(&anchor[1]) {
      return resolve_link(&decode_entities(href[1].trim()), base);
    }
  }
  LINK_PLACEHOLDER.to_string()
}

/// Resolve an href against the page URL; unusable targets become the placeholder
pub fn resolve_link(href: &str, base: &Url) -> String {
  let href = href.trim();
  if href.is_empty() || href == "#" || href.to_lowercase().starts_with("javascript:") {
    return LINK_PLACEHOLDER.to_string();
  }

  match base.join(href) {
    Ok(url) if url.scheme() == "http" || url.scheme() == "https" => url.to_string(),
    _ => LINK_PLACEHOLDER.to_string(),
  }
}

/// Visible text of a block, one entry per tag-separated segment
fn text_lines(block: &str) -> Vec<String> {
  TAG
    .replace_all(block, "\n")
    .lines()
    .map(|line| collapse_whitespace(&decode_entities(line)))
    .filter(|line| !line.is_empty())
    .collect()
}

fn strip_tags(raw: &str) -> String {
  TAG.replace_all(raw, " ").into_owned()
}

pub fn decode_entities(raw: &str) -> String {
  raw
    .replace("&nbsp;", " ")
    .replace("&lt;", "<")
    .replace("&gt;", ">")
    .replace("&quot;", "\"")
    .replace("&#39;", "'")
    .replace("&#039;", "'")
    .replace("&amp;", "&")
}
