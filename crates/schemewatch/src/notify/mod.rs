use async_trait::async_trait;
use thiserror::Error;

use crate::delta::Delta;
use crate::project::{has_link, or_dash, ProjectRecord};

pub mod relay;

pub use relay::RelayNotifier;

const SUBJECT_PREFIX: &str = "Housing scheme update";
const ADDED_COLOR: &str = "#1b7f3b";
const REMOVED_COLOR: &str = "#b3261e";

#[derive(Error, Debug)]
pub enum DispatchError {
  #[error("No recipients configured")]
  NoRecipients,

  #[error("Notification transport failed: {message}")]
  Transport { message: String },

  #[error("Notification relay rejected the message with status {status}: {body}")]
  Rejected { status: u16, body: String },
}

impl DispatchError {
  pub fn transport(message: impl Into<String>) -> Self {
    Self::Transport { message: message.into() }
  }

  pub fn rejected(status: u16, body: impl Into<String>) -> Self {
    Self::Rejected { status, body: body.into() }
  }
}

/// Rendered notification content. Recipients belong to the transport, not the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationPayload {
  pub subject: String,
  pub html: String,
  pub text: String,
}

/// Outbound transport for a rendered payload
#[async_trait]
pub trait Notifier: Send + Sync {
  async fn dispatch(&self, payload: &NotificationPayload) -> Result<(), DispatchError>;
}

/// Writes the payload to stderr with the other run output instead of sending it (`--dry-run`)
pub struct PreviewNotifier;

#[async_trait]
impl Notifier for PreviewNotifier {
  async fn dispatch(&self, payload: &NotificationPayload) -> Result<(), DispatchError> {
    bentley::announce(&format!("Subject: {}", payload.subject), &payload.text);
    Ok(())
  }
}

pub fn subject(delta: &Delta) -> String {
  format!("{SUBJECT_PREFIX}: {}", delta.summary())
}

/// Render the delta. Pure: the same delta always renders to the same payload.
pub fn render(delta: &Delta) -> NotificationPayload {
  NotificationPayload { subject: subject(delta), html: render_html(delta), text: render_text(delta) }
}

pub fn render_html(delta: &Delta) -> String {
  let mut html = String::new();
  html.push_str("<html><body style=\"font-family: Arial, sans-serif;\">\n");
  html.push_str(&format!("<h2>{}</h2>\n", escape_html(&subject(delta))));

  if !delta.added.is_empty() {
    html.push_str(&html_section("New schemes", ADDED_COLOR, &delta.added));
  }
  if !delta.removed.is_empty() {
    html.push_str(&html_section("Withdrawn schemes", REMOVED_COLOR, &delta.removed));
  }

  html.push_str("</body></html>\n");
  html
}

fn html_section(title: &str, color: &str, records: &[ProjectRecord]) -> String {
  let mut section = format!(
    "<h3 style=\"color: {color};\">{title} ({})</h3>\n<table style=\"border-collapse: collapse; border-left: 4px solid {color};\">\n",
    records.len()
  );
  section.push_str(
    "<tr><th>ID</th><th>Name</th><th>Start date</th><th>End date</th><th>Draw</th><th>Brochure</th></tr>\n",
  );

  for record in records {
    section.push_str(&format!(
      "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
      escape_html(&record.id),
      escape_html(record.display_name()),
      escape_html(&record.start_date),
      escape_html(&record.end_date),
      html_link(&record.draw_link, "Draw"),
      html_link(&record.brochure_link, "Brochure"),
    ));
  }

  section.push_str("</table>\n");
  section
}

fn html_link(link: &str, label: &str) -> String {
  if has_link(link) {
    format!("<a href=\"{}\">{label}</a>", escape_html(link.trim()))
  } else {
    "N/A".to_string()
  }
}

pub fn render_text(delta: &Delta) -> String {
  let mut text = format!("{}\n", subject(delta));

  if !delta.added.is_empty() {
    text.push_str(&text_section("New schemes", '+', &delta.added));
  }
  if !delta.removed.is_empty() {
    text.push_str(&text_section("Withdrawn schemes", '-', &delta.removed));
  }

  text
}

fn text_section(title: &str, marker: char, records: &[ProjectRecord]) -> String {
  let mut section = format!("\n{title} ({}):\n", records.len());
  for record in records {
    section.push_str(&format!("{marker} [{}] {}\n", record.id, record.display_name()));
    section.push_str(&format!(
      "    dates: {} to {}\n",
      or_dash(&record.start_date),
      or_dash(&record.end_date)
    ));
    section.push_str(&format!("    draw: {}\n", text_link(&record.draw_link)));
    section.push_str(&format!("    brochure: {}\n", text_link(&record.brochure_link)));
  }
  section
}

fn text_link(link: &str) -> &str {
  if has_link(link) {
    link.trim()
  } else {
    "N/A"
  }
}

pub fn escape_html(raw: &str) -> String {
  let mut escaped = String::with_capacity(raw.len());
  for c in raw.chars() {
    match c {
      '&' => escaped.push_str("&amp;"),
      '<' => escaped.push_str("&lt;"),
      '>' => escaped.push_str("&gt;"),
      '"' => escaped.push_str("&quot;"),
      '\'' => escaped.push_str("&#39;"),
      _ => escaped.push(c),
    }
  }
  escaped
}
