use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use super::{DispatchError, NotificationPayload, Notifier};

const USER_AGENT: &str = concat!("schemewatch/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Serialize)]
struct RelayMessage<'a> {
  from: &'a str,
  to: &'a [String],
  subject: &'a str,
  html: &'a str,
  text: &'a str,
}

/// Sends payloads through an HTTP email relay (JSON POST, optional bearer token)
pub struct RelayNotifier {
  client: reqwest::Client,
  endpoint: String,
  token: Option<String>,
  sender: String,
  recipients: Vec<String>,
}

impl RelayNotifier {
  pub fn new(
    endpoint: impl Into<String>,
    token: Option<String>,
    sender: impl Into<String>,
    recipients: Vec<String>,
    timeout: Duration,
  ) -> Result<Self, DispatchError> {
    let client = reqwest::Client::builder()
      .user_agent(USER_AGENT)
      .timeout(timeout)
      .build()
      .map_err(|e| DispatchError::transport(format!("failed to build HTTP client: {e}")))?;

    Ok(Self { client, endpoint: endpoint.into(), token, sender: sender.into(), recipients })
  }

  pub fn recipients(&self) -> &[String] {
    &self.recipients
  }
}

#[async_trait]
impl Notifier for RelayNotifier {
  async fn dispatch(&self, payload: &NotificationPayload) -> Result<(), DispatchError> {
    if self.recipients.is_empty() {
      return Err(DispatchError::NoRecipients);
    }

    let message = RelayMessage {
      from: &self.sender,
      to: &self.recipients,
      subject: &payload.subject,
      html: &payload.html,
      text: &payload.text,
    };

    let mut request = self.client.post(&self.endpoint).json(&message);
    if let Some(token) = &self.token {
      request = request.bearer_auth(token);
    }

    let response = request
      .send()
      .await
      .map_err(|e| DispatchError::transport(format!("failed to reach relay: {e}")))?;

    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      return Err(DispatchError::rejected(status.as_u16(), body.trim()));
    }

    debug!(recipients = self.recipients.len(), "relay accepted notification");
    Ok(())
  }
}
