use async_trait::async_trait;
use reqwest::header::{ACCEPT, REFERER};
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::extract::{extract_csrf_token, extract_projects};
use super::{FetchError, Fetcher};
use crate::project::Snapshot;

const USER_AGENT: &str = concat!("schemewatch/", env!("CARGO_PKG_VERSION"));
const CSRF_HEADER: &str = "X-CSRF-TOKEN";

/// Session-based portal client: loads the landing page for its cookie and CSRF
/// token, then posts for the listing of open schemes.
pub struct PortalFetcher {
  client: reqwest::Client,
  landing_url: Url,
  listing_url: Url,
}

impl PortalFetcher {
  pub fn new(landing_url: &str, listing_url: Option<&str>, timeout: Duration) -> Result<Self, FetchError> {
    let landing = parse_url(landing_url)?;
    let listing = match listing_url {
      Some(raw) => parse_url(raw)?,
      None => landing.clone(),
    };

    let client = reqwest::Client::builder()
      .user_agent(USER_AGENT)
      .cookie_store(true)
      .timeout(timeout)
      .build()
      .map_err(|e| FetchError::network(format!("failed to build HTTP client: {e}")))?;

    Ok(Self { client, landing_url: landing, listing_url: listing })
  }

  async fn session_token(&self) -> Result<String, FetchError> {
    let response = self
      .client
      .get(self.landing_url.clone())
      .header(ACCEPT, "text/html")
      .send()
      .await
      .map_err(|e| FetchError::network(format!("failed to load {}: {e}", self.landing_url)))?;

    if !response.status().is_success() {
      return Err(FetchError::status(self.landing_url.as_str(), response.status().as_u16()));
    }

    let body = response
      .text()
      .await
      .map_err(|e| FetchError::network(format!("failed to read {}: {e}", self.landing_url)))?;

    extract_csrf_token(&body).ok_or_else(|| FetchError::missing_token(self.landing_url.as_str()))
  }

  async fn listing_page(&self, token: &str) -> Result<String, FetchError> {
    let response = self
      .client
      .post(self.listing_url.clone())
      .header(CSRF_HEADER, token)
      .header(REFERER, self.landing_url.as_str())
      .header(ACCEPT, "text/html")
      .form(&[("_token", token)])
      .send()
      .await
      .map_err(|e| FetchError::network(format!("failed to load {}: {e}", self.listing_url)))?;

    if !response.status().is_success() {
      return Err(FetchError::status(self.listing_url.as_str(), response.status().as_u16()));
    }

    response
      .text()
      .await
      .map_err(|e| FetchError::network(format!("failed to read {}: {e}", self.listing_url)))
  }
}

#[async_trait]
impl Fetcher for PortalFetcher {
  async fn fetch_current_projects(&self) -> Result<Snapshot, FetchError> {
    let token = self.session_token().await?;
    debug!(url = %self.landing_url, "obtained session token");

    let page = self.listing_page(&token).await?;
    let snapshot = extract_projects(&page, &self.listing_url)?;
    debug!(url = %self.listing_url, records = snapshot.len(), "extracted listings");

    Ok(snapshot)
  }
}

fn parse_url(raw: &str) -> Result<Url, FetchError> {
  let url = Url::parse(raw.trim()).map_err(|e| FetchError::invalid_url(raw, e.to_string()))?;
  match url.scheme() {
    "http" | "https" => Ok(url),
    other => Err(FetchError::invalid_url(raw, format!("unsupported scheme '{other}'"))),
  }
}
