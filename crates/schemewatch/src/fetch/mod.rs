use async_trait::async_trait;
use thiserror::Error;

use crate::project::Snapshot;

pub mod extract;
pub mod portal;

pub use portal::PortalFetcher;

#[derive(Error, Debug)]
pub enum FetchError {
  #[error("Invalid portal URL '{url}': {message}")]
  InvalidUrl { url: String, message: String },

  #[error("Failed to reach portal: {message}")]
  Network { message: String },

  #[error("Portal returned status {status} for {url}")]
  Status { url: String, status: u16 },

  #[error("Portal page at {url} carried no session token")]
  MissingToken { url: String },

  #[error("Unexpected portal response: {message}")]
  UnexpectedShape { message: String },
}

impl FetchError {
  pub fn invalid_url(url: impl Into<String>, message: impl Into<String>) -> Self {
    Self::InvalidUrl { url: url.into(), message: message.into() }
  }

  pub fn network(message: impl Into<String>) -> Self {
    Self::Network { message: message.into() }
  }

  pub fn status(url: impl Into<String>, status: u16) -> Self {
    Self::Status { url: url.into(), status }
  }

  pub fn missing_token(url: impl Into<String>) -> Self {
    Self::MissingToken { url: url.into() }
  }

  pub fn unexpected_shape(message: impl Into<String>) -> Self {
    Self::UnexpectedShape { message: message.into() }
  }
}

/// Source of the current snapshot of open schemes
#[async_trait]
pub trait Fetcher: Send + Sync {
  async fn fetch_current_projects(&self) -> Result<Snapshot, FetchError>;
}
