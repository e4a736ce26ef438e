use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::cli::RunArgs;

const HOME_DIR_NAME: &str = ".schemewatch";
const HISTORY_FILE_NAME: &str = "history.json";

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("Could not determine home directory; pass --history or set SCHEMEWATCH_HISTORY")]
  NoHomeDirectory,

  #[error("No relay configured; pass --relay-url or set SCHEMEWATCH_RELAY_URL (or use --dry-run)")]
  MissingRelay,

  #[error("No recipients configured; pass --recipients or set SCHEMEWATCH_RECIPIENTS")]
  NoRecipients,

  #[error("Invalid recipient address '{address}'")]
  InvalidRecipient { address: String },

  #[error("Invalid {name}: must be greater than zero")]
  InvalidTimeout { name: &'static str },

  #[error("Invalid {name}: {message}")]
  InvalidUrl { name: &'static str, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
  pub url: String,
  pub token: Option<String>,
}

/// Fully resolved settings for one `run`
#[derive(Debug, Clone)]
pub struct WatchConfig {
  pub portal_url: String,
  pub listing_url: Option<String>,
  pub history: PathBuf,
  pub recipients: Vec<String>,
  pub sender: String,
  /// `None` for dry runs
  pub relay: Option<RelayConfig>,
  pub fetch_timeout: Duration,
  pub run_timeout: Duration,
  pub allow_empty_fetch: bool,
  pub dry_run: bool,
  pub commit: bool,
}

impl WatchConfig {
  pub fn from_args(args: &RunArgs) -> Result<Self, ConfigError> {
    if args.fetch_timeout == 0 {
      return Err(ConfigError::InvalidTimeout { name: "fetch timeout" });
    }
    if args.run_timeout == 0 {
      return Err(ConfigError::InvalidTimeout { name: "run timeout" });
    }

    check_url("portal URL", &args.portal_url)?;
    if let Some(listing) = &args.listing_url {
      check_url("listing URL", listing)?;
    }

    let recipients = parse_recipients(&args.recipients)?;

    let relay = if args.dry_run {
      None
    } else {
      let url = args.relay_url.clone().filter(|u| !u.trim().is_empty()).ok_or(ConfigError::MissingRelay)?;
      check_url("relay URL", &url)?;
      if recipients.is_empty() {
        return Err(ConfigError::NoRecipients);
      }
      Some(RelayConfig { url, token: args.relay_token.clone().filter(|t| !t.is_empty()) })
    };

    Ok(Self {
      portal_url: args.portal_url.trim().to_string(),
      listing_url: args.listing_url.as_ref().map(|u| u.trim().to_string()),
      history: resolve_history(args.history.clone())?,
      recipients,
      sender: args.sender.trim().to_string(),
      relay,
      fetch_timeout: Duration::from_secs(args.fetch_timeout),
      run_timeout: Duration::from_secs(args.run_timeout),
      allow_empty_fetch: args.allow_empty_fetch,
      dry_run: args.dry_run,
      commit: !args.dry_run && !args.no_commit,
    })
  }
}

/// Split a comma-separated recipient list, trimming entries and dropping empties
pub fn parse_recipients(raw: &str) -> Result<Vec<String>, ConfigError> {
  let mut recipients = Vec::new();
  for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
    if !looks_like_address(entry) {
      return Err(ConfigError::InvalidRecipient { address: entry.to_string() });
    }
    recipients.push(entry.to_string());
  }
  Ok(recipients)
}

fn looks_like_address(entry: &str) -> bool {
  match entry.split_once('@') {
    Some((local, domain)) => {
      !local.is_empty() && !domain.is_empty() && !domain.contains('@') && !entry.contains(char::is_whitespace)
    }
    None => false,
  }
}

fn check_url(name: &'static str, raw: &str) -> Result<(), ConfigError> {
  let url = url::Url::parse(raw.trim()).map_err(|e| ConfigError::InvalidUrl { name, message: e.to_string() })?;
  match url.scheme() {
    "http" | "https" => Ok(()),
    other => Err(ConfigError::InvalidUrl { name, message: format!("unsupported scheme '{other}'") }),
  }
}

/// History path from the flag/env value, else `~/.schemewatch/history.json`
pub fn resolve_history(explicit: Option<PathBuf>) -> Result<PathBuf, ConfigError> {
  if let Some(path) = explicit.filter(|p| !p.as_os_str().is_empty()) {
    return Ok(path);
  }

  let home = dirs::home_dir().ok_or(ConfigError::NoHomeDirectory)?;
  Ok(home.join(HOME_DIR_NAME).join(HISTORY_FILE_NAME))
}
