//! ## Features
//!
//! - Standard logging levels (info, warn, error, success) on stderr
//! - Verbose output that stays silent unless switched on
//! - Timestamped run events for pipeline state transitions
//! - Banner display for payload previews
//! - One-call `tracing` subscriber setup so library diagnostics share stderr
//!
//! ## Usage
//!
//! Call `init(verbose)` once from a binary, then log with the functions or
//! the `format!`-style macros: `info!`, `warn!`, `error!`, `success!`,
//! `verbose!`, `event!`.

use chrono::Local;
use colored::*;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Directive used when `RUST_LOG` is unset and verbose output is requested
const VERBOSE_FILTER: &str = "schemewatch=debug,warn";
/// Directive used when `RUST_LOG` is unset in normal mode
const QUIET_FILTER: &str = "schemewatch=warn,warn";

/// Initialize Bentley: set verbosity and install the stderr tracing subscriber.
///
/// Safe to call more than once; later calls only update the verbosity flag.
pub fn init(verbose: bool) {
  set_verbose(verbose);

  let filter = EnvFilter::try_from_default_env()
    .unwrap_or_else(|_| EnvFilter::new(if verbose { VERBOSE_FILTER } else { QUIET_FILTER }));

  let _ = tracing_subscriber::registry()
    .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
    .with(filter)
    .try_init();
}

pub fn set_verbose(verbose: bool) {
  VERBOSE.store(verbose, Ordering::Relaxed);
}

pub fn is_verbose() -> bool {
  VERBOSE.load(Ordering::Relaxed)
}

/// Core logging function that handles the actual output
pub fn log(message: &str) {
  for line in message.lines() {
    eprintln!("{line}");
  }
}

fn format_prefix(color: Color, prefix: &str) -> String {
  format!("[{}]{:<width$}", prefix.color(color).bold(), "", width = 7 - prefix.len() - 2)
}

fn log_prefixed(color: Color, prefix: &str, message: &str) {
  let prefix = format_prefix(color, prefix);
  for line in message.lines() {
    log(&format!("{prefix} {line}"));
  }
}

/// Create a banner line of the specified length and character
pub fn banner_line(length: usize, char: char) -> String {
  char.to_string().repeat(length)
}

/// Detail only shown with `--verbose`
pub fn verbose(message: &str) {
  if is_verbose() {
    log_prefixed(Color::Cyan, "verb", message);
  }
}

pub fn info(message: &str) {
  log_prefixed(Color::Blue, "info", message);
}

pub fn warn(message: &str) {
  log_prefixed(Color::Yellow, "warn", message);
}

pub fn error(message: &str) {
  log_prefixed(Color::Red, "error", message);
}

pub fn success(message: &str) {
  log_prefixed(Color::Green, "sccs", message);
}

/// Timestamped run event, e.g. `event("diffing", "2 added, 0 removed")`
pub fn event(stage: &str, message: &str) {
  let timestamp = Local::now().format("%H:%M:%S").to_string();
  let prefix = format!("[{}] [{}] {}", "event".blue().bold(), timestamp.cyan(), stage.bold());
  if message.is_empty() {
    log(&prefix);
    return;
  }
  for line in message.lines() {
    log(&format!("{prefix} {line}"));
  }
}

/// Banner around a block of text, used for dry-run previews
pub fn announce(title: &str, body: &str) {
  let banner = banner_line(60, '-');
  log(&banner.blue().bold().to_string());
  log(&title.blue().bold().to_string());
  log(&banner.blue().bold().to_string());
  log(body);
  log(&banner.blue().bold().to_string());
}

/// Macros for coverage-excluded logging - these expand with LCOV_EXCL_LINE at call sites
#[macro_export]
macro_rules! info {
  ($($arg:tt)*) => {
    $crate::info(&format!($($arg)*)) // LCOV_EXCL_LINE
  };
}

#[macro_export]
macro_rules! warn {
  ($($arg:tt)*) => {
    $crate::warn(&format!($($arg)*)) // LCOV_EXCL_LINE
  };
}

#[macro_export]
macro_rules! error {
  ($($arg:tt)*) => {
    $crate::error(&format!($($arg)*)) // LCOV_EXCL_LINE
  };
}

#[macro_export]
macro_rules! verbose {
  ($($arg:tt)*) => {
    $crate::verbose(&format!($($arg)*)) // LCOV_EXCL_LINE
  };
}

#[macro_export]
macro_rules! success {
  ($($arg:tt)*) => {
    $crate::success(&format!($($arg)*)) // LCOV_EXCL_LINE
  };
}

#[macro_export]
macro_rules! event {
  ($stage:expr) => {
    $crate::event($stage, "") // LCOV_EXCL_LINE
  };
  ($stage:expr, $($arg:tt)*) => {
    $crate::event($stage, &format!($($arg)*)) // LCOV_EXCL_LINE
  };
}
