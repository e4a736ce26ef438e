use bentley::*;

#[test]
fn test_basic_logging_functions() {
  // Logging functions must never panic, whatever the verbosity
  info("Test info message");
  warn("Test warning message");
  error("Test error message");
  success("Test success message");
  verbose("Hidden unless verbose");
  event("fetching", "");
  event("diffing", "1 added, 0 removed");
}

#[test]
fn test_multiline_messages() {
  let multiline_msg = "First line\nSecond line\nThird line";
  info(multiline_msg);
  warn(multiline_msg);
  error(multiline_msg);
  success(multiline_msg);
  announce("Preview", multiline_msg);
}

#[test]
fn test_macros_accept_format_arguments() {
  let count = 3;
  bentley::info!("{count} schemes fetched");
  bentley::warn!("{} looks {}", "portal", "empty");
  bentley::event!("idle");
  bentley::event!("committing", "writing {} records", count);
}

#[test]
fn test_init_is_repeatable_and_sets_verbosity() {
  init(true);
  assert!(is_verbose());
  init(false);
  assert!(!is_verbose());
}
