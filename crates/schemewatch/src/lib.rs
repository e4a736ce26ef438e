//! schemewatch - housing scheme listing watcher
//!
//! Detects schemes newly published on or withdrawn from a housing portal by
//! diffing the current listing against the last committed snapshot, emails
//! subscribers about the change, and only then commits the new snapshot.

pub mod cli;
pub mod commands;
pub mod config;
pub mod controller;
pub mod delta;
pub mod fetch;
pub mod notify;
pub mod project;
pub mod store;

pub use controller::{RunController, RunError, RunOptions, RunOutcome, RunReport, RunState};
pub use delta::{compute, Delta};
pub use fetch::{FetchError, Fetcher};
pub use notify::{render, DispatchError, NotificationPayload, Notifier};
pub use project::{ProjectRecord, Snapshot};
pub use store::{SnapshotStore, StoreError};
