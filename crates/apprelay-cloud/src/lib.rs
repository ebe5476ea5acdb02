//! # apprelay-cloud - Remote Build Pipeline Clients
//!
//! Narrow clients for the externally-owned build pipeline services, plus
//! the build lifecycle tracker built on top of them.
//!
//! - [`BuildService`] / [`HttpBuildService`] - project registration, run
//!   start, run status, and log-event queries
//! - [`ObjectStore`] / [`HttpObjectStore`] - artifact downloads
//! - [`ProjectRepo`] - working-tree commit/push before a run starts
//! - [`BuildTracker`] - the `Requested -> Running -> {Succeeded, Failed}`
//!   lifecycle, stateless between calls
//! - [`BuildLogFetcher`] - incremental build-log retrieval against a
//!   caller-held cursor

pub mod logs;
pub mod service;
pub mod store;
pub mod tracker;
pub mod vcs;

pub use logs::{BuildLogFetcher, BuildLogPage};
pub use service::{BuildService, HttpBuildService, LogEvent};
pub use store::{HttpObjectStore, ObjectStore};
pub use tracker::{BuildTracker, TrackerConfig};
pub use vcs::ProjectRepo;
