//! Device session control: process resolution and incremental device logs.
//!
//! A running app's pid changes across restarts, so the process handle is
//! re-resolved on every fetch and never cached. "App not running" is an
//! expected steady state reported as a not-found marker, not an error.

use std::sync::Arc;

use serde::Serialize;

use apprelay_core::cursor::{CursorDomain, LogChunk};
use apprelay_core::prelude::*;
use apprelay_core::ClockTranslator;

use crate::bridge::DeviceBridge;

/// Sentinel pid for "no such process"
pub const NOT_FOUND_PID: i32 = -1;

/// A resolved on-device process handle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceProcess {
    pub package: String,
    pub pid: i32,
}

impl DeviceProcess {
    pub fn not_found(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            pid: NOT_FOUND_PID,
        }
    }

    pub fn is_found(&self) -> bool {
        self.pid > 0
    }
}

/// Resolves app processes and tails their log stream incrementally
#[derive(Clone)]
pub struct DeviceSession {
    bridge: Arc<dyn DeviceBridge>,
    clock: ClockTranslator,
}

impl DeviceSession {
    pub fn new(bridge: Arc<dyn DeviceBridge>, clock: ClockTranslator) -> Self {
        Self { bridge, clock }
    }

    /// Resolve a package name to its running process.
    ///
    /// An exact match on the listing's name column wins; otherwise the
    /// first case-insensitive substring match is taken, which covers
    /// suffixed service processes like `com.example.app:push`.
    pub async fn resolve_process(&self, package: &str) -> Result<DeviceProcess> {
        let listing = self.bridge.list_processes().await?;
        let pid = find_pid(&listing, package);
        if pid <= 0 {
            debug!("No process found for {package}");
            return Ok(DeviceProcess::not_found(package));
        }
        Ok(DeviceProcess {
            package: package.to_string(),
            pid,
        })
    }

    /// Device log lines for one app since a wall-clock cursor.
    ///
    /// The returned cursor is the wall clock at fetch time, so the caller
    /// advances even when the app logged nothing, or is not running at
    /// all, which yields an empty chunk rather than an error.
    pub async fn logs(&self, package: &str, since_wall_ms: i64) -> Result<LogChunk> {
        let process = self.resolve_process(package).await?;
        if !process.is_found() {
            return Ok(LogChunk::empty(
                self.clock.next_cursor(CursorDomain::Device),
            ));
        }

        let marker = self.clock.to_device_local(since_wall_ms);
        let raw = self.bridge.tail_log(&marker).await?;
        let content = filter_by_pid(&raw, process.pid);

        Ok(LogChunk::new(
            content,
            self.clock.next_cursor(CursorDomain::Device),
        ))
    }
}

/// Find a package's pid in a `ps` listing.
///
/// Rows are split on whitespace (column offsets drift between tool
/// versions); the name is the final field and the pid the second.
fn find_pid(listing: &str, package: &str) -> i32 {
    let wanted = package.to_lowercase();
    let mut substring_match: Option<i32> = None;

    for line in listing.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 2 {
            continue;
        }
        let Ok(pid) = fields[1].parse::<i32>() else {
            // Header row and malformed lines land here
            continue;
        };
        let name = fields[fields.len() - 1].to_lowercase();

        if name == wanted {
            return pid;
        }
        if substring_match.is_none() && name.contains(&wanted) {
            substring_match = Some(pid);
        }
    }

    substring_match.unwrap_or(NOT_FOUND_PID)
}

/// Keep only log lines belonging to a pid.
///
/// The pid must appear as a whole whitespace-separated token; substring
/// matching would also hit pids embedded in larger numbers or message
/// text.
fn filter_by_pid(raw: &str, pid: i32) -> String {
    let needle = pid.to_string();
    let matched: Vec<&str> = raw
        .lines()
        .filter(|line| line.split_whitespace().any(|token| token == needle))
        .collect();
    matched.join("\n")
}
