//! Translation between the three time domains: wall-clock UTC, device-local
//! log timestamps, and build-service log timestamps.
//!
//! The build-service domain is epoch millis on both sides, so translation is
//! the identity. The device log source only accepts a local-time-formatted
//! start marker; translation there applies the local-UTC skew at call time
//! (via the local timezone offset) plus a fixed empirical correction for
//! device clocks that run a fixed window ahead of the host.

use chrono::{FixedOffset, Local, TimeZone, Utc};

use crate::cursor::{CursorDomain, LogCursor};

/// Calibration parameter: how far ahead attached device clocks have been
/// observed to run, in millis. Tunable per deployment, not a derived value.
pub const DEFAULT_DEVICE_LEAD_MS: i64 = 18_000_000;

/// Start-marker format accepted by the device log tail command
const DEVICE_MARKER_FORMAT: &str = "%m-%d %H:%M:%S%.3f";

/// Converts timestamps between clock domains.
///
/// All methods are pure functions of their inputs and the current local
/// timezone offset; nothing here keeps state.
#[derive(Debug, Clone, Copy)]
pub struct ClockTranslator {
    device_lead_ms: i64,
}

impl Default for ClockTranslator {
    fn default() -> Self {
        Self::new(DEFAULT_DEVICE_LEAD_MS)
    }
}

impl ClockTranslator {
    pub fn new(device_lead_ms: i64) -> Self {
        Self { device_lead_ms }
    }

    /// Wall-clock millis corrected into the device clock domain.
    ///
    /// Clamped at zero so a caller-supplied origin cursor never produces a
    /// negative timestamp.
    pub fn device_query_start(&self, wall_ms: i64) -> i64 {
        (wall_ms - self.device_lead_ms).max(0)
    }

    /// Undo [`device_query_start`](Self::device_query_start)
    pub fn device_to_wall_clock(&self, device_ms: i64) -> i64 {
        device_ms + self.device_lead_ms
    }

    /// Build-service timestamps are already epoch millis
    pub fn service_to_wall_clock(&self, service_ms: i64) -> i64 {
        service_ms
    }

    /// Render a wall-clock cursor as the device log tail's start marker,
    /// applying both the device-clock correction and the local-UTC skew.
    pub fn to_device_local(&self, wall_ms: i64) -> String {
        format_marker(self.device_query_start(wall_ms), *Local::now().offset())
    }

    /// Fresh cursor at the current wall clock for the given domain.
    ///
    /// Fetchers return this as the resume point rather than parsing
    /// timestamps out of fetched content, guaranteeing forward progress
    /// even when nothing matched.
    pub fn next_cursor(&self, domain: CursorDomain) -> LogCursor {
        LogCursor::new(Utc::now().timestamp_millis(), domain)
    }
}

/// Format epoch millis as a device start marker in the given offset
fn format_marker(epoch_millis: i64, offset: FixedOffset) -> String {
    let secs = epoch_millis.div_euclid(1000);
    let sub_ms = epoch_millis.rem_euclid(1000) as u32;
    match offset.timestamp_opt(secs, sub_ms * 1_000_000).single() {
        Some(dt) => dt.format(DEVICE_MARKER_FORMAT).to_string(),
        // Out-of-range input degrades to the epoch marker rather than panicking
        None => offset
            .timestamp_opt(0, 0)
            .unwrap()
            .format(DEVICE_MARKER_FORMAT)
            .to_string(),
    }
}
