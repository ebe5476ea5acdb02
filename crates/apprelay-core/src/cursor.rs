//! Timestamp-based progress markers for incremental log retrieval

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Which clock domain a cursor belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CursorDomain {
    /// Build-service log timestamps (epoch millis, UTC)
    Build,
    /// Device-local log timestamps
    Device,
}

/// Last point already delivered to the caller.
///
/// Supplied by the caller on each fetch; fetchers return a new cursor
/// alongside content. A cursor never moves backwards for a given stream:
/// resubmitting an old cursor may produce duplicate lines, never gaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogCursor {
    pub epoch_millis: i64,
    pub domain: CursorDomain,
}

impl LogCursor {
    pub fn new(epoch_millis: i64, domain: CursorDomain) -> Self {
        Self {
            epoch_millis,
            domain,
        }
    }

    /// Cursor at the start of the stream
    pub fn origin(domain: CursorDomain) -> Self {
        Self::new(0, domain)
    }

    /// Cursor at the current wall clock
    pub fn now(domain: CursorDomain) -> Self {
        Self::new(Utc::now().timestamp_millis(), domain)
    }

    /// Advance to `epoch_millis`, never moving backwards
    pub fn advanced_to(self, epoch_millis: i64) -> Self {
        Self {
            epoch_millis: self.epoch_millis.max(epoch_millis),
            domain: self.domain,
        }
    }
}

/// One incremental fetch result: new content plus the cursor to resume from
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogChunk {
    pub content: String,
    pub next_cursor: LogCursor,
}

impl LogChunk {
    pub fn new(content: impl Into<String>, next_cursor: LogCursor) -> Self {
        Self {
            content: content.into(),
            next_cursor,
        }
    }

    /// Empty chunk that still advances the cursor
    pub fn empty(next_cursor: LogCursor) -> Self {
        Self::new(String::new(), next_cursor)
    }
}
