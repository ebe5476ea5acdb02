//! Incremental build-log fetching.
//!
//! The build id decomposes into `(project, run_id)`; the log group is
//! derived from the project name and the run id doubles as the log stream
//! name. The returned cursor is the wall clock at fetch time, never a
//! timestamp parsed out of the fetched events, so an empty poll still makes
//! forward progress.

use std::sync::Arc;

use serde::Serialize;

use apprelay_core::cursor::CursorDomain;
use apprelay_core::prelude::*;
use apprelay_core::{BuildHandle, ClockTranslator};

use crate::service::{BuildService, LogEvent};

/// One page of build-log events plus the cursor to resume from
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildLogPage {
    pub events: Vec<LogEvent>,
    pub next_since: i64,
}

/// Fetches build logs incrementally against a caller-held cursor
#[derive(Clone)]
pub struct BuildLogFetcher {
    service: Arc<dyn BuildService>,
    log_group_prefix: String,
    clock: ClockTranslator,
}

impl BuildLogFetcher {
    pub fn new(
        service: Arc<dyn BuildService>,
        log_group_prefix: impl Into<String>,
        clock: ClockTranslator,
    ) -> Self {
        Self {
            service,
            log_group_prefix: log_group_prefix.into(),
            clock,
        }
    }

    /// The log group holding all runs of one project
    pub fn log_group(&self, project: &str) -> String {
        format!("{}{project}", self.log_group_prefix)
    }

    /// Events since `since_millis` for the given build.
    ///
    /// Duplicate events across overlapping polls are possible and left to
    /// the caller; dropped in-range events are not.
    pub async fn fetch(&self, build_id: &str, since_millis: i64) -> Result<BuildLogPage> {
        let handle = BuildHandle::parse(build_id)?;
        let group = self.log_group(&handle.project);

        let events = self
            .service
            .log_events(&group, &handle.run_id, since_millis)
            .await?;
        debug!(
            "Fetched {} build log events for {build_id} since {since_millis}",
            events.len()
        );

        Ok(BuildLogPage {
            events,
            next_since: self.clock.next_cursor(CursorDomain::Build).epoch_millis,
        })
    }
}
