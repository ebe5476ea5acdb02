//! Build identifiers and the build state machine

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A request to build one project. Transient; lives only for the call that
/// creates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildRequest {
    pub project: String,
}

/// Correlates a project with one remote build execution.
///
/// The client-facing identifier is `"<project>:<run_id>"`; clients treat it
/// as opaque and hand it back on status/log queries. Nothing is tracked
/// locally for a handle; the remote service owns the run's lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildHandle {
    pub project: String,
    pub run_id: String,
}

impl BuildHandle {
    pub fn new(project: impl Into<String>, run_id: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            run_id: run_id.into(),
        }
    }

    /// The opaque client-facing identifier
    pub fn build_id(&self) -> String {
        format!("{}:{}", self.project, self.run_id)
    }

    /// Decompose a client-supplied build id.
    ///
    /// Run ids may themselves contain `:` (remote services namespace them),
    /// so only the first separator splits.
    pub fn parse(build_id: &str) -> Result<Self> {
        match build_id.split_once(':') {
            Some((project, run_id)) if !project.is_empty() && !run_id.is_empty() => {
                Ok(Self::new(project, run_id))
            }
            _ => Err(Error::not_found(format!("build {build_id}"))),
        }
    }
}

/// Build lifecycle: `Requested -> Running -> {Succeeded, Failed}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuildState {
    Requested,
    Running,
    Succeeded,
    Failed,
}

impl BuildState {
    /// Map the remote service's status vocabulary into the state machine.
    ///
    /// Unknown strings map to `Running`: a vocabulary word this code has
    /// never seen must not terminate a client's poll loop.
    pub fn from_remote(status: &str) -> Self {
        match status.to_ascii_uppercase().as_str() {
            "QUEUED" | "SUBMITTED" | "REQUESTED" | "PENDING" => BuildState::Requested,
            "IN_PROGRESS" | "RUNNING" | "PROVISIONING" | "BUILDING" => BuildState::Running,
            "SUCCEEDED" | "SUCCESS" => BuildState::Succeeded,
            "FAILED" | "FAULT" | "TIMED_OUT" | "STOPPED" | "CANCELLED" => BuildState::Failed,
            _ => BuildState::Running,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BuildState::Succeeded | BuildState::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BuildState::Requested => "REQUESTED",
            BuildState::Running => "RUNNING",
            BuildState::Succeeded => "SUCCEEDED",
            BuildState::Failed => "FAILED",
        }
    }
}
