//! Build lifecycle tracking against the remote build service.
//!
//! The tracker holds no local state: `start` is the only write, and every
//! status query is a fresh remote round-trip. Polling cost stays with the
//! caller, cache invalidation stays nonexistent.

use std::sync::Arc;

use apprelay_core::prelude::*;
use apprelay_core::{BuildHandle, BuildState};

use crate::service::BuildService;
use crate::vcs::ProjectRepo;

/// Settings for the trigger path
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Base URL under which each project's source repository lives
    pub repo_base_url: String,
    /// Buildspec path registered with new build projects
    pub buildspec: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            repo_base_url: "http://vcs.localhost/repos".to_string(),
            buildspec: "buildspec.yml".to_string(),
        }
    }
}

/// Starts builds and answers status queries
#[derive(Clone)]
pub struct BuildTracker {
    service: Arc<dyn BuildService>,
    config: TrackerConfig,
}

impl BuildTracker {
    pub fn new(service: Arc<dyn BuildService>, config: TrackerConfig) -> Self {
        Self { service, config }
    }

    /// The remote source URL a project builds from
    pub fn source_repo_url(&self, project: &str) -> String {
        format!(
            "{}/{project}",
            self.config.repo_base_url.trim_end_matches('/')
        )
    }

    /// Trigger one build: ensure the remote build project exists, snapshot
    /// and push the working tree if one was given, then start a run.
    ///
    /// An `AlreadyExists` collision on project creation means the project
    /// was initialized earlier; it is logged and swallowed.
    pub async fn start(&self, project: &str, repo: Option<&ProjectRepo>) -> Result<BuildHandle> {
        let repo_url = self.source_repo_url(project);

        match self
            .service
            .create_project(project, &repo_url, &self.config.buildspec)
            .await
        {
            Ok(()) => info!("Registered build project {project}"),
            Err(err) if err.is_already_exists() => {
                debug!("Build project {project} already initialized")
            }
            Err(err) => return Err(err),
        }

        if let Some(repo) = repo {
            repo.commit("save changes").await?;
            repo.push(&repo_url).await?;
        }

        let run_id = self.service.start_run(project).await?;
        let handle = BuildHandle::new(project, run_id);
        info!("Started build {}", handle.build_id());
        Ok(handle)
    }

    /// Current state of a build, mapped from the remote status vocabulary
    pub async fn status(&self, build_id: &str) -> Result<BuildState> {
        let handle = BuildHandle::parse(build_id)?;
        let status = self
            .service
            .run_status(&handle.project, &handle.run_id)
            .await?;
        Ok(BuildState::from_remote(&status))
    }
}
