//! Shared application state for the HTTP surface

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use apprelay_cloud::{
    BuildLogFetcher, BuildTracker, HttpBuildService, HttpObjectStore, ProjectRepo, TrackerConfig,
};
use apprelay_core::prelude::*;
use apprelay_core::ClockTranslator;
use apprelay_device::{AdbBridge, DeviceSession, InstallReactor};

use crate::bus::{ChannelBroker, EventBusBridge};
use crate::config::Settings;

/// Everything a request handler needs. Cheap to clone: all components are
/// Arc-backed, and the service itself keeps no per-request state.
#[derive(Clone)]
pub struct AppState {
    pub tracker: BuildTracker,
    pub build_logs: BuildLogFetcher,
    pub session: DeviceSession,
    pub reactor: InstallReactor,
    pub bridge: EventBusBridge,
    pub projects_dir: PathBuf,
}

impl AppState {
    /// Wire up the production collaborators from settings
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let clock = ClockTranslator::new(settings.device.device_lead_ms);

        let service: Arc<HttpBuildService> =
            Arc::new(HttpBuildService::new(&settings.cloud.service_url)?);
        let store = Arc::new(HttpObjectStore::new(&settings.cloud.store_url)?);
        let device_bridge = Arc::new(
            AdbBridge::locate()
                .with_timeout(Duration::from_secs(settings.device.command_timeout_secs)),
        );

        let tracker = BuildTracker::new(
            service.clone(),
            TrackerConfig {
                repo_base_url: settings.cloud.repo_base_url.clone(),
                buildspec: settings.cloud.buildspec.clone(),
            },
        );
        let build_logs =
            BuildLogFetcher::new(service, settings.cloud.log_group_prefix.clone(), clock);
        let session = DeviceSession::new(device_bridge.clone(), clock);
        let reactor = InstallReactor::new(
            store,
            device_bridge,
            settings.cloud.artifact_bucket.clone(),
            settings.storage.staging_dir.clone(),
        );
        let bridge = EventBusBridge::new(Arc::new(ChannelBroker::new()));

        Ok(Self {
            tracker,
            build_logs,
            session,
            reactor,
            bridge,
            projects_dir: settings.storage.projects_dir.clone(),
        })
    }

    /// The project's local working copy, if one is checked out on this host
    pub fn project_repo(&self, project: &str) -> Option<ProjectRepo> {
        ProjectRepo::open(self.projects_dir.join(project)).ok()
    }
}
