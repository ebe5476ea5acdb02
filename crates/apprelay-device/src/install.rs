//! Install reaction: fetch a finished build's artifact and put it on the
//! attached device.
//!
//! Triggered from the event publish path for completion events. Steps run
//! sequentially with no rollback; any failure is reported upward but must
//! never suppress delivery of the triggering event; the caller publishes
//! regardless of the outcome here.

use std::path::PathBuf;
use std::sync::Arc;

use apprelay_core::prelude::*;
use apprelay_core::{InstallStep, ProjectEvent};
use apprelay_cloud::ObjectStore;

use crate::bridge::DeviceBridge;

/// Reacts to completion events by installing the built artifact
#[derive(Clone)]
pub struct InstallReactor {
    store: Arc<dyn ObjectStore>,
    bridge: Arc<dyn DeviceBridge>,
    bucket: String,
    staging_dir: PathBuf,
}

impl InstallReactor {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        bridge: Arc<dyn DeviceBridge>,
        bucket: impl Into<String>,
        staging_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            bridge,
            bucket: bucket.into(),
            staging_dir: staging_dir.into(),
        }
    }

    /// Object-store key a project's artifact is published under when the
    /// event does not carry an explicit reference
    pub fn default_artifact_key(project: &str) -> String {
        format!("{project}/app-debug.apk")
    }

    /// Run the full reaction for one completion event:
    /// fetch -> inspect -> uninstall -> install -> cleanup.
    pub async fn on_build_finished(&self, event: &ProjectEvent) -> Result<()> {
        let key = event
            .artifact_ref()
            .map(str::to_string)
            .unwrap_or_else(|| Self::default_artifact_key(&event.project));
        let staged = self.staging_dir.join(format!("{}-app.apk", event.project));

        info!(
            "Install reaction for {}: fetching {}/{key}",
            event.project, self.bucket
        );

        self.store
            .download(&self.bucket, &key, &staged)
            .await
            .map_err(|e| step_err(InstallStep::Fetch, e))?;

        let outcome = self.install_staged(&staged).await;

        // The staged copy is removed even after a failed install; a
        // cleanup failure only surfaces when everything else worked
        if let Err(e) = tokio::fs::remove_file(&staged).await {
            warn!("Failed to remove staged artifact {}: {e}", staged.display());
            if outcome.is_ok() {
                return Err(Error::install(InstallStep::Cleanup, e.to_string()));
            }
        }

        outcome
    }

    async fn install_staged(&self, staged: &std::path::Path) -> Result<()> {
        let package_id = self
            .bridge
            .inspect_package_id(staged)
            .await
            .map_err(|e| step_err(InstallStep::Inspect, e))?;
        debug!("Artifact package id: {package_id}");

        self.bridge
            .uninstall(&package_id)
            .await
            .map_err(|e| step_err(InstallStep::Uninstall, e))?;

        self.bridge
            .install(staged)
            .await
            .map_err(|e| step_err(InstallStep::Install, e))?;

        info!("Installed {package_id} from {}", staged.display());
        Ok(())
    }
}

/// Tag an underlying failure with the step it happened in, unless the
/// bridge already did
fn step_err(step: InstallStep, err: Error) -> Error {
    match err {
        e @ Error::InstallFailure { .. } => e,
        e => Error::install(step, e.to_string()),
    }
}
