//! Settings parser for apprelay's config.toml

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use apprelay_core::prelude::*;
use apprelay_core::DEFAULT_DEVICE_LEAD_MS;

const CONFIG_FILENAME: &str = "config.toml";
const APP_DIR: &str = "apprelay";

/// Global service settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "snake_case")]
pub struct Settings {
    pub server: ServerSettings,
    pub cloud: CloudSettings,
    pub device: DeviceSettings,
    pub storage: StorageSettings,
}

/// HTTP listener settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "snake_case")]
pub struct ServerSettings {
    /// Address the HTTP surface binds to
    pub listen: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:5000".to_string(),
        }
    }
}

/// Remote build pipeline endpoints
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "snake_case")]
pub struct CloudSettings {
    /// Base URL of the remote build service API
    pub service_url: String,

    /// Base URL of the artifact object store
    pub store_url: String,

    /// Base URL under which project source repositories live
    pub repo_base_url: String,

    /// Buildspec path registered with new build projects
    pub buildspec: String,

    /// Prefix a project name is appended to for its log group
    pub log_group_prefix: String,

    /// Bucket the build pipeline publishes artifacts into
    pub artifact_bucket: String,
}

impl Default for CloudSettings {
    fn default() -> Self {
        Self {
            service_url: "http://localhost:9090/api".to_string(),
            store_url: "http://localhost:9000".to_string(),
            repo_base_url: "http://localhost:3000/repos".to_string(),
            buildspec: "buildspec.yml".to_string(),
            log_group_prefix: "/codebuild/".to_string(),
            artifact_bucket: "artifacts".to_string(),
        }
    }
}

/// Attached-device settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "snake_case")]
pub struct DeviceSettings {
    /// Calibration: how far ahead the device clock runs, in millis
    pub device_lead_ms: i64,

    /// Timeout for device tool invocations, in seconds
    pub command_timeout_secs: u64,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            device_lead_ms: DEFAULT_DEVICE_LEAD_MS,
            command_timeout_secs: 30,
        }
    }
}

/// Local filesystem layout
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "snake_case")]
pub struct StorageSettings {
    /// Directory holding project working copies, one per project
    pub projects_dir: PathBuf,

    /// Directory artifacts are staged in before install
    pub staging_dir: PathBuf,
}

impl Default for StorageSettings {
    fn default() -> Self {
        let base = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            projects_dir: base.join(APP_DIR).join("projects"),
            staging_dir: std::env::temp_dir().join(APP_DIR),
        }
    }
}

impl Settings {
    /// Default config file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR).join(CONFIG_FILENAME))
    }

    /// Load settings from an explicit path, or the default location.
    ///
    /// An explicitly-given file must exist and parse; a missing or broken
    /// file at the default location falls back to defaults with a warning.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(|e| {
                    Error::config(format!("failed to read {}: {e}", path.display()))
                })?;
                toml::from_str(&content)
                    .map_err(|e| Error::config(format!("failed to parse {}: {e}", path.display())))
            }
            None => Ok(Self::load_default_location()),
        }
    }

    fn load_default_location() -> Self {
        let Some(path) = Self::default_path() else {
            return Self::default();
        };
        if !path.exists() {
            debug!("No config file at {:?}, using defaults", path);
            return Self::default();
        }
        match std::fs::read_to_string(&path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(settings) => {
                    debug!("Loaded settings from {:?}", path);
                    settings
                }
                Err(e) => {
                    warn!("Failed to parse {:?}: {}", path, e);
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Failed to read {:?}: {}", path, e);
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.server.listen, "0.0.0.0:5000");
        assert_eq!(settings.cloud.log_group_prefix, "/codebuild/");
        assert_eq!(settings.device.device_lead_ms, DEFAULT_DEVICE_LEAD_MS);
    }

    #[test]
    fn test_load_explicit_file() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[server]
listen = "127.0.0.1:8080"

[cloud]
artifact_bucket = "mobile-artifacts"

[device]
device_lead_ms = 0
"#,
        )
        .unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.server.listen, "127.0.0.1:8080");
        assert_eq!(settings.cloud.artifact_bucket, "mobile-artifacts");
        assert_eq!(settings.device.device_lead_ms, 0);
        // Unspecified sections keep their defaults
        assert_eq!(settings.cloud.buildspec, "buildspec.yml");
    }

    #[test]
    fn test_load_explicit_missing_file_fails() {
        let temp = tempdir().unwrap();
        let err = Settings::load(Some(&temp.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_load_explicit_invalid_toml_fails() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "not valid toml {{{{").unwrap();
        let err = Settings::load(Some(&path)).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_default_config_round_trips() {
        let content = toml::to_string(&Settings::default()).unwrap();
        let _: Settings = toml::from_str(&content).expect("default config should be valid TOML");
    }
}
