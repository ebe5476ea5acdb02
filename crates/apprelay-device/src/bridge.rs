//! Device bridge over the platform debug tools.
//!
//! Wraps the `adb`/`aapt` command-line tools behind a capability trait so
//! the session controller and install reactor never compose raw shell
//! pipelines. The bridge is a single shared resource per host: no
//! device-level locking is provided, so concurrent install and log-tail
//! calls against the same device are the caller's race to coordinate.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tokio::process::Command;
use tokio::time::timeout;

use apprelay_core::prelude::*;
use apprelay_core::InstallStep;

/// Default timeout for device tool invocations
const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Capabilities the orchestration layer needs from an attached device
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeviceBridge: Send + Sync {
    /// Raw process listing from the device shell
    async fn list_processes(&self) -> Result<String>;

    /// Device log lines since a device-local start marker
    async fn tail_log(&self, since_marker: &str) -> Result<String>;

    /// Remove an installed package. "Not installed" counts as success.
    async fn uninstall(&self, package_id: &str) -> Result<()>;

    /// Install an artifact, replacing any existing installation
    async fn install(&self, artifact: &Path) -> Result<()>;

    /// Package identifier embedded in an artifact's manifest
    async fn inspect_package_id(&self, artifact: &Path) -> Result<String>;
}

/// [`DeviceBridge`] backed by the Android debug tools
pub struct AdbBridge {
    adb: PathBuf,
    aapt: PathBuf,
    command_timeout: Duration,
}

impl AdbBridge {
    pub fn new(adb: impl Into<PathBuf>, aapt: impl Into<PathBuf>) -> Self {
        Self {
            adb: adb.into(),
            aapt: aapt.into(),
            command_timeout: COMMAND_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, command_timeout: Duration) -> Self {
        self.command_timeout = command_timeout;
        self
    }

    /// Locate the debug tools on PATH, falling back to the bare command
    /// names. Resolution failures are logged, not fatal: a host without
    /// the tools can still serve every cloud-side endpoint.
    pub fn locate() -> Self {
        let adb = which::which("adb").unwrap_or_else(|_| {
            warn!("adb not found on PATH; device operations will fail until it is installed");
            PathBuf::from("adb")
        });
        let aapt = which::which("aapt").unwrap_or_else(|_| {
            warn!("aapt not found on PATH; artifact inspection will fail until it is installed");
            PathBuf::from("aapt")
        });
        Self::new(adb, aapt)
    }

    async fn run(&self, program: &Path, args: &[&str]) -> Result<ToolOutput> {
        debug!("{} {}", program.display(), args.join(" "));

        let tool = program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| program.display().to_string());

        let output = timeout(
            self.command_timeout,
            Command::new(program)
                .args(args)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .output(),
        )
        .await
        .map_err(|_| Error::bridge(format!("{tool} timed out after {:?}", self.command_timeout)))?
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::tool_missing(tool.clone())
            } else {
                Error::bridge(format!("failed to run {tool}: {e}"))
            }
        })?;

        Ok(ToolOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

struct ToolOutput {
    success: bool,
    stdout: String,
    stderr: String,
}

impl ToolOutput {
    fn combined(&self) -> String {
        format!("{}\n{}", self.stdout, self.stderr)
    }
}

#[async_trait]
impl DeviceBridge for AdbBridge {
    async fn list_processes(&self) -> Result<String> {
        let out = self.run(&self.adb, &["shell", "ps"]).await?;
        if out.success {
            Ok(out.stdout)
        } else {
            Err(Error::bridge(format!(
                "process listing failed: {}",
                out.stderr.trim()
            )))
        }
    }

    async fn tail_log(&self, since_marker: &str) -> Result<String> {
        let out = self.run(&self.adb, &["logcat", "-t", since_marker]).await?;
        if out.success {
            Ok(out.stdout)
        } else {
            Err(Error::bridge(format!(
                "log tail failed: {}",
                out.stderr.trim()
            )))
        }
    }

    async fn uninstall(&self, package_id: &str) -> Result<()> {
        let out = self.run(&self.adb, &["uninstall", package_id]).await?;
        if out.success || is_not_installed(&out.combined()) {
            Ok(())
        } else {
            Err(Error::install(
                InstallStep::Uninstall,
                out.combined().trim().to_string(),
            ))
        }
    }

    async fn install(&self, artifact: &Path) -> Result<()> {
        let path = artifact.to_string_lossy();
        let out = self.run(&self.adb, &["install", "-r", path.as_ref()]).await?;
        // adb reports install outcomes on stdout; the exit status alone
        // does not distinguish Success from Failure on older tool versions
        if out.success && !out.combined().contains("Failure") {
            Ok(())
        } else {
            Err(Error::install(
                InstallStep::Install,
                out.combined().trim().to_string(),
            ))
        }
    }

    async fn inspect_package_id(&self, artifact: &Path) -> Result<String> {
        let path = artifact.to_string_lossy();
        let out = self
            .run(&self.aapt, &["dump", "badging", path.as_ref()])
            .await?;
        if !out.success {
            return Err(Error::install(
                InstallStep::Inspect,
                out.stderr.trim().to_string(),
            ));
        }
        parse_badging_package(&out.stdout).ok_or_else(|| {
            Error::install(
                InstallStep::Inspect,
                format!("no package id in badging output for {path}"),
            )
        })
    }
}

/// Uninstall responses that mean "nothing to remove"
fn is_not_installed(output: &str) -> bool {
    output.contains("NOT_INSTALLED") || output.contains("Unknown package")
}

/// Extract the package id from `aapt dump badging` output
pub(crate) fn parse_badging_package(badging: &str) -> Option<String> {
    // First line of badging output: package: name='com.example.app' versionCode='1' ...
    let re = Regex::new(r"package:\s+name='([^']+)'").expect("static regex");
    re.captures(badging)
        .map(|caps| caps[1].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_badging_package() {
        let badging = "package: name='com.rexz.testapp' versionCode='1' versionName='1.0'\n\
                       sdkVersion:'21'\n\
                       application-label:'testapp'";
        assert_eq!(
            parse_badging_package(badging),
            Some("com.rexz.testapp".to_string())
        );
    }

    #[test]
    fn test_parse_badging_missing_package() {
        assert_eq!(parse_badging_package("ERROR: dump failed"), None);
        assert_eq!(parse_badging_package(""), None);
    }

    #[test]
    fn test_is_not_installed() {
        assert!(is_not_installed("Failure [DELETE_FAILED_INTERNAL_ERROR: NOT_INSTALLED]"));
        assert!(is_not_installed("Unknown package: com.example.app"));
        assert!(!is_not_installed("Failure [DELETE_FAILED_DEVICE_POLICY_MANAGER]"));
        assert!(!is_not_installed("Success"));
    }

    #[test]
    fn test_locate_always_yields_a_bridge() {
        // Even without the tools on PATH this must not fail; commands
        // error at call time instead.
        let bridge = AdbBridge::locate();
        assert!(!bridge.adb.as_os_str().is_empty());
        assert!(!bridge.aapt.as_os_str().is_empty());
    }
}
