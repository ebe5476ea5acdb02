//! Version-control push helper for the build trigger path.
//!
//! The remote repository already exists (project scaffolding owns its
//! creation); this module only snapshots the working tree and pushes it to
//! the project's remote before a run starts.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;

use apprelay_core::prelude::*;

/// A project working tree under local version control
#[derive(Debug, Clone)]
pub struct ProjectRepo {
    path: PathBuf,
}

impl ProjectRepo {
    /// Open an existing working copy
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.join(".git").exists() {
            return Err(Error::vcs(format!(
                "not a repository: {}",
                path.display()
            )));
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stage everything and commit. A clean tree is not an error; the
    /// trigger path runs this unconditionally before every build.
    pub async fn commit(&self, message: &str) -> Result<()> {
        let add = run_git(&self.path, &["add", "-A"]).await?;
        if !add.success {
            return Err(Error::vcs(format!("git add failed: {}", add.stderr.trim())));
        }

        let commit = run_git(&self.path, &["commit", "-m", message]).await?;
        if commit.success || commit.combined().contains("nothing to commit") {
            Ok(())
        } else {
            Err(Error::vcs(format!(
                "git commit failed: {}",
                commit.stderr.trim()
            )))
        }
    }

    /// Push all branches to the remote URL
    pub async fn push(&self, remote_url: &str) -> Result<()> {
        info!("Pushing {} -> {remote_url}", self.path.display());
        let push = run_git(&self.path, &["push", remote_url, "--all"]).await?;
        if push.success {
            Ok(())
        } else {
            Err(Error::vcs(format!(
                "git push failed: {}",
                push.stderr.trim()
            )))
        }
    }
}

struct GitOutput {
    success: bool,
    stdout: String,
    stderr: String,
}

impl GitOutput {
    fn combined(&self) -> String {
        format!("{}\n{}", self.stdout, self.stderr)
    }
}

async fn run_git(cwd: &Path, args: &[&str]) -> Result<GitOutput> {
    debug!("git {} (in {})", args.join(" "), cwd.display());

    let output = Command::new("git")
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::tool_missing("git")
            } else {
                Error::vcs(format!("failed to run git: {e}"))
            }
        })?;

    Ok(GitOutput {
        success: output.status.success(),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    })
}
