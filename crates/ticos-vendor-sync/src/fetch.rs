//! Fetching the upstream SDK into the scratch directory.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{SyncError, SyncResult};

/// Source of an SDK snapshot.
///
/// Implementations must leave a full checkout of `revision` at `dest`, which
/// does not exist when `fetch` is called.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    /// Materialise `revision` at `dest`.
    async fn fetch(&self, revision: &str, dest: &Path) -> SyncResult<()>;

    /// Where the snapshot comes from, for logs.
    fn describe(&self) -> String;
}

/// Shallow `git clone` of a single tag or branch.
#[derive(Debug, Clone)]
pub struct GitFetcher {
    git: PathBuf,
    repo_url: String,
    timeout: Duration,
}

impl GitFetcher {
    /// Create a fetcher using an explicit `git` binary.
    #[must_use]
    pub fn new(git: impl Into<PathBuf>, repo_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            git: git.into(),
            repo_url: repo_url.into(),
            timeout,
        }
    }

    /// Create a fetcher using the `git` found on `PATH`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::GitNotFound`] if no `git` executable is on `PATH`.
    pub fn locate(repo_url: impl Into<String>, timeout: Duration) -> SyncResult<Self> {
        let git = which::which("git").map_err(|e| SyncError::GitNotFound(e.to_string()))?;
        Ok(Self::new(git, repo_url, timeout))
    }

    /// Arguments passed to `git` for a clone of `revision` into `dest`.
    #[must_use]
    pub fn clone_args(&self, revision: &str, dest: &Path) -> Vec<OsString> {
        vec![
            "clone".into(),
            "--depth=1".into(),
            "--single-branch".into(),
            "--branch".into(),
            revision.into(),
            self.repo_url.as_str().into(),
            dest.as_os_str().to_os_string(),
        ]
    }
}

#[async_trait::async_trait]
impl Fetcher for GitFetcher {
    async fn fetch(&self, revision: &str, dest: &Path) -> SyncResult<()> {
        // When the timeout future drops, kill_on_drop takes the child with it.
        tokio::time::timeout(self.timeout, self.clone_repo(revision, dest))
            .await
            .map_err(|_| SyncError::FetchTimeout {
                secs: self.timeout.as_secs(),
            })?
    }

    fn describe(&self) -> String {
        self.repo_url.clone()
    }
}

impl GitFetcher {
    /// Suppresses interactive credential prompts and pipes stdin to null
    /// so an unattended run fails instead of hanging on authentication.
    async fn clone_repo(&self, revision: &str, dest: &Path) -> SyncResult<()> {
        let mut cmd = Command::new(&self.git);
        cmd.env("GIT_TERMINAL_PROMPT", "0");
        cmd.env("GIT_SSH_COMMAND", "ssh -o BatchMode=yes");
        cmd.stdin(std::process::Stdio::null());
        cmd.kill_on_drop(true);
        cmd.args(self.clone_args(revision, dest));

        debug!(git = %self.git.display(), revision, dest = %dest.display(), "running git clone");

        let output = cmd.output().await.map_err(|e| SyncError::FetchFailed {
            revision: revision.to_owned(),
            stderr: format!("failed to run git clone: {e}"),
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SyncError::FetchFailed {
                revision: revision.to_owned(),
                stderr: stderr.trim_end().to_owned(),
            });
        }

        Ok(())
    }
}

/// Make `scratch` ready to receive a fresh clone.
///
/// A directory left behind by an earlier failed run is removed.
///
/// # Errors
///
/// Returns an error if the stale directory or the parent cannot be prepared.
pub async fn prepare_scratch(scratch: &Path) -> SyncResult<()> {
    match tokio::fs::metadata(scratch).await {
        Ok(_) => {
            warn!(path = %scratch.display(), "removing stale scratch directory from an earlier run");
            remove_scratch(scratch).await?;
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {},
        Err(e) => return Err(SyncError::io("inspect", scratch, e)),
    }

    if let Some(parent) = scratch.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| SyncError::io("create", parent, e))?;
    }
    Ok(())
}

/// Delete the scratch clone. A missing directory is not an error.
///
/// # Errors
///
/// Returns an error if the directory exists but cannot be removed.
pub async fn remove_scratch(scratch: &Path) -> SyncResult<()> {
    match tokio::fs::remove_dir_all(scratch).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(SyncError::io("remove", scratch, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetcher() -> GitFetcher {
        GitFetcher::new(
            "git",
            "git@github.com:tiwater/ticos-sdk-for-c.git",
            Duration::from_secs(300),
        )
    }

    #[test]
    fn test_clone_args_shallow_single_branch() {
        let args = fetcher().clone_args("v1.2.0", Path::new("/lib/sdkrepo"));
        let args: Vec<String> = args
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            vec![
                "clone",
                "--depth=1",
                "--single-branch",
                "--branch",
                "v1.2.0",
                "git@github.com:tiwater/ticos-sdk-for-c.git",
                "/lib/sdkrepo",
            ]
        );
    }

    #[test]
    fn test_describe_is_repo_url() {
        assert_eq!(
            fetcher().describe(),
            "git@github.com:tiwater/ticos-sdk-for-c.git"
        );
    }

    #[tokio::test]
    async fn test_missing_git_binary_is_fetch_failure() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = GitFetcher::new(
            dir.path().join("no-such-git"),
            "https://example.invalid/repo.git",
            Duration::from_secs(5),
        );
        let err = fetcher
            .fetch("v1.0.0", &dir.path().join("clone"))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::FetchFailed { .. }));
        assert!(!dir.path().join("clone").exists());
    }

    #[tokio::test]
    async fn test_prepare_scratch_removes_stale_clone() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = dir.path().join("sdkrepo");
        std::fs::create_dir_all(scratch.join("sdk/src")).unwrap();
        std::fs::write(scratch.join("sdk/src/old.c"), "old").unwrap();

        prepare_scratch(&scratch).await.unwrap();
        assert!(!scratch.exists());
    }

    #[tokio::test]
    async fn test_remove_scratch_tolerates_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        remove_scratch(&dir.path().join("never-created")).await.unwrap();
    }
}
