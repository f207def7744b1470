//! Git subprocess wrapper
//!
//! All repository questions the detector asks go through `git` itself:
//! diffs, merge bases, parent counts. Output is captured, trimmed, and
//! split; a non-zero exit is an error the caller's fallback chain absorbs.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

/// Errors from git invocations
#[derive(Debug, Error)]
pub enum GitError {
    #[error("failed to run git: {0}")]
    Spawn(String),

    #[error("git exited with code {0}: {1}")]
    Exit(i32, String),

    #[error("git output was not valid UTF-8")]
    Utf8,

    #[error("git timed out after {0} seconds")]
    Timeout(u64),
}

/// Client for running git in a working copy
#[derive(Debug, Clone)]
pub struct GitCli {
    repo_dir: PathBuf,
    timeout_secs: u64,
}

impl GitCli {
    pub fn new(repo_dir: impl Into<PathBuf>) -> Self {
        Self {
            repo_dir: repo_dir.into(),
            timeout_secs: 60,
        }
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    async fn run(&self, args: &[&str]) -> Result<String, GitError> {
        debug!("git {}", args.join(" "));

        let result = timeout(
            Duration::from_secs(self.timeout_secs),
            Command::new("git")
                .args(args)
                .current_dir(&self.repo_dir)
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| GitError::Timeout(self.timeout_secs))?;

        let output = result.map_err(|e| GitError::Spawn(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GitError::Exit(
                output.status.code().unwrap_or(-1),
                stderr.trim().to_string(),
            ));
        }

        String::from_utf8(output.stdout)
            .map(|s| s.trim().to_string())
            .map_err(|_| GitError::Utf8)
    }

    /// Names of files changed between two commits
    pub async fn diff_names(&self, from: &str, to: &str) -> Result<Vec<String>, GitError> {
        let output = self.run(&["diff", "--name-only", from, to]).await?;
        Ok(split_lines(&output))
    }

    /// Names of files changed over a literal range expression (`a...b`)
    pub async fn diff_names_range(&self, range: &str) -> Result<Vec<String>, GitError> {
        let output = self.run(&["diff", "--name-only", range]).await?;
        Ok(split_lines(&output))
    }

    /// Resolve a revision expression to a commit SHA
    pub async fn rev_parse(&self, spec: &str) -> Result<String, GitError> {
        self.run(&["rev-parse", spec]).await
    }

    /// The merge base of two commits
    pub async fn merge_base(&self, a: &str, b: &str) -> Result<String, GitError> {
        self.run(&["merge-base", a, b]).await
    }

    /// Number of parents of a commit; >1 means a merge commit
    pub async fn parent_count(&self, sha: &str) -> Result<usize, GitError> {
        let output = self.run(&["cat-file", "-p", sha]).await?;
        Ok(output
            .lines()
            .filter(|line| line.starts_with("parent "))
            .count())
    }
}

fn split_lines(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect()
}
