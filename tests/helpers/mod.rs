//! Test utility functions for cfn-pipeline

// Not every test crate uses every helper
#![allow(dead_code)]

use async_trait::async_trait;
use cfn_pipeline::detect::github::{ApiError, PullRequestFiles};
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

/// Pull-request API stub returning canned file lists
pub struct MockPullRequestFiles {
    files: Vec<String>,
    fail: bool,
}

impl MockPullRequestFiles {
    pub fn with_files(files: &[&str]) -> Self {
        Self {
            files: files.iter().map(|s| s.to_string()).collect(),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            files: Vec::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl PullRequestFiles for MockPullRequestFiles {
    async fn list_files(&self, _repo: &str, _number: u64) -> Result<Vec<String>, ApiError> {
        if self.fail {
            return Err(ApiError::Malformed);
        }
        Ok(self.files.clone())
    }
}

/// A throwaway git repository for detector tests
pub struct GitFixture {
    pub dir: TempDir,
}

impl GitFixture {
    pub fn init() -> Self {
        let fixture = Self {
            dir: tempfile::tempdir().expect("create temp repo dir"),
        };
        fixture.git(&["init", "-q"]);
        // normalize the unborn branch name regardless of git defaults
        fixture.git(&["symbolic-ref", "HEAD", "refs/heads/main"]);
        fixture.git(&["config", "user.email", "tests@example.com"]);
        fixture.git(&["config", "user.name", "Tests"]);
        fixture
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn git(&self, args: &[&str]) -> String {
        let output = Command::new("git")
            .args(args)
            .current_dir(self.dir.path())
            .output()
            .expect("run git");
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8(output.stdout)
            .expect("git output utf-8")
            .trim()
            .to_string()
    }

    pub fn write(&self, rel_path: &str, content: &str) {
        let path = self.dir.path().join(rel_path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dirs");
        }
        std::fs::write(path, content).expect("write fixture file");
    }

    /// Stage everything and commit; returns the new commit SHA
    pub fn commit_all(&self, message: &str) -> String {
        self.git(&["add", "-A"]);
        self.git(&["commit", "-q", "-m", message]);
        self.git(&["rev-parse", "HEAD"])
    }

    pub fn checkout_new(&self, branch: &str) {
        self.git(&["checkout", "-q", "-b", branch]);
    }

    pub fn checkout(&self, branch: &str) {
        self.git(&["checkout", "-q", branch]);
    }

    /// Merge a branch with a merge commit; returns the merge SHA
    pub fn merge_no_ff(&self, branch: &str) -> String {
        self.git(&["merge", "-q", "--no-ff", "-m", "merge", branch]);
        self.git(&["rev-parse", "HEAD"])
    }
}

/// Write a deployment-config document under a resource directory
pub fn write_deployment_config(root: &Path, resource_dir: &str, yaml: &str) {
    let dir = root.join(resource_dir);
    std::fs::create_dir_all(&dir).expect("create resource dir");
    std::fs::write(dir.join("deployment-config.yaml"), yaml).expect("write config");
}

/// A config declaring dev and int with complete required fields
pub const TWO_ENV_CONFIG: &str = r#"
deployments:
  - resource: "queue"
    environments: [dev, int]
    runners:
      dev: ubuntu-latest
      int: ubuntu-latest
    github_environments:
      dev: development
      int: integration
    aws_regions:
      dev: eu-west-1
      int: eu-west-1
    parameters:
      dev:
        stack-name: queue-dev
        parameter-file: params/dev.json
      int:
        stack-name: queue-int
        parameter-file: params/int.json
"#;
