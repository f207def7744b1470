//! Change detection
//!
//! Given the trigger event, work out which resource directories had their
//! deployment-config touched. Each event variant has an ordered list of
//! file-listing strategies; the first one that yields files wins, and a
//! chain that runs dry degrades to "nothing to deploy" rather than failing
//! the run.

pub mod git;
pub mod github;

use crate::core::{ResourcePath, TriggerEvent};
use git::{GitCli, GitError};
use github::{ApiError, PullRequestFiles};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Filename stems accepted as deployment-config documents
const CONFIG_FILENAMES: [&str; 2] = ["deployment-config.yml", "deployment-config.yaml"];

/// Validation failures surfaced to the caller; everything else degrades
#[derive(Debug, Error)]
pub enum DetectError {
    #[error("resource path '{path}' is not valid for app '{app}': must start with '{expected}'")]
    PathOutsideApp {
        path: String,
        app: String,
        expected: String,
    },
}

/// One way of obtaining a changed-file list.
///
/// Chains are built per event variant and evaluated in order; a strategy
/// either errors, yields nothing, or settles the question.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ListStrategy {
    /// Diff the commit immediately preceding `head` against `head`
    CommitBeforeHead { head: String },
    /// Query the hosting platform for the full pull-request file list
    PullRequestApi { number: u64 },
    /// Diff the two commits directly
    Range { from: String, to: String },
    /// Diff over the literal three-dot range `from...to`
    RangeDots { from: String, to: String },
    /// Diff what a merge commit introduces relative to the target branch
    MergeIntroduced { before: String, after: String },
    /// Best-effort diff of the previous commit against the current one
    PreviousCommit,
}

#[derive(Debug, Error)]
enum StrategyError {
    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Detector configuration: the namespace resources live under and an
/// optional application filter for manual dispatch validation.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    pub namespace: String,
    pub app_name: Option<String>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            namespace: "cloud-formation".to_string(),
            app_name: None,
        }
    }
}

/// Resolves a trigger event to the set of changed resource directories
pub struct ChangeDetector {
    git: GitCli,
    api: Arc<dyn PullRequestFiles>,
    repository: String,
    config: DetectorConfig,
}

impl ChangeDetector {
    pub fn new(
        git: GitCli,
        api: Arc<dyn PullRequestFiles>,
        repository: impl Into<String>,
        config: DetectorConfig,
    ) -> Self {
        Self {
            git,
            api,
            repository: repository.into(),
            config,
        }
    }

    /// Detect the resource paths touched by this event.
    ///
    /// Manual dispatch short-circuits to the supplied path after namespace
    /// validation and never consults the repository. Everything else runs
    /// the fallback chain for its variant and filters the resulting file
    /// list; an exhausted chain yields the empty set.
    pub async fn detect(&self, event: &TriggerEvent) -> Result<Vec<ResourcePath>, DetectError> {
        if let TriggerEvent::ManualDispatch { resource_path, .. } = event {
            self.validate_dispatch_path(resource_path)?;
            return Ok(vec![ResourcePath::new(resource_path.clone())]);
        }

        let files = self.changed_files(event).await;
        let paths = filter_resource_paths(&files, &self.config.namespace);

        if paths.is_empty() {
            info!(
                "no resource paths detected (event: {:?}, {} changed files)",
                event,
                files.len()
            );
        }
        Ok(paths)
    }

    fn validate_dispatch_path(&self, resource_path: &str) -> Result<(), DetectError> {
        let Some(app) = self.config.app_name.as_deref().filter(|a| !a.is_empty()) else {
            return Ok(());
        };
        let expected = if self.config.namespace.is_empty() {
            format!("{app}/")
        } else {
            format!("{}/{}/", self.config.namespace, app)
        };
        if resource_path.starts_with(&expected) {
            Ok(())
        } else {
            Err(DetectError::PathOutsideApp {
                path: resource_path.to_string(),
                app: app.to_string(),
                expected,
            })
        }
    }

    async fn changed_files(&self, event: &TriggerEvent) -> Vec<String> {
        let strategies = self.strategies_for(event).await;
        for strategy in &strategies {
            match self.run_strategy(strategy).await {
                Ok(files) if !files.is_empty() => {
                    debug!("{:?} yielded {} files", strategy, files.len());
                    return files;
                }
                Ok(_) => debug!("{:?} yielded no files, trying next", strategy),
                Err(e) => warn!("{:?} failed ({e}), trying next", strategy),
            }
        }
        Vec::new()
    }

    async fn strategies_for(&self, event: &TriggerEvent) -> Vec<ListStrategy> {
        match event {
            TriggerEvent::PullRequest {
                number, head_sha, ..
            } => vec![
                ListStrategy::CommitBeforeHead {
                    head: head_sha.clone(),
                },
                ListStrategy::PullRequestApi { number: *number },
                ListStrategy::PreviousCommit,
            ],
            TriggerEvent::Push {
                before_sha,
                after_sha,
            } => {
                // A parent-count probe failure reads as a non-merge commit.
                let parents = self.git.parent_count(after_sha).await.unwrap_or(0);
                if parents > 1 {
                    vec![ListStrategy::MergeIntroduced {
                        before: before_sha.clone(),
                        after: after_sha.clone(),
                    }]
                } else {
                    vec![
                        ListStrategy::Range {
                            from: before_sha.clone(),
                            to: after_sha.clone(),
                        },
                        ListStrategy::RangeDots {
                            from: before_sha.clone(),
                            to: after_sha.clone(),
                        },
                    ]
                }
            }
            TriggerEvent::Other { name } => {
                debug!("unhandled event kind '{name}', falling back to previous-commit diff");
                vec![ListStrategy::PreviousCommit]
            }
            TriggerEvent::ManualDispatch { .. } => Vec::new(),
        }
    }

    async fn run_strategy(&self, strategy: &ListStrategy) -> Result<Vec<String>, StrategyError> {
        match strategy {
            ListStrategy::CommitBeforeHead { head } => {
                let prev = self.git.rev_parse(&format!("{head}^")).await?;
                Ok(self.git.diff_names(&prev, head).await?)
            }
            ListStrategy::PullRequestApi { number } => {
                Ok(self.api.list_files(&self.repository, *number).await?)
            }
            ListStrategy::Range { from, to } => Ok(self.git.diff_names(from, to).await?),
            ListStrategy::RangeDots { from, to } => {
                Ok(self.git.diff_names_range(&format!("{from}...{to}")).await?)
            }
            ListStrategy::MergeIntroduced { before, after } => {
                let base = self.git.merge_base(before, after).await?;
                Ok(self.git.diff_names(&base, after).await?)
            }
            ListStrategy::PreviousCommit => Ok(self.git.diff_names("HEAD~1", "HEAD").await?),
        }
    }
}

/// Reduce a changed-file list to the distinct resource directories holding
/// a deployment-config document, in first-seen order. An empty namespace
/// leaves the list unconstrained by prefix.
pub fn filter_resource_paths(files: &[String], namespace: &str) -> Vec<ResourcePath> {
    let prefix = match namespace.trim_end_matches('/') {
        "" => String::new(),
        ns => format!("{ns}/"),
    };
    let mut seen = HashSet::new();
    let mut paths = Vec::new();

    for file in files {
        if file.is_empty() || !file.starts_with(&prefix) {
            continue;
        }
        let path = Path::new(file);
        let is_config = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| CONFIG_FILENAMES.contains(&n))
            .unwrap_or(false);
        if !is_config {
            continue;
        }
        let Some(dir) = path.parent().and_then(|p| p.to_str()) else {
            continue;
        };
        if seen.insert(dir.to_string()) {
            paths.push(ResourcePath::new(dir));
        }
    }

    paths
}
