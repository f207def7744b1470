//! Trigger events constructed from the invoking environment

use serde::Deserialize;
use std::path::Path;
use tracing::debug;

/// The event that started a pipeline run.
///
/// Constructed once per run; every downstream decision (which commits to
/// diff, which fallbacks apply) branches on the variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerEvent {
    /// A branch push with the commit range the hosting platform reported
    Push {
        before_sha: String,
        after_sha: String,
    },

    /// A pull request update
    PullRequest {
        number: u64,
        base_sha: Option<String>,
        head_sha: String,
    },

    /// A manually dispatched run targeting one resource directory
    ManualDispatch {
        resource_path: String,
        environment: Option<String>,
    },

    /// Any other event kind; handled with a best-effort diff
    Other { name: String },
}

/// Workflow environment snapshot, read once at startup.
///
/// Fields are public so tests can construct the snapshot directly instead
/// of mutating the process environment.
#[derive(Debug, Clone, Default)]
pub struct WorkflowEnv {
    pub event_name: String,
    pub repository: String,
    pub sha: String,
    pub event_before: String,
    pub token: Option<String>,
    pub payload: EventPayload,
}

/// The parts of the event payload document this pipeline consumes
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventPayload {
    #[serde(default)]
    pub inputs: DispatchInputs,

    #[serde(default)]
    pub pull_request: Option<PullRequestPayload>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DispatchInputs {
    #[serde(default)]
    pub resource_path: Option<String>,

    #[serde(default)]
    pub environment: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PullRequestPayload {
    #[serde(default)]
    pub number: Option<u64>,

    #[serde(default)]
    pub base: Option<CommitRef>,

    #[serde(default)]
    pub head: Option<CommitRef>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommitRef {
    #[serde(default)]
    pub sha: Option<String>,
}

impl WorkflowEnv {
    /// Snapshot the invoking environment.
    ///
    /// A missing or unreadable event payload document degrades to an empty
    /// payload; the trigger event then falls back to `Other`.
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).unwrap_or_default();

        let payload = match std::env::var("GITHUB_EVENT_PATH") {
            Ok(path) if Path::new(&path).exists() => Self::read_payload(Path::new(&path)),
            _ => EventPayload::default(),
        };

        Self {
            event_name: var("GITHUB_EVENT_NAME"),
            repository: var("GITHUB_REPOSITORY"),
            sha: var("GITHUB_SHA"),
            event_before: var("GITHUB_EVENT_BEFORE"),
            token: std::env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty()),
            payload,
        }
    }

    fn read_payload(path: &Path) -> EventPayload {
        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                debug!("event payload at {} is not valid JSON: {}", path.display(), e);
                EventPayload::default()
            }),
            Err(e) => {
                debug!("could not read event payload {}: {}", path.display(), e);
                EventPayload::default()
            }
        }
    }

    /// Build the trigger event for this run.
    ///
    /// Events whose payload lacks the fields their variant needs (a pull
    /// request without a head SHA, a dispatch without a resource path)
    /// degrade to `Other` so the best-effort diff path handles them.
    pub fn trigger_event(&self) -> TriggerEvent {
        match self.event_name.as_str() {
            "workflow_dispatch" => {
                if let Some(resource_path) = self.payload.inputs.resource_path.clone() {
                    return TriggerEvent::ManualDispatch {
                        resource_path,
                        environment: self.payload.inputs.environment.clone(),
                    };
                }
                TriggerEvent::Other {
                    name: self.event_name.clone(),
                }
            }
            "pull_request" => {
                let pr = self.payload.pull_request.as_ref();
                let number = pr.and_then(|p| p.number);
                let head_sha = pr.and_then(|p| p.head.as_ref()).and_then(|h| h.sha.clone());
                match (number, head_sha) {
                    (Some(number), Some(head_sha)) => TriggerEvent::PullRequest {
                        number,
                        base_sha: pr
                            .and_then(|p| p.base.as_ref())
                            .and_then(|b| b.sha.clone()),
                        head_sha,
                    },
                    _ => TriggerEvent::Other {
                        name: self.event_name.clone(),
                    },
                }
            }
            "push" if !self.event_before.is_empty() => TriggerEvent::Push {
                before_sha: self.event_before.clone(),
                after_sha: self.sha.clone(),
            },
            other => TriggerEvent::Other {
                name: other.to_string(),
            },
        }
    }
}
