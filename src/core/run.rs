//! Run-scoped scratch storage
//!
//! Every materialized artifact (processed parameter files, the sealed
//! secret store) lives under one directory keyed by the run id, so
//! concurrent unrelated runs sharing a temp namespace never collide and a
//! single unconditional cleanup step can remove everything.

use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Identity and scratch directory for one pipeline run
#[derive(Debug, Clone)]
pub struct RunContext {
    run_id: String,
    scratch: PathBuf,
}

impl RunContext {
    /// Build from the workflow environment; falls back to a generated id
    /// when invoked outside a workflow run.
    pub fn from_env() -> Self {
        let run_id = std::env::var("GITHUB_RUN_ID").unwrap_or_default();
        let run_number = std::env::var("GITHUB_RUN_NUMBER").unwrap_or_default();
        let combined = format!("{run_id}{run_number}");
        if combined.is_empty() {
            Self::with_run_id(uuid::Uuid::new_v4().simple().to_string())
        } else {
            Self::with_run_id(combined)
        }
    }

    pub fn with_run_id(run_id: impl Into<String>) -> Self {
        let run_id = run_id.into();
        let scratch = std::env::temp_dir().join(format!("cfn-pipeline-{run_id}"));
        Self { run_id, scratch }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch
    }

    /// Create the scratch directory if needed and return it
    pub fn ensure_scratch(&self) -> io::Result<&Path> {
        std::fs::create_dir_all(&self.scratch)?;
        Ok(&self.scratch)
    }

    /// Remove the scratch directory and everything in it.
    ///
    /// Idempotent: a missing directory is success, so the cleanup step can
    /// run unconditionally, including on cancellation-triggered teardown.
    pub fn cleanup(&self) -> io::Result<()> {
        match std::fs::remove_dir_all(&self.scratch) {
            Ok(()) => {
                debug!("removed scratch directory {}", self.scratch.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scratch_path_is_run_scoped() {
        let a = RunContext::with_run_id("11112222");
        let b = RunContext::with_run_id("33334444");
        assert_ne!(a.scratch_dir(), b.scratch_dir());
        assert!(a
            .scratch_dir()
            .to_string_lossy()
            .contains("cfn-pipeline-11112222"));
    }

    #[test]
    fn test_cleanup_is_idempotent() {
        let run = RunContext::with_run_id(uuid::Uuid::new_v4().simple().to_string());
        run.ensure_scratch().unwrap();
        std::fs::write(run.scratch_dir().join("file"), "x").unwrap();

        run.cleanup().unwrap();
        assert!(!run.scratch_dir().exists());
        // second pass finds nothing and still succeeds
        run.cleanup().unwrap();
    }
}
