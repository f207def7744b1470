//! Secret placeholder resolution
//!
//! The workflow engine only evaluates secret expressions at definition
//! time, so secret names embedded in configuration values reach run time
//! unresolved. This module closes the gap: values of the form
//! `SECRET:<name>` are substituted from an in-memory map built once per
//! resolution step. Secret values are never logged; diagnostics carry
//! names and counts only.

pub mod store;

pub use store::SecretStore;

use crate::core::config::{InlineParameters, ParameterBlock};
use crate::core::run::RunContext;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Canonical placeholder prefix
pub const PLACEHOLDER_PREFIX: &str = "SECRET:";

/// Deprecated placeholder prefix, still accepted with a warning
const LEGACY_PREFIX: &str = "SECRET.";

/// Environment variable prefixes that are workflow plumbing, not secrets
const RESERVED_ENV_PREFIXES: [&str; 3] = ["GITHUB_", "INPUT_", "RUNNER_"];

#[derive(Debug, Error)]
pub enum SecretError {
    #[error("failed to read parameter file {0}: {1}")]
    Io(String, std::io::Error),

    #[error("parameter file {0} is not valid JSON: {1}")]
    ParameterFile(String, serde_json::Error),

    #[error("failed to write processed parameter file {0}: {1}")]
    Write(String, std::io::Error),
}

/// Name→value secret map, scoped to one resolution step.
///
/// Deliberately not a process-wide singleton: built at the start of a
/// step, passed by reference, dropped at its end.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct SecretMap(HashMap<String, String>);

impl SecretMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect candidate secrets from the process environment, excluding
    /// the reserved workflow variable prefixes.
    pub fn from_env() -> Self {
        let map: HashMap<String, String> = std::env::vars()
            .filter(|(key, _)| !RESERVED_ENV_PREFIXES.iter().any(|p| key.starts_with(p)))
            .collect();
        info!("loaded {} candidate secrets from the environment", map.len());
        Self(map)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<const N: usize> From<[(&str, &str); N]> for SecretMap {
    fn from(entries: [(&str, &str); N]) -> Self {
        Self(
            entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }
}

// Values must never reach logs, so Debug shows the entry count only.
impl fmt::Debug for SecretMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretMap({} entries)", self.0.len())
    }
}

/// Counters from one resolution pass
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ResolutionStats {
    pub replaced: usize,
    pub missing: Vec<String>,
}

impl ResolutionStats {
    fn merge(&mut self, other: ResolutionStats) {
        self.replaced += other.replaced;
        self.missing.extend(other.missing);
    }
}

/// Extract the secret name from a whole-value placeholder, if any.
/// The second element flags the deprecated `SECRET.` spelling.
pub fn placeholder_name(value: &str) -> Option<(&str, bool)> {
    if let Some(name) = value.strip_prefix(PLACEHOLDER_PREFIX) {
        return Some((name, false));
    }
    if let Some(name) = value.strip_prefix(LEGACY_PREFIX) {
        return Some((name, true));
    }
    None
}

/// Substitute a single value. Returns the replacement (if any) and the
/// bookkeeping for this value.
pub fn resolve_value(value: &str, secrets: &SecretMap) -> (Option<String>, ResolutionStats) {
    let mut stats = ResolutionStats::default();
    let Some((name, legacy)) = placeholder_name(value) else {
        return (None, stats);
    };
    if legacy {
        warn!("placeholder 'SECRET.{name}' uses the deprecated separator; use 'SECRET:{name}'");
    }
    match secrets.get(name) {
        Some(secret) => {
            info!("replacing placeholder for secret {name}");
            stats.replaced += 1;
            (Some(secret.to_string()), stats)
        }
        None => {
            warn!("secret {name} not found in available secrets");
            stats.missing.push(name.to_string());
            (None, stats)
        }
    }
}

/// Resolve every placeholder in a parameter block's inline parameters.
///
/// A block containing no placeholders comes back unchanged.
pub fn resolve_block(
    block: &ParameterBlock,
    secrets: &SecretMap,
) -> (ParameterBlock, ResolutionStats) {
    let mut resolved = block.clone();
    let mut stats = ResolutionStats::default();

    if let Some(inline) = &mut resolved.inline_parameters {
        match inline {
            InlineParameters::Pairs(pairs) => {
                for pair in pairs {
                    if let Some(value) = pair.value.as_str() {
                        let (replacement, value_stats) = resolve_value(value, secrets);
                        stats.merge(value_stats);
                        if let Some(replacement) = replacement {
                            pair.value = serde_json::Value::String(replacement);
                        }
                    }
                }
            }
            InlineParameters::Map(map) => {
                for (_, value) in map.iter_mut() {
                    if let Some(s) = value.as_str() {
                        let (replacement, value_stats) = resolve_value(s, secrets);
                        stats.merge(value_stats);
                        if let Some(replacement) = replacement {
                            *value = serde_json::Value::String(replacement);
                        }
                    }
                }
            }
        }
    }

    (resolved, stats)
}

/// Resolve placeholders across every string value of an on-disk JSON
/// parameter file.
///
/// When nothing changes the original path is returned and no file is
/// written; otherwise the processed copy lands in the run scratch dir.
pub fn resolve_file(
    path: &Path,
    secrets: &SecretMap,
    run: &RunContext,
) -> Result<PathBuf, SecretError> {
    let shown = path.display().to_string();
    let content =
        std::fs::read_to_string(path).map_err(|e| SecretError::Io(shown.clone(), e))?;
    let mut document: serde_json::Value = serde_json::from_str(&content)
        .map_err(|e| SecretError::ParameterFile(shown.clone(), e))?;

    let mut stats = ResolutionStats::default();
    walk_strings(&mut document, secrets, &mut stats);

    if stats.replaced == 0 {
        debug!("no placeholders found in parameter file {shown}");
        return Ok(path.to_path_buf());
    }

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("parameters.json");
    let out_path = run
        .ensure_scratch()
        .map_err(|e| SecretError::Write(shown.clone(), e))?
        .join(format!("processed_{file_name}"));

    let serialized = serde_json::to_string_pretty(&document)
        .map_err(|e| SecretError::ParameterFile(shown.clone(), e))?;
    std::fs::write(&out_path, serialized)
        .map_err(|e| SecretError::Write(out_path.display().to_string(), e))?;

    info!(
        "processed parameter file {shown}: {} replacements, {} unresolved",
        stats.replaced,
        stats.missing.len()
    );
    Ok(out_path)
}

fn walk_strings(value: &mut serde_json::Value, secrets: &SecretMap, stats: &mut ResolutionStats) {
    match value {
        serde_json::Value::String(s) => {
            let (replacement, value_stats) = resolve_value(s, secrets);
            stats.merge(value_stats);
            if let Some(replacement) = replacement {
                *s = replacement;
            }
        }
        serde_json::Value::Array(items) => {
            for item in items {
                walk_strings(item, secrets, stats);
            }
        }
        serde_json::Value::Object(map) => {
            for (_, item) in map.iter_mut() {
                walk_strings(item, secrets, stats);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{InlineParameter, InlineParameters};

    fn block_with_pairs(values: &[(&str, &str)]) -> ParameterBlock {
        ParameterBlock {
            stack_name: Some("stack".to_string()),
            inline_parameters: Some(InlineParameters::Pairs(
                values
                    .iter()
                    .map(|(k, v)| InlineParameter {
                        key: k.to_string(),
                        value: serde_json::Value::String(v.to_string()),
                    })
                    .collect(),
            )),
            ..Default::default()
        }
    }

    #[test]
    fn test_placeholder_forms() {
        assert_eq!(placeholder_name("SECRET:EMAIL"), Some(("EMAIL", false)));
        assert_eq!(placeholder_name("SECRET.EMAIL"), Some(("EMAIL", true)));
        assert_eq!(placeholder_name("plain value"), None);
        assert_eq!(placeholder_name("has SECRET:EMAIL inside"), None);
    }

    #[test]
    fn test_substitution_replaces_whole_value() {
        let secrets = SecretMap::from([("EMAIL", "a@b.com")]);
        let block = block_with_pairs(&[("Email", "SECRET:EMAIL"), ("Stage", "dev")]);

        let (resolved, stats) = resolve_block(&block, &secrets);
        assert_eq!(stats.replaced, 1);
        assert!(stats.missing.is_empty());

        let pairs = resolved.inline_parameters.unwrap().to_pairs();
        assert_eq!(pairs[0].value, serde_json::json!("a@b.com"));
        assert_eq!(pairs[1].value, serde_json::json!("dev"));
    }

    #[test]
    fn test_missing_secret_leaves_placeholder() {
        let secrets = SecretMap::new();
        let block = block_with_pairs(&[("Email", "SECRET:EMAIL")]);

        let (resolved, stats) = resolve_block(&block, &secrets);
        assert_eq!(stats.replaced, 0);
        assert_eq!(stats.missing, vec!["EMAIL".to_string()]);

        let pairs = resolved.inline_parameters.unwrap().to_pairs();
        assert_eq!(pairs[0].value, serde_json::json!("SECRET:EMAIL"));
    }

    #[test]
    fn test_block_without_placeholders_is_unchanged() {
        let secrets = SecretMap::from([("EMAIL", "a@b.com")]);
        let block = block_with_pairs(&[("Stage", "dev")]);

        let (resolved, stats) = resolve_block(&block, &secrets);
        assert_eq!(stats, ResolutionStats::default());

        // byte-for-byte equal serialization
        assert_eq!(
            serde_json::to_string(&block).unwrap(),
            serde_json::to_string(&resolved).unwrap()
        );
    }

    #[test]
    fn test_map_shape_resolution() {
        let secrets = SecretMap::from([("TOKEN", "t0k3n")]);
        let mut map = serde_json::Map::new();
        map.insert("ApiToken".to_string(), serde_json::json!("SECRET:TOKEN"));
        let block = ParameterBlock {
            inline_parameters: Some(InlineParameters::Map(map)),
            ..Default::default()
        };

        let (resolved, stats) = resolve_block(&block, &secrets);
        assert_eq!(stats.replaced, 1);
        let pairs = resolved.inline_parameters.unwrap().to_pairs();
        assert_eq!(pairs[0].value, serde_json::json!("t0k3n"));
    }

    #[test]
    fn test_resolve_file_substitutes_and_writes_processed_copy() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("params.json");
        std::fs::write(
            &input,
            r#"[{"ParameterKey": "Email", "ParameterValue": "SECRET:EMAIL"}]"#,
        )
        .unwrap();

        let run = RunContext::with_run_id(uuid::Uuid::new_v4().simple().to_string());
        let secrets = SecretMap::from([("EMAIL", "a@b.com")]);

        let out = resolve_file(&input, &secrets, &run).unwrap();
        assert_ne!(out, input);

        let processed = std::fs::read_to_string(&out).unwrap();
        assert!(processed.contains("a@b.com"));
        assert!(!processed.contains("SECRET:EMAIL"));

        run.cleanup().unwrap();
    }

    #[test]
    fn test_resolve_file_without_placeholders_returns_input_path() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("params.json");
        std::fs::write(&input, r#"{"Stage": "dev"}"#).unwrap();

        let run = RunContext::with_run_id(uuid::Uuid::new_v4().simple().to_string());
        let out = resolve_file(&input, &SecretMap::new(), &run).unwrap();
        assert_eq!(out, input);
        assert!(!run.scratch_dir().exists());
    }

    #[test]
    fn test_debug_never_shows_values() {
        let secrets = SecretMap::from([("EMAIL", "hunter2")]);
        let shown = format!("{secrets:?}");
        assert!(!shown.contains("hunter2"));
        assert!(shown.contains("1 entries"));
    }
}
