//! CloudFormation parameter assembly
//!
//! The deploy step can receive parameters from a file, inline JSON, or
//! both. Both sources are normalized to the CloudFormation list form,
//! secrets are resolved on each side, and inline values override file
//! values key-by-key. The combined list is written to a run-scoped file
//! the deploy collaborator reads.

use crate::core::config::InlineParameter;
use crate::core::run::RunContext;
use crate::secrets::{resolve_value, SecretMap};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ParamsError {
    #[error("invalid inline JSON parameters: {0}")]
    InlineJson(serde_json::Error),

    #[error("failed to write parameter file {0}: {1}")]
    Write(String, std::io::Error),
}

/// Read a parameter file into the list form.
///
/// Accepts a plain path or the `file:///` form the deploy outputs use.
/// Remote locations are the upload collaborator's concern and are not
/// fetched here.
pub fn read_parameter_file(path: &str) -> Option<Vec<InlineParameter>> {
    if path.starts_with("s3://") {
        warn!("parameter file {path} is remote; fetch it before resolution");
        return None;
    }
    let local = path.strip_prefix("file:///").map(|p| format!("/{p}")).unwrap_or_else(|| path.to_string());

    let content = match std::fs::read_to_string(&local) {
        Ok(content) => content,
        Err(e) => {
            warn!("could not read parameters from file {local}: {e}");
            return None;
        }
    };
    match parse_parameters(&content) {
        Ok(params) => Some(params),
        Err(e) => {
            warn!("could not parse parameters from file {local}: {e}");
            None
        }
    }
}

/// Parse parameters from JSON text in either the list or the map shape
pub fn parse_parameters(json: &str) -> Result<Vec<InlineParameter>, ParamsError> {
    let value: serde_json::Value =
        serde_json::from_str(json).map_err(ParamsError::InlineJson)?;
    Ok(pairs_from_value(value))
}

fn pairs_from_value(value: serde_json::Value) -> Vec<InlineParameter> {
    match value {
        serde_json::Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        serde_json::Value::Object(map) => map
            .into_iter()
            .map(|(key, value)| InlineParameter { key, value })
            .collect(),
        _ => Vec::new(),
    }
}

/// Resolve placeholders across a parameter list in place
pub fn resolve_parameters(params: &mut [InlineParameter], secrets: &SecretMap) {
    for param in params {
        if let Some(value) = param.value.as_str() {
            if let Some(resolved) = resolve_value(value, secrets).0 {
                param.value = serde_json::Value::String(resolved);
            }
        }
    }
}

/// Merge inline parameters over file parameters.
///
/// An inline key already present keeps the file entry's position; new
/// keys append in inline order.
pub fn merge_parameters(
    file_params: Vec<InlineParameter>,
    inline_params: Vec<InlineParameter>,
) -> Vec<InlineParameter> {
    let mut combined = file_params;
    for param in inline_params {
        match combined.iter_mut().find(|p| p.key == param.key) {
            Some(existing) => *existing = param,
            None => combined.push(param),
        }
    }
    combined
}

/// Assemble the combined parameter list from both sources.
///
/// Malformed inline JSON is fatal only when there are no file parameters
/// to fall back on.
pub fn combine(
    parameter_file: Option<&str>,
    inline_json: Option<&str>,
    secrets: &SecretMap,
) -> Result<Vec<InlineParameter>, ParamsError> {
    let mut file_params = Vec::new();
    if let Some(path) = parameter_file.filter(|p| !p.trim().is_empty()) {
        info!("parameter-overrides are available: {path}");
        if let Some(params) = read_parameter_file(path) {
            file_params = params;
        }
    }
    resolve_parameters(&mut file_params, secrets);

    let inline_json = inline_json
        .map(str::trim)
        .filter(|j| !j.is_empty() && *j != "null");
    let inline_params = match inline_json {
        Some(json) => {
            info!("inline-json-parameters are available");
            match parse_parameters(json) {
                Ok(mut params) => {
                    resolve_parameters(&mut params, secrets);
                    params
                }
                Err(e) if file_params.is_empty() => return Err(e),
                Err(e) => {
                    warn!("ignoring inline parameters: {e}");
                    Vec::new()
                }
            }
        }
        None => Vec::new(),
    };

    Ok(merge_parameters(file_params, inline_params))
}

/// Write the combined list to the run-scoped parameter file and return
/// its path.
pub fn write_combined(
    params: &[InlineParameter],
    run: &RunContext,
) -> Result<PathBuf, ParamsError> {
    let dir = run
        .ensure_scratch()
        .map_err(|e| ParamsError::Write(run.scratch_dir().display().to_string(), e))?;
    let path = dir.join(format!("cfn-parameter-{}.json", run.run_id()));

    let serialized = serde_json::to_string_pretty(params).map_err(ParamsError::InlineJson)?;
    std::fs::write(&path, serialized)
        .map_err(|e| ParamsError::Write(path.display().to_string(), e))?;

    info!("{} created with {} parameters", path.display(), params.len());
    Ok(path)
}
