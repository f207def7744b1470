//! Stack tag assembly
//!
//! Tags arrive as a JSON list, as `Key=Value` lines, or both; the line
//! form overrides the JSON form key-by-key. An empty combined set fails
//! the run: the tagging policy gate is the one place this pipeline is
//! deliberately not fail-open.

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum TagsError {
    #[error("no tags are provided for this stack; follow the AWS tagging guidelines")]
    NoTags,
}

/// One stack tag in the CloudFormation shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    #[serde(rename = "Key")]
    pub key: String,

    #[serde(rename = "Value")]
    pub value: String,
}

/// Combine JSON tags with `Key=Value` override lines.
///
/// Lines starting with `#` and blank lines are skipped; values may be
/// wrapped in single or double quotes. A malformed JSON list is ignored
/// (the line form can still satisfy the gate).
pub fn combine_tags(tags_json: Option<&str>, key_value: Option<&str>) -> Result<Vec<Tag>, TagsError> {
    let mut combined: Vec<Tag> = Vec::new();

    if let Some(json) = tags_json.map(str::trim).filter(|j| !j.is_empty()) {
        match serde_json::from_str::<Vec<Tag>>(json) {
            Ok(tags) => combined.extend(tags),
            Err(e) => warn!("ignoring malformed JSON tags: {e}"),
        }
    }

    if let Some(lines) = key_value {
        let unquote = Regex::new(r#"^["'](.*)["']$"#).unwrap();
        for line in lines.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim().to_string();
            let value = value.trim();
            let value = unquote
                .captures(value)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str())
                .unwrap_or(value)
                .to_string();

            match combined.iter_mut().find(|t| t.key == key) {
                Some(existing) => existing.value = value,
                None => combined.push(Tag { key, value }),
            }
        }
    }

    if combined.is_empty() {
        return Err(TagsError::NoTags);
    }
    Ok(combined)
}
