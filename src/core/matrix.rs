//! Execution matrices emitted for the build-matrix strategy

use crate::core::config::ParameterBlock;
use crate::core::tier::Tier;
use serde::{Deserialize, Serialize};

/// The serialized form of a bucket with nothing to deploy
pub const EMPTY_INCLUDE: &str = r#"{"include":[]}"#;

/// One execution unit for the downstream deploy job.
///
/// Immutable once emitted; field order here is the field order in the
/// serialized matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatrixEntry {
    pub application: String,
    pub resource: String,
    pub environment: String,
    pub runner: String,
    pub github_environment: String,
    pub aws_region: String,
    pub aws_role_secret: String,
    pub cfn_role_secret: String,
    pub iam_role_secret: String,

    #[serde(default)]
    pub github_vars: serde_json::Value,

    pub parameters: ParameterBlock,
}

/// The four output buckets, each an ordered sequence of entries.
///
/// `dev`/`int`/`prod` hold exact tier matches; everything else lands in
/// `custom`, where each entry keeps its own environment tag for
/// `deploy_after` gating.
#[derive(Debug, Clone, Default)]
pub struct DeploymentMatrices {
    pub dev: Vec<MatrixEntry>,
    pub int: Vec<MatrixEntry>,
    pub prod: Vec<MatrixEntry>,
    pub custom: Vec<MatrixEntry>,
}

impl DeploymentMatrices {
    /// Route an entry into the bucket for its tier
    pub fn push(&mut self, tier: &Tier, entry: MatrixEntry) {
        match tier {
            Tier::Dev => self.dev.push(entry),
            Tier::Int => self.int.push(entry),
            Tier::Prod => self.prod.push(entry),
            Tier::Custom(_) => self.custom.push(entry),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.dev.is_empty() && self.int.is_empty() && self.prod.is_empty() && self.custom.is_empty()
    }

    /// Human-readable bucket sizes for the closing log line
    pub fn summary(&self) -> String {
        format!(
            "DEV({}), INT({}), PROD({}), CUSTOM({})",
            self.dev.len(),
            self.int.len(),
            self.prod.len(),
            self.custom.len()
        )
    }

    /// Serialize the four buckets as `(output name, JSON)` pairs.
    ///
    /// A bucket that fails to serialize degrades to the empty-include form
    /// so the downstream strategy always receives valid JSON.
    pub fn to_outputs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("dev_matrix", encode_bucket(&self.dev)),
            ("int_matrix", encode_bucket(&self.int)),
            ("prod_matrix", encode_bucket(&self.prod)),
            ("custom_matrix", encode_bucket(&self.custom)),
        ]
    }
}

/// Wire shape of one bucket
#[derive(Debug, Serialize, Deserialize)]
pub struct MatrixInclude {
    pub include: Vec<MatrixEntry>,
}

fn encode_bucket(entries: &[MatrixEntry]) -> String {
    serde_json::to_string(&serde_json::json!({ "include": entries }))
        .unwrap_or_else(|e| {
            tracing::warn!("matrix bucket failed to serialize, emitting empty include: {e}");
            EMPTY_INCLUDE.to_string()
        })
}
