//! Deployment configuration from YAML
//!
//! Each resource directory carries one `deployment-config.yaml` (or `.yml`)
//! document with a top-level `deployments` list. Historical field aliases
//! are folded into the canonical shape once, at parse time, so downstream
//! code never has to know they existed.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

/// Default secret names applied when a per-environment override is absent
pub const DEFAULT_AWS_ROLE_SECRET: &str = "AWS_ROLE_TO_ASSUME";
pub const DEFAULT_CFN_ROLE_SECRET: &str = "CFN_ROLE_ARN";
pub const DEFAULT_IAM_ROLE_SECRET: &str = "IAM_EXECUTION_ROLE_ARN";

/// Errors loading or validating a deployment-config document
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found for {0}")]
    NotFound(String),

    #[error("failed to read {0}: {1}")]
    Io(String, std::io::Error),

    #[error("invalid YAML in {0}: {1}")]
    Yaml(String, serde_yaml::Error),

    #[error("{0}")]
    Structure(String),
}

/// Top-level document shape
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DeploymentDocument {
    #[serde(default)]
    deployments: Vec<DeploymentSpec>,
}

/// One entry of the `deployments` list, as authored.
///
/// Every per-environment map is optional; lookups fall back to documented
/// defaults at assembly time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeploymentSpec {
    /// Display name; path resolution never uses it
    #[serde(default)]
    pub resource: Option<String>,

    /// Ordered environment tags this resource deploys to
    #[serde(default)]
    pub environments: Vec<String>,

    #[serde(default)]
    pub runners: HashMap<String, String>,

    #[serde(default)]
    pub github_environments: HashMap<String, String>,

    #[serde(default)]
    pub aws_regions: HashMap<String, String>,

    /// Canonical flat shape for the role-to-assume secret name
    #[serde(default)]
    pub aws_role_secrets: HashMap<String, String>,

    /// Deprecated nested shape; folded into `aws_role_secrets` at parse time
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub aws_roles: HashMap<String, AwsRoleAliases>,

    #[serde(default)]
    pub cfn_role_secrets: HashMap<String, String>,

    #[serde(default)]
    pub iam_execution_role_secrets: HashMap<String, String>,

    #[serde(default)]
    pub github_vars: HashMap<String, serde_json::Value>,

    /// Per-environment deployment payloads
    #[serde(default)]
    pub parameters: HashMap<String, ParameterBlock>,
}

/// The deprecated `aws_roles.<env>` value shape
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AwsRoleAliases {
    #[serde(default)]
    pub aws_role_to_assume: Option<String>,
}

/// The deployment-specific payload for one (resource, environment) pair.
///
/// Keys are kebab-case to match the authored documents. Unrecognized keys
/// are carried through `extra` so the emitted matrix keeps whatever the
/// config author wrote.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterBlock {
    #[serde(rename = "stack-name", default, skip_serializing_if = "Option::is_none")]
    pub stack_name: Option<String>,

    #[serde(rename = "s3-bucket", default, skip_serializing_if = "Option::is_none")]
    pub s3_bucket: Option<String>,

    #[serde(rename = "s3-target", default, skip_serializing_if = "Option::is_none")]
    pub s3_target: Option<String>,

    #[serde(rename = "source-folder", default, skip_serializing_if = "Option::is_none")]
    pub source_folder: Option<String>,

    #[serde(rename = "template-file", default, skip_serializing_if = "Option::is_none")]
    pub template_file: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lint: Option<bool>,

    #[serde(rename = "extra-args", default, skip_serializing_if = "Option::is_none")]
    pub extra_args: Option<String>,

    #[serde(rename = "parameter-file", default, skip_serializing_if = "Option::is_none")]
    pub parameter_file: Option<String>,

    #[serde(
        rename = "inline-parameters",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub inline_parameters: Option<InlineParameters>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<serde_json::Value>,

    #[serde(rename = "secret-pass", default, skip_serializing_if = "Option::is_none")]
    pub secret_pass: Option<bool>,

    /// Tier the custom bucket gates this entry on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deploy_after: Option<String>,

    /// Anything else the author wrote, preserved verbatim
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ParameterBlock {
    /// Tier this entry waits on when routed to the custom bucket
    pub fn deploy_after(&self) -> &str {
        self.deploy_after.as_deref().unwrap_or("dev")
    }

    /// Whether the block satisfies the deployability invariant:
    /// a stack name plus at least one parameter source.
    pub fn is_deployable(&self) -> bool {
        let named = self
            .stack_name
            .as_deref()
            .map(|s| !s.trim().is_empty())
            .unwrap_or(false);
        let has_file = self
            .parameter_file
            .as_deref()
            .map(|s| !s.trim().is_empty())
            .unwrap_or(false);
        let has_inline = self
            .inline_parameters
            .as_ref()
            .map(|p| !p.is_empty())
            .unwrap_or(false);
        named && (has_file || has_inline)
    }
}

/// Inline parameters appear in two authored shapes: the CloudFormation
/// list form and a plain key/value map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InlineParameters {
    Pairs(Vec<InlineParameter>),
    Map(serde_json::Map<String, serde_json::Value>),
}

impl InlineParameters {
    pub fn is_empty(&self) -> bool {
        match self {
            InlineParameters::Pairs(pairs) => pairs.is_empty(),
            InlineParameters::Map(map) => map.is_empty(),
        }
    }

    /// Normalize to the CloudFormation list form, preserving order
    pub fn to_pairs(&self) -> Vec<InlineParameter> {
        match self {
            InlineParameters::Pairs(pairs) => pairs.clone(),
            InlineParameters::Map(map) => map
                .iter()
                .map(|(key, value)| InlineParameter {
                    key: key.clone(),
                    value: value.clone(),
                })
                .collect(),
        }
    }
}

/// One `{ParameterKey, ParameterValue}` pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InlineParameter {
    #[serde(rename = "ParameterKey")]
    pub key: String,

    #[serde(rename = "ParameterValue")]
    pub value: serde_json::Value,
}

/// A parsed, normalized deployment-config document.
///
/// Holds the first (and in practice only) entry of the `deployments` list
/// with all field aliases already resolved.
#[derive(Debug, Clone)]
pub struct DeploymentConfig {
    spec: DeploymentSpec,
}

/// Per-environment settings assembled for matrix entry construction
#[derive(Debug, Clone)]
pub struct EnvSettings {
    pub runner: Option<String>,
    pub github_environment: Option<String>,
    pub aws_region: Option<String>,
    pub aws_role_secret: String,
    pub cfn_role_secret: String,
    pub iam_role_secret: String,
    pub github_vars: serde_json::Value,
    pub parameters: Option<ParameterBlock>,
}

impl DeploymentConfig {
    /// Locate and load the config for a resource directory, trying the
    /// `.yaml` then the `.yml` extension.
    pub fn load(resource_dir: &Path) -> Result<Self, ConfigError> {
        for name in ["deployment-config.yaml", "deployment-config.yml"] {
            let candidate = resource_dir.join(name);
            if candidate.is_file() {
                return Self::from_file(&candidate);
            }
        }
        Err(ConfigError::NotFound(resource_dir.display().to_string()))
    }

    /// Load a deployment-config document from a specific file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let shown = path.display().to_string();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(shown.clone(), e))?;
        Self::from_yaml(&content, &shown)
    }

    /// Parse a deployment-config document from a YAML string.
    ///
    /// `origin` names the source in diagnostics.
    pub fn from_yaml(yaml: &str, origin: &str) -> Result<Self, ConfigError> {
        let document: DeploymentDocument =
            serde_yaml::from_str(yaml).map_err(|e| ConfigError::Yaml(origin.to_string(), e))?;

        let mut spec = document
            .deployments
            .into_iter()
            .next()
            .ok_or_else(|| ConfigError::Structure(format!("no deployments found in {origin}")))?;

        if spec.environments.is_empty() {
            return Err(ConfigError::Structure(format!(
                "no environments found in {origin}"
            )));
        }

        Self::fold_role_aliases(&mut spec, origin);
        Ok(Self { spec })
    }

    /// Fold the deprecated `aws_roles.<env>.aws_role_to_assume` shape into
    /// the canonical `aws_role_secrets.<env>` map. The canonical form wins
    /// when both are present.
    fn fold_role_aliases(spec: &mut DeploymentSpec, origin: &str) {
        if spec.aws_roles.is_empty() {
            return;
        }
        warn!(
            "{origin}: aws_roles.<env>.aws_role_to_assume is deprecated; \
             use aws_role_secrets.<env>"
        );
        let aliases = std::mem::take(&mut spec.aws_roles);
        for (env, alias) in aliases {
            if let Some(name) = alias.aws_role_to_assume {
                spec.aws_role_secrets.entry(env).or_insert(name);
            }
        }
    }

    /// Display name as authored
    pub fn resource(&self) -> Option<&str> {
        self.spec.resource.as_deref()
    }

    /// Declared environment tags, in authored order
    pub fn environments(&self) -> &[String] {
        &self.spec.environments
    }

    /// Assemble the per-environment settings, applying secret-name defaults
    pub fn env_settings(&self, env: &str) -> EnvSettings {
        let lookup = |map: &HashMap<String, String>| map.get(env).cloned();

        EnvSettings {
            runner: lookup(&self.spec.runners),
            github_environment: lookup(&self.spec.github_environments),
            aws_region: lookup(&self.spec.aws_regions),
            aws_role_secret: lookup(&self.spec.aws_role_secrets)
                .unwrap_or_else(|| DEFAULT_AWS_ROLE_SECRET.to_string()),
            cfn_role_secret: lookup(&self.spec.cfn_role_secrets)
                .unwrap_or_else(|| DEFAULT_CFN_ROLE_SECRET.to_string()),
            iam_role_secret: lookup(&self.spec.iam_execution_role_secrets)
                .unwrap_or_else(|| DEFAULT_IAM_ROLE_SECRET.to_string()),
            github_vars: self
                .spec
                .github_vars
                .get(env)
                .cloned()
                .unwrap_or_else(|| serde_json::json!({})),
            parameters: self.spec.parameters.get(env).cloned(),
        }
    }
}

impl EnvSettings {
    /// Names of required fields that are absent or blank, in a fixed order
    pub fn missing_required(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.parameters.is_none() {
            missing.push("parameters");
        }
        if self.runner.as_deref().map(str::trim).unwrap_or("").is_empty() {
            missing.push("runner");
        }
        if self
            .github_environment
            .as_deref()
            .map(str::trim)
            .unwrap_or("")
            .is_empty()
        {
            missing.push("github_environment");
        }
        if self
            .aws_region
            .as_deref()
            .map(str::trim)
            .unwrap_or("")
            .is_empty()
        {
            missing.push("aws_region");
        }
        missing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_CONFIG: &str = r#"
deployments:
  - resource: "message-queue"
    environments: [dev, int, prod]
    runners:
      dev: ubuntu-latest
      int: ubuntu-latest
      prod: deploy-runner
    github_environments:
      dev: development
      int: integration
      prod: production
    aws_regions:
      dev: eu-west-1
      int: eu-west-1
      prod: eu-central-1
    aws_role_secrets:
      prod: PROD_AWS_ROLE
    parameters:
      dev:
        stack-name: mq-dev
        template-file: template.yaml
        inline-parameters:
          - ParameterKey: Stage
            ParameterValue: dev
      int:
        stack-name: mq-int
        parameter-file: params/int.json
      prod:
        stack-name: mq-prod
        parameter-file: params/prod.json
"#;

    #[test]
    fn test_parse_full_config() {
        let config = DeploymentConfig::from_yaml(FULL_CONFIG, "test").unwrap();
        assert_eq!(config.resource(), Some("message-queue"));
        assert_eq!(config.environments(), &["dev", "int", "prod"]);
    }

    #[test]
    fn test_secret_name_defaults() {
        let config = DeploymentConfig::from_yaml(FULL_CONFIG, "test").unwrap();

        let dev = config.env_settings("dev");
        assert_eq!(dev.aws_role_secret, DEFAULT_AWS_ROLE_SECRET);
        assert_eq!(dev.cfn_role_secret, DEFAULT_CFN_ROLE_SECRET);
        assert_eq!(dev.iam_role_secret, DEFAULT_IAM_ROLE_SECRET);

        let prod = config.env_settings("prod");
        assert_eq!(prod.aws_role_secret, "PROD_AWS_ROLE");
    }

    #[test]
    fn test_deprecated_role_alias_folds_into_canonical() {
        let yaml = r#"
deployments:
  - environments: [dev]
    aws_roles:
      dev:
        aws_role_to_assume: LEGACY_ROLE
"#;
        let config = DeploymentConfig::from_yaml(yaml, "test").unwrap();
        assert_eq!(config.env_settings("dev").aws_role_secret, "LEGACY_ROLE");
    }

    #[test]
    fn test_canonical_role_wins_over_alias() {
        let yaml = r#"
deployments:
  - environments: [dev]
    aws_role_secrets:
      dev: CANONICAL_ROLE
    aws_roles:
      dev:
        aws_role_to_assume: LEGACY_ROLE
"#;
        let config = DeploymentConfig::from_yaml(yaml, "test").unwrap();
        assert_eq!(config.env_settings("dev").aws_role_secret, "CANONICAL_ROLE");
    }

    #[test]
    fn test_empty_deployments_rejected() {
        let result = DeploymentConfig::from_yaml("deployments: []", "test");
        assert!(matches!(result, Err(ConfigError::Structure(_))));
    }

    #[test]
    fn test_missing_environments_rejected() {
        let yaml = r#"
deployments:
  - resource: "thing"
"#;
        let result = DeploymentConfig::from_yaml(yaml, "test");
        assert!(matches!(result, Err(ConfigError::Structure(_))));
    }

    #[test]
    fn test_invalid_yaml_rejected() {
        let result = DeploymentConfig::from_yaml("deployments: [unclosed", "test");
        assert!(matches!(result, Err(ConfigError::Yaml(..))));
    }

    #[test]
    fn test_missing_required_fields() {
        let yaml = r#"
deployments:
  - environments: [dev, int]
    runners:
      dev: ubuntu-latest
    github_environments:
      dev: development
      int: integration
    aws_regions:
      dev: eu-west-1
      int: eu-west-1
    parameters:
      dev:
        stack-name: s
        parameter-file: p.json
      int:
        stack-name: s
        parameter-file: p.json
"#;
        let config = DeploymentConfig::from_yaml(yaml, "test").unwrap();
        assert!(config.env_settings("dev").missing_required().is_empty());
        assert_eq!(config.env_settings("int").missing_required(), vec!["runner"]);
    }

    #[test]
    fn test_parameter_block_deployability() {
        let named_only = ParameterBlock {
            stack_name: Some("stack".to_string()),
            ..Default::default()
        };
        assert!(!named_only.is_deployable());

        let with_file = ParameterBlock {
            stack_name: Some("stack".to_string()),
            parameter_file: Some("params.json".to_string()),
            ..Default::default()
        };
        assert!(with_file.is_deployable());

        let blank_name = ParameterBlock {
            stack_name: Some("  ".to_string()),
            parameter_file: Some("params.json".to_string()),
            ..Default::default()
        };
        assert!(!blank_name.is_deployable());
    }

    #[test]
    fn test_inline_parameters_both_shapes() {
        let list: InlineParameters = serde_yaml::from_str(
            r#"
- ParameterKey: Email
  ParameterValue: "SECRET:EMAIL"
"#,
        )
        .unwrap();
        assert_eq!(list.to_pairs().len(), 1);

        let map: InlineParameters = serde_yaml::from_str(
            r#"
Email: "a@b.com"
Stage: dev
"#,
        )
        .unwrap();
        let pairs = map.to_pairs();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].key, "Email");
    }

    #[test]
    fn test_unknown_parameter_keys_preserved() {
        let yaml = r#"
deployments:
  - environments: [dev]
    parameters:
      dev:
        stack-name: s
        parameter-file: p.json
        change-set: true
"#;
        let config = DeploymentConfig::from_yaml(yaml, "test").unwrap();
        let block = config.env_settings("dev").parameters.unwrap();
        assert_eq!(block.extra.get("change-set"), Some(&serde_json::json!(true)));
    }

    #[test]
    fn test_deploy_after_default() {
        let block = ParameterBlock::default();
        assert_eq!(block.deploy_after(), "dev");

        let gated = ParameterBlock {
            deploy_after: Some("int".to_string()),
            ..Default::default()
        };
        assert_eq!(gated.deploy_after(), "int");
    }
}
