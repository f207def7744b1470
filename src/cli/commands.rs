//! CLI command definitions

use clap::Args;

/// Detect changed resource directories for the current trigger event
#[derive(Debug, Args, Clone)]
pub struct DetectCommand {
    /// Namespace directory resources live under
    #[arg(long, default_value = "cloud-formation")]
    pub namespace: String,

    /// Restrict manual dispatch to one application's resources
    #[arg(long)]
    pub app_name: Option<String>,

    /// Working copy to run git in
    #[arg(long, default_value = ".")]
    pub repo_dir: String,
}

/// Generate the tiered deployment matrices for a set of resource paths
#[derive(Debug, Args, Clone)]
pub struct MatrixCommand {
    /// Comma-separated resource paths (defaults to INPUT_RESOURCE_PATHS)
    #[arg(long)]
    pub resource_paths: Option<String>,

    /// Deploy only these environments (tag, or comma-separated tags)
    #[arg(long)]
    pub environment: Option<String>,

    /// Repository root the resource paths are relative to
    #[arg(long, default_value = ".")]
    pub root: String,
}

/// Validate a deployment-config document
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    /// Path to the deployment-config YAML file
    #[arg(short, long)]
    pub file: String,

    /// Output the parsed environments in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Resolve secrets and assemble the combined parameter file
#[derive(Debug, Args, Clone)]
pub struct ResolveCommand {
    /// Parameter file path (plain or file:/// form)
    #[arg(long)]
    pub parameter_file: Option<String>,

    /// Inline JSON parameters (list or map shape)
    #[arg(long)]
    pub inline_json: Option<String>,

    /// Sealed secret store to draw secret values from
    #[arg(long)]
    pub secrets_file: Option<String>,

    /// Salt key the secret store was sealed with
    #[arg(long)]
    pub salt_key: Option<String>,
}

/// Combine stack tags from JSON and Key=Value sources
#[derive(Debug, Args, Clone)]
pub struct TagsCommand {
    /// JSON list of {Key, Value} tags (defaults to INPUT_TAGS)
    #[arg(long)]
    pub tags: Option<String>,

    /// Key=Value lines overriding the JSON tags (defaults to INPUT_TAGS_KEY_VALUE)
    #[arg(long)]
    pub tags_key_value: Option<String>,
}

/// Seal environment secrets into the run-scoped store
#[derive(Debug, Args, Clone)]
pub struct EncryptSecretsCommand {
    /// Salt key the store is sealed with
    #[arg(long)]
    pub salt_key: String,

    /// Where to write the sealed store (defaults to the run scratch dir)
    #[arg(long)]
    pub output: Option<String>,
}

/// Remove this run's scratch directory
#[derive(Debug, Args, Clone)]
pub struct CleanupCommand {}
