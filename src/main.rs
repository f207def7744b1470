use anyhow::{Context, Result};
use cfn_pipeline::cli::commands::{
    CleanupCommand, DetectCommand, EncryptSecretsCommand, MatrixCommand, ResolveCommand,
    TagsCommand, ValidateCommand,
};
use cfn_pipeline::cli::output::*;
use cfn_pipeline::cli::{Cli, Command};
use cfn_pipeline::core::{DeploymentConfig, ResourcePath, RunContext, WorkflowEnv};
use cfn_pipeline::deploy;
use cfn_pipeline::detect::git::GitCli;
use cfn_pipeline::detect::github::GithubClient;
use cfn_pipeline::detect::{ChangeDetector, DetectorConfig};
use cfn_pipeline::generate::MatrixGenerator;
use cfn_pipeline::secrets::store::SecretStore;
use cfn_pipeline::secrets::SecretMap;
use std::path::Path;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    // Execute command
    match &cli.command {
        Command::Detect(cmd) => detect_changes(cmd).await?,
        Command::Matrix(cmd) => generate_matrices(cmd)?,
        Command::Validate(cmd) => validate_config(cmd)?,
        Command::Resolve(cmd) => resolve_parameters(cmd)?,
        Command::Tags(cmd) => combine_tags(cmd)?,
        Command::EncryptSecrets(cmd) => encrypt_secrets(cmd)?,
        Command::Cleanup(cmd) => cleanup(cmd)?,
    }

    Ok(())
}

/// Optional CLI value falling back to a workflow input variable
fn or_input(value: &Option<String>, input_var: &str) -> Option<String> {
    value
        .clone()
        .or_else(|| std::env::var(input_var).ok())
        .filter(|v| !v.trim().is_empty())
}

async fn detect_changes(cmd: &DetectCommand) -> Result<()> {
    let env = WorkflowEnv::from_env();
    let event = env.trigger_event();

    let detector = ChangeDetector::new(
        GitCli::new(&cmd.repo_dir),
        Arc::new(GithubClient::new(env.token.clone())),
        env.repository.clone(),
        DetectorConfig {
            namespace: cmd.namespace.clone(),
            app_name: or_input(&cmd.app_name, "INPUT_APP_NAME"),
        },
    );

    let channel = OutputChannel::from_env();
    match detector.detect(&event).await {
        Ok(paths) => {
            if paths.is_empty() {
                // Debug information for empty results
                println!("{} No resource paths detected", INFO);
                println!("  Event: {}", style(&env.event_name).dim());
                println!("  SHA: {}", style(&env.sha).dim());
                println!(
                    "  Before: {}",
                    style(if env.event_before.is_empty() {
                        "N/A"
                    } else {
                        env.event_before.as_str()
                    })
                    .dim()
                );
            } else {
                println!(
                    "{} Detected {} resource path(s)",
                    CHECK,
                    style(paths.len()).cyan()
                );
            }
            channel
                .set("paths", &ResourcePath::join_list(&paths))
                .context("Failed to write outputs")?;
        }
        Err(e) => {
            // Rejected dispatch: no work to do, downstream gates on empty
            error_annotation(&e.to_string());
            channel
                .set("paths", "")
                .context("Failed to write outputs")?;
        }
    }

    Ok(())
}

fn generate_matrices(cmd: &MatrixCommand) -> Result<()> {
    let raw_paths = or_input(&cmd.resource_paths, "INPUT_RESOURCE_PATHS").unwrap_or_default();
    let env_filter = or_input(&cmd.environment, "INPUT_SPECIFIC_ENVIRONMENT");
    let paths = ResourcePath::parse_list(&raw_paths);

    let generator = MatrixGenerator::new(&cmd.root);
    let report = generator.generate(&paths, env_filter.as_deref());

    for warning in &report.warnings {
        warn_annotation(warning);
    }

    let channel = OutputChannel::from_env();
    for (name, json) in report.matrices.to_outputs() {
        channel
            .set_multiline(name, &json)
            .context("Failed to write outputs")?;
    }

    println!(
        "{} Generated matrices: {}",
        CHECK,
        style(report.matrices.summary()).cyan()
    );
    Ok(())
}

fn validate_config(cmd: &ValidateCommand) -> Result<()> {
    println!("{} Validating deployment config...", INFO);

    match DeploymentConfig::from_file(Path::new(&cmd.file)) {
        Ok(config) => {
            println!("{} Deployment configuration is valid!", CHECK);
            if let Some(resource) = config.resource() {
                println!("  Resource: {}", style(resource).bold());
            }
            println!(
                "  Environments: {}",
                style(config.environments().join(", ")).cyan()
            );

            if cmd.json {
                let json = serde_json::to_string_pretty(config.environments())?;
                println!("\n{}", json);
            }
            Ok(())
        }
        Err(e) => {
            println!("{} Validation failed:", CROSS);
            println!("  {}", style(e).red());
            std::process::exit(1);
        }
    }
}

fn resolve_parameters(cmd: &ResolveCommand) -> Result<()> {
    let run = RunContext::from_env();
    let channel = OutputChannel::from_env();

    // A sealed store that cannot be opened is the one fatal condition:
    // resolving against the wrong secrets would be worse than stopping.
    let secrets = match (&cmd.secrets_file, &cmd.salt_key) {
        (Some(file), Some(salt)) => SecretStore::new(salt, run.run_id())
            .open_from_file(Path::new(file))
            .context("Failed to open secret store")?,
        _ => SecretMap::from_env(),
    };

    let parameter_file = or_input(&cmd.parameter_file, "INPUT_PARAMETER_OVERRIDES");
    let inline_json = or_input(&cmd.inline_json, "INPUT_INLINE_JSON_PARAMETERS");

    let combined = deploy::params::combine(
        parameter_file.as_deref(),
        inline_json.as_deref(),
        &secrets,
    )
    .context("Failed to assemble parameters")?;

    if combined.is_empty() {
        println!("{} No CFN parameters are available", INFO);
        channel
            .set("param_file", "")
            .context("Failed to write outputs")?;
    } else {
        let path = deploy::params::write_combined(&combined, &run)
            .context("Failed to write parameter file")?;
        println!(
            "{} Combined {} parameter(s) into {}",
            CHECK,
            style(combined.len()).cyan(),
            style(path.display()).dim()
        );
        channel
            .set("param_file", &format!("file://{}", path.display()))
            .context("Failed to write outputs")?;
    }

    Ok(())
}

fn combine_tags(cmd: &TagsCommand) -> Result<()> {
    let tags_json = or_input(&cmd.tags, "INPUT_TAGS");
    let key_value = or_input(&cmd.tags_key_value, "INPUT_TAGS_KEY_VALUE");

    match deploy::tags::combine_tags(tags_json.as_deref(), key_value.as_deref()) {
        Ok(tags) => {
            println!("{} Combined {} tag(s)", CHECK, style(tags.len()).cyan());
            OutputChannel::from_env()
                .set("tags", &serde_json::to_string(&tags)?)
                .context("Failed to write outputs")?;
            Ok(())
        }
        Err(e) => {
            // The tagging gate is deliberately fatal
            error_annotation(&e.to_string());
            std::process::exit(1);
        }
    }
}

fn encrypt_secrets(cmd: &EncryptSecretsCommand) -> Result<()> {
    let run = RunContext::from_env();
    let secrets = SecretMap::from_env();

    if secrets.is_empty() {
        println!("{} No secrets found to seal", WARN);
        std::process::exit(1);
    }

    let path = match &cmd.output {
        Some(path) => std::path::PathBuf::from(path),
        None => run
            .ensure_scratch()
            .context("Failed to create scratch directory")?
            .join(format!("sealed-secrets-{}.b64", run.run_id())),
    };

    SecretStore::new(&cmd.salt_key, run.run_id())
        .seal_to_file(&secrets, &path)
        .context("Failed to seal secrets")?;

    println!(
        "{} Sealed {} secret(s) to {}",
        CHECK,
        style(secrets.len()).cyan(),
        style(path.display()).dim()
    );
    OutputChannel::from_env()
        .set("secrets_file", &path.display().to_string())
        .context("Failed to write outputs")?;
    Ok(())
}

fn cleanup(_cmd: &CleanupCommand) -> Result<()> {
    let run = RunContext::from_env();
    run.cleanup().context("Failed to remove scratch directory")?;
    println!("{} Scratch directory removed", CHECK);
    Ok(())
}
