//! Deployment matrix generation
//!
//! Turns a set of resource paths into the four tiered execution matrices.
//! Every failure below the whole-run level (missing config, malformed
//! document, filtered-out environment, incomplete pair) skips that unit
//! with a warning and lets the rest proceed.

use crate::core::config::DeploymentConfig;
use crate::core::matrix::{DeploymentMatrices, MatrixEntry};
use crate::core::resource::ResourcePath;
use crate::core::tier::Tier;
use regex::Regex;
use std::path::PathBuf;
use tracing::{debug, info};

/// The matrices plus the warnings accumulated while building them
#[derive(Debug, Default)]
pub struct MatrixReport {
    pub matrices: DeploymentMatrices,
    pub warnings: Vec<String>,
}

/// Builds deployment matrices from resource paths under a repository root
#[derive(Debug, Clone)]
pub struct MatrixGenerator {
    root: PathBuf,
}

impl MatrixGenerator {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Generate the four matrices for the given paths, optionally filtered
    /// to one environment or a comma-separated list of environments.
    pub fn generate(&self, paths: &[ResourcePath], env_filter: Option<&str>) -> MatrixReport {
        let mut report = MatrixReport::default();

        for path in paths {
            info!("processing resource path: {path}");
            self.collect(path, env_filter, &mut report);
        }

        info!("generated matrices: {}", report.matrices.summary());
        report
    }

    fn collect(&self, path: &ResourcePath, env_filter: Option<&str>, report: &mut MatrixReport) {
        let config = match DeploymentConfig::load(&path.join_root(&self.root)) {
            Ok(config) => config,
            Err(e) => {
                report.warnings.push(e.to_string());
                return;
            }
        };

        let environments =
            match select_environments(config.environments(), env_filter) {
                Ok(environments) => environments,
                Err(warning) => {
                    report.warnings.push(format!("{warning} in {path}"));
                    return;
                }
            };

        for env in &environments {
            debug!("processing environment {env} for {path}");
            let settings = config.env_settings(env);

            let missing = settings.missing_required();
            if !missing.is_empty() {
                report.warnings.push(format!(
                    "missing required configuration for {path} in {env} environment: {}",
                    missing.join(", ")
                ));
                continue;
            }

            // missing_required() guarantees these are present
            let Some(parameters) = settings.parameters else {
                continue;
            };
            if !parameters.is_deployable() {
                report.warnings.push(format!(
                    "parameters for {path} in {env} environment need a stack-name \
                     and a parameter-file or inline-parameters"
                ));
                continue;
            }

            let entry = MatrixEntry {
                application: path.application().to_string(),
                resource: path.resource_name().to_string(),
                environment: env.clone(),
                runner: settings.runner.unwrap_or_default(),
                github_environment: settings.github_environment.unwrap_or_default(),
                aws_region: settings.aws_region.unwrap_or_default(),
                aws_role_secret: settings.aws_role_secret,
                cfn_role_secret: settings.cfn_role_secret,
                iam_role_secret: settings.iam_role_secret,
                github_vars: settings.github_vars,
                parameters,
            };

            report.matrices.push(&Tier::from_tag(env), entry);
        }
    }
}

/// Pick the effective environments: the declared list, narrowed by the
/// filter when one is supplied. A filter matching nothing is a warning.
fn select_environments(
    declared: &[String],
    filter: Option<&str>,
) -> Result<Vec<String>, String> {
    let filter = filter.map(str::trim).filter(|f| !f.is_empty());
    let Some(filter) = filter else {
        return Ok(declared.to_vec());
    };

    if filter.contains(',') {
        let wanted: Vec<&str> = filter
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        let pattern = format!(
            "^({})$",
            wanted
                .iter()
                .map(|w| regex::escape(w))
                .collect::<Vec<_>>()
                .join("|")
        );
        // The pattern is built from escaped literals; it always compiles.
        let matcher = Regex::new(&pattern).map_err(|e| e.to_string())?;

        let selected: Vec<String> = declared
            .iter()
            .filter(|env| matcher.is_match(env))
            .cloned()
            .collect();
        if selected.is_empty() {
            return Err(format!(
                "none of the specified environments ({filter}) found"
            ));
        }
        Ok(selected)
    } else if declared.iter().any(|env| env == filter) {
        Ok(vec![filter.to_string()])
    } else {
        Err(format!("specified environment {filter} not found"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn declared(tags: &[&str]) -> Vec<String> {
        tags.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_no_filter_keeps_declared_order() {
        let environments = declared(&["dev", "int", "prod"]);
        let selected = select_environments(&environments, None).unwrap();
        assert_eq!(selected, environments);
    }

    #[test]
    fn test_single_filter_must_be_declared() {
        let environments = declared(&["dev", "int"]);

        assert_eq!(
            select_environments(&environments, Some("int")).unwrap(),
            declared(&["int"])
        );
        assert!(select_environments(&environments, Some("prod")).is_err());
    }

    #[test]
    fn test_comma_filter_selects_matching_subset() {
        let environments = declared(&["dev", "int", "stg", "qa"]);

        let selected = select_environments(&environments, Some("int, qa")).unwrap();
        assert_eq!(selected, declared(&["int", "qa"]));

        assert!(select_environments(&environments, Some("prod, uat")).is_err());
    }

    #[test]
    fn test_blank_filter_is_no_filter() {
        let environments = declared(&["dev"]);
        let selected = select_environments(&environments, Some("  ")).unwrap();
        assert_eq!(selected, environments);
    }

    #[test]
    fn test_filter_tags_are_matched_whole() {
        // "de" must not match "dev"
        let environments = declared(&["dev"]);
        assert!(select_environments(&environments, Some("de,v")).is_err());
    }
}
