//! Scenario tests for secret resolution and parameter assembly

use cfn_pipeline::core::config::{InlineParameter, InlineParameters, ParameterBlock};
use cfn_pipeline::deploy;
use cfn_pipeline::secrets::{self, SecretMap, SecretStore};
use cfn_pipeline::RunContext;
use tempfile::TempDir;

fn run() -> RunContext {
    RunContext::with_run_id(uuid::Uuid::new_v4().simple().to_string())
}

/// Seal secrets at the start of a run, open them in the resolve step,
/// substitute into a parameter file, clean up; nothing plaintext survives.
#[test]
fn test_sealed_store_to_resolved_file_round_trip() {
    let run = run();
    let dir = TempDir::new().unwrap();

    // encrypt step
    let mut secrets = SecretMap::new();
    secrets.insert("EMAIL", "a@b.com");
    let store = SecretStore::new("salt-key", run.run_id());
    let sealed_path = dir.path().join("sealed.b64");
    store.seal_to_file(&secrets, &sealed_path).unwrap();

    let sealed = std::fs::read_to_string(&sealed_path).unwrap();
    assert!(!sealed.contains("a@b.com"));

    // resolve step, separate store instance as a separate process would use
    let opened = SecretStore::new("salt-key", run.run_id())
        .open_from_file(&sealed_path)
        .unwrap();

    let param_file = dir.path().join("params.json");
    std::fs::write(
        &param_file,
        r#"[{"ParameterKey": "Email", "ParameterValue": "SECRET:EMAIL"}]"#,
    )
    .unwrap();

    let processed = secrets::resolve_file(&param_file, &opened, &run).unwrap();
    let content = std::fs::read_to_string(&processed).unwrap();
    assert!(content.contains("a@b.com"));

    // the unconditional cleanup step removes every materialization
    run.cleanup().unwrap();
    assert!(!processed.exists());
}

/// A store sealed by another run cannot be opened here
#[test]
fn test_store_from_another_run_is_rejected() {
    let dir = TempDir::new().unwrap();
    let sealed_path = dir.path().join("sealed.b64");

    let mut secrets = SecretMap::new();
    secrets.insert("EMAIL", "a@b.com");
    SecretStore::new("salt-key", "other-run")
        .seal_to_file(&secrets, &sealed_path)
        .unwrap();

    let result = SecretStore::new("salt-key", "this-run").open_from_file(&sealed_path);
    assert!(result.is_err());
}

/// File and inline parameters combine with inline precedence, secrets
/// resolved on both sides.
#[test]
fn test_combined_parameter_file_output() {
    let run = run();
    let dir = TempDir::new().unwrap();

    let param_file = dir.path().join("params.json");
    std::fs::write(
        &param_file,
        r#"[{"ParameterKey": "Email", "ParameterValue": "SECRET:EMAIL"},
            {"ParameterKey": "Size", "ParameterValue": "small"}]"#,
    )
    .unwrap();

    let mut secrets = SecretMap::new();
    secrets.insert("EMAIL", "a@b.com");
    secrets.insert("TOKEN", "t0k3n");

    let combined = deploy::params::combine(
        param_file.to_str(),
        Some(r#"{"Size": "large", "ApiToken": "SECRET:TOKEN"}"#),
        &secrets,
    )
    .unwrap();

    let out = deploy::params::write_combined(&combined, &run).unwrap();
    let written: Vec<InlineParameter> =
        serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();

    let as_pairs: Vec<(String, String)> = written
        .iter()
        .map(|p| (p.key.clone(), p.value.as_str().unwrap_or("").to_string()))
        .collect();
    assert_eq!(
        as_pairs,
        vec![
            ("Email".to_string(), "a@b.com".to_string()),
            ("Size".to_string(), "large".to_string()),
            ("ApiToken".to_string(), "t0k3n".to_string()),
        ]
    );

    run.cleanup().unwrap();
}

/// Resolution of a block with no placeholders is the identity
#[test]
fn test_resolution_round_trip_idempotence() {
    let block = ParameterBlock {
        stack_name: Some("queue-dev".to_string()),
        inline_parameters: Some(InlineParameters::Pairs(vec![InlineParameter {
            key: "Stage".to_string(),
            value: serde_json::json!("dev"),
        }])),
        ..Default::default()
    };

    let mut secrets = SecretMap::new();
    secrets.insert("EMAIL", "a@b.com");

    let (resolved, stats) = secrets::resolve_block(&block, &secrets);
    assert_eq!(stats.replaced, 0);
    assert_eq!(
        serde_json::to_string(&block).unwrap(),
        serde_json::to_string(&resolved).unwrap()
    );
}

/// A missing secret warns and leaves the placeholder; siblings resolve
#[test]
fn test_partial_resolution_is_not_fatal() {
    let block = ParameterBlock {
        inline_parameters: Some(InlineParameters::Pairs(vec![
            InlineParameter {
                key: "Email".to_string(),
                value: serde_json::json!("SECRET:EMAIL"),
            },
            InlineParameter {
                key: "Missing".to_string(),
                value: serde_json::json!("SECRET:ABSENT"),
            },
        ])),
        ..Default::default()
    };

    let mut secrets = SecretMap::new();
    secrets.insert("EMAIL", "a@b.com");

    let (resolved, stats) = secrets::resolve_block(&block, &secrets);
    assert_eq!(stats.replaced, 1);
    assert_eq!(stats.missing, vec!["ABSENT".to_string()]);

    let pairs = resolved.inline_parameters.unwrap().to_pairs();
    assert_eq!(pairs[0].value, serde_json::json!("a@b.com"));
    assert_eq!(pairs[1].value, serde_json::json!("SECRET:ABSENT"));
}
