//! End-to-end scenarios exercising the full pipeline through
//! `orchestrator::run_compare`, matching the testable properties in
//! spec §8.

use std::fs;

use policy_drift::cancel::CancellationToken;
use policy_drift::config::EffectiveConfig;
use policy_drift::orchestrator::{run_compare, CompareRequest};
use policy_drift::report::ReportSink;
use policy_drift::source::MockLivePolicySource;

fn write_reference_policy(dir: &std::path::Path, file_name: &str, body: &str) {
    fs::write(dir.join(file_name), body).unwrap();
}

fn config_with_overrides(overrides: serde_json::Value) -> EffectiveConfig {
    EffectiveConfig::build(None, None, Some(overrides)).unwrap()
}

#[test]
fn identical_policies_produce_no_drift() {
    let dir = tempfile::tempdir().unwrap();
    write_reference_policy(
        dir.path(),
        "mfa.json",
        r#"{"displayName":"Require MFA","state":"enabled"}"#,
    );

    let live = MockLivePolicySource::new(serde_json::json!({
        "tenantId": "t1",
        "policies": [{"displayName": "Require MFA", "state": "enabled"}]
    }));
    let config = config_with_overrides(serde_json::json!({"exitOnDifferences": true}));
    let sink = ReportSink::new(true);
    let cancellation = CancellationToken::new();

    let result = run_compare(CompareRequest {
        reference_dir: dir.path().to_path_buf(),
        entra_file: None,
        live_source: &live,
        config: &config,
        cancellation,
        report_sink: &sink,
    })
    .unwrap();

    assert_eq!(result.exit_code, 0);
    assert_eq!(result.status, "noDrift");
    assert_eq!(result.tenant_id, "t1");
}

#[test]
fn dialect_equivalent_numeric_and_string_controls_compare_identical() {
    let dir = tempfile::tempdir().unwrap();
    write_reference_policy(
        dir.path(),
        "mfa.json",
        r#"{"displayName":"Require MFA","state":"enabled","grantControls":{"operator":"OR","builtInControls":["1"]}}"#,
    );

    let live = MockLivePolicySource::new(serde_json::json!({
        "policies": [{
            "displayName": "Require MFA",
            "state": "enabled",
            "grantControls": {"operator": "OR", "builtInControls": ["mfa"]}
        }]
    }));
    let config = config_with_overrides(serde_json::json!({"exitOnDifferences": true}));
    let sink = ReportSink::new(true);

    let result = run_compare(CompareRequest {
        reference_dir: dir.path().to_path_buf(),
        entra_file: None,
        live_source: &live,
        config: &config,
        cancellation: CancellationToken::new(),
        report_sink: &sink,
    })
    .unwrap();

    assert_eq!(result.exit_code, 0);
    assert_eq!(result.summary.identical, 1);
}

#[test]
fn critical_state_change_drives_exit_code_two() {
    let dir = tempfile::tempdir().unwrap();
    write_reference_policy(
        dir.path(),
        "mfa.json",
        r#"{"displayName":"Require MFA","state":"enabled"}"#,
    );

    let live = MockLivePolicySource::new(serde_json::json!({
        "policies": [{"displayName": "Require MFA", "state": "disabled"}]
    }));
    let config = config_with_overrides(serde_json::json!({"exitOnDifferences": true}));
    let sink = ReportSink::new(true);

    let result = run_compare(CompareRequest {
        reference_dir: dir.path().to_path_buf(),
        entra_file: None,
        live_source: &live,
        config: &config,
        cancellation: CancellationToken::new(),
        report_sink: &sink,
    })
    .unwrap();

    assert_eq!(result.exit_code, 2);
    assert_eq!(result.status, "criticalDriftDetected");
    assert_eq!(result.summary.critical_changes, 1);
}

#[test]
fn non_critical_diff_is_suppressed_by_ignore_override() {
    let dir = tempfile::tempdir().unwrap();
    write_reference_policy(
        dir.path(),
        "mfa.json",
        r#"{"displayName":"Require MFA","state":"enabled","description":"baseline"}"#,
    );

    let live = MockLivePolicySource::new(serde_json::json!({
        "policies": [{"displayName": "Require MFA", "state": "enabled", "description": "updated"}]
    }));
    let sink = ReportSink::new(true);

    let without_ignore = config_with_overrides(serde_json::json!({"exitOnDifferences": true}));
    let result = run_compare(CompareRequest {
        reference_dir: dir.path().to_path_buf(),
        entra_file: None,
        live_source: &live,
        config: &without_ignore,
        cancellation: CancellationToken::new(),
        report_sink: &sink,
    })
    .unwrap();
    assert_eq!(result.exit_code, 1);
    assert_eq!(result.status, "differencesFound");

    let with_ignore = config_with_overrides(serde_json::json!({
        "exitOnDifferences": true,
        "ignoreChangeTypes": ["description"]
    }));
    let result = run_compare(CompareRequest {
        reference_dir: dir.path().to_path_buf(),
        entra_file: None,
        live_source: &live,
        config: &with_ignore,
        cancellation: CancellationToken::new(),
        report_sink: &sink,
    })
    .unwrap();
    assert_eq!(result.exit_code, 0);
    assert_eq!(result.status, "noDrift");
}

#[test]
fn threshold_exceeded_overrides_plain_differences_found() {
    let dir = tempfile::tempdir().unwrap();
    write_reference_policy(
        dir.path(),
        "a.json",
        r#"{"displayName":"Policy A","state":"enabled","description":"one"}"#,
    );
    write_reference_policy(
        dir.path(),
        "b.json",
        r#"{"displayName":"Policy B","state":"enabled","description":"two"}"#,
    );

    let live = MockLivePolicySource::new(serde_json::json!({
        "policies": [
            {"displayName": "Policy A", "state": "enabled", "description": "one-changed"},
            {"displayName": "Policy B", "state": "enabled", "description": "two-changed"}
        ]
    }));
    let sink = ReportSink::new(true);
    let config = config_with_overrides(serde_json::json!({
        "exitOnDifferences": true,
        "maxDifferences": 1
    }));

    let result = run_compare(CompareRequest {
        reference_dir: dir.path().to_path_buf(),
        entra_file: None,
        live_source: &live,
        config: &config,
        cancellation: CancellationToken::new(),
        report_sink: &sink,
    })
    .unwrap();

    assert_eq!(result.exit_code, 2);
    assert_eq!(result.status, "thresholdExceeded");
}

#[test]
fn orphan_policies_count_toward_differences_found() {
    let dir = tempfile::tempdir().unwrap();
    write_reference_policy(
        dir.path(),
        "only_in_reference.json",
        r#"{"displayName":"Legacy Policy","state":"enabled"}"#,
    );

    let live = MockLivePolicySource::new(serde_json::json!({"policies": []}));
    let config = config_with_overrides(serde_json::json!({"exitOnDifferences": true}));
    let sink = ReportSink::new(true);

    let result = run_compare(CompareRequest {
        reference_dir: dir.path().to_path_buf(),
        entra_file: None,
        live_source: &live,
        config: &config,
        cancellation: CancellationToken::new(),
        report_sink: &sink,
    })
    .unwrap();

    assert_eq!(result.exit_code, 1);
    assert_eq!(result.summary.left_only, 1);
}

#[test]
fn exit_on_differences_false_keeps_exit_code_zero_despite_critical_drift() {
    let dir = tempfile::tempdir().unwrap();
    write_reference_policy(
        dir.path(),
        "mfa.json",
        r#"{"displayName":"Require MFA","state":"enabled"}"#,
    );

    let live = MockLivePolicySource::new(serde_json::json!({
        "policies": [{"displayName": "Require MFA", "state": "disabled"}]
    }));
    let config = config_with_overrides(serde_json::json!({"exitOnDifferences": false}));
    let sink = ReportSink::new(true);

    let result = run_compare(CompareRequest {
        reference_dir: dir.path().to_path_buf(),
        entra_file: None,
        live_source: &live,
        config: &config,
        cancellation: CancellationToken::new(),
        report_sink: &sink,
    })
    .unwrap();

    assert_eq!(result.exit_code, 0);
    assert_eq!(result.status, "criticalDriftDetected");
}

#[test]
fn entra_file_override_is_used_instead_of_live_source() {
    let dir = tempfile::tempdir().unwrap();
    write_reference_policy(
        dir.path(),
        "mfa.json",
        r#"{"displayName":"Require MFA","state":"enabled"}"#,
    );

    let entra_dir = tempfile::tempdir().unwrap();
    let entra_path = entra_dir.path().join("export.json");
    fs::write(
        &entra_path,
        r#"{"tenantId":"from-file","policies":[{"displayName":"Require MFA","state":"enabled"}]}"#,
    )
    .unwrap();

    let live = MockLivePolicySource::new(serde_json::json!({"tenantId": "from-mock", "policies": []}));
    let config = config_with_overrides(serde_json::json!({"exitOnDifferences": true}));
    let sink = ReportSink::new(true);

    let result = run_compare(CompareRequest {
        reference_dir: dir.path().to_path_buf(),
        entra_file: Some(entra_path),
        live_source: &live,
        config: &config,
        cancellation: CancellationToken::new(),
        report_sink: &sink,
    })
    .unwrap();

    assert_eq!(result.exit_code, 0);
    assert_eq!(result.tenant_id, "from-file");
}
