//! End-to-end analysis tests over a synthetic raw store

use cloudsweep_analyzer::{Analyzer, Domain, Severity};
use cloudsweep_common::records::{ErrorKind, RawRecord, RecordError, RecordMetadata};
use cloudsweep_common::RawStore;
use serde_json::{json, Value};
use std::path::Path;

fn metadata(service: &str, operation: &str) -> RecordMetadata {
    RecordMetadata {
        service: service.to_string(),
        region: "us-east-1".to_string(),
        operation: operation.to_string(),
        timestamp: chrono::Utc::now(),
        account: Some("123456789012".to_string()),
        paginated: false,
        truncated: false,
        success: true,
    }
}

fn put_success(store: &RawStore, service: &str, operation: &str, data: Value) {
    store
        .put(&RawRecord::success(metadata(service, operation), data))
        .unwrap();
}

fn put_error(store: &RawStore, service: &str, operation: &str, kind: ErrorKind) {
    store
        .put(&RawRecord::failure(
            metadata(service, operation),
            RecordError {
                kind,
                message: format!("{kind} for test"),
            },
        ))
        .unwrap();
}

/// Every security service healthy except CloudTrail, which is absent
fn seed_cloudtrail_gap(run_dir: &Path) {
    let store = RawStore::create(run_dir).unwrap();
    put_success(&store, "securityhub", "GetFindings", json!({"Findings": []}));
    put_success(&store, "config", "DescribeConfigurationRecorders", json!({"ConfigurationRecorders": [{"name": "default"}]}));
    put_error(&store, "cloudtrail", "ListTrails", ErrorKind::NotFound);
    put_success(&store, "ce", "GetCostAndUsage", json!({}));
    put_success(&store, "cloudwatch", "DescribeAlarms", json!({"MetricAlarms": []}));
    put_success(&store, "ssm", "DescribeInstanceInformation", json!({"InstanceInformationList": []}));
}

/// Everything present: no rule fires anywhere
fn seed_all_clear(run_dir: &Path) {
    let store = RawStore::create(run_dir).unwrap();
    put_success(&store, "securityhub", "GetFindings", json!({"Findings": []}));
    put_success(&store, "config", "DescribeConfigurationRecorders", json!({"ConfigurationRecorders": []}));
    put_success(&store, "cloudtrail", "ListTrails", json!({"Trails": [{"Name": "main"}]}));
    put_success(&store, "ce", "GetCostAndUsage", json!({}));
    put_success(&store, "cloudwatch", "DescribeAlarms", json!({"MetricAlarms": []}));
    put_success(&store, "ssm", "DescribeInstanceInformation", json!({"InstanceInformationList": []}));
}

#[test]
fn test_cloudtrail_gap_scenario() {
    let dir = tempfile::tempdir().unwrap();
    seed_cloudtrail_gap(dir.path());

    let report = Analyzer::new(dir.path().to_path_buf()).analyze().unwrap();

    // Exactly one high-severity finding, for the missing audit trail
    let highs: Vec<_> = report
        .findings
        .findings
        .iter()
        .filter(|f| f.severity == Severity::High)
        .collect();
    assert_eq!(highs.len(), 1);
    assert_eq!(highs[0].id, "SEC-003");
    assert!(highs[0].evidence[0].contains("NotFound"));

    // No medium or low findings in Security
    assert!(report
        .findings
        .findings
        .iter()
        .filter(|f| f.domain == Domain::Security)
        .all(|f| f.severity == Severity::High));

    // One high-severity finding -> Security domain scores 2
    let security = report
        .scores
        .domains
        .iter()
        .find(|d| d.domain == Domain::Security)
        .unwrap();
    assert_eq!(security.score, 2);
    assert_eq!(security.rationale, vec!["SEC-003"]);
}

#[test]
fn test_all_clear_scores_five_everywhere() {
    let dir = tempfile::tempdir().unwrap();
    seed_all_clear(dir.path());

    let report = Analyzer::new(dir.path().to_path_buf()).analyze().unwrap();

    assert_eq!(report.findings.total_findings, 0);
    assert!(report.scores.domains.iter().all(|d| d.score == 5));
    assert_eq!(report.scores.overall, 5.0);
    assert_eq!(report.summary.overall_score, 5.0);
}

#[test]
fn test_analysis_is_idempotent_over_unchanged_store() {
    let dir = tempfile::tempdir().unwrap();
    seed_cloudtrail_gap(dir.path());

    let analyzer = Analyzer::new(dir.path().to_path_buf());
    let first = analyzer.analyze().unwrap();
    let second = analyzer.analyze().unwrap();

    assert_eq!(
        serde_json::to_string(&first.index).unwrap(),
        serde_json::to_string(&second.index).unwrap()
    );
    assert_eq!(
        serde_json::to_string(&first.findings.findings).unwrap(),
        serde_json::to_string(&second.findings.findings).unwrap()
    );
}

#[test]
fn test_outputs_are_written_to_run_dir() {
    let dir = tempfile::tempdir().unwrap();
    seed_all_clear(dir.path());

    Analyzer::new(dir.path().to_path_buf()).analyze().unwrap();

    for path in [
        "index/index.json",
        "outputs/findings.json",
        "outputs/scores.json",
        "outputs/summary.json",
    ] {
        assert!(dir.path().join(path).is_file(), "{path} missing");
    }

    let summary: Value = serde_json::from_str(
        &std::fs::read_to_string(dir.path().join("outputs/summary.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(summary["services_count"], 6);
    assert_eq!(summary["overall_score"], 5.0);
}

#[test]
fn test_truncated_list_counts_only_fetched_pages() {
    let dir = tempfile::tempdir().unwrap();
    let store = RawStore::create(dir.path()).unwrap();

    let mut meta = metadata("ec2", "DescribeVpcs");
    meta.paginated = true;
    meta.truncated = true;
    store
        .put(&RawRecord::success(
            meta,
            json!({
                "pages": 2,
                "data": [
                    {"Vpcs": [{"VpcId": "vpc-1"}]},
                    {"Vpcs": [{"VpcId": "vpc-2"}]}
                ]
            }),
        ))
        .unwrap();

    let report = Analyzer::new(dir.path().to_path_buf()).analyze().unwrap();
    assert_eq!(report.index.resource_total("ec2"), 2);
    let entry = &report.index.services["ec2"].regions["us-east-1"].operations[0];
    assert!(entry.truncated);
    assert_eq!(entry.resource_count, 2);
}
