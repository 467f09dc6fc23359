//! Cross-crate integration tests verifying contracts between workspace
//! crates.
//!
//! These tests simulate how the CLI binary uses egolint-core and
//! egolint-rules: the check registry, the pattern runtime over the bundled
//! rule file, and the resource graph document shape.

use std::fs;

// ============================================================================
// CLI <-> core contracts
// ============================================================================

#[test]
fn cli_check_context_and_registry_work_on_empty_dir() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = egolint_core::CheckContext::new(dir.path());
    let findings = egolint_core::run_all(&ctx);

    // The CLI renders every finding; each must hold the line grammar.
    for finding in &findings {
        let line = finding.render();
        assert!(line.matches('|').count() >= 2, "finding line too short: {line}");
    }
    assert!(egolint_core::find_check("lifecycle").is_some());
    assert!(egolint_core::find_check("resources").is_some());
}

#[test]
fn cli_runs_bundled_rules_through_core_runtime() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("metadata.json"),
        r#"{"uuid": "x@y", "shell-version": ["46"]}"#,
    )
    .unwrap();
    fs::write(dir.path().join("extension.js"), "console.log('hi');\n").unwrap();

    let findings = egolint_core::run_rules(egolint_rules::DEFAULT_PATTERNS, dir.path());

    // R-LOG-01 (console.log ban) must fire; every bundled rule must report.
    assert!(findings
        .iter()
        .any(|f| f.check == "R-LOG-01" && f.status == egolint_core::Status::Fail));
    let rule_count = egolint_core::parse_rules(egolint_rules::DEFAULT_PATTERNS).len();
    let mut reported: Vec<&str> = findings.iter().map(|f| f.check.as_str()).collect();
    reported.sort();
    reported.dedup();
    assert_eq!(reported.len(), rule_count, "no rule may stay silent");
}

// ============================================================================
// rules <-> core contracts
// ============================================================================

#[test]
fn bundled_rules_pass_core_validator() {
    let rules = egolint_core::parse_rules(egolint_rules::DEFAULT_PATTERNS);
    let report = egolint_core::validate_store(&rules);
    assert!(report.is_ok(), "bundled rules invalid: {:?}", report.errors);
    assert_eq!(report.rule_count, egolint_core::parse_rules(egolint_rules::DEFAULT_PATTERNS).len());
}

#[test]
fn graph_document_summary_shape_is_stable() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("extension.js"), "enable() {}\n").unwrap();

    let graph = egolint_core::ResourceGraph::build(dir.path()).unwrap();
    let doc: serde_json::Value = serde_json::from_str(&graph.to_json()).unwrap();

    for key in [
        "total_creates",
        "total_destroys",
        "orphan_count",
        "files_scanned",
        "ownership_depth",
    ] {
        assert!(
            doc["summary"][key].is_u64(),
            "summary key {key} missing or mistyped"
        );
    }
}
