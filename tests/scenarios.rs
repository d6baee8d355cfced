//! End-to-end behaviour of the analyzer over in-memory workspaces.

use std::path::PathBuf;
use std::sync::Arc;

use compliance_scanner::analyzer::{AnalyzerConfig, ComplianceAnalyzer, MemoryFileSource, ScanState};
use compliance_scanner::catalog::{Check, CheckScope, Control, ControlRegistry, Severity};
use compliance_scanner::error::ScanError;

fn analyzer(registry: ControlRegistry, source: MemoryFileSource) -> ComplianceAnalyzer {
    ComplianceAnalyzer::with_source(Arc::new(registry), Arc::new(source), AnalyzerConfig::default()).unwrap()
}

fn password_registry() -> ControlRegistry {
    let check = Check::new(
        "AC-02",
        "hardcoded-password",
        r#"password\s*=\s*["'][^"']+["']"#,
        "i",
        "Hardcoded password",
        Severity::Error,
    )
    .unwrap()
    .with_scope(CheckScope::Line);

    let mut registry = ControlRegistry::new();
    registry
        .register(Control::new("FedRAMP", "AC-02", "Account Management").with_check(check))
        .unwrap();
    registry
}

#[test]
fn test_password_on_third_line() {
    let source = MemoryFileSource::new().with_file(
        "/repo/db.tf",
        "resource \"aws_db_instance\" \"db\" {\n  engine = \"postgres\"\n  password = \"abc123\"\n}\n",
    );
    let analyzer = analyzer(password_registry(), source);

    let report = analyzer.scan(&["FedRAMP"], &[PathBuf::from("/repo/db.tf")]);
    assert_eq!(report.issues.len(), 1);
    let issue = &report.issues[0];
    assert_eq!(issue.line, 3);
    assert_eq!(issue.column, 3);
    assert_eq!(issue.control_id, "AC-02");
    assert_eq!(issue.severity, Severity::Error);
    assert_eq!(issue.matched_text, "password = \"abc123\"");
}

#[test]
fn test_same_literal_in_two_standards_is_reported_twice() {
    let mut registry = ControlRegistry::new();
    for standard in ["StandardA", "StandardB"] {
        let check = Check::new("NET-1", "open-cidr", r"0\.0\.0\.0/0", "", "Open CIDR", Severity::Warning).unwrap();
        registry
            .register(Control::new(standard, "NET-1", "Network exposure").with_check(check))
            .unwrap();
    }
    let source = MemoryFileSource::new().with_file("/repo/sg.tf", "cidr_blocks = [\"0.0.0.0/0\"]\n");
    let analyzer = analyzer(registry, source);

    let report = analyzer.scan(&["StandardA", "StandardB"], &[PathBuf::from("/repo/sg.tf")]);
    assert_eq!(report.issues.len(), 2);
    let standards: Vec<&str> = report.issues.iter().map(|d| d.standard.as_str()).collect();
    assert_eq!(standards, vec!["StandardA", "StandardB"]);
}

#[test]
fn test_lookup_before_registration_is_empty() {
    let registry = ControlRegistry::new();
    assert!(registry.get_controls_for_standards(&["GDPR"]).is_empty());

    let analyzer = analyzer(registry, MemoryFileSource::new().with_file("/repo/a.tf", "x = 1\n"));
    let report = analyzer.scan(&["GDPR"], &[PathBuf::from("/repo/a.tf")]);
    assert!(report.issues.is_empty());
    assert_eq!(report.unknown_standards, vec!["GDPR"]);
}

#[test]
fn test_empty_file_is_scanned_without_issues() {
    let source = MemoryFileSource::new().with_file("/repo/empty.tf", "");
    let analyzer = analyzer(password_registry(), source);

    let report = analyzer.scan(&["FedRAMP"], &[PathBuf::from("/repo/empty.tf")]);
    assert!(report.issues.is_empty());
    assert_eq!(report.scanned_files, vec![PathBuf::from("/repo/empty.tf")]);
    assert_eq!(report.summary.files_scanned, 1);
    assert!(report.summary.compliant);
}

#[test]
fn test_empty_file_set_yields_empty_report() {
    let analyzer = analyzer(password_registry(), MemoryFileSource::new());

    let report = analyzer.scan(&["FedRAMP"], &[] as &[PathBuf]);
    assert!(report.issues.is_empty());
    assert_eq!(report.files_scanned(), 0);
    assert_eq!(report.summary.files_scanned, 0);
    assert!(report.skipped_files.is_empty());
    assert!(!report.cancelled);
    assert!(report.summary.compliant);
    assert_eq!(analyzer.get_last_report(&["FedRAMP"]).unwrap(), report);
}

#[test]
fn test_last_report_matches_scan_for_any_name_order() {
    let source = MemoryFileSource::new()
        .with_file("/repo/a.tf", "password = \"x\"\n")
        .with_file("/repo/b.tf", "password = 'y'\npassword = 'z'\n");
    let analyzer = analyzer(password_registry(), source);
    let files = vec![PathBuf::from("/repo/b.tf"), PathBuf::from("/repo/a.tf")];

    assert_eq!(analyzer.state(&["FedRAMP", "GDPR"]), ScanState::Unscanned);
    let report = analyzer.scan(&["FedRAMP", "GDPR"], &files);
    assert_eq!(report.issues.len(), 3);
    assert_eq!(analyzer.get_last_report(&["gdpr", "fedramp"]).unwrap(), report);

    assert!(matches!(
        analyzer.get_last_report(&["FedRAMP"]),
        Err(ScanError::ReportNotFound { .. })
    ));
}

#[test]
fn test_builtin_catalog_scan_of_mixed_workspace() {
    let registry = compliance_scanner::catalog::builtin_registry().unwrap();
    let source = MemoryFileSource::new()
        .with_file("/repo/main.tf", "resource \"aws_s3_bucket\" \"b\" {\n  public_access = true\n}\n")
        .with_file("/repo/deploy.yaml", "env:\n  - name: DATA_ENCRYPTION\n    value: \"false\"\n");
    let analyzer = analyzer(registry, source);

    let report = analyzer.scan(
        &["GDPR", "UNKNOWN-STD"],
        &[PathBuf::from("/repo/main.tf"), PathBuf::from("/repo/deploy.yaml")],
    );
    assert_eq!(report.unknown_standards, vec!["UNKNOWN-STD"]);

    let found: Vec<(&str, usize)> = report
        .issues
        .iter()
        .map(|d| (d.check_id.as_str(), d.line))
        .collect();
    assert_eq!(found, vec![("data-encryption-check", 2), ("public-access-check", 2)]);
    assert!(report.issues.iter().all(|d| d.standard == "GDPR"));
}
