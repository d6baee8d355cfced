//! # Results Module
//!
//! Diagnostics, scan reports, and the aggregation that turns per-file scan
//! outcomes into one deterministic report.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::scanner::FileScanOutcome;
use crate::catalog::{family_of, Severity};
use crate::error::{FileReadError, Result};

/// A single finding: one check matched at one location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub file: PathBuf,
    pub line: usize,
    pub column: usize,
    pub severity: Severity,
    #[serde(rename = "control")]
    pub control_id: String,
    #[serde(rename = "check")]
    pub check_id: String,
    pub standard: String,
    pub message: String,
    pub matched_text: String,
    pub remediation: Option<String>,
}

impl Diagnostic {
    pub fn family(&self) -> &str {
        family_of(&self.control_id)
    }
}

/// A file that was selected for the scan but could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

impl SkippedFile {
    pub fn new(path: PathBuf, error: &FileReadError) -> Self {
        Self {
            path,
            reason: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSummary {
    pub total_issues: usize,
    pub errors: usize,
    pub warnings: usize,
    pub info: usize,
    pub by_family: BTreeMap<String, usize>,
    pub by_standard: BTreeMap<String, usize>,
    pub files_scanned: usize,
    pub files_skipped: usize,
    pub files_with_issues: usize,
    /// Distinct controls with at least one issue.
    pub controls_covered: usize,
    /// Controls active for this scan.
    pub total_controls: usize,
    /// No `Error`-severity issue was found.
    pub compliant: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    /// Normalized standard-set key the report is cached under.
    pub standards: Vec<String>,
    pub unknown_standards: Vec<String>,
    pub scanned_files: Vec<PathBuf>,
    pub skipped_files: Vec<SkippedFile>,
    pub issues: Vec<Diagnostic>,
    pub summary: ScanSummary,
    /// blake3 digest of every scanned file, for staleness checks.
    pub file_digests: BTreeMap<PathBuf, String>,
    pub cancelled: bool,
    pub timestamp: DateTime<Utc>,
    pub duration: Duration,
}

impl ScanReport {
    pub fn empty(standards: Vec<String>) -> Self {
        Self {
            standards,
            unknown_standards: Vec::new(),
            scanned_files: Vec::new(),
            skipped_files: Vec::new(),
            issues: Vec::new(),
            summary: ScanSummary {
                compliant: true,
                ..ScanSummary::default()
            },
            file_digests: BTreeMap::new(),
            cancelled: false,
            timestamp: Utc::now(),
            duration: Duration::from_secs(0),
        }
    }

    pub fn files_scanned(&self) -> usize {
        self.scanned_files.len()
    }

    /// Issues at or above `threshold`.
    pub fn issues_at_or_above(&self, threshold: Severity) -> usize {
        self.issues.iter().filter(|d| d.severity >= threshold).count()
    }

    pub fn issues_for_file<'a>(&'a self, file: &'a std::path::Path) -> impl Iterator<Item = &'a Diagnostic> + 'a {
        self.issues.iter().filter(move |d| d.file == file)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Scan-wide facts the aggregator needs besides the per-file outcomes.
#[derive(Debug, Clone, Default)]
pub struct ReportContext {
    pub standards: Vec<String>,
    pub unknown_standards: Vec<String>,
    pub total_controls: usize,
    pub cancelled: bool,
}

pub struct ResultAggregator;

impl ResultAggregator {
    /// Merge per-file outcomes into a report. Output order does not depend on
    /// the order outcomes arrive in.
    pub fn aggregate(
        outcomes: Vec<FileScanOutcome>,
        context: ReportContext,
        duration: Duration,
    ) -> ScanReport {
        let mut scanned_files = Vec::new();
        let mut skipped_files = Vec::new();
        let mut file_digests = BTreeMap::new();
        let mut issues = Vec::new();

        for outcome in outcomes {
            match outcome {
                FileScanOutcome::Scanned {
                    path,
                    diagnostics,
                    digest,
                } => {
                    file_digests.insert(path.clone(), digest);
                    scanned_files.push(path);
                    issues.extend(diagnostics);
                }
                FileScanOutcome::Skipped { path, reason } => {
                    skipped_files.push(SkippedFile::new(path, &reason));
                }
            }
        }

        scanned_files.sort();
        skipped_files.sort_by(|a, b| a.path.cmp(&b.path));
        issues.sort_by(|a, b| {
            (&a.file, a.line, a.column, &a.control_id, &a.check_id, &a.standard).cmp(&(
                &b.file,
                b.line,
                b.column,
                &b.control_id,
                &b.check_id,
                &b.standard,
            ))
        });

        let summary = Self::summarize(&issues, &scanned_files, &skipped_files, context.total_controls);

        ScanReport {
            standards: context.standards,
            unknown_standards: context.unknown_standards,
            scanned_files,
            skipped_files,
            issues,
            summary,
            file_digests,
            cancelled: context.cancelled,
            timestamp: Utc::now(),
            duration,
        }
    }

    fn summarize(
        issues: &[Diagnostic],
        scanned_files: &[PathBuf],
        skipped_files: &[SkippedFile],
        total_controls: usize,
    ) -> ScanSummary {
        let mut summary = ScanSummary {
            total_issues: issues.len(),
            files_scanned: scanned_files.len(),
            files_skipped: skipped_files.len(),
            total_controls,
            ..ScanSummary::default()
        };

        let mut files_with_issues = BTreeSet::new();
        let mut controls = BTreeSet::new();

        for issue in issues {
            match issue.severity {
                Severity::Error => summary.errors += 1,
                Severity::Warning => summary.warnings += 1,
                Severity::Info => summary.info += 1,
            }
            *summary.by_family.entry(issue.family().to_string()).or_insert(0) += 1;
            *summary.by_standard.entry(issue.standard.clone()).or_insert(0) += 1;
            files_with_issues.insert(&issue.file);
            controls.insert((&issue.standard, &issue.control_id));
        }

        summary.files_with_issues = files_with_issues.len();
        summary.controls_covered = controls.len();
        summary.compliant = summary.errors == 0;
        summary
    }
}
