//! # Scanner Module
//!
//! Runs every applicable check against one file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use ahash::AHashSet;
use log::{debug, trace};

use super::file_discovery::{content_digest, FileSource};
use super::pattern_engine::{evaluate, LineIndex};
use super::results::Diagnostic;
use crate::catalog::{Check, CheckScope, Control};
use crate::error::FileReadError;

/// What happened to a single file during a scan.
#[derive(Debug, Clone, PartialEq)]
pub enum FileScanOutcome {
    Scanned {
        path: PathBuf,
        diagnostics: Vec<Diagnostic>,
        digest: String,
    },
    Skipped {
        path: PathBuf,
        reason: FileReadError,
    },
}

/// Reads files through a [`FileSource`] and scans them against a fixed
/// control set. Cheap to share between worker threads.
pub struct FileScanner {
    source: Arc<dyn FileSource>,
    controls: Arc<[Arc<Control>]>,
}

impl FileScanner {
    pub fn new(source: Arc<dyn FileSource>, controls: Vec<Arc<Control>>) -> Self {
        Self {
            source,
            controls: controls.into(),
        }
    }

    pub fn scan(&self, path: &Path) -> FileScanOutcome {
        match self.source.read_file(path) {
            Ok(content) => {
                let diagnostics = scan_file(path, &content, &self.controls);
                trace!("{}: {} diagnostics", path.display(), diagnostics.len());
                FileScanOutcome::Scanned {
                    path: path.to_path_buf(),
                    diagnostics,
                    digest: content_digest(&content),
                }
            }
            Err(reason) => {
                debug!("Skipping {}: {}", path.display(), reason);
                FileScanOutcome::Skipped {
                    path: path.to_path_buf(),
                    reason,
                }
            }
        }
    }
}

/// Lines of `content` with their byte offsets. Lines are split on `\n`; a
/// trailing `\r` is not part of the line.
fn split_lines(content: &str) -> Vec<&str> {
    content
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect()
}

/// Scan already-loaded content against `controls`.
///
/// Each (control, check, line) is reported at most once, at its earliest
/// column. The result is ordered by line, column, check id, control id and
/// standard.
pub fn scan_file(path: &Path, content: &str, controls: &[Arc<Control>]) -> Vec<Diagnostic> {
    let lines = split_lines(content);
    let mut line_index: Option<LineIndex> = None;
    let mut seen: AHashSet<(usize, usize, usize)> = AHashSet::new();
    let mut diagnostics = Vec::new();

    for (control_idx, control) in controls.iter().enumerate() {
        for (check_idx, check) in control.checks.iter().enumerate() {
            if !check.applies_to(path) {
                continue;
            }

            let mut emit = |line: usize, column: usize, matched_text: &str| {
                if seen.insert((control_idx, check_idx, line)) {
                    diagnostics.push(build_diagnostic(path, control, check, line, column, matched_text));
                }
            };

            match check.scope {
                CheckScope::Line => {
                    for (idx, line) in lines.iter().enumerate() {
                        for m in evaluate(check, line) {
                            let column = line[..m.offset].chars().count() + 1;
                            emit(idx + 1, column, &m.matched_text);
                        }
                    }
                }
                CheckScope::File => {
                    let index = line_index.get_or_insert_with(|| LineIndex::new(content));
                    for m in evaluate(check, content) {
                        let (line, column) = index.offset_to_line_col(content, m.offset);
                        emit(line, column, &m.matched_text);
                    }
                }
            }
        }
    }

    diagnostics.sort_by(|a, b| {
        (a.line, a.column, &a.check_id, &a.control_id, &a.standard).cmp(&(
            b.line,
            b.column,
            &b.check_id,
            &b.control_id,
            &b.standard,
        ))
    });
    diagnostics
}

fn build_diagnostic(
    path: &Path,
    control: &Control,
    check: &Check,
    line: usize,
    column: usize,
    matched_text: &str,
) -> Diagnostic {
    Diagnostic {
        file: path.to_path_buf(),
        line,
        column,
        severity: check.severity,
        control_id: control.id.clone(),
        check_id: check.id.clone(),
        standard: control.standard.clone(),
        message: check.render_message(&control.id, matched_text),
        matched_text: matched_text.to_string(),
        remediation: check.remediation.clone(),
    }
}
