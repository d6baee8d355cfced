//! # Display Module
//!
//! Terminal rendering of scan reports, control listings and coverage.

use std::fmt::Write as _;
use std::path::Path;

use colored::*;

use super::coverage::Coverage;
use super::results::{Diagnostic, ScanReport};
use crate::catalog::{Control, Severity};

/// Content line for measuring and drawing
#[derive(Debug, Clone)]
enum ContentLine {
    Pair { label: String, value: String },
    Value(String),
    Separator,
}

/// Box drawer that sizes itself to its content.
pub struct BoxDrawer {
    title: String,
    lines: Vec<ContentLine>,
    min_width: usize,
    max_width: usize,
}

impl BoxDrawer {
    pub fn new(title: &str) -> Self {
        let terminal_width = term_size::dimensions().map(|(w, _)| w).unwrap_or(120);
        Self {
            title: title.to_string(),
            lines: Vec::new(),
            min_width: 60,
            max_width: terminal_width.clamp(60, 120),
        }
    }

    pub fn add_line(&mut self, label: &str, value: &str) {
        self.lines.push(ContentLine::Pair {
            label: label.to_string(),
            value: value.to_string(),
        });
    }

    pub fn add_value_only(&mut self, value: &str) {
        self.lines.push(ContentLine::Value(value.to_string()));
    }

    pub fn add_separator(&mut self) {
        self.lines.push(ContentLine::Separator);
    }

    fn optimal_width(&self) -> usize {
        let title_width = visual_width(&self.title) + 6;
        let content_width = self
            .lines
            .iter()
            .map(|line| match line {
                ContentLine::Pair { label, value } => visual_width(label).max(24) + 2 + visual_width(value),
                ContentLine::Value(value) => visual_width(value),
                ContentLine::Separator => 0,
            })
            .max()
            .unwrap_or(0);

        // "│ " + content + " │"
        title_width
            .max(content_width + 4)
            .max(self.min_width)
            .min(self.max_width)
    }

    pub fn draw(&self) -> String {
        let width = self.optimal_width();
        let content_width = width - 4;
        let mut output = Vec::with_capacity(self.lines.len() + 2);

        let title_len = visual_width(&self.title).min(width.saturating_sub(5));
        output.push(format!(
            "┌─ {} {}┐",
            self.title.bright_cyan(),
            "─".repeat(width.saturating_sub(5 + title_len))
        ));

        for line in &self.lines {
            let content = match line {
                ContentLine::Separator => {
                    output.push(format!("│ {} │", "─".repeat(content_width).dimmed()));
                    continue;
                }
                ContentLine::Value(value) => value.clone(),
                ContentLine::Pair { label, value } => {
                    let label_width = visual_width(label).max(24);
                    let padding = label_width - visual_width(label);
                    format!("{}{}  {}", label.bright_white(), " ".repeat(padding), value)
                }
            };
            output.push(format!("│ {} │", fit_to_width(&content, content_width)));
        }

        output.push(format!("└{}┘", "─".repeat(width - 2)));
        output.join("\n")
    }
}

/// Pad or truncate to exactly `width` columns.
fn fit_to_width(s: &str, width: usize) -> String {
    let actual = visual_width(s);
    if actual <= width {
        format!("{}{}", s, " ".repeat(width - actual))
    } else {
        let truncated = truncate_to_width(s, width);
        let truncated_width = visual_width(&truncated);
        format!("{}{}", truncated, " ".repeat(width.saturating_sub(truncated_width)))
    }
}

/// Visual width of a string, ignoring ANSI color codes
fn visual_width(s: &str) -> usize {
    strip_ansi_codes(s).chars().map(char_width).sum()
}

fn char_width(ch: char) -> usize {
    match ch {
        '\u{0000}'..='\u{001F}' | '\u{007F}' => 0,
        '\u{0300}'..='\u{036F}' => 0,
        '\u{1100}'..='\u{115F}'
        | '\u{2600}'..='\u{27BF}'
        | '\u{2E80}'..='\u{A4CF}'
        | '\u{AC00}'..='\u{D7AF}'
        | '\u{F900}'..='\u{FAFF}'
        | '\u{FE30}'..='\u{FE6F}'
        | '\u{FF00}'..='\u{FF60}'
        | '\u{FFE0}'..='\u{FFE6}'
        | '\u{1F300}'..='\u{1F9FF}' => 2,
        _ => 1,
    }
}

/// Truncate to `max_width` columns with a trailing `...`. Color codes are
/// dropped from truncated strings.
fn truncate_to_width(s: &str, max_width: usize) -> String {
    if visual_width(s) <= max_width {
        return s.to_string();
    }

    let stripped = strip_ansi_codes(s);
    let mut result = String::new();
    let mut width = 0;
    for ch in stripped.chars() {
        let ch_width = char_width(ch);
        if width + ch_width > max_width.saturating_sub(3) {
            result.push_str("...");
            break;
        }
        result.push(ch);
        width += ch_width;
    }
    result
}

fn strip_ansi_codes(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '\x1b' && chars.peek() == Some(&'[') {
            chars.next();
            for c in chars.by_ref() {
                if c.is_ascii_alphabetic() {
                    break;
                }
            }
        } else {
            result.push(ch);
        }
    }
    result
}

fn severity_label(severity: Severity) -> ColoredString {
    match severity {
        Severity::Error => "ERROR".red().bold(),
        Severity::Warning => "WARN ".yellow().bold(),
        Severity::Info => "INFO ".blue(),
    }
}

fn display_path(path: &Path, root: Option<&Path>) -> String {
    match root.and_then(|root| path.strip_prefix(root).ok()) {
        Some(relative) => relative.display().to_string(),
        None => path.display().to_string(),
    }
}

/// Render a scan report for the terminal.
pub fn render_report(report: &ScanReport, root: Option<&Path>) -> String {
    let mut out = String::new();

    let mut summary = BoxDrawer::new("Compliance Scan");
    summary.add_line("Standards:", &report.standards.join(", "));
    if !report.unknown_standards.is_empty() {
        summary.add_line("Unknown standards:", &report.unknown_standards.join(", ").yellow().to_string());
    }
    summary.add_line("Controls evaluated:", &report.summary.total_controls.to_string());
    summary.add_line("Files scanned:", &report.summary.files_scanned.to_string());
    summary.add_line("Files skipped:", &report.summary.files_skipped.to_string());
    summary.add_separator();
    summary.add_line("Errors:", &report.summary.errors.to_string().red().to_string());
    summary.add_line("Warnings:", &report.summary.warnings.to_string().yellow().to_string());
    summary.add_line("Info:", &report.summary.info.to_string());
    summary.add_line("Controls with issues:", &report.summary.controls_covered.to_string());
    let status = if report.cancelled {
        "CANCELLED (partial results)".yellow().bold()
    } else if report.summary.compliant {
        "COMPLIANT".green().bold()
    } else {
        "NON-COMPLIANT".red().bold()
    };
    summary.add_line("Status:", &status.to_string());
    summary.add_line("Duration:", &format!("{:.2?}", report.duration));
    let _ = writeln!(out, "{}", summary.draw());

    if !report.issues.is_empty() {
        let _ = writeln!(out);
        let mut current_file: Option<&Path> = None;
        for issue in &report.issues {
            if current_file != Some(issue.file.as_path()) {
                current_file = Some(issue.file.as_path());
                let _ = writeln!(out, "{}", display_path(&issue.file, root).bold().underline());
            }
            render_issue(&mut out, issue);
        }
    }

    if !report.skipped_files.is_empty() {
        let _ = writeln!(out, "\n{}", "Skipped files".dimmed());
        for skipped in &report.skipped_files {
            let _ = writeln!(
                out,
                "  {} ({})",
                display_path(&skipped.path, root),
                skipped.reason.dimmed()
            );
        }
    }

    out
}

fn render_issue(out: &mut String, issue: &Diagnostic) {
    let _ = writeln!(
        out,
        "  {:>5}:{:<4} {} {} {}",
        issue.line,
        issue.column,
        severity_label(issue.severity),
        format!("[{}]", issue.control_id).cyan(),
        issue.message
    );
    if let Some(remediation) = &issue.remediation {
        let options = textwrap::Options::new(100)
            .initial_indent("             fix: ")
            .subsequent_indent("                  ");
        for line in textwrap::wrap(remediation, options) {
            let _ = writeln!(out, "{}", line.dimmed());
        }
    }
}

/// Render a control listing, one box per standard.
pub fn render_controls(controls: &[std::sync::Arc<Control>]) -> String {
    let mut out = String::new();
    let mut standards: Vec<&str> = Vec::new();
    for control in controls {
        if !standards.contains(&control.standard.as_str()) {
            standards.push(&control.standard);
        }
    }

    for standard in standards {
        let mut drawer = BoxDrawer::new(standard);
        for control in controls.iter().filter(|c| c.standard == standard) {
            let levels = if control.levels.is_empty() {
                String::new()
            } else {
                let names: Vec<&str> = control.levels.iter().map(|l| l.as_str()).collect();
                format!(" [{}]", names.join("/"))
            };
            drawer.add_line(
                &control.id,
                &format!(
                    "{} ({} checks, {}){}",
                    control.title,
                    control.checks.len(),
                    control.severity,
                    levels
                ),
            );
        }
        let _ = writeln!(out, "{}", drawer.draw());
    }
    out
}

pub fn render_coverage(title: &str, coverage: &Coverage) -> String {
    let mut drawer = BoxDrawer::new(title);
    let percentage = format!("{:.1}%", coverage.percentage);
    let percentage = if coverage.is_complete() {
        percentage.green().to_string()
    } else {
        percentage.yellow().to_string()
    };
    drawer.add_line("Coverage:", &percentage);
    drawer.add_line("Covered:", &coverage.covered.len().to_string());
    drawer.add_line("Missing:", &coverage.missing.len().to_string());
    drawer.add_line("Not in baseline:", &coverage.extra.len().to_string());

    if !coverage.missing.is_empty() {
        drawer.add_separator();
        let missing: Vec<&str> = coverage.missing.iter().map(|s| s.as_str()).collect();
        for line in textwrap::wrap(&missing.join(", "), 72) {
            drawer.add_value_only(&line);
        }
    }
    drawer.draw()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::results::{ReportContext, ResultAggregator};
    use crate::analyzer::scanner::FileScanOutcome;
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn test_visual_width_ignores_color() {
        colored::control::set_override(true);
        let colored = "abc".red().to_string();
        assert_eq!(visual_width(&colored), 3);
        assert_eq!(visual_width("漢字"), 4);
        colored::control::unset_override();
    }

    #[test]
    fn test_box_lines_have_equal_width() {
        let mut drawer = BoxDrawer::new("Title");
        drawer.add_line("Label:", "value");
        drawer.add_separator();
        drawer.add_value_only(&"x".repeat(500));
        let drawn = drawer.draw();
        let widths: Vec<usize> = drawn.lines().map(visual_width).collect();
        assert!(widths.windows(2).all(|w| w[0] == w[1]), "{:?}", widths);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate_to_width("abcdefghij", 6), "abc...");
        assert_eq!(truncate_to_width("abc", 6), "abc");
    }

    #[test]
    fn test_render_report() {
        let issue = Diagnostic {
            file: PathBuf::from("/repo/main.tf"),
            line: 3,
            column: 3,
            severity: Severity::Error,
            control_id: "AC-02".to_string(),
            check_id: "AC-02-2".to_string(),
            standard: "FedRAMP".to_string(),
            message: "Hardcoded passwords detected".to_string(),
            matched_text: "password = \"x\"".to_string(),
            remediation: Some("Use a secret manager".to_string()),
        };
        let report = ResultAggregator::aggregate(
            vec![FileScanOutcome::Scanned {
                path: PathBuf::from("/repo/main.tf"),
                diagnostics: vec![issue],
                digest: String::new(),
            }],
            ReportContext {
                standards: vec!["FEDRAMP".to_string()],
                total_controls: 1,
                ..ReportContext::default()
            },
            Duration::from_millis(3),
        );

        let rendered = render_report(&report, Some(Path::new("/repo")));
        assert!(rendered.contains("NON-COMPLIANT"));
        assert!(rendered.contains("main.tf"));
        assert!(rendered.contains("AC-02"));
        assert!(rendered.contains("Use a secret manager"));
    }
}
