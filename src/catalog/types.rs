//! # Catalog Types
//!
//! Controls, checks and the severity vocabulary shared by the whole crate.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use regex::{Regex, RegexBuilder};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::CatalogError;

/// Severity of a check and of the diagnostics it produces.
///
/// Ordered `Info < Warning < Error`. Catalog data may also use the four-level
/// cloud vocabulary (`low`/`medium`/`high`/`critical`); it is folded into this
/// enum through [`RiskLevel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Four-level risk vocabulary used by cloud-style reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }

    /// Presentation mapping into the four-level vocabulary.
    pub fn to_risk_level(self) -> RiskLevel {
        match self {
            Severity::Error => RiskLevel::High,
            Severity::Warning => RiskLevel::Medium,
            Severity::Info => RiskLevel::Low,
        }
    }

    pub fn from_risk_level(level: RiskLevel) -> Self {
        match level {
            RiskLevel::Critical | RiskLevel::High => Severity::Error,
            RiskLevel::Medium => Severity::Warning,
            RiskLevel::Low => Severity::Info,
        }
    }

    pub fn all() -> [Severity; 3] {
        [Severity::Error, Severity::Warning, Severity::Info]
    }
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "info" | "information" => Ok(Severity::Info),
            "warning" | "warn" => Ok(Severity::Warning),
            "error" => Ok(Severity::Error),
            "low" => Ok(Severity::from_risk_level(RiskLevel::Low)),
            "medium" => Ok(Severity::from_risk_level(RiskLevel::Medium)),
            "high" => Ok(Severity::from_risk_level(RiskLevel::High)),
            "critical" => Ok(Severity::from_risk_level(RiskLevel::Critical)),
            other => Err(format!("unknown severity '{}'", other)),
        }
    }
}

impl TryFrom<String> for Severity {
    type Error = String;

    fn try_from(value: String) -> Result<Self, String> {
        value.parse()
    }
}

/// FedRAMP baseline a control belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BaselineLevel {
    Low,
    Moderate,
    High,
}

impl BaselineLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            BaselineLevel::Low => "low",
            BaselineLevel::Moderate => "moderate",
            BaselineLevel::High => "high",
        }
    }
}

impl fmt::Display for BaselineLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BaselineLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(BaselineLevel::Low),
            "moderate" => Ok(BaselineLevel::Moderate),
            "high" => Ok(BaselineLevel::High),
            other => Err(format!("unknown baseline level '{}'", other)),
        }
    }
}

/// Unit of text a check is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckScope {
    /// Once per line; the pattern never sees a newline.
    #[default]
    Line,
    /// Once over the whole file; the pattern may span lines.
    File,
}

/// Regex flags as written in catalog data (`i`, `m`, `s`, `x`, plus `g` and `u`
/// which are accepted and have no effect).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PatternFlags {
    pub case_insensitive: bool,
    pub multi_line: bool,
    pub dot_matches_new_line: bool,
    pub ignore_whitespace: bool,
}

impl PatternFlags {
    pub fn parse(flags: &str) -> Result<Self, String> {
        let mut parsed = PatternFlags::default();
        for flag in flags.chars() {
            match flag {
                'i' => parsed.case_insensitive = true,
                'm' => parsed.multi_line = true,
                's' => parsed.dot_matches_new_line = true,
                'x' => parsed.ignore_whitespace = true,
                // every evaluation already collects all matches
                'g' | 'u' => {}
                other => return Err(format!("unsupported regex flag '{}'", other)),
            }
        }
        Ok(parsed)
    }
}

impl fmt::Display for PatternFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.case_insensitive {
            f.write_str("i")?;
        }
        if self.multi_line {
            f.write_str("m")?;
        }
        if self.dot_matches_new_line {
            f.write_str("s")?;
        }
        if self.ignore_whitespace {
            f.write_str("x")?;
        }
        Ok(())
    }
}

/// A check pattern compiled once at catalog-load time.
///
/// `regex::Regex` keeps no per-search cursor, so one compiled pattern can be
/// shared by every worker and every file without state leaking between texts.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    source: String,
    flags: PatternFlags,
    regex: Regex,
}

impl CompiledPattern {
    pub fn new(source: &str, flags: PatternFlags) -> Result<Self, regex::Error> {
        let regex = RegexBuilder::new(source)
            .case_insensitive(flags.case_insensitive)
            .multi_line(flags.multi_line)
            .dot_matches_new_line(flags.dot_matches_new_line)
            .ignore_whitespace(flags.ignore_whitespace)
            .build()?;

        Ok(Self {
            source: source.to_string(),
            flags,
            regex,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn flags(&self) -> PatternFlags {
        self.flags
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }
}

impl PartialEq for CompiledPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source && self.flags == other.flags
    }
}

impl Eq for CompiledPattern {}

impl Serialize for CompiledPattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("CompiledPattern", 2)?;
        state.serialize_field("source", &self.source)?;
        state.serialize_field("flags", &self.flags.to_string())?;
        state.end()
    }
}

/// One detection rule belonging to a [`Control`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Check {
    pub id: String,
    pub pattern: CompiledPattern,
    pub message: String,
    pub severity: Severity,
    pub remediation: Option<String>,
    pub scope: CheckScope,
    /// Normalized extensions with a leading dot (`.tf`). Empty means every file.
    pub file_types: Vec<String>,
}

impl Check {
    pub fn new(
        control_id: &str,
        id: &str,
        pattern: &str,
        flags: &str,
        message: &str,
        severity: Severity,
    ) -> Result<Self, CatalogError> {
        let invalid = |message: String| CatalogError::InvalidPattern {
            control_id: control_id.to_string(),
            check_id: id.to_string(),
            message,
        };

        let flags = PatternFlags::parse(flags).map_err(invalid)?;
        let pattern = CompiledPattern::new(pattern, flags).map_err(|e| invalid(e.to_string()))?;

        Ok(Self {
            id: id.to_string(),
            pattern,
            message: message.to_string(),
            severity,
            remediation: None,
            scope: CheckScope::Line,
            file_types: Vec::new(),
        })
    }

    pub fn with_scope(mut self, scope: CheckScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_remediation(mut self, remediation: impl Into<String>) -> Self {
        self.remediation = Some(remediation.into());
        self
    }

    pub fn with_file_types<I, S>(mut self, file_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.file_types = file_types
            .into_iter()
            .map(|ext| normalize_extension(ext.as_ref()))
            .filter(|ext| ext.len() > 1)
            .collect();
        self
    }

    /// Whether this check is configured for the given file's extension.
    pub fn applies_to(&self, path: &Path) -> bool {
        if self.file_types.is_empty() {
            return true;
        }

        let extension = match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) => normalize_extension(ext),
            None => return false,
        };

        self.file_types.iter().any(|ft| *ft == extension)
    }

    /// Render the message template for one match.
    ///
    /// Placeholders are expanded in a single pass, so braces inside the
    /// matched text are copied as-is.
    pub fn render_message(&self, control_id: &str, matched_text: &str) -> String {
        let mut rendered = String::with_capacity(self.message.len() + matched_text.len());
        let mut rest = self.message.as_str();
        while let Some(start) = rest.find('{') {
            rendered.push_str(&rest[..start]);
            let tail = &rest[start..];
            if let Some(after) = tail.strip_prefix("{match}") {
                rendered.push_str(matched_text);
                rest = after;
            } else if let Some(after) = tail.strip_prefix("{control}") {
                rendered.push_str(control_id);
                rest = after;
            } else {
                rendered.push('{');
                rest = &tail[1..];
            }
        }
        rendered.push_str(rest);
        rendered
    }
}

fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim().to_ascii_lowercase();
    if ext.starts_with('.') {
        ext
    } else {
        format!(".{}", ext)
    }
}

/// A regulatory requirement belonging to one standard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Control {
    pub id: String,
    pub standard: String,
    pub title: String,
    pub description: String,
    pub severity: Severity,
    /// FedRAMP baselines this control is part of. Empty means every baseline.
    pub levels: Vec<BaselineLevel>,
    pub checks: Vec<Check>,
}

impl Control {
    pub fn new(standard: &str, id: &str, title: &str) -> Self {
        Self {
            id: id.to_string(),
            standard: standard.to_string(),
            title: title.to_string(),
            description: String::new(),
            severity: Severity::Warning,
            levels: Vec::new(),
            checks: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_levels(mut self, levels: Vec<BaselineLevel>) -> Self {
        self.levels = levels;
        self
    }

    pub fn with_check(mut self, check: Check) -> Self {
        self.checks.push(check);
        self
    }

    /// Portion of the id before the first `-` (`AC` for `AC-02`).
    pub fn family(&self) -> &str {
        family_of(&self.id)
    }

    pub fn in_baseline(&self, level: BaselineLevel) -> bool {
        self.levels.is_empty() || self.levels.contains(&level)
    }
}

pub fn family_of(control_id: &str) -> &str {
    control_id.split('-').next().unwrap_or(control_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_accepts_both_vocabularies() {
        assert_eq!("error".parse::<Severity>(), Ok(Severity::Error));
        assert_eq!("WARNING".parse::<Severity>(), Ok(Severity::Warning));
        assert_eq!("CRITICAL".parse::<Severity>(), Ok(Severity::Error));
        assert_eq!("high".parse::<Severity>(), Ok(Severity::Error));
        assert_eq!("Medium".parse::<Severity>(), Ok(Severity::Warning));
        assert_eq!("low".parse::<Severity>(), Ok(Severity::Info));
        assert!("severe".parse::<Severity>().is_err());
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Error > Severity::Warning);
        assert!(Severity::Warning > Severity::Info);
    }

    #[test]
    fn test_risk_level_round_trip_is_stable() {
        for severity in Severity::all() {
            assert_eq!(Severity::from_risk_level(severity.to_risk_level()), severity);
        }
    }

    #[test]
    fn test_severity_deserializes_from_yaml() {
        let severity: Severity = serde_yaml::from_str("HIGH").unwrap();
        assert_eq!(severity, Severity::Error);
        assert_eq!(serde_json::to_string(&Severity::Warning).unwrap(), "\"warning\"");
    }

    #[test]
    fn test_pattern_flags() {
        let flags = PatternFlags::parse("gi").unwrap();
        assert!(flags.case_insensitive);
        assert!(!flags.multi_line);
        assert_eq!(flags.to_string(), "i");
        assert!(PatternFlags::parse("q").is_err());
    }

    #[test]
    fn test_invalid_pattern_is_rejected_at_construction() {
        let result = Check::new("AC-02", "AC-02-1", "password(", "", "broken", Severity::Error);
        match result {
            Err(CatalogError::InvalidPattern { control_id, check_id, .. }) => {
                assert_eq!(control_id, "AC-02");
                assert_eq!(check_id, "AC-02-1");
            }
            other => panic!("expected InvalidPattern, got {:?}", other),
        }
    }

    #[test]
    fn test_file_type_filter() {
        let check = Check::new("SC-08", "SC-08-1", "http:", "", "plain http", Severity::Error)
            .unwrap()
            .with_file_types(["tf", ".YAML"]);

        assert!(check.applies_to(Path::new("infra/main.tf")));
        assert!(check.applies_to(Path::new("k8s/deploy.yaml")));
        assert!(!check.applies_to(Path::new("README.md")));
        assert!(!check.applies_to(Path::new("Makefile")));
    }

    #[test]
    fn test_family_and_baseline() {
        let control = Control::new("FedRAMP", "AC-02", "Account Management")
            .with_levels(vec![BaselineLevel::Moderate, BaselineLevel::High]);

        assert_eq!(control.family(), "AC");
        assert!(control.in_baseline(BaselineLevel::High));
        assert!(!control.in_baseline(BaselineLevel::Low));
        assert_eq!(family_of("GDPR-ART-25"), "GDPR");
        assert_eq!(family_of("NOSEPARATOR"), "NOSEPARATOR");
    }

    #[test]
    fn test_message_template() {
        let check = Check::new("AC-02", "AC-02-2", "root", "", "{control}: found '{match}'", Severity::Error)
            .unwrap();
        assert_eq!(check.render_message("AC-02", "root"), "AC-02: found 'root'");
    }

    #[test]
    fn test_message_template_keeps_matched_braces() {
        let check = Check::new("AC-02", "AC-02-3", "tag=.*", "", "matched {match} for {control} {other}", Severity::Info)
            .unwrap();
        assert_eq!(
            check.render_message("AC-02", "tag={control}"),
            "matched tag={control} for AC-02 {other}"
        );
        assert_eq!(check.render_message("AC-02", "{match}"), "matched {match} for AC-02 {other}");
    }

    #[test]
    fn test_severity_try_from_string() {
        assert_eq!(Severity::try_from("warning".to_string()), Ok(Severity::Warning));
        assert!(Severity::try_from("loud".to_string()).is_err());
    }
}
