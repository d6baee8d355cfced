use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::analyzer::{AnalyzerConfig, DEFAULT_MAX_FILE_SIZE};
use crate::catalog::{BaselineLevel, Severity};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scan: ScanConfig,
    pub catalog: CatalogConfig,
    pub output: OutputConfig,
}

/// What to scan and against which standards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub standards: Vec<String>,
    pub fedramp_level: Option<BaselineLevel>,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub max_file_size: u64,
    /// 0 = one worker per CPU
    pub worker_threads: usize,
}

/// Where controls come from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub include_builtin: bool,
    pub extra_catalogs: Vec<PathBuf>,
    /// Fail on any check whose pattern does not compile instead of dropping it
    pub strict: bool,
}

/// Output configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
    /// Exit with status 2 when issues at or above this severity are found
    pub fail_on: Option<Severity>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Table,
    Json,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            standards: vec!["FedRAMP".to_string()],
            fedramp_level: Some(BaselineLevel::Moderate),
            include: globs(&[
                "**/*.tf", "**/*.yaml", "**/*.yml", "**/*.json", "**/*.md", "**/*.txt", "**/*.sh",
                "**/*.py", "**/*.js", "**/*.ts",
            ]),
            exclude: globs(&["**/node_modules/**", "**/vendor/**", "**/.git/**"]),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            worker_threads: 0,
        }
    }
}

fn globs(patterns: &[&str]) -> Vec<String> {
    patterns.iter().map(|p| p.to_string()).collect()
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            include_builtin: true,
            extra_catalogs: Vec::new(),
            strict: false,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Table,
            fail_on: None,
        }
    }
}

impl ScanConfig {
    pub fn analyzer_config(&self) -> AnalyzerConfig {
        AnalyzerConfig {
            worker_threads: self.worker_threads,
            fedramp_level: self.fedramp_level,
            include: self.include.clone(),
            exclude: self.exclude.clone(),
        }
    }
}
