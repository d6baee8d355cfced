use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::catalog::{BaselineLevel, Severity};
use crate::config;

#[derive(Parser)]
#[command(name = "comply-ctl")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Scan infrastructure-as-code for compliance violations")]
#[command(long_about = "Scans Terraform, CloudFormation, Kubernetes manifests and other text files against regex-based checks for FedRAMP, GDPR, HIPAA, PCI-DSS, ISO-27001, ISO-27002, SOC-2, NIST-CSF and DPDP controls.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Additional control catalog (YAML or JSON); may be repeated
    #[arg(long = "catalog", global = true, value_name = "FILE")]
    pub catalogs: Vec<PathBuf>,

    /// Do not load the built-in control catalog
    #[arg(long, global = true)]
    pub no_builtin: bool,

    /// Fail when a catalog check has an invalid pattern instead of skipping it
    #[arg(long, global = true)]
    pub strict: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan files for compliance violations
    Scan {
        /// Files or directories to scan
        #[arg(value_name = "PATH", default_value = ".")]
        paths: Vec<PathBuf>,

        /// Standards to check against (repeatable or comma separated)
        #[arg(short, long = "standard", value_delimiter = ',')]
        standards: Vec<String>,

        /// FedRAMP baseline to apply
        #[arg(long, value_enum)]
        level: Option<LevelArg>,

        /// Include glob, relative to each scanned directory (replaces configured includes)
        #[arg(long, value_name = "GLOB")]
        include: Vec<String>,

        /// Exclude glob (added to configured excludes)
        #[arg(long, value_name = "GLOB")]
        exclude: Vec<String>,

        /// Skip files larger than this many bytes
        #[arg(long, value_name = "BYTES")]
        max_file_size: Option<u64>,

        /// Worker threads (0 = one per CPU)
        #[arg(long)]
        threads: Option<usize>,

        /// Output format
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,

        /// Write the report to a file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Exit with status 2 if issues at or above this severity are found
        #[arg(long, value_enum)]
        fail_on: Option<SeverityThreshold>,
    },

    /// List controls in the catalog
    Controls {
        /// Only controls of these standards
        #[arg(short, long = "standard", value_delimiter = ',')]
        standards: Vec<String>,

        /// Only controls of this family (e.g. AC)
        #[arg(long)]
        family: Option<String>,

        /// Only FedRAMP controls in this baseline
        #[arg(long, value_enum)]
        level: Option<LevelArg>,

        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// List the standards known to the catalog
    Standards {
        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Compare catalog controls against a required baseline
    Coverage {
        /// Standard whose controls are compared
        #[arg(short, long, default_value = "FedRAMP")]
        standard: String,

        /// Built-in FedRAMP baseline to compare against
        #[arg(long, value_enum, default_value = "moderate", conflicts_with = "baseline")]
        level: LevelArg,

        /// Baseline file: one control id per line, `#` starts a comment
        #[arg(long, value_name = "FILE")]
        baseline: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SeverityThreshold {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LevelArg {
    Low,
    Moderate,
    High,
}

impl From<OutputFormat> for config::OutputFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Table => config::OutputFormat::Table,
            OutputFormat::Json => config::OutputFormat::Json,
        }
    }
}

impl From<SeverityThreshold> for Severity {
    fn from(threshold: SeverityThreshold) -> Self {
        match threshold {
            SeverityThreshold::Info => Severity::Info,
            SeverityThreshold::Warning => Severity::Warning,
            SeverityThreshold::Error => Severity::Error,
        }
    }
}

impl From<LevelArg> for BaselineLevel {
    fn from(level: LevelArg) -> Self {
        match level {
            LevelArg::Low => BaselineLevel::Low,
            LevelArg::Moderate => BaselineLevel::Moderate,
            LevelArg::High => BaselineLevel::High,
        }
    }
}

impl Cli {
    /// Initialize logging based on verbosity level
    pub fn init_logging(&self) {
        if self.quiet {
            return;
        }

        let level = match self.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        };

        env_logger::Builder::from_default_env()
            .filter_level(level)
            .init();
    }
}
