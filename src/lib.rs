//! # Compliance Scanner
//!
//! Matches text files (Terraform, CloudFormation, Kubernetes manifests,
//! scripts, docs) against regex-based checks grouped into compliance
//! controls, and reports every match as a diagnostic.
//!
//! ## Example
//!
//! ```rust,no_run
//! use compliance_scanner::analyzer::{AnalyzerConfig, ComplianceAnalyzer};
//! use compliance_scanner::catalog::builtin_registry;
//! use std::path::PathBuf;
//! use std::sync::Arc;
//!
//! # fn main() -> compliance_scanner::Result<()> {
//! let registry = Arc::new(builtin_registry()?);
//! let analyzer = ComplianceAnalyzer::new(registry, AnalyzerConfig::default())?;
//! let report = analyzer.scan(&["FedRAMP", "GDPR"], &[PathBuf::from("main.tf")]);
//! println!("{} issues", report.issues.len());
//! # Ok(())
//! # }
//! ```

pub mod analyzer;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;

// Re-export commonly used types and functions
pub use analyzer::{ComplianceAnalyzer, Diagnostic, ScanReport};
pub use catalog::{Control, ControlRegistry, Severity};
pub use error::{ComplianceError, Result};

/// The current version of the CLI tool
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
