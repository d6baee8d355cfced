use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ComplianceError {
    #[error("Control catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Scan failed: {0}")]
    Scan(#[from] ScanError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Invalid regex pattern in check '{check_id}' of control '{control_id}': {message}")]
    InvalidPattern {
        control_id: String,
        check_id: String,
        message: String,
    },

    #[error("Control '{id}' is already registered for standard '{standard}'")]
    DuplicateControlId { standard: String, id: String },

    #[error("Invalid control definition '{id}': {reason}")]
    InvalidDefinition { id: String, reason: String },

    #[error("Failed to parse catalog {source_name}: {reason}")]
    Parse { source_name: String, reason: String },

    #[error("Failed to read catalog {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("No cached report for standards [{standards}]")]
    ReportNotFound { standards: String },

    #[error("File discovery failed under {root}: {reason}")]
    Discovery { root: PathBuf, reason: String },

    #[error("Invalid glob pattern '{pattern}': {reason}")]
    InvalidGlob { pattern: String, reason: String },

    #[error("Failed to build worker pool: {0}")]
    WorkerPool(String),
}

/// Per-file read failures. These never abort a scan; they become skip reasons.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FileReadError {
    #[error("file not found")]
    NotFound,

    #[error("permission denied")]
    PermissionDenied,

    #[error("file is {size} bytes, limit is {limit}")]
    TooLarge { size: u64, limit: u64 },

    #[error("content is not valid UTF-8 text")]
    NotUtf8,

    #[error("binary content")]
    Binary,

    #[error("{0}")]
    Io(String),
}

impl From<std::io::Error> for FileReadError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => FileReadError::NotFound,
            std::io::ErrorKind::PermissionDenied => FileReadError::PermissionDenied,
            std::io::ErrorKind::InvalidData => FileReadError::NotUtf8,
            _ => FileReadError::Io(err.to_string()),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration file: {0}")]
    InvalidFile(String),

    #[error("Configuration parsing failed: {0}")]
    ParsingFailed(String),

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: String, value: String },
}

pub type Result<T> = std::result::Result<T, ComplianceError>;
