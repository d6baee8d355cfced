pub mod types;

use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::analyzer::file_discovery::GlobFilter;
use crate::error::{ConfigError, Result};

pub use types::{CatalogConfig, Config, OutputConfig, OutputFormat, ScanConfig};

/// Name of the project-local configuration file.
pub const PROJECT_CONFIG_FILE: &str = ".comply-ctl.toml";

/// Load configuration from `path`, or from the first default location that
/// exists (`./.comply-ctl.toml`, then `<config dir>/comply-ctl/config.toml`).
/// Falls back to built-in defaults when no file is found.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(path) => Some(path.to_path_buf()),
        None => default_config_paths().into_iter().find(|p| p.is_file()),
    };

    let config = match path {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            let content = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::InvalidFile(format!("{}: {}", path.display(), e)))?;
            parse_config(&content)?
        }
        None => {
            debug!("No configuration file found, using defaults");
            Config::default()
        }
    };

    validate(&config)?;
    Ok(config)
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).map_err(|e| ConfigError::ParsingFailed(e.to_string()))?;
    Ok(config)
}

fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from(PROJECT_CONFIG_FILE)];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("comply-ctl").join("config.toml"));
    }
    paths
}

fn validate(config: &Config) -> Result<()> {
    if config.scan.max_file_size == 0 {
        return Err(ConfigError::InvalidValue {
            field: "scan.max_file_size".to_string(),
            value: "0".to_string(),
        }
        .into());
    }

    GlobFilter::new(&config.scan.include, &config.scan.exclude).map_err(|e| ConfigError::InvalidValue {
        field: "scan.include/scan.exclude".to_string(),
        value: e.to_string(),
    })?;

    Ok(())
}
