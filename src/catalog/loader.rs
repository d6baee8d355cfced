//! Catalog document loading.
//!
//! A catalog document is YAML (or JSON) of the form
//!
//! ```yaml
//! controls:
//!   - id: AC-02
//!     standard: FedRAMP
//!     title: Account Management
//!     severity: error
//!     levels: [low, moderate, high]
//!     checks:
//!       - pattern: 'password\s*=\s*["''][^"'']*["'']'
//!         flags: i
//!         message: Hardcoded passwords detected
//! ```

use std::path::Path;

use ahash::AHashSet;
use log::{debug, info, warn};
use serde::Deserialize;

use super::types::{BaselineLevel, Check, CheckScope, Control, Severity};
use super::ControlRegistry;
use crate::error::CatalogError;

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogDocument {
    #[serde(default)]
    pub controls: Vec<ControlDefinition>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ControlDefinition {
    pub id: String,
    pub standard: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub severity: Option<Severity>,
    #[serde(default)]
    pub levels: Vec<BaselineLevel>,
    #[serde(default)]
    pub checks: Vec<CheckDefinition>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckDefinition {
    pub id: Option<String>,
    pub pattern: String,
    #[serde(default)]
    pub flags: String,
    #[serde(default)]
    pub scope: CheckScope,
    #[serde(default)]
    pub file_types: Vec<String>,
    pub severity: Option<Severity>,
    pub message: String,
    pub remediation: Option<String>,
}

/// Result of loading one catalog document.
#[derive(Debug, Default)]
pub struct LoadOutcome {
    pub registry: ControlRegistry,
    /// Checks dropped in lenient mode, one line each.
    pub warnings: Vec<String>,
}

/// Builds registries from catalog documents.
///
/// In lenient mode a check whose pattern does not compile is dropped and
/// recorded as a warning. In strict mode the first such check fails the
/// whole load.
#[derive(Debug, Clone, Copy, Default)]
pub struct CatalogLoader {
    strict: bool,
}

impl CatalogLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn load_file(&self, path: &Path) -> Result<LoadOutcome, CatalogError> {
        let content = std::fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        info!("Loading control catalog from {}", path.display());
        self.load_str(&content, &path.display().to_string())
    }

    /// Parse `content`. `source_name` is used in errors and decides the
    /// format: names ending in `.json` are parsed as JSON, anything else as YAML.
    pub fn load_str(&self, content: &str, source_name: &str) -> Result<LoadOutcome, CatalogError> {
        let document: CatalogDocument = if source_name.to_ascii_lowercase().ends_with(".json") {
            serde_json::from_str(content).map_err(|e| CatalogError::Parse {
                source_name: source_name.to_string(),
                reason: e.to_string(),
            })?
        } else {
            serde_yaml::from_str(content).map_err(|e| CatalogError::Parse {
                source_name: source_name.to_string(),
                reason: e.to_string(),
            })?
        };

        self.build(document)
    }

    pub fn build(&self, document: CatalogDocument) -> Result<LoadOutcome, CatalogError> {
        let mut outcome = LoadOutcome::default();

        for definition in document.controls {
            let control = self.build_control(definition, &mut outcome.warnings)?;
            outcome.registry.register(control)?;
        }

        for warning in &outcome.warnings {
            warn!("{}", warning);
        }
        debug!(
            "Catalog load produced {} controls ({} warnings)",
            outcome.registry.len(),
            outcome.warnings.len()
        );
        Ok(outcome)
    }

    fn build_control(
        &self,
        definition: ControlDefinition,
        warnings: &mut Vec<String>,
    ) -> Result<Control, CatalogError> {
        let id = definition.id.trim().to_string();
        if id.is_empty() {
            return Err(CatalogError::InvalidDefinition {
                id: definition.id,
                reason: "control id is empty".to_string(),
            });
        }
        if definition.standard.trim().is_empty() {
            return Err(CatalogError::InvalidDefinition {
                id,
                reason: "standard is empty".to_string(),
            });
        }

        let severity = definition.severity.unwrap_or(Severity::Warning);
        let mut control = Control::new(definition.standard.trim(), &id, &definition.title)
            .with_description(definition.description)
            .with_severity(severity)
            .with_levels(definition.levels);

        let mut check_ids = AHashSet::new();
        for (index, check_def) in definition.checks.into_iter().enumerate() {
            let check_id = check_def
                .id
                .clone()
                .unwrap_or_else(|| format!("{}-{}", id, index + 1));

            if !check_ids.insert(check_id.clone()) {
                return Err(CatalogError::InvalidDefinition {
                    id,
                    reason: format!("check id '{}' appears more than once", check_id),
                });
            }

            match build_check(&id, &check_id, check_def, severity) {
                Ok(check) => control.checks.push(check),
                Err(err @ CatalogError::InvalidPattern { .. }) if !self.strict => {
                    warnings.push(format!("Dropped check: {}", err));
                }
                Err(err) => return Err(err),
            }
        }

        Ok(control)
    }
}

fn build_check(
    control_id: &str,
    check_id: &str,
    definition: CheckDefinition,
    control_severity: Severity,
) -> Result<Check, CatalogError> {
    let severity = definition.severity.unwrap_or(control_severity);
    let mut check = Check::new(
        control_id,
        check_id,
        &definition.pattern,
        &definition.flags,
        &definition.message,
        severity,
    )?
    .with_scope(definition.scope)
    .with_file_types(&definition.file_types);

    if let Some(remediation) = definition.remediation {
        check = check.with_remediation(remediation);
    }
    Ok(check)
}

/// Lenient load of a catalog held in memory.
pub fn load_catalog_str(content: &str, source_name: &str) -> Result<LoadOutcome, CatalogError> {
    CatalogLoader::new().load_str(content, source_name)
}

/// Lenient load of a catalog file.
pub fn load_catalog_file(path: &Path) -> Result<LoadOutcome, CatalogError> {
    CatalogLoader::new().load_file(path)
}
