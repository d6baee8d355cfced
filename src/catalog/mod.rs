//! # Control Catalog
//!
//! In-memory registry of compliance controls grouped by standard, plus the
//! loaders that populate it from catalog documents.

pub mod baselines;
pub mod builtin;
pub mod loader;
pub mod types;

pub use builtin::builtin_registry;
pub use loader::{load_catalog_file, load_catalog_str, CatalogLoader, LoadOutcome};
pub use types::{
    family_of, BaselineLevel, Check, CheckScope, CompiledPattern, Control, PatternFlags,
    RiskLevel, Severity,
};

use std::path::PathBuf;
use std::sync::Arc;

use ahash::AHashSet;
use log::{debug, info};

use crate::error::CatalogError;

/// Standard names compare case-insensitively everywhere in the crate.
pub fn normalize_standard(name: &str) -> String {
    name.trim().to_ascii_uppercase()
}

/// Registry of controls, populated once at startup and shared read-only.
#[derive(Debug, Default, Clone)]
pub struct ControlRegistry {
    controls: Vec<Arc<Control>>,
    keys: AHashSet<(String, String)>,
}

impl ControlRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a control. Fails if the same (standard, id) pair is already present.
    pub fn register(&mut self, control: Control) -> Result<(), CatalogError> {
        let key = (normalize_standard(&control.standard), control.id.clone());
        if self.keys.contains(&key) {
            return Err(CatalogError::DuplicateControlId {
                standard: control.standard,
                id: control.id,
            });
        }

        debug!(
            "Registered control {} ({}) with {} checks",
            control.id,
            control.standard,
            control.checks.len()
        );
        self.keys.insert(key);
        self.controls.push(Arc::new(control));
        Ok(())
    }

    /// Controls whose standard is one of `names`, in registration order.
    /// Unknown names contribute nothing.
    pub fn get_controls_for_standards<S: AsRef<str>>(&self, names: &[S]) -> Vec<Arc<Control>> {
        let wanted: AHashSet<String> = names.iter().map(|n| normalize_standard(n.as_ref())).collect();
        self.controls
            .iter()
            .filter(|c| wanted.contains(&normalize_standard(&c.standard)))
            .cloned()
            .collect()
    }

    pub fn get_controls_by_family(&self, standard: &str, family_prefix: &str) -> Vec<Arc<Control>> {
        let standard = normalize_standard(standard);
        self.controls
            .iter()
            .filter(|c| normalize_standard(&c.standard) == standard && c.family() == family_prefix)
            .cloned()
            .collect()
    }

    /// Controls of `standard` that belong to the given baseline.
    pub fn get_controls_by_level(&self, standard: &str, level: BaselineLevel) -> Vec<Arc<Control>> {
        let standard = normalize_standard(standard);
        self.controls
            .iter()
            .filter(|c| normalize_standard(&c.standard) == standard && c.in_baseline(level))
            .cloned()
            .collect()
    }

    pub fn get(&self, standard: &str, id: &str) -> Option<Arc<Control>> {
        let standard = normalize_standard(standard);
        self.controls
            .iter()
            .find(|c| c.id == id && normalize_standard(&c.standard) == standard)
            .cloned()
    }

    /// Distinct standard names, in the casing first registered.
    pub fn standards(&self) -> Vec<String> {
        let mut seen = AHashSet::new();
        self.controls
            .iter()
            .filter(|c| seen.insert(normalize_standard(&c.standard)))
            .map(|c| c.standard.clone())
            .collect()
    }

    pub fn has_standard(&self, name: &str) -> bool {
        let name = normalize_standard(name);
        self.controls.iter().any(|c| normalize_standard(&c.standard) == name)
    }

    pub fn control_ids(&self, standard: &str) -> Vec<String> {
        self.get_controls_for_standards(&[standard])
            .iter()
            .map(|c| c.id.clone())
            .collect()
    }

    pub fn controls(&self) -> &[Arc<Control>] {
        &self.controls
    }

    pub fn len(&self) -> usize {
        self.controls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }

    /// Register every control of `other`, stopping at the first duplicate.
    pub fn merge(&mut self, other: ControlRegistry) -> Result<(), CatalogError> {
        for control in other.controls {
            let control = Arc::try_unwrap(control).unwrap_or_else(|shared| (*shared).clone());
            self.register(control)?;
        }
        Ok(())
    }
}

/// Assemble the working registry: the built-in catalog (optionally) followed
/// by each extra catalog file, in order.
pub fn build_registry(
    include_builtin: bool,
    extra_catalogs: &[PathBuf],
    strict: bool,
) -> Result<LoadOutcome, CatalogError> {
    let mut outcome = LoadOutcome::default();
    if include_builtin {
        outcome.registry = builtin_registry()?;
    }

    let loader = CatalogLoader::new().strict(strict);
    for path in extra_catalogs {
        let loaded = loader.load_file(path)?;
        outcome.registry.merge(loaded.registry)?;
        outcome.warnings.extend(loaded.warnings);
    }

    info!(
        "Control registry ready: {} controls across {} standards",
        outcome.registry.len(),
        outcome.registry.standards().len()
    );
    Ok(outcome)
}
