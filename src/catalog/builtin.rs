use log::debug;

use super::loader::CatalogLoader;
use super::ControlRegistry;
use crate::error::CatalogError;

/// The catalog shipped inside the binary.
pub const BUILTIN_CATALOG: &str = include_str!("builtin.yaml");

/// Registry holding every built-in control. Loaded strictly: a broken
/// built-in pattern is a bug, not something to warn about.
pub fn builtin_registry() -> Result<ControlRegistry, CatalogError> {
    let outcome = CatalogLoader::new()
        .strict(true)
        .load_str(BUILTIN_CATALOG, "builtin.yaml")?;
    debug!("Built-in catalog: {} controls", outcome.registry.len());
    Ok(outcome.registry)
}
