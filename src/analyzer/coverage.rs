//! Control coverage against a required set.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::catalog::baselines::{canonical_control_id, fedramp_baseline};
use crate::catalog::{BaselineLevel, ControlRegistry};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Coverage {
    pub covered: BTreeSet<String>,
    pub missing: BTreeSet<String>,
    /// Implemented but not required.
    pub extra: BTreeSet<String>,
    pub percentage: f64,
}

impl Coverage {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Compare implemented control ids against required ones. An empty
/// requirement set is fully covered.
pub fn coverage_of(required: &BTreeSet<String>, implemented: &BTreeSet<String>) -> Coverage {
    let covered: BTreeSet<String> = required.intersection(implemented).cloned().collect();
    let missing: BTreeSet<String> = required.difference(implemented).cloned().collect();
    let extra: BTreeSet<String> = implemented.difference(required).cloned().collect();

    let percentage = if required.is_empty() {
        100.0
    } else {
        covered.len() as f64 * 100.0 / required.len() as f64
    };

    Coverage {
        covered,
        missing,
        extra,
        percentage,
    }
}

/// Coverage of `required` by the controls `registry` holds for `standard`.
/// Ids on both sides are canonicalized, so `AC-2` satisfies `AC-02`.
pub fn coverage_for_standard(
    registry: &ControlRegistry,
    standard: &str,
    required: &BTreeSet<String>,
) -> Coverage {
    let implemented: BTreeSet<String> = registry
        .control_ids(standard)
        .iter()
        .map(|id| canonical_control_id(id))
        .collect();
    let required: BTreeSet<String> = required.iter().map(|id| canonical_control_id(id)).collect();
    coverage_of(&required, &implemented)
}

/// Coverage of a built-in FedRAMP baseline.
pub fn fedramp_coverage(registry: &ControlRegistry, level: BaselineLevel) -> Coverage {
    coverage_for_standard(registry, "FedRAMP", &fedramp_baseline(level))
}

/// Parse a baseline file: one control id per line, `#` starts a comment.
pub fn parse_baseline(content: &str) -> BTreeSet<String> {
    content
        .lines()
        .map(|line| line.split('#').next().unwrap_or("").trim())
        .filter(|line| !line.is_empty())
        .map(|line| line.to_string())
        .collect()
}
