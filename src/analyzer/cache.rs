//! # Cache Module
//!
//! Last report per standard set. A new scan for the same set replaces the
//! previous report; entries never expire on their own.

use std::fmt;

use dashmap::DashMap;
use log::debug;

use super::results::ScanReport;
use crate::catalog::normalize_standard;

/// Normalized standard set: trimmed, upper-cased, sorted, deduplicated.
/// `["gdpr", "FedRAMP ", "GDPR"]` and `["FEDRAMP", "GDPR"]` are the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StandardSetKey(Vec<String>);

impl StandardSetKey {
    pub fn new<S: AsRef<str>>(names: &[S]) -> Self {
        let mut normalized: Vec<String> = names
            .iter()
            .map(|n| normalize_standard(n.as_ref()))
            .filter(|n| !n.is_empty())
            .collect();
        normalized.sort();
        normalized.dedup();
        Self(normalized)
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }

    pub fn into_names(self) -> Vec<String> {
        self.0
    }
}

impl fmt::Display for StandardSetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(","))
    }
}

pub struct ReportCache {
    reports: DashMap<StandardSetKey, ScanReport, ahash::RandomState>,
}

impl Default for ReportCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportCache {
    pub fn new() -> Self {
        Self {
            reports: DashMap::with_hasher(ahash::RandomState::new()),
        }
    }

    pub fn get(&self, key: &StandardSetKey) -> Option<ScanReport> {
        self.reports.get(key).map(|entry| entry.value().clone())
    }

    pub fn insert(&self, key: StandardSetKey, report: ScanReport) {
        debug!("Caching report for [{}] ({} issues)", key, report.issues.len());
        self.reports.insert(key, report);
    }

    pub fn remove(&self, key: &StandardSetKey) -> bool {
        self.reports.remove(key).is_some()
    }

    pub fn contains(&self, key: &StandardSetKey) -> bool {
        self.reports.contains_key(key)
    }

    pub fn clear(&self) {
        self.reports.clear();
        debug!("Report cache cleared");
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }
}
