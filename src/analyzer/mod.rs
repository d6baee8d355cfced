//! # Compliance Analyzer
//!
//! Scans a file set against the controls of one or more standards, merges
//! the per-file results into a report, and keeps the last report for each
//! standard set.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use log::{debug, info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

pub mod cache;
pub mod coverage;
pub mod display;
pub mod file_discovery;
pub mod pattern_engine;
pub mod results;
pub mod scanner;

pub use cache::{ReportCache, StandardSetKey};
pub use coverage::{coverage_for_standard, coverage_of, fedramp_coverage, Coverage};
pub use file_discovery::{
    discover_files, filter_paths, FileSource, FsFileSource, MemoryFileSource,
    DEFAULT_MAX_FILE_SIZE,
};
pub use pattern_engine::{evaluate, PatternMatch};
pub use results::{Diagnostic, ReportContext, ResultAggregator, ScanReport, ScanSummary, SkippedFile};
pub use scanner::{scan_file, FileScanOutcome, FileScanner};

use crate::catalog::{normalize_standard, BaselineLevel, Control, ControlRegistry};
use crate::error::{Result, ScanError};

/// Analyzer configuration
#[derive(Debug, Clone, Default)]
pub struct AnalyzerConfig {
    /// Number of worker threads (0 = one per CPU)
    pub worker_threads: usize,

    /// Restrict FedRAMP controls to this baseline
    pub fedramp_level: Option<BaselineLevel>,

    /// Globs used by [`ComplianceAnalyzer::scan_workspace`]
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

/// Whether a report is cached for a standard set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanState {
    Unscanned,
    Scanned,
}

/// Cooperative cancellation flag, checked before each file is scanned.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

pub struct ComplianceAnalyzer {
    registry: Arc<ControlRegistry>,
    source: Arc<dyn FileSource>,
    config: AnalyzerConfig,
    cache: ReportCache,
    pool: rayon::ThreadPool,
}

impl ComplianceAnalyzer {
    /// Analyzer reading from the real filesystem.
    pub fn new(registry: Arc<ControlRegistry>, config: AnalyzerConfig) -> Result<Self> {
        Self::with_source(registry, Arc::new(FsFileSource::default()), config)
    }

    pub fn with_source(
        registry: Arc<ControlRegistry>,
        source: Arc<dyn FileSource>,
        config: AnalyzerConfig,
    ) -> Result<Self> {
        let thread_count = if config.worker_threads == 0 {
            num_cpus::get()
        } else {
            config.worker_threads
        };

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(thread_count)
            .thread_name(|i| format!("comply-scan-{}", i))
            .build()
            .map_err(|e| ScanError::WorkerPool(e.to_string()))?;

        debug!(
            "Compliance analyzer ready: {} controls, {} worker threads",
            registry.len(),
            thread_count
        );

        Ok(Self {
            registry,
            source,
            config,
            cache: ReportCache::new(),
            pool,
        })
    }

    pub fn registry(&self) -> &ControlRegistry {
        &self.registry
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Controls active for `standard_names`, plus the requested names the
    /// registry does not know.
    pub fn resolve_controls<S: AsRef<str>>(&self, standard_names: &[S]) -> (Vec<Arc<Control>>, Vec<String>) {
        let key = StandardSetKey::new(standard_names);
        let unknown: Vec<String> = key
            .names()
            .iter()
            .filter(|name| !self.registry.has_standard(name))
            .cloned()
            .collect();

        let fedramp = normalize_standard("FedRAMP");
        let controls = self
            .registry
            .get_controls_for_standards(key.names())
            .into_iter()
            .filter(|control| match self.config.fedramp_level {
                Some(level) if normalize_standard(&control.standard) == fedramp => control.in_baseline(level),
                _ => true,
            })
            .collect();

        (controls, unknown)
    }

    /// Scan `files` against every control of the named standards and cache
    /// the report under the normalized standard set.
    pub fn scan<S: AsRef<str>>(&self, standard_names: &[S], files: &[PathBuf]) -> ScanReport {
        self.scan_with_cancel(standard_names, files, &CancellationToken::new())
    }

    /// Like [`scan`](Self::scan), stopping before any file not yet started
    /// once `token` is cancelled. A cancelled report only holds the files
    /// that finished and is flagged `cancelled`.
    pub fn scan_with_cancel<S: AsRef<str>>(
        &self,
        standard_names: &[S],
        files: &[PathBuf],
        token: &CancellationToken,
    ) -> ScanReport {
        let start = Instant::now();
        let key = StandardSetKey::new(standard_names);
        let (controls, unknown_standards) = self.resolve_controls(key.names());

        for name in &unknown_standards {
            warn!("Unknown compliance standard '{}' ignored", name);
        }

        let mut files = files.to_vec();
        files.sort();
        files.dedup();

        info!(
            "Scanning {} files against {} controls for [{}]",
            files.len(),
            controls.len(),
            key
        );

        let total_controls = controls.len();
        let scanner = FileScanner::new(Arc::clone(&self.source), controls);

        let slots: Vec<Option<FileScanOutcome>> = self.pool.install(|| {
            files
                .par_iter()
                .map(|path| {
                    if token.is_cancelled() {
                        None
                    } else {
                        Some(scanner.scan(path))
                    }
                })
                .collect()
        });

        let cancelled = slots.iter().any(Option::is_none);
        let outcomes: Vec<FileScanOutcome> = slots.into_iter().flatten().collect();
        if cancelled {
            warn!(
                "Scan for [{}] cancelled after {} of {} files",
                key,
                outcomes.len(),
                files.len()
            );
        }

        let context = ReportContext {
            standards: key.names().to_vec(),
            unknown_standards,
            total_controls,
            cancelled,
        };
        let report = ResultAggregator::aggregate(outcomes, context, start.elapsed());

        info!(
            "Scan complete: {} files scanned, {} skipped, {} issues in {:?}",
            report.files_scanned(),
            report.skipped_files.len(),
            report.issues.len(),
            report.duration
        );

        self.cache.insert(key, report.clone());
        report
    }

    /// Discover files under `roots` with the configured globs, then scan them.
    pub fn scan_workspace<S: AsRef<str>>(&self, standard_names: &[S], roots: &[PathBuf]) -> Result<ScanReport> {
        let files = file_discovery::discover_with(
            self.source.as_ref(),
            roots,
            &self.config.include,
            &self.config.exclude,
        )?;
        Ok(self.scan(standard_names, &files))
    }

    pub fn get_last_report<S: AsRef<str>>(&self, standard_names: &[S]) -> std::result::Result<ScanReport, ScanError> {
        let key = StandardSetKey::new(standard_names);
        self.cache
            .get(&key)
            .ok_or_else(|| ScanError::ReportNotFound {
                standards: key.to_string(),
            })
    }

    pub fn state<S: AsRef<str>>(&self, standard_names: &[S]) -> ScanState {
        if self.cache.contains(&StandardSetKey::new(standard_names)) {
            ScanState::Scanned
        } else {
            ScanState::Unscanned
        }
    }

    /// Drop the cached report for one standard set.
    pub fn clear<S: AsRef<str>>(&self, standard_names: &[S]) {
        let key = StandardSetKey::new(standard_names);
        if self.cache.remove(&key) {
            debug!("Cleared report for [{}]", key);
        }
    }

    pub fn clear_all(&self) {
        self.cache.clear();
    }

    /// Whether every file in the cached report still has the content it was
    /// scanned with, and every skipped file is still unreadable. A cancelled
    /// report is never current.
    pub fn is_report_current<S: AsRef<str>>(&self, standard_names: &[S]) -> Result<bool> {
        let report = self.get_last_report(standard_names)?;
        if report.cancelled {
            debug!("Cached report for [{}] is partial", StandardSetKey::new(standard_names));
            return Ok(false);
        }

        for (path, digest) in &report.file_digests {
            match self.source.digest(path) {
                Ok(current) if current == *digest => {}
                Ok(_) => {
                    debug!("{} changed since last scan", path.display());
                    return Ok(false);
                }
                Err(err) => {
                    debug!("{} no longer readable: {}", path.display(), err);
                    return Ok(false);
                }
            }
        }

        for skipped in &report.skipped_files {
            if self.source.read_file(&skipped.path).is_ok() {
                debug!("{} became readable since last scan", skipped.path.display());
                return Ok(false);
            }
        }

        Ok(true)
    }
}
