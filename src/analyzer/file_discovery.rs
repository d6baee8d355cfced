//! # File Discovery Module
//!
//! Enumerates candidate files with include/exclude globs and reads their
//! content. Everything filesystem-facing goes through [`FileSource`] so the
//! scanner can run against in-memory fixtures as well as the real disk.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Component, Path, PathBuf};

use glob::{MatchOptions, Pattern};
use log::{debug, trace};
use memmap2::MmapOptions;
use parking_lot::RwLock;
use walkdir::WalkDir;

use crate::error::{FileReadError, ScanError};

/// Files above this size are memory-mapped instead of read through a buffer.
const MMAP_THRESHOLD: u64 = 4096;

/// Default upper bound on the size of a scanned file.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Source of file listings and file content.
pub trait FileSource: Send + Sync {
    fn read_file(&self, path: &Path) -> Result<String, FileReadError>;

    /// Files under `root` accepted by the include/exclude globs, sorted.
    fn list_files(
        &self,
        root: &Path,
        include: &[String],
        exclude: &[String],
    ) -> Result<Vec<PathBuf>, ScanError>;

    /// Content digest used to detect files that changed since a scan.
    fn digest(&self, path: &Path) -> Result<String, FileReadError> {
        let content = self.read_file(path)?;
        Ok(content_digest(&content))
    }
}

pub fn content_digest(content: &str) -> String {
    blake3::hash(content.as_bytes()).to_hex().to_string()
}

/// Compiled include/exclude glob sets.
///
/// Patterns are matched against root-relative paths joined with `/`. A `*`
/// never crosses a directory separator, `**` does. Exclusion wins over
/// inclusion, and an empty include list accepts everything.
#[derive(Debug, Clone)]
pub struct GlobFilter {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
}

impl GlobFilter {
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self, ScanError> {
        Ok(Self {
            include: compile_globs(include)?,
            exclude: compile_globs(exclude)?,
        })
    }

    pub fn matches(&self, relative_path: &str) -> bool {
        let options = match_options();
        if self
            .exclude
            .iter()
            .any(|p| p.matches_with(relative_path, options))
        {
            return false;
        }

        self.include.is_empty()
            || self
                .include
                .iter()
                .any(|p| p.matches_with(relative_path, options))
    }
}

fn match_options() -> MatchOptions {
    MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    }
}

fn compile_globs(patterns: &[String]) -> Result<Vec<Pattern>, ScanError> {
    patterns
        .iter()
        .map(|p| {
            Pattern::new(p).map_err(|e| ScanError::InvalidGlob {
                pattern: p.clone(),
                reason: e.to_string(),
            })
        })
        .collect()
}

/// `path` relative to `root`, components joined with `/`.
pub fn relative_slash_path(path: &Path, root: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            Component::ParentDir => Some("..".into()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Walk every root and return the accepted files, sorted and deduplicated.
pub fn discover_files(
    roots: &[PathBuf],
    include: &[String],
    exclude: &[String],
) -> Result<Vec<PathBuf>, ScanError> {
    discover_with(&FsFileSource::default(), roots, include, exclude)
}

pub fn discover_with(
    source: &dyn FileSource,
    roots: &[PathBuf],
    include: &[String],
    exclude: &[String],
) -> Result<Vec<PathBuf>, ScanError> {
    let mut files = Vec::new();
    for root in roots {
        files.extend(source.list_files(root, include, exclude)?);
    }
    files.sort();
    files.dedup();
    debug!("Discovered {} files under {} roots", files.len(), roots.len());
    Ok(files)
}

/// Apply the include/exclude rules to an explicit path list.
///
/// Paths under `root` are matched by their relative form; others by their
/// full path.
pub fn filter_paths(
    paths: &[PathBuf],
    root: Option<&Path>,
    include: &[String],
    exclude: &[String],
) -> Result<Vec<PathBuf>, ScanError> {
    let filter = GlobFilter::new(include, exclude)?;
    let mut accepted: Vec<PathBuf> = paths
        .iter()
        .filter(|path| {
            let relative = match root {
                Some(root) => relative_slash_path(path, root),
                None => relative_slash_path(path, Path::new("")),
            };
            filter.matches(&relative)
        })
        .cloned()
        .collect();
    accepted.sort();
    accepted.dedup();
    Ok(accepted)
}

/// Real filesystem access.
#[derive(Debug, Clone)]
pub struct FsFileSource {
    max_file_size: u64,
    use_mmap: bool,
}

impl Default for FsFileSource {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            use_mmap: true,
        }
    }
}

impl FsFileSource {
    pub fn new(max_file_size: u64) -> Self {
        Self {
            max_file_size,
            ..Self::default()
        }
    }

    pub fn with_mmap(mut self, use_mmap: bool) -> Self {
        self.use_mmap = use_mmap;
        self
    }

    fn read_bytes_mmap(&self, path: &Path) -> Result<String, FileReadError> {
        let file = File::open(path)?;
        // SAFETY: the map is read-only and dropped before returning; a file
        // truncated concurrently can fault, which scanners accept.
        let mmap = unsafe { MmapOptions::new().map(&file)? };
        decode(&mmap)
    }

    fn read_bytes_buffered(&self, path: &Path) -> Result<String, FileReadError> {
        let file = File::open(path)?;
        let mut reader = BufReader::with_capacity(8192, file);
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        decode(&bytes)
    }
}

fn decode(bytes: &[u8]) -> Result<String, FileReadError> {
    if bytes.contains(&0) {
        return Err(FileReadError::Binary);
    }
    simdutf8::basic::from_utf8(bytes)
        .map(|s| s.to_string())
        .map_err(|_| FileReadError::NotUtf8)
}

impl FileSource for FsFileSource {
    fn read_file(&self, path: &Path) -> Result<String, FileReadError> {
        let metadata = fs::metadata(path)?;
        let size = metadata.len();
        if size > self.max_file_size {
            return Err(FileReadError::TooLarge {
                size,
                limit: self.max_file_size,
            });
        }

        if self.use_mmap && size > MMAP_THRESHOLD {
            self.read_bytes_mmap(path)
        } else {
            self.read_bytes_buffered(path)
        }
    }

    fn list_files(
        &self,
        root: &Path,
        include: &[String],
        exclude: &[String],
    ) -> Result<Vec<PathBuf>, ScanError> {
        if !root.exists() {
            return Err(ScanError::Discovery {
                root: root.to_path_buf(),
                reason: "path does not exist".to_string(),
            });
        }

        let filter = GlobFilter::new(include, exclude)?;

        if root.is_file() {
            let name = root
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            return Ok(if filter.matches(&name) {
                vec![root.to_path_buf()]
            } else {
                Vec::new()
            });
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(root).follow_links(false) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    debug!("Skipping unreadable entry under {}: {}", root.display(), err);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = relative_slash_path(entry.path(), root);
            if filter.matches(&relative) {
                trace!("Accepted {}", relative);
                files.push(entry.into_path());
            }
        }

        files.sort();
        Ok(files)
    }
}

/// In-memory file tree, mainly for tests and editor buffers.
#[derive(Debug, Default)]
pub struct MemoryFileSource {
    files: RwLock<BTreeMap<PathBuf, Result<String, FileReadError>>>,
}

impl MemoryFileSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        self.insert(path, content);
        self
    }

    /// Add or replace a file.
    pub fn insert(&self, path: impl Into<PathBuf>, content: impl Into<String>) {
        self.files.write().insert(path.into(), Ok(content.into()));
    }

    /// Register a path that exists but fails to read.
    pub fn insert_unreadable(&self, path: impl Into<PathBuf>, error: FileReadError) {
        self.files.write().insert(path.into(), Err(error));
    }

    pub fn remove(&self, path: &Path) {
        self.files.write().remove(path);
    }
}

impl FileSource for MemoryFileSource {
    fn read_file(&self, path: &Path) -> Result<String, FileReadError> {
        match self.files.read().get(path) {
            Some(result) => result.clone(),
            None => Err(FileReadError::NotFound),
        }
    }

    fn list_files(
        &self,
        root: &Path,
        include: &[String],
        exclude: &[String],
    ) -> Result<Vec<PathBuf>, ScanError> {
        let filter = GlobFilter::new(include, exclude)?;
        // BTreeMap keys are already sorted
        Ok(self
            .files
            .read()
            .keys()
            .filter(|path| path.starts_with(root))
            .filter(|path| filter.matches(&relative_slash_path(path, root)))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn globs(patterns: &[&str]) -> Vec<String> {
        patterns.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn test_glob_filter_semantics() {
        let filter = GlobFilter::new(
            &globs(&["**/*.tf", "*.json"]),
            &globs(&["**/node_modules/**"]),
        )
        .unwrap();

        assert!(filter.matches("main.tf"));
        assert!(filter.matches("modules/vpc/main.tf"));
        assert!(filter.matches("package.json"));
        // `*` does not cross directories
        assert!(!filter.matches("config/settings.json"));
        // exclude beats include
        assert!(!filter.matches("node_modules/pkg/main.tf"));
        assert!(!filter.matches("README.md"));
    }

    #[test]
    fn test_empty_include_accepts_all() {
        let filter = GlobFilter::new(&[], &globs(&["**/.git/**"])).unwrap();
        assert!(filter.matches("anything/at/all.txt"));
        assert!(!filter.matches(".git/config"));
    }

    #[test]
    fn test_invalid_glob() {
        let err = GlobFilter::new(&globs(&["[unclosed"]), &[]).unwrap_err();
        assert!(matches!(err, ScanError::InvalidGlob { .. }));
    }

    #[test]
    fn test_discover_files_on_disk() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("infra/modules")).unwrap();
        fs::create_dir_all(root.join("node_modules/dep")).unwrap();
        fs::write(root.join("infra/main.tf"), "resource {}").unwrap();
        fs::write(root.join("infra/modules/db.tf"), "resource {}").unwrap();
        fs::write(root.join("node_modules/dep/bad.tf"), "resource {}").unwrap();
        fs::write(root.join("notes.md"), "# notes").unwrap();

        let files = discover_files(
            &[root.to_path_buf(), root.join("infra")],
            &globs(&["**/*.tf"]),
            &globs(&["**/node_modules/**"]),
        )
        .unwrap();

        assert_eq!(
            files,
            vec![root.join("infra/main.tf"), root.join("infra/modules/db.tf")]
        );
    }

    #[test]
    fn test_discover_missing_root() {
        let err = discover_files(&[PathBuf::from("/definitely/not/here")], &[], &[]).unwrap_err();
        assert!(matches!(err, ScanError::Discovery { .. }));
    }

    #[test]
    fn test_filter_paths() {
        let root = PathBuf::from("/work");
        let paths = vec![
            root.join("b.tf"),
            root.join("a.tf"),
            root.join("vendor/x.tf"),
            root.join("a.tf"),
        ];
        let accepted =
            filter_paths(&paths, Some(&root), &globs(&["**/*.tf"]), &globs(&["**/vendor/**"])).unwrap();
        assert_eq!(accepted, vec![root.join("a.tf"), root.join("b.tf")]);
    }

    #[test]
    fn test_fs_reads_and_skip_reasons() {
        let temp_dir = TempDir::new().unwrap();
        let source = FsFileSource::new(64);

        let text = temp_dir.path().join("ok.tf");
        fs::write(&text, "user = \"root\"").unwrap();
        assert_eq!(source.read_file(&text).unwrap(), "user = \"root\"");

        let big = temp_dir.path().join("big.tf");
        fs::write(&big, "x".repeat(100)).unwrap();
        assert_eq!(
            source.read_file(&big),
            Err(FileReadError::TooLarge { size: 100, limit: 64 })
        );

        let binary = temp_dir.path().join("blob.bin");
        fs::write(&binary, [0u8, 159, 146, 150]).unwrap();
        assert_eq!(source.read_file(&binary), Err(FileReadError::Binary));

        let latin1 = temp_dir.path().join("latin1.txt");
        fs::write(&latin1, [b'c', b'a', b'f', 0xE9]).unwrap();
        assert_eq!(source.read_file(&latin1), Err(FileReadError::NotUtf8));

        assert_eq!(
            source.read_file(&temp_dir.path().join("missing.tf")),
            Err(FileReadError::NotFound)
        );
    }

    #[test]
    fn test_mmap_path_for_large_files() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("large.yaml");
        let content = "key: value\n".repeat(1000);
        fs::write(&path, &content).unwrap();

        let source = FsFileSource::default();
        assert_eq!(source.read_file(&path).unwrap(), content);
        assert_eq!(source.digest(&path).unwrap(), content_digest(&content));
    }

    #[test]
    fn test_memory_source() {
        let source = MemoryFileSource::new()
            .with_file("/repo/main.tf", "a")
            .with_file("/repo/docs/readme.md", "b")
            .with_file("/other/x.tf", "c");
        source.insert_unreadable("/repo/locked.tf", FileReadError::PermissionDenied);

        let files = source
            .list_files(Path::new("/repo"), &globs(&["**/*.tf"]), &[])
            .unwrap();
        assert_eq!(
            files,
            vec![PathBuf::from("/repo/locked.tf"), PathBuf::from("/repo/main.tf")]
        );
        assert_eq!(
            source.read_file(Path::new("/repo/locked.tf")),
            Err(FileReadError::PermissionDenied)
        );
        assert_eq!(source.read_file(Path::new("/nope")), Err(FileReadError::NotFound));
    }
}
