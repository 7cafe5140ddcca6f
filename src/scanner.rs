//! Scanner module - walks watched directories and feeds the catalog

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use walkdir::{DirEntry, WalkDir};

use crate::config::LibraryConfig;
use crate::db::CatalogStore;
use crate::error::{LibraryError, Result};
use crate::models::{NewEntry, ScanSummary};
use crate::probe::MetadataProber;
use crate::progress::ProgressReporter;

/// Counters shared by the directory workers of one pass
#[derive(Debug, Default)]
struct ScanCounters {
    added: AtomicU64,
    skipped: AtomicU64,
    failed: AtomicU64,
}

enum FileOutcome {
    Catalogued,
    Unchanged,
}

/// Scan orchestrator for one catalog
pub struct Scanner<'a> {
    config: &'a LibraryConfig,
    store: &'a dyn CatalogStore,
    prober: &'a dyn MetadataProber,
    reporter: Option<&'a ProgressReporter>,
}

impl<'a> Scanner<'a> {
    pub fn new(
        config: &'a LibraryConfig,
        store: &'a dyn CatalogStore,
        prober: &'a dyn MetadataProber,
    ) -> Self {
        Self {
            config,
            store,
            prober,
            reporter: None,
        }
    }

    /// Send progress messages for this scanner's passes
    pub fn with_reporter(mut self, reporter: &'a ProgressReporter) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Scan the configured roots incrementally and advance the scan cursor.
    ///
    /// The cursor moves to the time the pass started, and only once the pass
    /// has run to completion.
    pub fn run_pass(&self) -> Result<ScanSummary> {
        let since = self.store.scan_cursor()?;
        let pass_start = Utc::now();

        let summary = self.scan(&self.config.roots, since)?;

        self.store.set_scan_cursor(pass_start)?;
        log::info!(
            "Scan pass finished: {} catalogued, {} unchanged, {} failed",
            summary.added,
            summary.skipped,
            summary.failed
        );
        Ok(summary)
    }

    /// Scan `directories`, skipping files not modified after `since`.
    ///
    /// Per-file failures are logged and counted; they never abort the pass.
    pub fn scan(&self, directories: &[PathBuf], since: Option<DateTime<Utc>>) -> Result<ScanSummary> {
        let start = Instant::now();
        let roots = unique_existing_dirs(directories, self.config.max_depth.is_none());

        if let Some(reporter) = self.reporter {
            reporter.report_start(&roots, since.as_ref());
        }

        let counters = ScanCounters::default();
        if !roots.is_empty() {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.config.effective_threads().min(roots.len()))
                .build()?;
            pool.install(|| {
                roots
                    .par_iter()
                    .for_each(|root| self.scan_directory(root, since, &counters));
            });
        }

        let summary = ScanSummary {
            added: counters.added.load(Ordering::Relaxed),
            skipped: counters.skipped.load(Ordering::Relaxed),
            failed: counters.failed.load(Ordering::Relaxed),
            directories: roots.len() as u64,
            duration_ms: start.elapsed().as_millis() as u64,
        };

        if let Some(reporter) = self.reporter {
            reporter.report_done(&summary);
        }
        Ok(summary)
    }

    fn is_ignored(&self, entry: &DirEntry) -> bool {
        entry.depth() > 0
            && entry.file_type().is_dir()
            && entry
                .file_name()
                .to_str()
                .map(|name| self.config.should_ignore_dir(name))
                .unwrap_or(false)
    }

    fn scan_directory(&self, root: &Path, since: Option<DateTime<Utc>>, counters: &ScanCounters) {
        log::debug!("Scanning {}", root.display());
        let root_label = root.to_string_lossy();

        let mut walker = WalkDir::new(root).follow_links(false);
        if let Some(depth) = self.config.max_depth {
            walker = walker.max_depth(depth);
        }

        for entry in walker.into_iter().filter_entry(|e| !self.is_ignored(e)) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map(|p| p.to_path_buf());
                    let error = match e.into_io_error() {
                        Some(io) => {
                            let mut error = LibraryError::from(io);
                            error.path = path;
                            error
                        }
                        None => LibraryError::new(
                            crate::error::ErrorKind::Io,
                            path,
                            "filesystem loop detected",
                        ),
                    };
                    self.record_failure(&error, counters);
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let matches = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| self.config.should_include_extension(e))
                .unwrap_or(false);
            if !matches {
                continue;
            }

            match self.process_file(path, since) {
                Ok(FileOutcome::Catalogued) => {
                    counters.added.fetch_add(1, Ordering::Relaxed);
                }
                Ok(FileOutcome::Unchanged) => {
                    counters.skipped.fetch_add(1, Ordering::Relaxed);
                }
                Err(error) => self.record_failure(&error, counters),
            }

            if let Some(reporter) = self.reporter {
                reporter.report_progress(
                    counters.added.load(Ordering::Relaxed),
                    counters.skipped.load(Ordering::Relaxed),
                    counters.failed.load(Ordering::Relaxed),
                    &root_label,
                );
            }
        }
    }

    fn record_failure(&self, error: &LibraryError, counters: &ScanCounters) {
        log::warn!("Scan skipped an item: {}", error);
        counters.failed.fetch_add(1, Ordering::Relaxed);
        if let Some(reporter) = self.reporter {
            reporter.report_error(error);
        }
    }

    /// Catalog one matching file unless it is unchanged since `since`
    fn process_file(&self, path: &Path, since: Option<DateTime<Utc>>) -> Result<FileOutcome> {
        let metadata = std::fs::metadata(path).map_err(|e| LibraryError::io(path, e))?;

        if let (Some(since), Ok(modified)) = (since, metadata.modified()) {
            if DateTime::<Utc>::from(modified) <= since {
                return Ok(FileOutcome::Unchanged);
            }
        }

        let duration = match self.prober.probe(path) {
            Ok(duration) => Some(duration),
            Err(e) => {
                log::warn!("Duration probe failed for {}: {}", path.display(), e);
                None
            }
        };

        let title = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let entry = NewEntry::new(title, path.to_path_buf())
            .with_duration(duration.unwrap_or_default())
            .with_file_size(metadata.len())
            .with_creation_date(metadata.created().ok().map(DateTime::<Utc>::from));

        if !self.store.upsert(&entry)? {
            // Already catalogued: keep identity, follow the file's size and length
            self.store
                .refresh_metadata(path, metadata.len(), duration)?;
        }
        Ok(FileOutcome::Catalogued)
    }
}

/// Drop missing directories, duplicates and (without a depth limit) roots
/// nested inside another root, comparing paths after resolving symlinks
fn unique_existing_dirs(directories: &[PathBuf], collapse_nested: bool) -> Vec<PathBuf> {
    let mut candidates: Vec<(PathBuf, &PathBuf)> = directories
        .iter()
        .filter(|dir| {
            let exists = dir.is_dir();
            if !exists {
                log::debug!("Skipping missing directory {}", dir.display());
            }
            exists
        })
        .map(|dir| (std::fs::canonicalize(dir).unwrap_or_else(|_| dir.clone()), dir))
        .collect();
    // Outer roots first so nested ones find their ancestor already kept
    candidates.sort_by_key(|(key, _)| key.components().count());

    let mut kept: Vec<PathBuf> = Vec::new();
    let mut roots = Vec::new();
    for (key, dir) in candidates {
        let covered = kept
            .iter()
            .any(|outer| *outer == key || (collapse_nested && key.starts_with(outer)));
        if covered {
            log::debug!("Skipping {} already covered by another root", dir.display());
            continue;
        }
        kept.push(key);
        roots.push(dir.clone());
    }
    roots
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqliteCatalog;
    use crate::models::{CatalogFilter, SortKey};
    use crate::test_support::{set_mtime, write_video, FailingProber, FixedProber, FlakyStore};
    use std::time::{Duration, SystemTime};

    fn config() -> LibraryConfig {
        LibraryConfig::builder().num_threads(2).build()
    }

    fn hours_ago(hours: u64) -> SystemTime {
        SystemTime::now() - Duration::from_secs(hours * 3600)
    }

    #[test]
    fn test_incremental_scan_only_processes_changed_files() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_video(dir.path(), "a.mp4", 10);
        let b = write_video(dir.path(), "b.mkv", 20);
        set_mtime(&a, hours_ago(3));
        set_mtime(&b, hours_ago(1));

        let store = SqliteCatalog::open_memory().unwrap();
        let existing = NewEntry::new("a", a.clone()).with_file_size(999);
        store.upsert(&existing).unwrap();
        let before = store.get_by_path(&a).unwrap().unwrap();

        let config = config();
        let prober = FixedProber(Duration::from_secs(5));
        let scanner = Scanner::new(&config, &store, &prober);
        let since = DateTime::<Utc>::from(hours_ago(2));

        let summary = scanner.scan(&[dir.path().to_path_buf()], Some(since)).unwrap();
        assert_eq!(summary.added, 1);
        assert_eq!(summary.skipped, 1);

        assert_eq!(store.get_by_path(&a).unwrap().unwrap(), before);
        let b_row = store.get_by_path(&b).unwrap().unwrap();
        assert_eq!(b_row.title, "b");
        assert_eq!(b_row.file_size, 20);
        assert_eq!(b_row.duration, Duration::from_secs(5));
    }

    #[test]
    fn test_second_pass_adds_nothing() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["one.mp4", "two.MOV", "nested/three.webm"] {
            let path = write_video(dir.path(), name, 1);
            set_mtime(&path, hours_ago(1));
        }

        let store = SqliteCatalog::open_memory().unwrap();
        let config = LibraryConfig::builder()
            .add_root(dir.path().to_path_buf())
            .num_threads(2)
            .build();
        let prober = FixedProber(Duration::ZERO);
        let scanner = Scanner::new(&config, &store, &prober);

        let first = scanner.run_pass().unwrap();
        assert_eq!(first.added, 3);
        assert!(store.scan_cursor().unwrap().is_some());

        let second = scanner.run_pass().unwrap();
        assert_eq!(second.added, 0);
        assert_eq!(second.skipped, 3);
        assert_eq!(store.count(&CatalogFilter::All).unwrap(), 3);
    }

    #[test]
    fn test_filters_extensions_case_insensitively() {
        let dir = tempfile::tempdir().unwrap();
        write_video(dir.path(), "keep.MP4", 1);
        write_video(dir.path(), "poster.jpg", 1);
        write_video(dir.path(), "notes.txt", 1);
        write_video(dir.path(), "noextension", 1);

        let store = SqliteCatalog::open_memory().unwrap();
        let config = config();
        let prober = FixedProber(Duration::ZERO);
        let scanner = Scanner::new(&config, &store, &prober);
        let summary = scanner.scan(&[dir.path().to_path_buf()], None).unwrap();

        assert_eq!(summary.added, 1);
        let rows = store
            .query(&CatalogFilter::All, SortKey::DateAdded, false, 0, 10)
            .unwrap();
        assert_eq!(rows[0].title, "keep");
    }

    #[test]
    fn test_missing_and_duplicate_directories() {
        let dir = tempfile::tempdir().unwrap();
        write_video(dir.path(), "a.mp4", 1);

        let store = SqliteCatalog::open_memory().unwrap();
        let config = config();
        let prober = FixedProber(Duration::ZERO);
        let scanner = Scanner::new(&config, &store, &prober);
        let summary = scanner
            .scan(
                &[
                    dir.path().to_path_buf(),
                    dir.path().join("does-not-exist"),
                    dir.path().to_path_buf(),
                ],
                None,
            )
            .unwrap();

        assert_eq!(summary.directories, 1);
        assert_eq!(summary.added, 1);
        assert_eq!(summary.failed, 0);
    }

    #[test]
    fn test_nested_roots_are_walked_once() {
        let dir = tempfile::tempdir().unwrap();
        write_video(dir.path(), "top.mp4", 1);
        write_video(dir.path(), "sub/inner.mp4", 1);
        write_video(dir.path(), "sub/deeper/more.mkv", 1);

        let store = SqliteCatalog::open_memory().unwrap();
        let config = config();
        let prober = FixedProber(Duration::ZERO);
        let scanner = Scanner::new(&config, &store, &prober);
        let summary = scanner
            .scan(
                &[dir.path().join("sub"), dir.path().to_path_buf(), dir.path().join("sub/deeper")],
                None,
            )
            .unwrap();

        assert_eq!(summary.directories, 1);
        assert_eq!(summary.added, 3);
        assert_eq!(store.count(&CatalogFilter::All).unwrap(), 3);
    }

    #[test]
    fn test_nested_roots_kept_when_depth_is_limited() {
        let dir = tempfile::tempdir().unwrap();
        write_video(dir.path(), "top.mp4", 1);
        write_video(dir.path(), "sub/inner.mp4", 1);

        let roots = unique_existing_dirs(&[dir.path().to_path_buf(), dir.path().join("sub")], false);
        assert_eq!(roots.len(), 2);
        let roots = unique_existing_dirs(&[dir.path().to_path_buf(), dir.path().join("sub")], true);
        assert_eq!(roots, vec![dir.path().to_path_buf()]);
    }

    #[test]
    fn test_directories_scanned_concurrently_count_every_file() {
        let store = SqliteCatalog::open_memory().unwrap();
        let dirs: Vec<_> = (0..4).map(|_| tempfile::tempdir().unwrap()).collect();
        for (i, dir) in dirs.iter().enumerate() {
            for j in 0..5 {
                write_video(dir.path(), &format!("clip_{}_{}.mp4", i, j), 1);
            }
        }
        let roots: Vec<PathBuf> = dirs.iter().map(|d| d.path().to_path_buf()).collect();

        let config = LibraryConfig::builder().num_threads(4).build();
        let prober = FixedProber(Duration::ZERO);
        let scanner = Scanner::new(&config, &store, &prober);
        let summary = scanner.scan(&roots, None).unwrap();

        assert_eq!(summary.added, 20);
        assert_eq!(store.count(&CatalogFilter::All).unwrap(), 20);
    }

    #[test]
    fn test_probe_failure_records_zero_duration() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_video(dir.path(), "broken.mp4", 3);

        let store = SqliteCatalog::open_memory().unwrap();
        let config = config();
        let prober = FailingProber;
        let scanner = Scanner::new(&config, &store, &prober);
        let summary = scanner.scan(&[dir.path().to_path_buf()], None).unwrap();

        assert_eq!(summary.added, 1);
        let row = store.get_by_path(&path).unwrap().unwrap();
        assert_eq!(row.duration, Duration::ZERO);
        assert_eq!(row.file_size, 3);
    }

    #[test]
    fn test_rescan_refreshes_size_without_touching_identity() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_video(dir.path(), "grow.mp4", 3);

        let store = SqliteCatalog::open_memory().unwrap();
        let config = config();
        let prober = FixedProber(Duration::from_secs(1));
        let scanner = Scanner::new(&config, &store, &prober);
        scanner.scan(&[dir.path().to_path_buf()], None).unwrap();
        let first = store.get_by_path(&path).unwrap().unwrap();
        store.set_favorite(first.id, true).unwrap();

        std::fs::write(&path, vec![0u8; 30]).unwrap();
        let prober = FixedProber(Duration::from_secs(9));
        let scanner = Scanner::new(&config, &store, &prober);
        scanner.scan(&[dir.path().to_path_buf()], None).unwrap();

        let second = store.get_by_path(&path).unwrap().unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.date_added, first.date_added);
        assert!(second.is_favorite);
        assert_eq!(second.file_size, 30);
        assert_eq!(second.duration, Duration::from_secs(9));
    }

    #[test]
    fn test_store_failure_is_per_file_and_cursor_still_advances() {
        let dir = tempfile::tempdir().unwrap();
        write_video(dir.path(), "good.mp4", 1);
        write_video(dir.path(), "cursed.mp4", 1);

        let store = FlakyStore::new().fail_upsert_for("cursed");
        let config = LibraryConfig::builder()
            .add_root(dir.path().to_path_buf())
            .build();
        let prober = FixedProber(Duration::ZERO);
        let scanner = Scanner::new(&config, &store, &prober);

        let summary = scanner.run_pass().unwrap();
        assert_eq!(summary.added, 1);
        assert_eq!(summary.failed, 1);
        assert!(!summary.is_success());
        assert!(store.scan_cursor().unwrap().is_some());
    }

    #[test]
    fn test_ignored_directories_are_not_walked() {
        let dir = tempfile::tempdir().unwrap();
        write_video(dir.path(), "visible/a.mp4", 1);
        write_video(dir.path(), ".hidden/b.mp4", 1);
        write_video(dir.path(), "$RECYCLE.BIN/c.mp4", 1);

        let store = SqliteCatalog::open_memory().unwrap();
        let config = config();
        let prober = FixedProber(Duration::ZERO);
        let scanner = Scanner::new(&config, &store, &prober);
        let summary = scanner.scan(&[dir.path().to_path_buf()], None).unwrap();
        assert_eq!(summary.added, 1);
    }
}
