//! Shared fixtures for unit tests

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use crate::db::{CatalogStore, SqliteCatalog};
use crate::error::{LibraryError, Result};
use crate::models::{CatalogEntry, CatalogFilter, NewEntry, SortKey};
use crate::probe::MetadataProber;

/// Write a file of `size` zero bytes at `dir/rel`, creating parents
pub fn write_video(dir: &Path, rel: &str, size: usize) -> PathBuf {
    let path = dir.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, vec![0u8; size]).unwrap();
    path
}

pub fn set_mtime(path: &Path, at: SystemTime) {
    let file = std::fs::File::options().write(true).open(path).unwrap();
    file.set_modified(at).unwrap();
}

/// Catalog a file that exists on disk
pub fn catalog(store: &dyn CatalogStore, path: &Path) -> CatalogEntry {
    let title = path.file_stem().unwrap().to_string_lossy().to_string();
    let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
    store
        .upsert(&NewEntry::new(title, path.to_path_buf()).with_file_size(size))
        .unwrap();
    store.get_by_path(path).unwrap().unwrap()
}

/// Write an executable shell script standing in for an external tool
#[cfg(unix)]
pub fn fake_tool(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::io::Write;
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    {
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "#!/bin/sh").unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file.sync_all().unwrap();
    }
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[derive(Debug, Clone, Copy)]
pub struct FixedProber(pub Duration);

impl MetadataProber for FixedProber {
    fn probe(&self, _path: &Path) -> Result<Duration> {
        Ok(self.0)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FailingProber;

impl MetadataProber for FailingProber {
    fn probe(&self, path: &Path) -> Result<Duration> {
        Err(LibraryError::probe_error(path, "corrupt container"))
    }
}

/// In-memory catalog with switchable failures
pub struct FlakyStore {
    pub inner: SqliteCatalog,
    fail_upsert_for: Option<String>,
    fail_file_info: bool,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self {
            inner: SqliteCatalog::open_memory().unwrap(),
            fail_upsert_for: None,
            fail_file_info: false,
        }
    }

    /// Fail upserts whose path contains `needle`
    pub fn fail_upsert_for(mut self, needle: &str) -> Self {
        self.fail_upsert_for = Some(needle.to_string());
        self
    }

    pub fn fail_file_info(mut self) -> Self {
        self.fail_file_info = true;
        self
    }
}

impl CatalogStore for FlakyStore {
    fn upsert(&self, entry: &NewEntry) -> Result<bool> {
        if let Some(needle) = &self.fail_upsert_for {
            if entry.file_path.to_string_lossy().contains(needle.as_str()) {
                return Err(LibraryError::database_error("disk I/O error"));
            }
        }
        self.inner.upsert(entry)
    }

    fn set_favorite(&self, id: i64, value: bool) -> Result<()> {
        self.inner.set_favorite(id, value)
    }

    fn set_watch_later(&self, id: i64, value: bool) -> Result<()> {
        self.inner.set_watch_later(id, value)
    }

    fn update_file_info(
        &self,
        id: i64,
        title: &str,
        file_path: &Path,
        thumbnail_path: Option<&Path>,
    ) -> Result<()> {
        if self.fail_file_info {
            return Err(LibraryError::database_error("database is locked"));
        }
        self.inner.update_file_info(id, title, file_path, thumbnail_path)
    }

    fn refresh_metadata(
        &self,
        file_path: &Path,
        file_size: u64,
        duration: Option<Duration>,
    ) -> Result<()> {
        self.inner.refresh_metadata(file_path, file_size, duration)
    }

    fn set_thumbnail(&self, file_path: &Path, thumbnail_path: &Path) -> Result<()> {
        self.inner.set_thumbnail(file_path, thumbnail_path)
    }

    fn delete(&self, id: i64) -> Result<()> {
        self.inner.delete(id)
    }

    fn get(&self, id: i64) -> Result<Option<CatalogEntry>> {
        self.inner.get(id)
    }

    fn get_by_path(&self, file_path: &Path) -> Result<Option<CatalogEntry>> {
        self.inner.get_by_path(file_path)
    }

    fn count(&self, filter: &CatalogFilter) -> Result<u64> {
        self.inner.count(filter)
    }

    fn query(
        &self,
        filter: &CatalogFilter,
        sort: SortKey,
        ascending: bool,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<CatalogEntry>> {
        self.inner.query(filter, sort, ascending, offset, limit)
    }

    fn scan_cursor(&self) -> Result<Option<DateTime<Utc>>> {
        self.inner.scan_cursor()
    }

    fn set_scan_cursor(&self, at: DateTime<Utc>) -> Result<()> {
        self.inner.set_scan_cursor(at)
    }
}
