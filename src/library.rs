//! Library facade
//!
//! Wires one catalog store, prober, thumbnail queue and merge runner together
//! so front ends can drive every operation by entry id.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::LibraryConfig;
use crate::db::{CatalogStore, SqliteCatalog};
use crate::error::{ErrorKind, LibraryError, Result};
use crate::merge::{CancellationToken, MergeWorkflow};
use crate::models::{CatalogEntry, CatalogFilter, ScanSummary, SortKey};
use crate::probe::{FfprobeProber, MetadataProber, NoopProber};
use crate::progress::ProgressReporter;
use crate::query::{build_page, Page, PageRequest};
use crate::rename::rename_entry;
use crate::scanner::Scanner;
use crate::thumbnail::{resolve_thumbnail, ThumbnailQueue, ThumbnailService};

fn unknown_id(id: i64) -> LibraryError {
    LibraryError::new(ErrorKind::NotFound, None, format!("No video with id {}", id))
}

pub struct Library {
    config: LibraryConfig,
    store: Arc<dyn CatalogStore>,
    prober: Arc<dyn MetadataProber>,
    thumbnails: Option<ThumbnailQueue>,
    merger: MergeWorkflow,
}

impl std::fmt::Debug for Library {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Library")
            .field("config", &self.config)
            .field("thumbnails", &self.thumbnails)
            .field("merger", &self.merger)
            .finish()
    }
}

impl Library {
    /// Open the SQLite catalog at `config.db_path` with ffprobe for durations
    pub fn open(config: LibraryConfig) -> Result<Self> {
        let store = SqliteCatalog::open(&config.db_path)?;
        let prober: Arc<dyn MetadataProber> = if config.ffprobe_path.as_os_str().is_empty() {
            log::info!("Duration probing disabled");
            Arc::new(NoopProber)
        } else {
            Arc::new(FfprobeProber::new(config.ffprobe_path.clone()))
        };
        log::info!("Opened catalog {}", config.db_path.display());
        Ok(Self::new(config, Arc::new(store), prober))
    }

    /// Assemble a library from an existing store and prober
    pub fn new(
        config: LibraryConfig,
        store: Arc<dyn CatalogStore>,
        prober: Arc<dyn MetadataProber>,
    ) -> Self {
        let merger = MergeWorkflow::from_config(&config);
        Self {
            config,
            store,
            prober,
            thumbnails: None,
            merger,
        }
    }

    /// Generate thumbnails in the background after refreshes and merges
    pub fn with_thumbnails(mut self, service: Arc<dyn ThumbnailService>) -> Self {
        self.thumbnails = Some(ThumbnailQueue::spawn(service, self.store.clone()));
        self
    }

    pub fn config(&self) -> &LibraryConfig {
        &self.config
    }

    /// Underlying catalog, for reads the facade does not wrap
    pub fn store(&self) -> &dyn CatalogStore {
        self.store.as_ref()
    }

    /// Whether a merge is running right now
    pub fn is_merging(&self) -> bool {
        self.merger.is_running()
    }

    /// Run one incremental pass over the configured roots
    pub fn scan(&self, reporter: Option<&ProgressReporter>) -> Result<ScanSummary> {
        let mut scanner = Scanner::new(&self.config, self.store.as_ref(), self.prober.as_ref());
        if let Some(reporter) = reporter {
            scanner = scanner.with_reporter(reporter);
        }
        scanner.run_pass()
    }

    pub fn page(&self, request: &PageRequest) -> Result<Page> {
        build_page(self.store.as_ref(), request)
    }

    /// Newest `n` entries by date added
    pub fn featured(&self, n: u64) -> Result<Vec<CatalogEntry>> {
        self.store
            .query(&CatalogFilter::All, SortKey::DateAdded, false, 0, n)
    }

    /// Flip the favorite flag; `None` for an unknown id
    pub fn toggle_favorite(&self, id: i64) -> Result<Option<bool>> {
        let Some(entry) = self.store.get(id)? else {
            return Ok(None);
        };
        let value = !entry.is_favorite;
        self.store.set_favorite(id, value)?;
        Ok(Some(value))
    }

    /// Flip the watch-later flag; `None` for an unknown id
    pub fn toggle_watch_later(&self, id: i64) -> Result<Option<bool>> {
        let Some(entry) = self.store.get(id)? else {
            return Ok(None);
        };
        let value = !entry.is_watch_later;
        self.store.set_watch_later(id, value)?;
        Ok(Some(value))
    }

    /// Rename entry `id`; fails with `NotFound` for an unknown id
    pub fn rename(&self, id: i64, new_base_name: &str) -> Result<CatalogEntry> {
        let entry = self.store.get(id)?.ok_or_else(|| unknown_id(id))?;
        rename_entry(self.store.as_ref(), &entry, new_base_name)
    }

    /// Delete a video's file, its thumbnail (best-effort) and then its row.
    ///
    /// A file that cannot be removed keeps its row. Returns false for an
    /// unknown id.
    pub fn delete_video(&self, id: i64) -> Result<bool> {
        let Some(entry) = self.store.get(id)? else {
            return Ok(false);
        };

        match std::fs::remove_file(&entry.file_path) {
            Ok(()) => log::info!("Deleted {}", entry.file_path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("{} already gone", entry.file_path.display())
            }
            Err(e) => return Err(LibraryError::io(&entry.file_path, e)),
        }

        if let Some(thumbnail) = resolve_thumbnail(&entry) {
            if let Err(e) = std::fs::remove_file(&thumbnail) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    log::warn!("Failed to delete thumbnail {}: {}", thumbnail.display(), e);
                }
            }
        }

        self.store.delete(id)?;
        Ok(true)
    }

    /// Re-read size and duration of one entry from disk.
    ///
    /// A failed probe leaves the stored duration as it was.
    pub fn refresh_metadata(&self, id: i64) -> Result<CatalogEntry> {
        let entry = self.store.get(id)?.ok_or_else(|| unknown_id(id))?;
        let metadata =
            std::fs::metadata(&entry.file_path).map_err(|e| LibraryError::io(&entry.file_path, e))?;

        let duration = match self.prober.probe(&entry.file_path) {
            Ok(duration) => Some(duration),
            Err(e) => {
                log::warn!("Duration probe failed for {}: {}", entry.file_path.display(), e);
                None
            }
        };
        self.store
            .refresh_metadata(&entry.file_path, metadata.len(), duration)?;
        self.request_thumbnail(&entry.file_path);

        self.store.get(id)?.ok_or_else(|| unknown_id(id))
    }

    /// Merge `sources` into `{dir of first}/{output_base_name}.mp4`
    pub fn merge(
        &self,
        sources: &[PathBuf],
        output_base_name: &str,
        cancel: &CancellationToken,
    ) -> Result<PathBuf> {
        let output = self.merger.merge(
            self.store.as_ref(),
            self.prober.as_ref(),
            sources,
            output_base_name,
            cancel,
        )?;
        self.request_thumbnail(&output);
        Ok(output)
    }

    fn request_thumbnail(&self, video: &Path) {
        if let Some(queue) = &self.thumbnails {
            queue.submit(video);
        }
    }
}
