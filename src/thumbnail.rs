//! Thumbnail paths and background thumbnail requests
//!
//! Image generation belongs to a [`ThumbnailService`]; the library only moves,
//! deletes and records thumbnail paths it already knows about.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::db::CatalogStore;
use crate::error::Result;
use crate::models::CatalogEntry;

/// Suffix of the conventional poster image next to a video
pub const POSTER_SUFFIX: &str = "-poster.jpg";

/// Produces a preview image for a video and returns its path
pub trait ThumbnailService: Send + Sync {
    fn generate(&self, video: &Path) -> Result<PathBuf>;
}

/// `{dir}/{stem}-poster.jpg`
pub fn poster_path(video: &Path) -> PathBuf {
    let stem = video
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    video.with_file_name(format!("{}{}", stem, POSTER_SUFFIX))
}

/// Thumbnail to move or delete alongside the entry's video.
///
/// The stored path wins; without one, an existing conventional poster is used.
pub fn resolve_thumbnail(entry: &CatalogEntry) -> Option<PathBuf> {
    match &entry.thumbnail_path {
        Some(path) => Some(path.clone()),
        None => {
            let poster = poster_path(&entry.file_path);
            poster.is_file().then_some(poster)
        }
    }
}

/// Name for a thumbnail following its video from `old_stem` to `new_stem`.
///
/// `old-poster.jpg` becomes `new-poster.jpg`; a thumbnail not named after the
/// video becomes `new.<ext>`.
pub fn renamed_thumbnail(thumbnail: &Path, old_stem: &str, new_stem: &str) -> PathBuf {
    let name = thumbnail
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let new_name = match name.strip_prefix(old_stem) {
        Some(rest) if !rest.is_empty() => format!("{}{}", new_stem, rest),
        _ => match thumbnail.extension() {
            Some(ext) => format!("{}.{}", new_stem, ext.to_string_lossy()),
            None => new_stem.to_string(),
        },
    };
    thumbnail.with_file_name(new_name)
}

/// Background worker that generates thumbnails off the caller's thread.
///
/// Failures are logged by the worker and never reach the submitter.
pub struct ThumbnailQueue {
    sender: Option<Sender<PathBuf>>,
    worker: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for ThumbnailQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThumbnailQueue")
            .field("running", &self.sender.is_some())
            .finish()
    }
}

impl ThumbnailQueue {
    /// Start the worker; generated paths are recorded in `store`
    pub fn spawn(service: Arc<dyn ThumbnailService>, store: Arc<dyn CatalogStore>) -> Self {
        let (sender, receiver) = mpsc::channel::<PathBuf>();
        let worker = std::thread::Builder::new()
            .name("thumbnails".to_string())
            .spawn(move || {
                for video in receiver {
                    match service.generate(&video) {
                        Ok(thumbnail) => {
                            log::debug!("Generated thumbnail {}", thumbnail.display());
                            if let Err(e) = store.set_thumbnail(&video, &thumbnail) {
                                log::warn!(
                                    "Failed to record thumbnail for {}: {}",
                                    video.display(),
                                    e
                                );
                            }
                        }
                        Err(e) => {
                            log::warn!("Thumbnail generation failed for {}: {}", video.display(), e)
                        }
                    }
                }
            });

        match worker {
            Ok(worker) => Self {
                sender: Some(sender),
                worker: Some(worker),
            },
            Err(e) => {
                log::error!("Failed to start thumbnail worker: {}", e);
                Self {
                    sender: None,
                    worker: None,
                }
            }
        }
    }

    /// Queue a video; never blocks
    pub fn submit(&self, video: &Path) {
        match &self.sender {
            Some(sender) => {
                if sender.send(video.to_path_buf()).is_err() {
                    log::warn!("Thumbnail worker stopped; dropping {}", video.display());
                }
            }
            None => log::debug!("No thumbnail worker; skipping {}", video.display()),
        }
    }

    /// Finish queued work and stop the worker
    pub fn shutdown(&mut self) {
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("Thumbnail worker panicked");
            }
        }
    }
}

impl Drop for ThumbnailQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}
