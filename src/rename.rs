//! Renaming a catalogued video together with its thumbnail and row

use std::path::{Path, PathBuf};

use crate::db::CatalogStore;
use crate::error::{LibraryError, Result};
use crate::models::CatalogEntry;
use crate::thumbnail::{renamed_thumbnail, resolve_thumbnail};

/// Characters rejected in file names on any platform
const ILLEGAL_NAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Check a user-supplied base name and return it trimmed
pub fn validate_base_name(name: &str) -> Result<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(LibraryError::validation("Name must not be empty"));
    }
    if let Some(c) = trimmed
        .chars()
        .find(|c| ILLEGAL_NAME_CHARS.contains(c) || c.is_control())
    {
        return Err(LibraryError::validation(format!(
            "Name contains an illegal character: {:?}",
            c
        )));
    }
    if trimmed == "." || trimmed == ".." {
        return Err(LibraryError::validation("Name must not be a relative directory"));
    }
    Ok(trimmed)
}

fn stem_of(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Rename `entry`'s file to `new_base_name`, keeping directory and extension.
///
/// The video moves first, then its thumbnail (best-effort), then the catalog
/// row. If the row update fails both moves are undone and the update error is
/// returned. Renaming to the current name (ignoring case) changes nothing.
pub fn rename_entry(
    store: &dyn CatalogStore,
    entry: &CatalogEntry,
    new_base_name: &str,
) -> Result<CatalogEntry> {
    let new_stem = validate_base_name(new_base_name)?;
    let old_path = &entry.file_path;
    let old_stem = stem_of(old_path);

    if old_stem.to_lowercase() == new_stem.to_lowercase() {
        log::debug!("Rename of {} is a no-op", old_path.display());
        return Ok(entry.clone());
    }

    let file_name = match old_path.extension() {
        Some(ext) => format!("{}.{}", new_stem, ext.to_string_lossy()),
        None => new_stem.to_string(),
    };
    let new_path = old_path.with_file_name(file_name);
    if new_path.symlink_metadata().is_ok() {
        return Err(LibraryError::destination_exists(&new_path));
    }

    std::fs::rename(old_path, &new_path).map_err(|e| LibraryError::io(old_path, e))?;
    log::info!("Renamed {} -> {}", old_path.display(), new_path.display());

    let moved_thumbnail = move_thumbnail(entry, &old_stem, new_stem);
    let thumbnail_path = match &moved_thumbnail {
        Some((_, to)) => Some(to.clone()),
        None => entry.thumbnail_path.clone(),
    };

    if let Err(e) = store.update_file_info(entry.id, new_stem, &new_path, thumbnail_path.as_deref())
    {
        log::error!("Catalog update failed for {}, rolling back: {}", new_path.display(), e);
        rollback(old_path, &new_path, moved_thumbnail.as_ref());
        return Err(e);
    }

    Ok(CatalogEntry {
        title: new_stem.to_string(),
        file_path: new_path,
        thumbnail_path,
        ..entry.clone()
    })
}

/// Move the entry's thumbnail after its video; returns (from, to) when moved
fn move_thumbnail(entry: &CatalogEntry, old_stem: &str, new_stem: &str) -> Option<(PathBuf, PathBuf)> {
    let from = resolve_thumbnail(entry)?;
    if !from.is_file() {
        log::debug!("Thumbnail {} not on disk, leaving as is", from.display());
        return None;
    }
    let to = renamed_thumbnail(&from, old_stem, new_stem);
    if to.symlink_metadata().is_ok() {
        log::warn!("Thumbnail target {} already exists, not moving", to.display());
        return None;
    }
    match std::fs::rename(&from, &to) {
        Ok(()) => Some((from, to)),
        Err(e) => {
            log::warn!("Failed to rename thumbnail {}: {}", from.display(), e);
            None
        }
    }
}

fn rollback(old_path: &Path, new_path: &Path, moved_thumbnail: Option<&(PathBuf, PathBuf)>) {
    if let Err(e) = std::fs::rename(new_path, old_path) {
        log::error!(
            "Rollback failed: could not move {} back to {}: {}",
            new_path.display(),
            old_path.display(),
            e
        );
    }
    if let Some((from, to)) = moved_thumbnail {
        if let Err(e) = std::fs::rename(to, from) {
            log::error!(
                "Rollback failed: could not move thumbnail {} back to {}: {}",
                to.display(),
                from.display(),
                e
            );
        }
    }
}
