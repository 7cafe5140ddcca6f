//! Core data models for the video catalog

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// One catalogued video file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Store-assigned surrogate key
    pub id: i64,
    /// Display name
    pub title: String,
    /// Absolute path, unique across the catalog
    pub file_path: PathBuf,
    /// Companion preview image
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_path: Option<PathBuf>,
    /// Playback duration, zero when unknown
    pub duration: Duration,
    /// File size in bytes at last scan or refresh
    pub file_size: u64,
    /// When the row was first created
    pub date_added: DateTime<Utc>,
    /// Filesystem creation time captured at scan time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<DateTime<Utc>>,
    pub is_favorite: bool,
    pub is_watch_later: bool,
}

/// Row to be inserted by an upsert
#[derive(Debug, Clone, PartialEq)]
pub struct NewEntry {
    pub title: String,
    pub file_path: PathBuf,
    pub thumbnail_path: Option<PathBuf>,
    pub duration: Duration,
    pub file_size: u64,
    pub date_added: DateTime<Utc>,
    pub creation_date: Option<DateTime<Utc>>,
}

impl NewEntry {
    /// Create an entry with no thumbnail, added now
    pub fn new(title: impl Into<String>, file_path: PathBuf) -> Self {
        Self {
            title: title.into(),
            file_path,
            thumbnail_path: None,
            duration: Duration::ZERO,
            file_size: 0,
            date_added: Utc::now(),
            creation_date: None,
        }
    }

    /// Set the playback duration
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Set the size in bytes
    pub fn with_file_size(mut self, size: u64) -> Self {
        self.file_size = size;
        self
    }

    /// Override the time the entry is considered added
    pub fn with_date_added(mut self, at: DateTime<Utc>) -> Self {
        self.date_added = at;
        self
    }

    /// Set the file's creation time, if the filesystem reports one
    pub fn with_creation_date(mut self, at: Option<DateTime<Utc>>) -> Self {
        self.creation_date = at;
        self
    }

    /// Set a known thumbnail
    pub fn with_thumbnail(mut self, path: Option<PathBuf>) -> Self {
        self.thumbnail_path = path;
        self
    }
}

/// View mode selected by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViewMode {
    #[default]
    All,
    Favorites,
    WatchLater,
}

impl ViewMode {
    /// Name accepted on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewMode::All => "all",
            ViewMode::Favorites => "favorites",
            ViewMode::WatchLater => "watch-later",
        }
    }
}

impl FromStr for ViewMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" => Ok(ViewMode::All),
            "favorites" | "favourites" => Ok(ViewMode::Favorites),
            "watch-later" | "watchlater" => Ok(ViewMode::WatchLater),
            other => Err(format!("unknown view mode: {}", other)),
        }
    }
}

/// Row filter applied by the store
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CatalogFilter {
    #[default]
    All,
    Favorites,
    WatchLater,
    /// Case-insensitive substring match on title or path
    Search(String),
}

impl From<ViewMode> for CatalogFilter {
    fn from(mode: ViewMode) -> Self {
        match mode {
            ViewMode::All => CatalogFilter::All,
            ViewMode::Favorites => CatalogFilter::Favorites,
            ViewMode::WatchLater => CatalogFilter::WatchLater,
        }
    }
}

/// Supported sort keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortKey {
    #[default]
    DateAdded,
    FileSize,
    CreationDate,
    Duration,
}

impl SortKey {
    /// Catalog column holding this key
    pub fn column(&self) -> &'static str {
        match self {
            SortKey::DateAdded => "date_added",
            SortKey::FileSize => "file_size",
            SortKey::CreationDate => "creation_date",
            SortKey::Duration => "duration_ms",
        }
    }

    /// Name accepted on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::DateAdded => "date-added",
            SortKey::FileSize => "file-size",
            SortKey::CreationDate => "creation-date",
            SortKey::Duration => "duration",
        }
    }

    /// Total order over entries for this key.
    ///
    /// Ties fall back to date-added descending, then id descending. Missing
    /// creation dates order before any present date.
    pub fn compare(&self, a: &CatalogEntry, b: &CatalogEntry, ascending: bool) -> Ordering {
        let primary = match self {
            SortKey::DateAdded => a.date_added.cmp(&b.date_added),
            SortKey::FileSize => a.file_size.cmp(&b.file_size),
            SortKey::CreationDate => a.creation_date.cmp(&b.creation_date),
            SortKey::Duration => a.duration.cmp(&b.duration),
        };
        let primary = if ascending { primary } else { primary.reverse() };
        primary
            .then_with(|| b.date_added.cmp(&a.date_added))
            .then_with(|| b.id.cmp(&a.id))
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "date-added" | "added" => Ok(SortKey::DateAdded),
            "file-size" | "size" => Ok(SortKey::FileSize),
            "creation-date" | "created" => Ok(SortKey::CreationDate),
            "duration" => Ok(SortKey::Duration),
            other => Err(format!("unknown sort key: {}", other)),
        }
    }
}

/// Result of a scan pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSummary {
    /// Files successfully added or updated
    pub added: u64,
    /// Matching files skipped as unchanged since the cursor
    pub skipped: u64,
    /// Files that failed and were left out
    pub failed: u64,
    /// Root directories actually walked
    pub directories: u64,
    /// Total scan duration in milliseconds
    pub duration_ms: u64,
}

impl ScanSummary {
    /// Check if the pass completed without per-file failures
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}
