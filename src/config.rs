//! Configuration for the video library

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::{LibraryError, Result};

/// Default number of entries per page
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Default poll interval while waiting on the merge tool
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Default catalog database file
pub const DEFAULT_DB_FILE: &str = "videos.db";

const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "avi", "mkv", "mov", "wmv", "flv", "webm", "m4v", "ts", "rmvb",
];

/// System, trash and tool directories that never hold library videos
const IGNORED_DIRS: &[&str] = &[
    "$RECYCLE.BIN",
    "System Volume Information",
    "lost+found",
    "@eaDir",
    "node_modules",
];

/// Configuration for the library
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Watched root directories
    pub roots: Vec<PathBuf>,

    /// Video file extensions to include (lowercase, without dot)
    pub extensions: HashSet<String>,

    /// Directory names to ignore below a root
    pub ignore_dirs: HashSet<String>,

    /// Maximum recursion depth, None for unlimited
    pub max_depth: Option<usize>,

    /// Number of threads for the scan pool
    /// 0 means auto-detect (CPU cores × 2)
    pub num_threads: usize,

    /// Entries per page in paged views
    pub page_size: u32,

    /// Catalog database path
    pub db_path: PathBuf,

    /// Concatenation tool used by merges
    pub ffmpeg_path: PathBuf,

    /// Duration prober executable; empty switches probing off
    pub ffprobe_path: PathBuf,

    /// Poll interval while waiting on the merge tool, in milliseconds
    pub merge_poll_interval_ms: u64,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            extensions: Self::default_video_extensions(),
            ignore_dirs: Self::default_ignore_dirs(),
            max_depth: None,
            num_threads: 0,
            page_size: DEFAULT_PAGE_SIZE,
            db_path: PathBuf::from(DEFAULT_DB_FILE),
            ffmpeg_path: PathBuf::from("ffmpeg"),
            ffprobe_path: PathBuf::from("ffprobe"),
            merge_poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl LibraryConfig {
    /// Start a builder from the defaults
    pub fn builder() -> LibraryConfigBuilder {
        LibraryConfigBuilder::new()
    }

    /// Load a config from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            LibraryError::config_error(Some(path.to_path_buf()), e.to_string())
        })?;
        let mut config: Self = serde_json::from_str(&text)
            .map_err(|e| LibraryError::config_error(Some(path.to_path_buf()), e.to_string()))?;
        config.extensions = normalize_extensions(config.extensions);
        Ok(config)
    }

    /// Save the config as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)
            .map_err(|e| LibraryError::config_error(Some(path.to_path_buf()), e.to_string()))
    }

    /// Extensions recognised as video out of the box
    pub fn default_video_extensions() -> HashSet<String> {
        VIDEO_EXTENSIONS.iter().map(|e| e.to_string()).collect()
    }

    /// Directory names skipped out of the box
    pub fn default_ignore_dirs() -> HashSet<String> {
        IGNORED_DIRS.iter().map(|d| d.to_string()).collect()
    }

    /// Check if an extension is in the allow-list (case-insensitive)
    pub fn should_include_extension(&self, ext: &str) -> bool {
        let ext = ext.trim_start_matches('.');
        !ext.is_empty() && self.extensions.contains(&ext.to_lowercase())
    }

    /// Hidden directories and the ignore list
    pub fn should_ignore_dir(&self, name: &str) -> bool {
        name.starts_with('.') || self.ignore_dirs.contains(name)
    }

    /// Scan pool size; auto means twice the available cores
    pub fn effective_threads(&self) -> usize {
        if self.num_threads == 0 {
            std::thread::available_parallelism()
                .map(|p| p.get() * 2)
                .unwrap_or(4)
        } else {
            self.num_threads
        }
    }

    /// Page size, never below one
    pub fn effective_page_size(&self) -> u32 {
        self.page_size.max(1)
    }
}

fn normalize_extensions(extensions: HashSet<String>) -> HashSet<String> {
    extensions
        .into_iter()
        .map(|e| e.trim_start_matches('.').to_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}

/// Builder for LibraryConfig
#[derive(Debug, Default)]
pub struct LibraryConfigBuilder {
    config: LibraryConfig,
}

impl LibraryConfigBuilder {
    /// Create a builder holding the default config
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the watched root directories
    pub fn roots(mut self, roots: Vec<PathBuf>) -> Self {
        self.config.roots = roots;
        self
    }

    /// Watch one more root directory
    pub fn add_root(mut self, root: PathBuf) -> Self {
        self.config.roots.push(root);
        self
    }

    /// Replace the extension allow-list (normalized to lowercase, no dot)
    pub fn extensions(mut self, extensions: HashSet<String>) -> Self {
        self.config.extensions = normalize_extensions(extensions);
        self
    }

    /// Replace the ignored directory names
    pub fn ignore_dirs(mut self, dirs: HashSet<String>) -> Self {
        self.config.ignore_dirs = dirs;
        self
    }

    /// Limit recursion depth
    pub fn max_depth(mut self, depth: Option<usize>) -> Self {
        self.config.max_depth = depth;
        self
    }

    /// Set the scan pool size (0 = auto)
    pub fn num_threads(mut self, threads: usize) -> Self {
        self.config.num_threads = threads;
        self
    }

    /// Set the default page size
    pub fn page_size(mut self, size: u32) -> Self {
        self.config.page_size = size;
        self
    }

    /// Set the catalog database path
    pub fn db_path(mut self, path: PathBuf) -> Self {
        self.config.db_path = path;
        self
    }

    /// Set the concatenation tool used by merges
    pub fn ffmpeg_path(mut self, path: PathBuf) -> Self {
        self.config.ffmpeg_path = path;
        self
    }

    /// Set the duration prober; an empty path switches probing off
    pub fn ffprobe_path(mut self, path: PathBuf) -> Self {
        self.config.ffprobe_path = path;
        self
    }

    /// Set how often a running merge checks for exit or cancellation
    pub fn merge_poll_interval_ms(mut self, interval: u64) -> Self {
        self.config.merge_poll_interval_ms = interval;
        self
    }

    /// Build the config
    pub fn build(self) -> LibraryConfig {
        self.config
    }
}
