//! Personal video library: incremental directory scanning into a SQLite
//! catalog, paged and searchable views, and rename/merge workflows that keep
//! files on disk and catalog rows consistent.

pub mod config;
pub mod db;
pub mod error;
pub mod library;
pub mod merge;
pub mod models;
pub mod probe;
pub mod progress;
pub mod query;
pub mod rename;
pub mod scanner;
pub mod thumbnail;

#[cfg(test)]
mod test_support;

pub use config::LibraryConfig;
pub use db::{CatalogStore, SqliteCatalog};
pub use error::{ErrorKind, LibraryError, Result};
pub use library::Library;
pub use merge::{CancellationToken, MergeWorkflow};
pub use models::{CatalogEntry, CatalogFilter, NewEntry, ScanSummary, SortKey, ViewMode};
pub use probe::{FfprobeProber, MetadataProber, NoopProber};
pub use progress::{ProgressEvent, ProgressReporter};
pub use query::{build_page, Page, PageRequest};
pub use rename::rename_entry;
pub use scanner::Scanner;
pub use thumbnail::{ThumbnailQueue, ThumbnailService};
