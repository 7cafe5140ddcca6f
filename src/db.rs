//! Catalog persistence: the store contract and its SQLite backend

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::functions::FunctionFlags;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use crate::error::{LibraryError, Result};
use crate::models::{CatalogEntry, CatalogFilter, NewEntry, SortKey};

const SCAN_CURSOR_KEY: &str = "last_scan";

const ENTRY_COLUMNS: &str = "id, title, file_path, thumbnail_path, duration_ms, file_size, \
                             date_added, creation_date, is_favorite, is_watch_later";

/// Catalog operations consumed by the scanner, query service and workflows.
///
/// Every write is a single-row auto-commit. Updates and deletes that name an
/// unknown id are no-ops.
pub trait CatalogStore: Send + Sync {
    /// Insert the entry unless its path is already catalogued.
    /// Returns true when a row was inserted.
    fn upsert(&self, entry: &NewEntry) -> Result<bool>;

    fn set_favorite(&self, id: i64, value: bool) -> Result<()>;

    fn set_watch_later(&self, id: i64, value: bool) -> Result<()>;

    /// Replace title, path and thumbnail of one row
    fn update_file_info(
        &self,
        id: i64,
        title: &str,
        file_path: &Path,
        thumbnail_path: Option<&Path>,
    ) -> Result<()>;

    /// Update size and, when known, duration of the row at `file_path`
    fn refresh_metadata(&self, file_path: &Path, file_size: u64, duration: Option<Duration>)
        -> Result<()>;

    /// Record a thumbnail for the row at `file_path`
    fn set_thumbnail(&self, file_path: &Path, thumbnail_path: &Path) -> Result<()>;

    fn delete(&self, id: i64) -> Result<()>;

    fn get(&self, id: i64) -> Result<Option<CatalogEntry>>;

    fn get_by_path(&self, file_path: &Path) -> Result<Option<CatalogEntry>>;

    /// Number of rows matching the filter, ignoring pagination
    fn count(&self, filter: &CatalogFilter) -> Result<u64>;

    /// Ordered window of matching rows
    fn query(
        &self,
        filter: &CatalogFilter,
        sort: SortKey,
        ascending: bool,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<CatalogEntry>>;

    /// Completion time of the last scan pass
    fn scan_cursor(&self) -> Result<Option<DateTime<Utc>>>;

    fn set_scan_cursor(&self, at: DateTime<Utc>) -> Result<()>;
}

/// Fixed-width RFC 3339 text so lexical order equals time order
pub(crate) fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(text: &str) -> std::result::Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(text)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| format!("bad timestamp {:?}: {}", text, e))
}

fn path_to_sql(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

fn to_sql_int(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// SQL function folding text with Unicode lowercase rules
const FOLD_FN: &str = "unicode_lower";

/// Escape LIKE wildcards so the (case-folded) term matches literally
fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn where_clause(filter: &CatalogFilter) -> (&'static str, Vec<Value>) {
    match filter {
        CatalogFilter::All => ("", Vec::new()),
        CatalogFilter::Favorites => ("WHERE is_favorite = 1", Vec::new()),
        CatalogFilter::WatchLater => ("WHERE is_watch_later = 1", Vec::new()),
        CatalogFilter::Search(term) => (
            "WHERE unicode_lower(title) LIKE ?1 ESCAPE '\\' \
             OR unicode_lower(file_path) LIKE ?1 ESCAPE '\\'",
            vec![Value::Text(like_pattern(term.trim()))],
        ),
    }
}

/// Row as stored, before timestamp parsing
struct StoredRow {
    id: i64,
    title: String,
    file_path: String,
    thumbnail_path: Option<String>,
    duration_ms: i64,
    file_size: i64,
    date_added: String,
    creation_date: Option<String>,
    is_favorite: bool,
    is_watch_later: bool,
}

impl StoredRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            file_path: row.get(2)?,
            thumbnail_path: row.get(3)?,
            duration_ms: row.get::<_, Option<i64>>(4)?.unwrap_or(0),
            file_size: row.get::<_, Option<i64>>(5)?.unwrap_or(0),
            date_added: row.get(6)?,
            creation_date: row.get(7)?,
            is_favorite: row.get::<_, i64>(8)? != 0,
            is_watch_later: row.get::<_, i64>(9)? != 0,
        })
    }

    fn into_entry(self) -> std::result::Result<CatalogEntry, String> {
        let creation_date = match self.creation_date.as_deref() {
            None | Some("") => None,
            Some(text) => Some(parse_timestamp(text)?),
        };
        Ok(CatalogEntry {
            id: self.id,
            title: self.title,
            file_path: PathBuf::from(self.file_path),
            thumbnail_path: self
                .thumbnail_path
                .filter(|p| !p.is_empty())
                .map(PathBuf::from),
            duration: Duration::from_millis(self.duration_ms.max(0) as u64),
            file_size: self.file_size.max(0) as u64,
            date_added: parse_timestamp(&self.date_added)?,
            creation_date,
            is_favorite: self.is_favorite,
            is_watch_later: self.is_watch_later,
        })
    }
}

/// Keep well-formed rows, log and drop the rest
fn collect_entries(
    rows: impl Iterator<Item = rusqlite::Result<StoredRow>>,
) -> Result<Vec<CatalogEntry>> {
    let mut entries = Vec::new();
    for row in rows {
        let row = row?;
        let id = row.id;
        match row.into_entry() {
            Ok(entry) => entries.push(entry),
            Err(e) => log::warn!("Skipping malformed catalog row {}: {}", id, e),
        }
    }
    Ok(entries)
}

/// SQLite catalog.
///
/// Holds one connection; concurrent callers are serialized on it.
pub struct SqliteCatalog {
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for SqliteCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteCatalog").finish_non_exhaustive()
    }
}

impl SqliteCatalog {
    /// Open or create the catalog
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| LibraryError::io(parent, e))?;
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Self::init(conn)
    }

    /// Open in-memory catalog (for testing)
    pub fn open_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        register_functions(&conn)?;
        init_schema(&conn)?;
        migrate_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| LibraryError::database_error("catalog connection lock poisoned"))
    }

    fn find_one(&self, clause: &str, param: Value) -> Result<Option<CatalogEntry>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} FROM videos WHERE {}", ENTRY_COLUMNS, clause);
        let row = conn
            .query_row(&sql, [param], StoredRow::from_row)
            .optional()?;
        Ok(collect_entries(row.into_iter().map(Ok))?.pop())
    }
}

/// LIKE only folds ASCII; search compares Unicode-lowercased text instead
fn register_functions(conn: &Connection) -> Result<()> {
    conn.create_scalar_function(
        FOLD_FN,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| Ok(ctx.get::<Option<String>>(0)?.map(|text| text.to_lowercase())),
    )?;
    Ok(())
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS videos (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            file_path TEXT NOT NULL UNIQUE,
            thumbnail_path TEXT,
            duration_ms INTEGER NOT NULL DEFAULT 0,
            file_size INTEGER NOT NULL DEFAULT 0,
            date_added TEXT NOT NULL,
            creation_date TEXT,
            is_favorite INTEGER NOT NULL DEFAULT 0,
            is_watch_later INTEGER NOT NULL DEFAULT 0
        );
        CREATE INDEX IF NOT EXISTS idx_videos_date_added ON videos(date_added);
        CREATE INDEX IF NOT EXISTS idx_videos_file_size ON videos(file_size);
        CREATE INDEX IF NOT EXISTS idx_videos_duration ON videos(duration_ms);

        CREATE TABLE IF NOT EXISTS scan_state (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );
        ",
    )?;
    Ok(())
}

/// Bring catalogs created before creation dates were tracked up to date
fn migrate_schema(conn: &Connection) -> Result<()> {
    let has_creation_date: bool = conn
        .query_row(
            "SELECT COUNT(*) > 0 FROM pragma_table_info('videos') WHERE name='creation_date'",
            [],
            |row| row.get(0),
        )
        .unwrap_or(false);

    if !has_creation_date {
        log::info!("Migrating catalog: adding creation_date column");
        conn.execute("ALTER TABLE videos ADD COLUMN creation_date TEXT", [])?;
    }
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_videos_creation_date ON videos(creation_date)",
        [],
    )?;
    Ok(())
}

impl CatalogStore for SqliteCatalog {
    fn upsert(&self, entry: &NewEntry) -> Result<bool> {
        let conn = self.conn()?;
        let inserted = conn.execute(
            "INSERT INTO videos
             (title, file_path, thumbnail_path, duration_ms, file_size, date_added, creation_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(file_path) DO NOTHING",
            params![
                entry.title,
                path_to_sql(&entry.file_path),
                entry.thumbnail_path.as_deref().map(path_to_sql),
                to_sql_int(entry.duration.as_millis() as u64),
                to_sql_int(entry.file_size),
                format_timestamp(&entry.date_added),
                entry.creation_date.as_ref().map(format_timestamp),
            ],
        )?;
        Ok(inserted > 0)
    }

    fn set_favorite(&self, id: i64, value: bool) -> Result<()> {
        self.conn()?.execute(
            "UPDATE videos SET is_favorite = ?2 WHERE id = ?1",
            params![id, value as i64],
        )?;
        Ok(())
    }

    fn set_watch_later(&self, id: i64, value: bool) -> Result<()> {
        self.conn()?.execute(
            "UPDATE videos SET is_watch_later = ?2 WHERE id = ?1",
            params![id, value as i64],
        )?;
        Ok(())
    }

    fn update_file_info(
        &self,
        id: i64,
        title: &str,
        file_path: &Path,
        thumbnail_path: Option<&Path>,
    ) -> Result<()> {
        self.conn()?.execute(
            "UPDATE videos SET title = ?2, file_path = ?3, thumbnail_path = ?4 WHERE id = ?1",
            params![
                id,
                title,
                path_to_sql(file_path),
                thumbnail_path.map(path_to_sql)
            ],
        )?;
        Ok(())
    }

    fn refresh_metadata(
        &self,
        file_path: &Path,
        file_size: u64,
        duration: Option<Duration>,
    ) -> Result<()> {
        let conn = self.conn()?;
        match duration {
            Some(duration) => conn.execute(
                "UPDATE videos SET file_size = ?2, duration_ms = ?3 WHERE file_path = ?1",
                params![
                    path_to_sql(file_path),
                    to_sql_int(file_size),
                    to_sql_int(duration.as_millis() as u64)
                ],
            )?,
            None => conn.execute(
                "UPDATE videos SET file_size = ?2 WHERE file_path = ?1",
                params![path_to_sql(file_path), to_sql_int(file_size)],
            )?,
        };
        Ok(())
    }

    fn set_thumbnail(&self, file_path: &Path, thumbnail_path: &Path) -> Result<()> {
        self.conn()?.execute(
            "UPDATE videos SET thumbnail_path = ?2 WHERE file_path = ?1",
            params![path_to_sql(file_path), path_to_sql(thumbnail_path)],
        )?;
        Ok(())
    }

    fn delete(&self, id: i64) -> Result<()> {
        self.conn()?
            .execute("DELETE FROM videos WHERE id = ?1", params![id])?;
        Ok(())
    }

    fn get(&self, id: i64) -> Result<Option<CatalogEntry>> {
        self.find_one("id = ?1", Value::Integer(id))
    }

    fn get_by_path(&self, file_path: &Path) -> Result<Option<CatalogEntry>> {
        self.find_one("file_path = ?1", Value::Text(path_to_sql(file_path)))
    }

    fn count(&self, filter: &CatalogFilter) -> Result<u64> {
        let (clause, values) = where_clause(filter);
        let sql = format!("SELECT COUNT(*) FROM videos {}", clause);
        let count: i64 = self
            .conn()?
            .query_row(&sql, params_from_iter(values.iter()), |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    fn query(
        &self,
        filter: &CatalogFilter,
        sort: SortKey,
        ascending: bool,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<CatalogEntry>> {
        let (clause, mut values) = where_clause(filter);
        let limit_idx = values.len() + 1;
        values.push(Value::Integer(to_sql_int(limit)));
        values.push(Value::Integer(to_sql_int(offset)));

        let sql = format!(
            "SELECT {} FROM videos {} ORDER BY {} {}, date_added DESC, id DESC LIMIT ?{} OFFSET ?{}",
            ENTRY_COLUMNS,
            clause,
            sort.column(),
            if ascending { "ASC" } else { "DESC" },
            limit_idx,
            limit_idx + 1,
        );

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), StoredRow::from_row)?;
        collect_entries(rows)
    }

    fn scan_cursor(&self) -> Result<Option<DateTime<Utc>>> {
        let value: Option<String> = self
            .conn()?
            .query_row(
                "SELECT value FROM scan_state WHERE key = ?1",
                [SCAN_CURSOR_KEY],
                |row| row.get(0),
            )
            .optional()?;

        match value {
            None => Ok(None),
            Some(text) => match parse_timestamp(&text) {
                Ok(at) => Ok(Some(at)),
                Err(e) => {
                    log::warn!("Ignoring unreadable scan cursor, rescanning everything: {}", e);
                    Ok(None)
                }
            },
        }
    }

    fn set_scan_cursor(&self, at: DateTime<Utc>) -> Result<()> {
        self.conn()?.execute(
            "INSERT INTO scan_state (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![SCAN_CURSOR_KEY, format_timestamp(&at)],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn new_entry(path: &str, size: u64, added: i64) -> NewEntry {
        NewEntry::new(
            Path::new(path).file_stem().unwrap().to_string_lossy(),
            PathBuf::from(path),
        )
        .with_file_size(size)
        .with_date_added(at(added))
    }

    fn insert(store: &SqliteCatalog, path: &str, size: u64, added: i64) -> CatalogEntry {
        assert!(store.upsert(&new_entry(path, size, added)).unwrap());
        store.get_by_path(Path::new(path)).unwrap().unwrap()
    }

    #[test]
    fn test_upsert_keeps_first_row() {
        let store = SqliteCatalog::open_memory().unwrap();
        let first = insert(&store, "/videos/a.mp4", 10, 100);

        let second = new_entry("/videos/a.mp4", 999, 500)
            .with_duration(Duration::from_secs(42))
            .with_thumbnail(Some(PathBuf::from("/videos/a.jpg")));
        assert!(!store.upsert(&second).unwrap());

        let stored = store.get_by_path(Path::new("/videos/a.mp4")).unwrap().unwrap();
        assert_eq!(stored, first);
        assert_eq!(store.count(&CatalogFilter::All).unwrap(), 1);
    }

    #[test]
    fn test_ids_are_never_reused() {
        let store = SqliteCatalog::open_memory().unwrap();
        let a = insert(&store, "/videos/a.mp4", 1, 1);
        store.delete(a.id).unwrap();
        let b = insert(&store, "/videos/b.mp4", 1, 2);
        assert!(b.id > a.id);
    }

    #[test]
    fn test_favorites_sorted_by_size_ascending() {
        let store = SqliteCatalog::open_memory().unwrap();
        for (i, size) in [10u64, 5, 20].iter().enumerate() {
            let e = insert(&store, &format!("/videos/fav{}.mp4", i), *size, i as i64);
            store.set_favorite(e.id, true).unwrap();
        }
        insert(&store, "/videos/plain.mp4", 1, 10);

        let rows = store
            .query(&CatalogFilter::Favorites, SortKey::FileSize, true, 0, 100)
            .unwrap();
        let sizes: Vec<u64> = rows.iter().map(|e| e.file_size).collect();
        assert_eq!(sizes, vec![5, 10, 20]);
        assert_eq!(store.count(&CatalogFilter::Favorites).unwrap(), 3);
    }

    #[test]
    fn test_query_order_matches_sort_key_compare() {
        let store = SqliteCatalog::open_memory().unwrap();
        let sizes = [7u64, 3, 7, 1, 3, 7];
        for (i, size) in sizes.iter().enumerate() {
            let e = insert(&store, &format!("/videos/{}.mp4", i), *size, (i % 2) as i64);
            store
                .refresh_metadata(&e.file_path, *size, Some(Duration::from_secs(i as u64 % 3)))
                .unwrap();
        }

        for key in [SortKey::DateAdded, SortKey::FileSize, SortKey::Duration, SortKey::CreationDate] {
            for ascending in [true, false] {
                let rows = store.query(&CatalogFilter::All, key, ascending, 0, 100).unwrap();
                let mut expected = rows.clone();
                expected.sort_by(|a, b| key.compare(a, b, ascending));
                assert_eq!(rows, expected, "{:?} ascending={}", key, ascending);

                let again = store.query(&CatalogFilter::All, key, ascending, 0, 100).unwrap();
                assert_eq!(rows, again);
            }
        }
    }

    #[test]
    fn test_pagination_window() {
        let store = SqliteCatalog::open_memory().unwrap();
        for i in 0..5 {
            insert(&store, &format!("/videos/{}.mp4", i), i, i as i64);
        }
        let page = store
            .query(&CatalogFilter::All, SortKey::FileSize, true, 2, 2)
            .unwrap();
        let sizes: Vec<u64> = page.iter().map(|e| e.file_size).collect();
        assert_eq!(sizes, vec![2, 3]);
    }

    #[test]
    fn test_search_matches_title_or_path_case_insensitively() {
        let store = SqliteCatalog::open_memory().unwrap();
        insert(&store, "/videos/Holiday/Beach.mp4", 1, 1);
        insert(&store, "/videos/work/standup.mkv", 1, 2);
        insert(&store, "/videos/100%_real.mp4", 1, 3);

        let filter = CatalogFilter::Search("holiday".into());
        assert_eq!(store.count(&filter).unwrap(), 1);

        let filter = CatalogFilter::Search("STANDUP".into());
        let rows = store.query(&filter, SortKey::DateAdded, false, 0, 10).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].title, "standup");

        // Wildcards in the term match literally
        assert_eq!(store.count(&CatalogFilter::Search("%_".into())).unwrap(), 1);
    }

    #[test]
    fn test_search_folds_non_ascii_case() {
        let store = SqliteCatalog::open_memory().unwrap();
        insert(&store, "/videos/Été à Paris.mp4", 1, 1);
        insert(&store, "/videos/ÜBERFAHRT/Straße.mkv", 1, 2);

        assert_eq!(store.count(&CatalogFilter::Search("été".into())).unwrap(), 1);
        assert_eq!(store.count(&CatalogFilter::Search("ÉTÉ À".into())).unwrap(), 1);
        assert_eq!(store.count(&CatalogFilter::Search("überfahrt".into())).unwrap(), 1);

        let rows = store
            .query(&CatalogFilter::Search("STRASSE".into()), SortKey::DateAdded, false, 0, 10)
            .unwrap();
        assert!(rows.is_empty());
        let rows = store
            .query(&CatalogFilter::Search("STRAßE".into()), SortKey::DateAdded, false, 0, 10)
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_flag_updates_and_unknown_ids() {
        let store = SqliteCatalog::open_memory().unwrap();
        let e = insert(&store, "/videos/a.mp4", 1, 1);

        store.set_favorite(e.id, true).unwrap();
        store.set_watch_later(e.id, true).unwrap();
        store.set_favorite(e.id, false).unwrap();
        let stored = store.get(e.id).unwrap().unwrap();
        assert!(!stored.is_favorite);
        assert!(stored.is_watch_later);

        store.set_favorite(9999, true).unwrap();
        store
            .update_file_info(9999, "x", Path::new("/x.mp4"), None)
            .unwrap();
        store.delete(9999).unwrap();
        store.delete(e.id).unwrap();
        store.delete(e.id).unwrap();
        assert!(store.get(e.id).unwrap().is_none());
    }

    #[test]
    fn test_update_file_info_and_refresh() {
        let store = SqliteCatalog::open_memory().unwrap();
        let e = insert(&store, "/videos/a.mp4", 1, 1);

        store
            .update_file_info(
                e.id,
                "renamed",
                Path::new("/videos/renamed.mp4"),
                Some(Path::new("/videos/renamed.jpg")),
            )
            .unwrap();
        store
            .refresh_metadata(Path::new("/videos/renamed.mp4"), 2048, None)
            .unwrap();

        let stored = store.get(e.id).unwrap().unwrap();
        assert_eq!(stored.title, "renamed");
        assert_eq!(stored.file_path, PathBuf::from("/videos/renamed.mp4"));
        assert_eq!(stored.thumbnail_path, Some(PathBuf::from("/videos/renamed.jpg")));
        assert_eq!(stored.file_size, 2048);
        assert_eq!(stored.date_added, e.date_added);
        assert!(store.get_by_path(Path::new("/videos/a.mp4")).unwrap().is_none());
    }

    #[test]
    fn test_malformed_rows_are_skipped() {
        let store = SqliteCatalog::open_memory().unwrap();
        insert(&store, "/videos/good.mp4", 1, 1);
        store
            .conn()
            .unwrap()
            .execute(
                "INSERT INTO videos (title, file_path, date_added) VALUES ('bad', '/videos/bad.mp4', 'yesterday')",
                [],
            )
            .unwrap();

        let rows = store
            .query(&CatalogFilter::All, SortKey::DateAdded, false, 0, 10)
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].title, "good");
        assert!(store.get_by_path(Path::new("/videos/bad.mp4")).unwrap().is_none());
    }

    #[test]
    fn test_scan_cursor_roundtrip() {
        let store = SqliteCatalog::open_memory().unwrap();
        assert!(store.scan_cursor().unwrap().is_none());

        store.set_scan_cursor(at(1_000)).unwrap();
        store.set_scan_cursor(at(2_000)).unwrap();
        assert_eq!(store.scan_cursor().unwrap(), Some(at(2_000)));
    }

    #[test]
    fn test_migrates_catalog_without_creation_date() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("videos.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                "CREATE TABLE videos (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    title TEXT NOT NULL,
                    file_path TEXT NOT NULL UNIQUE,
                    thumbnail_path TEXT,
                    duration_ms INTEGER NOT NULL DEFAULT 0,
                    file_size INTEGER NOT NULL DEFAULT 0,
                    date_added TEXT NOT NULL,
                    is_favorite INTEGER NOT NULL DEFAULT 0,
                    is_watch_later INTEGER NOT NULL DEFAULT 0
                );
                INSERT INTO videos (title, file_path, thumbnail_path, date_added)
                VALUES ('old', '/videos/old.mp4', '', '2024-01-01T00:00:00.000000Z');",
            )
            .unwrap();
        }

        let store = SqliteCatalog::open(&path).unwrap();
        let old = store.get_by_path(Path::new("/videos/old.mp4")).unwrap().unwrap();
        assert!(old.creation_date.is_none());
        assert!(old.thumbnail_path.is_none());

        let fresh = new_entry("/videos/new.mp4", 1, 1).with_creation_date(Some(at(50)));
        assert!(store.upsert(&fresh).unwrap());
        let stored = store.get_by_path(Path::new("/videos/new.mp4")).unwrap().unwrap();
        assert_eq!(stored.creation_date, Some(at(50)));
    }
}
