//! The relational index of bundles and their localized strings.
//!
//! Backed by SQLite through `rusqlite`. Two tables:
//!
//! - `bundles(file_id, path, name)`, one row per scanned bundle directory;
//! - `strings(file_id, key, lang, value, tbl, source)`, unique per `(file_id, key, lang)`.
//!
//! Deleting a bundle cascades to its strings. When two resource files of one
//! bundle define the same key for the same language, the row from the greatest
//! `(tbl, source)` pair is kept, whatever order the files were parsed in.

use std::{
    collections::HashMap,
    env,
    path::{MAIN_SEPARATOR, Path, PathBuf},
    sync::Arc,
};

use indoc::indoc;
use regex::Regex;
use rusqlite::{
    Connection, OpenFlags, OptionalExtension, Transaction,
    functions::FunctionFlags,
    params, params_from_iter,
    types::Value,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    config::SearchConfig,
    error::{Error, StoreError},
    scanner::{ScanReport, ScanStream},
    types::{
        Bundle, BundleInfo, ClassifiedRecord, DeletedBundle, ExportRow, LanguageCount, SearchHit,
        TableCount,
    },
};

/// File name of the index when no location is given.
pub const DEFAULT_DATABASE_NAME: &str = "stringdex.db";

/// Value stored in `PRAGMA user_version`.
pub const SCHEMA_VERSION: i64 = 1;

const SCHEMA: &str = indoc! {"
    CREATE TABLE IF NOT EXISTS bundles (
        file_id INTEGER PRIMARY KEY,
        path    TEXT NOT NULL UNIQUE,
        name    TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS strings (
        file_id INTEGER NOT NULL REFERENCES bundles(file_id) ON DELETE CASCADE,
        key     TEXT NOT NULL,
        lang    TEXT NOT NULL,
        value   TEXT NOT NULL,
        tbl     TEXT NOT NULL DEFAULT '',
        source  TEXT NOT NULL DEFAULT '',
        UNIQUE (file_id, key, lang)
    );
    CREATE INDEX IF NOT EXISTS strings_lang ON strings(lang);
"};

const UPSERT: &str = indoc! {"
    INSERT INTO strings (file_id, key, lang, value, tbl, source)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
    ON CONFLICT (file_id, key, lang) DO UPDATE SET
        value = excluded.value,
        tbl = excluded.tbl,
        source = excluded.source
    WHERE (excluded.tbl, excluded.source) >= (strings.tbl, strings.source)
"};

/// `stringdex.db` next to the running executable.
pub fn default_database_path() -> Result<PathBuf, Error> {
    let exe = env::current_exe()?;
    let dir = exe
        .parent()
        .ok_or_else(|| Error::config("cannot locate the executable's directory"))?;
    Ok(dir.join(DEFAULT_DATABASE_NAME))
}

/// Which column a search pattern is matched against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SearchTarget {
    #[default]
    Values,
    Keys,
}

impl SearchTarget {
    fn column(self) -> &'static str {
        match self {
            SearchTarget::Values => "value",
            SearchTarget::Keys => "key",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOptions {
    /// Language-tag prefixes; empty means every language.
    pub languages: Vec<String>,
    pub case_insensitive: bool,
    pub target: SearchTarget,
    pub limit: Option<usize>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        SearchOptions::from(&SearchConfig::default())
    }
}

impl From<&SearchConfig> for SearchOptions {
    fn from(config: &SearchConfig) -> Self {
        SearchOptions {
            languages: config.languages.clone(),
            case_insensitive: config.case_insensitive,
            target: SearchTarget::Values,
            limit: None,
        }
    }
}

/// Bundle selector for [`IndexStore::delete`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteTarget {
    Id(i64),
    Path(PathBuf),
}

/// Outcome of an `add`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AddSummary {
    /// Distinct bundles touched.
    pub bundles: usize,
    pub bundles_created: usize,
    /// Rows inserted or updated.
    pub entries: usize,
    pub report: ScanReport,
}

pub struct IndexStore {
    conn: Connection,
    path: Option<PathBuf>,
}

impl IndexStore {
    /// Opens the index at `path`, creating the file and schema if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        Self::init(conn, Some(path.to_path_buf()))
    }

    /// Opens an index that must already exist.
    pub fn open_existing<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(StoreError::Missing(path.to_path_buf()));
        }
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Self::init(conn, Some(path.to_path_buf()))
    }

    /// A throwaway in-memory index.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?, None)
    }

    fn init(conn: Connection, path: Option<PathBuf>) -> Result<Self, StoreError> {
        conn.pragma_update(None, "foreign_keys", true)?;
        if path.is_some() {
            conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        }

        let found: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
        match found {
            0 => {
                conn.execute_batch(SCHEMA)?;
                conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
            }
            SCHEMA_VERSION => {}
            found => {
                return Err(StoreError::SchemaMismatch {
                    found,
                    expected: SCHEMA_VERSION,
                });
            }
        }

        register_regexp(&conn)?;
        debug!(path = ?path, "opened index");
        Ok(IndexStore { conn, path })
    }

    /// Location of the database file, `None` for in-memory stores.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Upserts `records` in a single transaction.
    pub fn add<I>(&mut self, records: I) -> Result<AddSummary, StoreError>
    where
        I: IntoIterator<Item = ClassifiedRecord>,
    {
        let tx = self.conn.transaction()?;
        let summary = write_records(&tx, records)?;
        tx.commit()?;
        Ok(summary)
    }

    /// Drains a running scan into the index.
    ///
    /// Nothing is committed unless the scan finishes without being cancelled.
    pub fn add_scan(&mut self, stream: ScanStream) -> Result<AddSummary, Error> {
        let mut summaries = self.add_scans([Ok(stream)])?;
        Ok(summaries.pop().unwrap_or_default())
    }

    /// Drains several scans into the index within one transaction.
    ///
    /// Scans are pulled from `streams` one at a time. Any failed or cancelled
    /// scan rolls back the whole batch.
    pub fn add_scans<I>(&mut self, streams: I) -> Result<Vec<AddSummary>, Error>
    where
        I: IntoIterator<Item = Result<ScanStream, Error>>,
    {
        let tx = self.conn.transaction()?;
        let mut summaries = Vec::new();
        for stream in streams {
            let mut stream = stream?;
            let root = stream.root().to_path_buf();
            let mut summary = write_records(&tx, stream.by_ref())?;
            summary.report = stream.finish()?;
            debug!(
                root = %root.display(),
                bundles = summary.bundles,
                entries = summary.entries,
                "scan drained"
            );
            summaries.push(summary);
        }
        tx.commit()?;
        info!(
            scans = summaries.len(),
            bundles = summaries.iter().map(|s| s.bundles).sum::<usize>(),
            entries = summaries.iter().map(|s| s.entries).sum::<usize>(),
            "index updated"
        );
        Ok(summaries)
    }

    /// Removes bundles and, through the cascade, their strings.
    ///
    /// A [`DeleteTarget::Path`] matches the stored path exactly, or with
    /// `recursive` also every bundle below it.
    pub fn delete(
        &mut self,
        target: &DeleteTarget,
        recursive: bool,
    ) -> Result<Vec<DeletedBundle>, StoreError> {
        let tx = self.conn.transaction()?;
        let bundles = match target {
            DeleteTarget::Id(id) => bundle_by_id(&tx, *id)?.into_iter().collect(),
            DeleteTarget::Path(path) => bundles_by_path(&tx, path, recursive)?,
        };

        let mut deleted = Vec::with_capacity(bundles.len());
        for bundle in bundles {
            let strings: i64 = tx.query_row(
                "SELECT COUNT(*) FROM strings WHERE file_id = ?1",
                [bundle.file_id],
                |row| row.get(0),
            )?;
            tx.execute("DELETE FROM bundles WHERE file_id = ?1", [bundle.file_id])?;
            info!(file_id = bundle.file_id, path = %bundle.path, strings, "deleted bundle");
            deleted.push(DeletedBundle {
                bundle,
                strings: strings as usize,
            });
        }
        tx.commit()?;
        Ok(deleted)
    }

    /// Finds strings matching a `%`/`_` wildcard pattern.
    ///
    /// # Example
    /// ```rust
    /// use std::path::PathBuf;
    /// use stringdex::{store::{IndexStore, SearchOptions}, types::ClassifiedRecord};
    ///
    /// let mut store = IndexStore::open_in_memory()?;
    /// store.add([ClassifiedRecord {
    ///     bundle: PathBuf::from("/Applications/Mail.app"),
    ///     language: "en".to_string(),
    ///     table: "Localizable".to_string(),
    ///     key: "UPDATE".to_string(),
    ///     value: "Update software".to_string(),
    ///     source: PathBuf::from("/Applications/Mail.app/en.lproj/Localizable.strings"),
    /// }])?;
    /// let hits = store.search("update s%", &SearchOptions::default())?;
    /// assert_eq!(hits.len(), 1);
    /// # Ok::<(), stringdex::error::StoreError>(())
    /// ```
    pub fn search(
        &self,
        pattern: &str,
        options: &SearchOptions,
    ) -> Result<Vec<SearchHit>, StoreError> {
        let mut sql = format!(
            "SELECT file_id, key, lang, value FROM strings WHERE regexp(?1, {})",
            options.target.column()
        );
        let mut args = vec![Value::Text(wildcard_to_regex(pattern, options.case_insensitive))];

        let prefixes: Vec<&String> = options.languages.iter().filter(|l| !l.is_empty()).collect();
        if !prefixes.is_empty() {
            let clauses: Vec<String> = prefixes
                .iter()
                .map(|prefix| {
                    args.push(Value::Text(format!("{}%", escape_like(prefix))));
                    format!("lang LIKE ?{} ESCAPE '\\'", args.len())
                })
                .collect();
            sql.push_str(&format!(" AND ({})", clauses.join(" OR ")));
        }

        args.push(Value::Integer(
            options.limit.map(|l| l as i64).unwrap_or(-1),
        ));
        sql.push_str(&format!(
            " ORDER BY file_id, key, lang LIMIT ?{}",
            args.len()
        ));

        let mut stmt = self.conn.prepare(&sql)?;
        let hits = stmt
            .query_map(params_from_iter(args), |row| {
                Ok(SearchHit {
                    file_id: row.get(0)?,
                    key: row.get(1)?,
                    lang: row.get(2)?,
                    value: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        debug!(pattern, hits = hits.len(), "search");
        Ok(hits)
    }

    /// Every translation of `key` in one bundle, ordered by language.
    pub fn export_entry(&self, file_id: i64, key: &str) -> Result<Vec<ExportRow>, StoreError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT lang, value FROM strings WHERE file_id = ?1 AND key = ?2 ORDER BY lang",
        )?;
        let rows = stmt
            .query_map(params![file_id, key], |row| {
                Ok(ExportRow {
                    lang: row.get(0)?,
                    value: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Bundles whose id equals `term` or whose name contains it.
    pub fn bundles(&self, term: Option<&str>) -> Result<Vec<Bundle>, StoreError> {
        let id = term.and_then(|t| t.parse::<i64>().ok());
        let mut stmt = self.conn.prepare_cached(indoc! {"
            SELECT file_id, name, path FROM bundles
            WHERE ?1 IS NULL OR file_id = ?2 OR instr(lower(name), lower(?1)) > 0
            ORDER BY name COLLATE NOCASE, file_id
        "})?;
        let bundles = stmt
            .query_map(params![term, id], bundle_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(bundles)
    }

    /// Languages with their entry counts, optionally filtered by substring.
    pub fn languages(&self, term: Option<&str>) -> Result<Vec<LanguageCount>, StoreError> {
        let mut stmt = self.conn.prepare_cached(indoc! {"
            SELECT lang, COUNT(*) FROM strings
            WHERE ?1 IS NULL OR instr(lower(lang), lower(?1)) > 0
            GROUP BY lang
            ORDER BY lang COLLATE NOCASE
        "})?;
        let langs = stmt
            .query_map([term], |row| {
                Ok(LanguageCount {
                    lang: row.get(0)?,
                    entries: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(langs)
    }

    /// Distinct keys of one bundle.
    pub fn keys(&self, file_id: i64) -> Result<Vec<String>, StoreError> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT DISTINCT key FROM strings WHERE file_id = ?1 ORDER BY key COLLATE NOCASE",
        )?;
        let keys = stmt
            .query_map([file_id], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(keys)
    }

    /// Tables of one bundle with the number of entries each contributed.
    pub fn tables(&self, file_id: i64) -> Result<Vec<TableCount>, StoreError> {
        let mut stmt = self.conn.prepare_cached(indoc! {"
            SELECT tbl, COUNT(*) FROM strings
            WHERE file_id = ?1
            GROUP BY tbl
            ORDER BY tbl COLLATE NOCASE
        "})?;
        let tables = stmt
            .query_map([file_id], |row| {
                Ok(TableCount {
                    table: row.get(0)?,
                    entries: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tables)
    }

    /// Summary counts for one bundle, `None` if the id is unknown.
    pub fn info(&self, file_id: i64) -> Result<Option<BundleInfo>, StoreError> {
        let Some(bundle) = bundle_by_id(&self.conn, file_id)? else {
            return Ok(None);
        };
        let mut stmt = self
            .conn
            .prepare_cached("SELECT COUNT(*) FROM strings WHERE file_id = ?1 GROUP BY lang")?;
        let counts = stmt
            .query_map([file_id], |row| row.get::<_, i64>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(BundleInfo {
            bundle,
            languages: counts.len() as i64,
            max_translations: counts.iter().copied().max().unwrap_or(0),
            total: counts.iter().sum(),
        }))
    }
}

fn write_records<I>(tx: &Transaction<'_>, records: I) -> Result<AddSummary, StoreError>
where
    I: IntoIterator<Item = ClassifiedRecord>,
{
    let mut summary = AddSummary::default();
    let mut bundle_ids: HashMap<PathBuf, i64> = HashMap::new();
    let mut upsert = tx.prepare_cached(UPSERT)?;

    for record in records {
        if record.key.is_empty() || record.language.is_empty() {
            warn!(source = %record.source.display(), "skipping record with empty key or language");
            continue;
        }

        let file_id = match bundle_ids.get(&record.bundle) {
            Some(id) => *id,
            None => {
                let (id, created) = resolve_bundle(tx, &record.bundle)?;
                summary.bundles += 1;
                if created {
                    summary.bundles_created += 1;
                }
                bundle_ids.insert(record.bundle.clone(), id);
                id
            }
        };

        upsert.execute(params![
            file_id,
            record.key,
            record.language,
            record.value,
            record.table,
            record.source.to_string_lossy()
        ])?;
        summary.entries += 1;
    }
    Ok(summary)
}

/// Returns the bundle's id and whether its row was just created.
fn resolve_bundle(tx: &Transaction<'_>, bundle: &Path) -> Result<(i64, bool), StoreError> {
    let path = bundle.to_string_lossy();
    let existing: Option<i64> = tx
        .prepare_cached("SELECT file_id FROM bundles WHERE path = ?1")?
        .query_row([path.as_ref()], |row| row.get(0))
        .optional()?;
    if let Some(id) = existing {
        return Ok((id, false));
    }

    let name = bundle
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string());
    tx.prepare_cached("INSERT INTO bundles (path, name) VALUES (?1, ?2)")?
        .execute(params![path.as_ref(), name])?;
    let id = tx.last_insert_rowid();
    debug!(file_id = id, path = %path, "new bundle");
    Ok((id, true))
}

fn bundle_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Bundle> {
    Ok(Bundle {
        file_id: row.get(0)?,
        name: row.get(1)?,
        path: row.get(2)?,
    })
}

fn bundle_by_id(conn: &Connection, file_id: i64) -> Result<Option<Bundle>, StoreError> {
    let bundle = conn
        .prepare_cached("SELECT file_id, name, path FROM bundles WHERE file_id = ?1")?
        .query_row([file_id], bundle_from_row)
        .optional()?;
    Ok(bundle)
}

fn bundles_by_path(
    conn: &Connection,
    path: &Path,
    recursive: bool,
) -> Result<Vec<Bundle>, StoreError> {
    let exact = path.to_string_lossy().trim_end_matches(MAIN_SEPARATOR).to_string();
    let prefix = format!("{}{}", exact, MAIN_SEPARATOR);
    let mut stmt = conn.prepare_cached(indoc! {"
        SELECT file_id, name, path FROM bundles
        WHERE path = ?1 OR (?3 AND substr(path, 1, length(?2)) = ?2)
        ORDER BY path
    "})?;
    let bundles = stmt
        .query_map(params![exact, prefix, recursive], bundle_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(bundles)
}

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Registers `regexp(pattern, text)`, which also backs `text REGEXP pattern`.
fn register_regexp(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        "regexp",
        2,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let regex: Arc<Regex> = ctx.get_or_create_aux(0, |vr| -> Result<_, BoxError> {
                Ok(Regex::new(vr.as_str()?)?)
            })?;
            let text = ctx
                .get_raw(1)
                .as_str()
                .map_err(|e| rusqlite::Error::UserFunctionError(e.into()))?;
            Ok(regex.is_match(text))
        },
    )
}

/// Translates a SQL-style wildcard pattern into an anchored regex.
///
/// `%` matches any run of characters, `_` exactly one, and `\` escapes the
/// next character. Everything else is literal.
pub fn wildcard_to_regex(pattern: &str, case_insensitive: bool) -> String {
    let mut out = String::from(if case_insensitive { "(?is)^" } else { "(?s)^" });
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '%' => out.push_str(".*"),
            '_' => out.push('.'),
            '\\' => match chars.next() {
                Some(next) => out.push_str(&regex::escape(next.encode_utf8(&mut [0; 4]))),
                None => out.push_str(r"\\"),
            },
            c => out.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
        }
    }
    out.push('$');
    out
}

fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(bundle: &str, lang: &str, key: &str, value: &str) -> ClassifiedRecord {
        ClassifiedRecord {
            bundle: PathBuf::from(bundle),
            language: lang.to_string(),
            table: "Localizable".to_string(),
            key: key.to_string(),
            value: value.to_string(),
            source: PathBuf::from(bundle).join(format!("{}.lproj/Localizable.strings", lang)),
        }
    }

    fn any_language() -> SearchOptions {
        SearchOptions {
            languages: vec![],
            ..SearchOptions::default()
        }
    }

    #[test]
    fn test_wildcard_to_regex() {
        assert_eq!(wildcard_to_regex("a%b_c", false), "(?s)^a.*b.c$");
        assert_eq!(wildcard_to_regex(r"100\%", true), r"(?is)^100%$");
        assert_eq!(wildcard_to_regex("a.b", false), r"(?s)^a\.b$");
        assert_eq!(wildcard_to_regex(r"x\", false), r"(?s)^x\\$");
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("en_GB%"), r"en\_GB\%");
    }

    #[test]
    fn test_new_store_has_schema_version() {
        let store = IndexStore::open_in_memory().unwrap();
        let version: i64 = store
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION);
        assert!(store.path().is_none());
    }

    #[test]
    fn test_schema_mismatch_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("old.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.pragma_update(None, "user_version", 7).unwrap();
        }
        assert!(matches!(
            IndexStore::open(&path),
            Err(StoreError::SchemaMismatch { found: 7, expected: 1 })
        ));
    }

    #[test]
    fn test_open_existing_requires_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.db");
        assert!(matches!(
            IndexStore::open_existing(&path),
            Err(StoreError::Missing(p)) if p == path
        ));
        IndexStore::open(&path).unwrap();
        IndexStore::open_existing(&path).unwrap();
    }

    #[test]
    fn test_add_counts_bundles_and_entries() {
        let mut store = IndexStore::open_in_memory().unwrap();
        let summary = store
            .add([
                record("/A.app", "en", "OK", "OK"),
                record("/A.app", "de", "OK", "Weiter"),
                record("/B.app", "en", "OK", "Okay"),
            ])
            .unwrap();
        assert_eq!(summary.bundles, 2);
        assert_eq!(summary.bundles_created, 2);
        assert_eq!(summary.entries, 3);

        let again = store.add([record("/A.app", "fr", "OK", "Continuer")]).unwrap();
        assert_eq!(again.bundles, 1);
        assert_eq!(again.bundles_created, 0);
    }

    #[test]
    fn test_upsert_replaces_value() {
        let mut store = IndexStore::open_in_memory().unwrap();
        store.add([record("/A.app", "de", "OK", "Gut")]).unwrap();
        store.add([record("/A.app", "de", "OK", "Weiter")]).unwrap();
        let rows = store.export_entry(1, "OK").unwrap();
        assert_eq!(
            rows,
            vec![ExportRow {
                lang: "de".to_string(),
                value: "Weiter".to_string()
            }]
        );
    }

    #[test]
    fn test_same_key_in_two_tables_keeps_greatest_table() {
        let from_table = |table: &str, value: &str| ClassifiedRecord {
            table: table.to_string(),
            source: PathBuf::from(format!("/A.app/en.lproj/{}.strings", table)),
            ..record("/A.app", "en", "OK", value)
        };

        for order in [["Alpha", "Beta"], ["Beta", "Alpha"]] {
            let mut store = IndexStore::open_in_memory().unwrap();
            store
                .add(order.iter().map(|t| from_table(*t, &format!("from {}", t))))
                .unwrap();
            let rows = store.export_entry(1, "OK").unwrap();
            assert_eq!(rows.len(), 1);
            assert_eq!(rows[0].value, "from Beta", "order {:?}", order);
        }
    }

    #[test]
    fn test_empty_key_records_are_skipped() {
        let mut store = IndexStore::open_in_memory().unwrap();
        let summary = store.add([record("/A.app", "en", "", "x")]).unwrap();
        assert_eq!(summary.entries, 0);
    }

    #[test]
    fn test_search_language_prefixes() {
        let mut store = IndexStore::open_in_memory().unwrap();
        store
            .add([
                record("/A.app", "en", "OK", "OK"),
                record("/A.app", "English", "OK", "OK"),
                record("/A.app", "fr", "OK", "OK"),
            ])
            .unwrap();

        let en = SearchOptions {
            languages: vec!["EN".to_string()],
            ..SearchOptions::default()
        };
        let langs: Vec<_> = store
            .search("ok", &en)
            .unwrap()
            .into_iter()
            .map(|h| h.lang)
            .collect();
        assert_eq!(langs, vec!["English", "en"]);

        assert_eq!(store.search("ok", &any_language()).unwrap().len(), 3);
    }

    #[test]
    fn test_search_case_sensitivity() {
        let mut store = IndexStore::open_in_memory().unwrap();
        store.add([record("/A.app", "de", "K", "Über")]).unwrap();
        assert_eq!(store.search("über", &any_language()).unwrap().len(), 1);

        let strict = SearchOptions {
            case_insensitive: false,
            ..any_language()
        };
        assert!(store.search("über", &strict).unwrap().is_empty());
        assert_eq!(store.search("Über", &strict).unwrap().len(), 1);
    }

    #[test]
    fn test_search_keys_and_limit() {
        let mut store = IndexStore::open_in_memory().unwrap();
        store
            .add([
                record("/A.app", "en", "SAVE_TITLE", "Save"),
                record("/A.app", "de", "SAVE_TITLE", "Sichern"),
                record("/A.app", "en", "OPEN_TITLE", "Open"),
            ])
            .unwrap();

        let keys = SearchOptions {
            target: SearchTarget::Keys,
            ..any_language()
        };
        assert_eq!(store.search("save\\_%", &keys).unwrap().len(), 2);

        let limited = SearchOptions {
            limit: Some(1),
            ..keys
        };
        let hits = store.search("%_TITLE", &limited).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].key, "OPEN_TITLE");
    }

    #[test]
    fn test_delete_by_path_recursive() {
        let mut store = IndexStore::open_in_memory().unwrap();
        store
            .add([
                record("/Apps/A.app", "en", "k", "v"),
                record("/Apps/A.app/Contents/Plug.bundle", "en", "k", "v"),
                record("/Apps/AB.app", "en", "k", "v"),
            ])
            .unwrap();

        let exact = store
            .delete(&DeleteTarget::Path(PathBuf::from("/Apps/A.app")), false)
            .unwrap();
        assert_eq!(exact.len(), 1);
        assert_eq!(exact[0].strings, 1);

        let nested = store
            .delete(&DeleteTarget::Path(PathBuf::from("/Apps/A.app/")), true)
            .unwrap();
        assert_eq!(nested.len(), 1);
        assert_eq!(nested[0].bundle.name, "Plug.bundle");

        assert_eq!(store.bundles(None).unwrap().len(), 1);
    }

    #[test]
    fn test_delete_unknown_id_is_empty() {
        let mut store = IndexStore::open_in_memory().unwrap();
        assert!(store.delete(&DeleteTarget::Id(42), false).unwrap().is_empty());
    }

    #[test]
    fn test_listing_and_info() {
        let mut store = IndexStore::open_in_memory().unwrap();
        store
            .add([
                record("/x/Mail.app", "en", "b", "1"),
                record("/x/Mail.app", "en", "a", "2"),
                record("/x/Mail.app", "de", "a", "3"),
                record("/x/Notes.app", "en", "a", "4"),
            ])
            .unwrap();

        assert_eq!(store.bundles(Some("mail")).unwrap()[0].name, "Mail.app");
        assert_eq!(store.bundles(Some("2")).unwrap()[0].name, "Notes.app");
        assert_eq!(store.keys(1).unwrap(), vec!["a", "b"]);

        let langs = store.languages(None).unwrap();
        assert_eq!(
            langs,
            vec![
                LanguageCount { lang: "de".to_string(), entries: 1 },
                LanguageCount { lang: "en".to_string(), entries: 3 },
            ]
        );

        assert_eq!(
            store.tables(1).unwrap(),
            vec![TableCount { table: "Localizable".to_string(), entries: 3 }]
        );
        assert!(store.tables(99).unwrap().is_empty());

        let info = store.info(1).unwrap().unwrap();
        assert_eq!(info.languages, 2);
        assert_eq!(info.max_translations, 2);
        assert_eq!(info.total, 3);
        assert!(store.info(99).unwrap().is_none());
    }
}
