//! SQLite storage implementation

use std::cell::OnceCell;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use rusqlite::{Connection, DatabaseName, Params};
use rusqlite::backup::Progress;
use rusqlite::types::ValueRef;
use serde::Serialize;
use crate::{Result, Error};
use crate::config::STORE_NAME;

/// Where a store keeps its snapshot file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotLocation {
    data_dir: PathBuf,
    name: String,
}

impl SnapshotLocation {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self::with_name(data_dir, STORE_NAME)
    }

    pub fn with_name(data_dir: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            data_dir: data_dir.into(),
            name: name.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Directory holding the snapshot: `<data-dir>/data`
    pub fn snapshot_dir(&self) -> PathBuf {
        self.data_dir.join("data")
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.snapshot_dir().join(format!("{}.db", self.name))
    }

    /// Staging file for flushes, always in the snapshot's own directory so
    /// the final rename never crosses filesystems.
    pub fn temp_path(&self) -> PathBuf {
        self.snapshot_dir().join(format!("{}.db.tmp", self.name))
    }
}

/// One result set: column names plus rows in statement order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub values: Vec<Vec<serde_json::Value>>,
}

/// In-memory SQLite handle backed by a snapshot file.
///
/// Construction does no I/O. The handle is created on first use and lives
/// as long as the store. Nothing reaches disk until [`Store::flush`].
pub struct Store {
    location: SnapshotLocation,
    conn: OnceCell<Connection>,
}

impl Store {
    pub fn new(location: SnapshotLocation) -> Self {
        Self {
            location,
            conn: OnceCell::new(),
        }
    }

    pub fn location(&self) -> &SnapshotLocation {
        &self.location
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.location.snapshot_path()
    }

    /// The handle, only if it has already been opened
    pub fn connection(&self) -> Option<&Connection> {
        self.conn.get()
    }

    pub fn is_open(&self) -> bool {
        self.conn.get().is_some()
    }

    /// Whether a snapshot file exists (first-run detection)
    pub fn exists(&self) -> bool {
        self.location.snapshot_path().exists()
    }

    /// Return the handle, opening it from the snapshot on first call
    pub fn open(&self) -> Result<&Connection> {
        if let Some(conn) = self.conn.get() {
            return Ok(conn);
        }
        let conn = self.load()?;
        Ok(self.conn.get_or_init(|| conn))
    }

    fn load(&self) -> Result<Connection> {
        let dir = self.location.snapshot_dir();
        let path = self.location.snapshot_path();

        fs::create_dir_all(&dir).map_err(|e| Error::store_init(&dir, e))?;

        let mut conn = Connection::open_in_memory().map_err(|e| Error::store_init(&path, e))?;

        if path.exists() {
            conn.restore(DatabaseName::Main, &path, None::<fn(Progress)>)
                .map_err(|e| Error::store_init(&path, e))?;
            tracing::info!("Restored store from snapshot {}", path.display());
        } else {
            tracing::info!("No snapshot at {}, starting with an empty store", path.display());
        }

        // An in-memory database only supports MEMORY or OFF journaling
        let mode: String = conn
            .pragma_update_and_check(None, "journal_mode", "MEMORY", |row| row.get(0))
            .map_err(|e| Error::store_init(&path, e))?;
        conn.pragma_update(None, "foreign_keys", true)
            .map_err(|e| Error::store_init(&path, e))?;
        tracing::debug!("Store handle ready (journal_mode={})", mode);

        Ok(conn)
    }

    // ========== Statement Operations ==========

    /// Execute a single statement, returning the number of changed rows
    pub fn execute<P: Params>(&self, sql: &str, params: P) -> Result<usize> {
        let changed = self.open()?.execute(sql, params)?;
        Ok(changed)
    }

    /// Execute a script of one or more statements without parameters
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.open()?.execute_batch(sql)?;
        Ok(())
    }

    /// Run a statement and collect its rows.
    ///
    /// Returns no result set when the statement produced no rows, otherwise
    /// exactly one.
    pub fn query<P: Params>(&self, sql: &str, params: P) -> Result<Vec<ResultSet>> {
        let conn = self.open()?;
        let mut stmt = conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let mut rows = stmt.query(params)?;
        let mut values = Vec::new();
        while let Some(row) = rows.next()? {
            let mut record = Vec::with_capacity(columns.len());
            for idx in 0..columns.len() {
                record.push(value_to_json(row.get_ref(idx)?));
            }
            values.push(record);
        }

        if values.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![ResultSet { columns, values }])
    }

    /// Run a statement and return its first column as text, skipping NULLs
    pub fn query_strings<P: Params>(&self, sql: &str, params: P) -> Result<Vec<String>> {
        let conn = self.open()?;
        let mut stmt = conn.prepare_cached(sql)?;
        let values = stmt
            .query_map(params, |row| row.get::<_, Option<String>>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(values.into_iter().flatten().collect())
    }

    // ========== Persistence ==========

    /// Write the whole database to the snapshot file.
    ///
    /// The snapshot is written to a temp file next to the canonical one and
    /// then renamed over it, so the canonical file is either the old or the
    /// new version, never a partial one. No-op if the store was never opened.
    pub fn flush(&self) -> Result<()> {
        let Some(conn) = self.conn.get() else {
            tracing::debug!("Flush skipped, store never opened");
            return Ok(());
        };

        let dir = self.location.snapshot_dir();
        let path = self.location.snapshot_path();
        let tmp = self.location.temp_path();

        fs::create_dir_all(&dir)?;

        // Left over from an interrupted flush
        match fs::remove_file(&tmp) {
            Ok(()) => tracing::warn!("Removed stale snapshot temp file {}", tmp.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        conn.backup(DatabaseName::Main, &tmp, None)?;
        let bytes = fs::metadata(&tmp)?.len();
        fs::rename(&tmp, &path)?;

        tracing::debug!("Flushed {} bytes to {}", bytes, path.display());
        Ok(())
    }
}

fn value_to_json(value: ValueRef<'_>) -> serde_json::Value {
    match value {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Integer(i) => serde_json::Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ValueRef::Text(t) => serde_json::Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => serde_json::Value::from(b.to_vec()),
    }
}
