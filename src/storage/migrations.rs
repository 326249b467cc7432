//! Migration runner
//!
//! Discovers `*.sql` scripts in a list of candidate directories, applies
//! the ones not yet recorded in `_migrations` in lexicographic order, and
//! flushes the store once at the end of the run.

use std::fs;
use std::path::{Path, PathBuf};
use serde::Serialize;
use crate::{Result, Error};
use super::schema;
use super::sqlite::Store;

/// A row of the tracking table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedMigration {
    pub id: i64,
    pub name: String,
    pub applied_at: Option<String>,
}

/// Outcome of a migration run
#[derive(Debug, Clone, Default, Serialize)]
pub struct MigrationReport {
    pub source_dir: Option<PathBuf>,
    pub applied: Vec<String>,
    pub skipped: Vec<String>,
}

impl std::fmt::Display for MigrationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Migration Run:")?;
        match &self.source_dir {
            Some(dir) => writeln!(f, "  Source: {}", dir.display())?,
            None => writeln!(f, "  Source: (none found)")?,
        }
        writeln!(f, "  Applied: {}", self.applied.len())?;
        writeln!(f, "  Skipped: {}", self.skipped.len())
    }
}

/// Scripts found in one candidate directory, sorted by file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationSource {
    pub dir: PathBuf,
    pub names: Vec<String>,
}

/// Applies pending migrations to a store
pub struct MigrationRunner<'a> {
    store: &'a Store,
    dirs: Vec<PathBuf>,
}

impl<'a> MigrationRunner<'a> {
    /// `dirs` are candidate directories in preference order
    pub fn new(store: &'a Store, dirs: Vec<PathBuf>) -> Self {
        Self { store, dirs }
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// Apply every pending migration from the chosen source directory.
    ///
    /// Stops at the first failing script. That script is not recorded, and
    /// migrations applied earlier in the run stay in memory unflushed.
    pub fn run(&self) -> Result<MigrationReport> {
        self.store.execute_batch(schema::CREATE_MIGRATIONS_TABLE)?;

        let Some(source) = self.discover()? else {
            tracing::info!("No migration scripts found in {:?}", self.dirs);
            return Ok(MigrationReport::default());
        };

        let mut report = MigrationReport {
            source_dir: Some(source.dir.clone()),
            ..Default::default()
        };

        for name in &source.names {
            if self.is_applied(name)? {
                tracing::debug!("Skipping already applied migration {}", name);
                report.skipped.push(name.clone());
                continue;
            }

            let script = fs::read_to_string(source.dir.join(name))?;
            self.apply(name, &script)?;
            tracing::info!("Applied migration {}", name);
            report.applied.push(name.clone());
        }

        self.store.flush()?;
        Ok(report)
    }

    /// Pick the directory to migrate from.
    ///
    /// The first directory with at least one `.sql` entry wins. Any other
    /// non-empty candidate must list exactly the same names, otherwise the
    /// deployment is ambiguous and nothing is applied.
    pub fn discover(&self) -> Result<Option<MigrationSource>> {
        let mut chosen: Option<MigrationSource> = None;

        for dir in &self.dirs {
            let names = list_sql_files(dir)?;
            if names.is_empty() {
                continue;
            }

            match &chosen {
                None => {
                    chosen = Some(MigrationSource {
                        dir: dir.clone(),
                        names,
                    })
                }
                Some(first) if first.names != names => {
                    return Err(Error::MigrationSource(format!(
                        "{} and {} contain different migration sets",
                        first.dir.display(),
                        dir.display()
                    )));
                }
                Some(_) => {
                    tracing::debug!("Ignoring duplicate migration source {}", dir.display());
                }
            }
        }

        Ok(chosen)
    }

    fn is_applied(&self, name: &str) -> Result<bool> {
        let rows = self.store.query(schema::MIGRATION_APPLIED, [name])?;
        Ok(!rows.is_empty())
    }

    /// Run one script and its tracking insert in a single transaction
    fn apply(&self, name: &str, script: &str) -> Result<()> {
        let conn = self.store.open()?;
        let tx = conn.unchecked_transaction()?;

        let wrap = |source| Error::Migration {
            name: name.to_string(),
            source,
        };
        tx.execute_batch(script).map_err(wrap)?;
        tx.execute(schema::RECORD_MIGRATION, [name]).map_err(wrap)?;
        tx.commit()?;
        Ok(())
    }
}

/// Rows of the tracking table in application order.
///
/// Returns an empty list if no migration run has created the table yet.
pub fn applied_migrations(store: &Store) -> Result<Vec<AppliedMigration>> {
    let tracked = store.query(
        "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = '_migrations'",
        [],
    )?;
    if tracked.is_empty() {
        return Ok(Vec::new());
    }

    let conn = store.open()?;
    let mut stmt = conn.prepare(schema::LIST_MIGRATIONS)?;
    let rows = stmt
        .query_map([], |row| {
            Ok(AppliedMigration {
                id: row.get(0)?,
                name: row.get(1)?,
                applied_at: row.get(2)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Sorted file names of `*.sql` files directly inside `dir`
fn list_sql_files(dir: &Path) -> Result<Vec<String>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let pattern = format!("{}/*.sql", glob::Pattern::escape(&dir.to_string_lossy()));

    let entries = glob::glob(&pattern)
        .map_err(|e| Error::MigrationSource(format!("invalid pattern {}: {}", pattern, e)))?;

    let mut names = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| Error::Io(e.into_error()))?;
        if !path.is_file() {
            continue;
        }
        if let Some(name) = path.file_name() {
            names.push(name.to_string_lossy().into_owned());
        }
    }

    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SnapshotLocation;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, sql: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join(name), sql).unwrap();
    }

    fn setup() -> (TempDir, Store, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(SnapshotLocation::new(dir.path().join("home")));
        let sql_dir = dir.path().join("sql");
        (dir, store, sql_dir)
    }

    fn log_order(store: &Store) -> Vec<String> {
        store.query_strings("SELECT step FROM log ORDER BY seq", []).unwrap()
    }

    #[test]
    fn test_applies_in_lexicographic_order() {
        let (_dir, store, sql_dir) = setup();
        // Written out of order on purpose
        write(&sql_dir, "010_z.sql", "INSERT INTO log (step) VALUES ('010');");
        write(&sql_dir, "002_y.sql", "INSERT INTO log (step) VALUES ('002');");
        write(
            &sql_dir,
            "001_x.sql",
            "CREATE TABLE log (seq INTEGER PRIMARY KEY AUTOINCREMENT, step TEXT);
             INSERT INTO log (step) VALUES ('001');",
        );
        write(&sql_dir, "README.md", "not a migration");

        let report = MigrationRunner::new(&store, vec![sql_dir.clone()]).run().unwrap();

        assert_eq!(report.applied, vec!["001_x.sql", "002_y.sql", "010_z.sql"]);
        assert_eq!(report.source_dir, Some(sql_dir));
        assert_eq!(log_order(&store), vec!["001", "002", "010"]);
        assert!(store.exists());
    }

    #[test]
    fn test_second_run_is_noop() {
        let (_dir, store, sql_dir) = setup();
        write(&sql_dir, "001_people.sql", "CREATE TABLE people (id TEXT PRIMARY KEY);");
        write(&sql_dir, "002_seed.sql", "INSERT INTO people (id) VALUES ('p1');");

        let runner = MigrationRunner::new(&store, vec![sql_dir]);
        runner.run().unwrap();
        let second = runner.run().unwrap();

        assert!(second.applied.is_empty());
        assert_eq!(second.skipped.len(), 2);

        let applied = applied_migrations(&store).unwrap();
        let names: Vec<_> = applied.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["001_people.sql", "002_seed.sql"]);
        assert!(applied.iter().all(|m| m.applied_at.is_some()));
    }

    #[test]
    fn test_failure_stops_run_and_is_retried() {
        let (_dir, store, sql_dir) = setup();
        write(&sql_dir, "001_people.sql", "CREATE TABLE people (id TEXT PRIMARY KEY);");
        write(
            &sql_dir,
            "002_broken.sql",
            "INSERT INTO people (id) VALUES ('p1'); INSERT INTO nowhere VALUES (1);",
        );
        write(&sql_dir, "003_more.sql", "INSERT INTO people (id) VALUES ('p2');");

        let runner = MigrationRunner::new(&store, vec![sql_dir.clone()]);
        let err = runner.run().unwrap_err();
        match err {
            Error::Migration { name, .. } => assert_eq!(name, "002_broken.sql"),
            other => panic!("unexpected error: {other}"),
        }

        let names: Vec<_> = applied_migrations(&store).unwrap().into_iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["001_people.sql"]);
        // Partial effects of the failed script are rolled back
        assert!(store.query_strings("SELECT id FROM people", []).unwrap().is_empty());
        // Nothing was flushed
        assert!(!store.exists());

        write(&sql_dir, "002_broken.sql", "INSERT INTO people (id) VALUES ('p1');");
        let report = runner.run().unwrap();
        assert_eq!(report.applied, vec!["002_broken.sql", "003_more.sql"]);
        assert_eq!(report.skipped, vec!["001_people.sql"]);
        assert_eq!(
            store.query_strings("SELECT id FROM people ORDER BY id", []).unwrap(),
            vec!["p1", "p2"]
        );
    }

    #[test]
    fn test_falls_back_to_second_directory() {
        let (dir, store, sql_dir) = setup();
        let fallback = dir.path().join("bundled");
        fs::create_dir_all(&sql_dir).unwrap();
        write(&fallback, "001_people.sql", "CREATE TABLE people (id TEXT PRIMARY KEY);");

        let report = MigrationRunner::new(&store, vec![sql_dir, fallback.clone()]).run().unwrap();
        assert_eq!(report.source_dir, Some(fallback));
        assert_eq!(report.applied.len(), 1);
    }

    #[test]
    fn test_conflicting_sources_rejected() {
        let (dir, store, sql_dir) = setup();
        let other = dir.path().join("bundled");
        write(&sql_dir, "001_a.sql", "CREATE TABLE a (x INTEGER);");
        write(&other, "001_b.sql", "CREATE TABLE b (x INTEGER);");

        let err = MigrationRunner::new(&store, vec![sql_dir, other]).run().unwrap_err();
        assert!(matches!(err, Error::MigrationSource(_)));
        assert!(applied_migrations(&store).unwrap().is_empty());
    }

    #[test]
    fn test_identical_sources_use_first() {
        let (dir, store, sql_dir) = setup();
        let other = dir.path().join("bundled");
        write(&sql_dir, "001_a.sql", "CREATE TABLE a (x INTEGER);");
        write(&other, "001_a.sql", "CREATE TABLE a (x INTEGER);");

        let report = MigrationRunner::new(&store, vec![sql_dir.clone(), other]).run().unwrap();
        assert_eq!(report.source_dir, Some(sql_dir));
    }

    #[test]
    fn test_no_sources_does_not_flush() {
        let (dir, store, _sql_dir) = setup();

        let report = MigrationRunner::new(&store, vec![dir.path().join("missing")]).run().unwrap();
        assert!(report.source_dir.is_none());
        assert!(!store.exists());
        assert!(applied_migrations(&store).unwrap().is_empty());
    }
}
