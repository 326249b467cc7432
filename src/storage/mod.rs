//! Storage Layer - file-backed in-memory SQLite
//!
//! The live database is an in-memory SQLite handle. Durability comes from
//! full snapshots written to `<data-dir>/data/<name>.db`:
//! - `Store` owns the handle and the snapshot file
//! - `MigrationRunner` applies `*.sql` scripts exactly once, tracked in `_migrations`

pub mod migrations;
pub mod schema;
pub mod sqlite;

pub use migrations::{AppliedMigration, MigrationReport, MigrationRunner};
pub use sqlite::{ResultSet, SnapshotLocation, Store};
