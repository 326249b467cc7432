//! Schema and statement definitions owned by the storage core
//!
//! The genealogy tables themselves (people, families, children) are created
//! by migration scripts; only the tracking table is defined here.

/// SQL to create the migration tracking table
pub const CREATE_MIGRATIONS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS _migrations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    applied_at TEXT DEFAULT (datetime('now'))
)
"#;

pub const MIGRATION_APPLIED: &str = "SELECT 1 FROM _migrations WHERE name = ?1";

pub const RECORD_MIGRATION: &str = "INSERT INTO _migrations (name) VALUES (?1)";

pub const LIST_MIGRATIONS: &str = "SELECT id, name, applied_at FROM _migrations ORDER BY id";

/// Families in which a person is either parent
pub const FAMILIES_BY_PARENT: &str =
    "SELECT id FROM families WHERE father_id = ?1 OR mother_id = ?1";

/// Children linked to a family
pub const CHILDREN_OF_FAMILY: &str = "SELECT person_id FROM children WHERE family_id = ?1";
