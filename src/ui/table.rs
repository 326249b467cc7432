use tabled::{settings::Style, Table, Tabled};
use crate::storage::AppliedMigration;

#[derive(Tabled)]
struct MigrationRow {
    #[tabled(rename = "#")]
    id: i64,
    #[tabled(rename = "Migration")]
    name: String,
    #[tabled(rename = "Applied At")]
    applied_at: String,
}

/// Rounded table of applied migrations, empty string when there are none
pub fn migrations_table(migrations: &[AppliedMigration]) -> String {
    if migrations.is_empty() {
        return String::new();
    }

    let rows: Vec<MigrationRow> = migrations
        .iter()
        .map(|m| MigrationRow {
            id: m.id,
            name: m.name.clone(),
            applied_at: m.applied_at.clone().unwrap_or_else(|| "-".to_string()),
        })
        .collect();

    Table::new(rows).with(Style::rounded()).to_string()
}
