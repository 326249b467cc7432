//! AncestorTree desktop CLI - migrate, inspect and serve the offline store

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use ancestortree::auth::DesktopAuth;
use ancestortree::config::{self, AppConfig};
use ancestortree::rpc::{RpcDispatcher, RpcParams};
use ancestortree::server::{self, AppState};
use ancestortree::storage::{migrations, MigrationRunner, SnapshotLocation, Store};
use ancestortree::ui::{self, Icons};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "ancestortree")]
#[command(version)]
#[command(about = "Offline storage for AncestorTree desktop mode")]
#[command(long_about = r#"
Keeps the genealogy database in memory and snapshots it to
<data-dir>/data/ancestortree.db.

Example usage:
  ancestortree migrate --migrations-dir ./desktop/migrations
  ancestortree rpc is_person_in_subtree --params '{"root_id":"p1","target_id":"p3"}'
  ancestortree serve --port 3001
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Data directory root (overrides DESKTOP_DATA_DIR and the config file)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print machine-readable JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending SQL migrations
    Migrate {
        /// Primary migrations directory
        #[arg(short, long)]
        migrations_dir: Option<PathBuf>,
    },

    /// Show snapshot location and applied migrations
    Status,

    /// Call an RPC function and print the result envelope
    Rpc {
        /// Function name, e.g. is_person_in_subtree
        function: String,

        /// Parameters as a JSON object
        #[arg(short, long, default_value = "{}")]
        params: String,
    },

    /// Migrate, then serve the RPC and auth endpoints over HTTP
    Serve {
        /// Port to listen on (localhost only)
        #[arg(short, long, default_value = "3001")]
        port: u16,

        /// Primary migrations directory
        #[arg(short, long)]
        migrations_dir: Option<PathBuf>,
    },

    /// Write a config file with the resolved data directory
    InitConfig {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let app_config = config::load_config(cli.config.as_deref())?;
    let data_dir = config::resolve_data_dir(cli.data_dir.as_deref(), app_config.as_ref());
    let store = Store::new(SnapshotLocation::new(&data_dir));

    match cli.command {
        Commands::Migrate { migrations_dir } => {
            let dirs = config::migration_dirs(migrations_dir.as_deref(), app_config.as_ref(), &data_dir);
            run_migrations(&store, dirs, cli.json)?;
        }

        Commands::Status => {
            let applied = migrations::applied_migrations(&store)?;

            if cli.json {
                let data = serde_json::json!({
                    "data_dir": data_dir,
                    "snapshot_path": store.snapshot_path(),
                    "exists": store.exists(),
                    "migrations": applied,
                });
                println!("{}", serde_json::to_string_pretty(&data)?);
            } else {
                ui::header("AncestorTree Store");
                ui::field(Icons::DATABASE, "Snapshot", &store.snapshot_path().display().to_string());
                ui::field(Icons::DATABASE, "Exists", &store.exists().to_string());
                if applied.is_empty() {
                    ui::warn("No migrations applied yet");
                } else {
                    println!("{}", ui::migrations_table(&applied));
                }
            }
        }

        Commands::Rpc { function, params } => {
            let params: RpcParams = serde_json::from_str(&params)?;
            let result = RpcDispatcher::new(&store).handle(&function, &params)?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            if !result.is_ok() {
                std::process::exit(1);
            }
        }

        Commands::Serve { port, migrations_dir } => {
            let dirs = config::migration_dirs(migrations_dir.as_deref(), app_config.as_ref(), &data_dir);
            run_migrations(&store, dirs, cli.json)?;

            let state = AppState::new(store, Arc::new(DesktopAuth::new()));
            server::start_server(port, state).await?;
        }

        Commands::InitConfig { force } => {
            let path = cli.config.clone().unwrap_or_else(config::default_config_path);
            let new_config = AppConfig {
                data_dir: Some(data_dir.display().to_string()),
                ..app_config.unwrap_or_default()
            };
            config::write_config(&path, &new_config, force)?;
            ui::success(&format!("Wrote {}", path.display()));
        }
    }

    Ok(())
}

fn run_migrations(store: &Store, dirs: Vec<PathBuf>, json: bool) -> anyhow::Result<()> {
    if !store.exists() {
        tracing::info!("No snapshot yet, populating a new store");
    }

    let runner = MigrationRunner::new(store, dirs);
    let report = match runner.run() {
        Ok(report) => report,
        Err(e) => {
            if !json {
                ui::error(&e.to_string());
            }
            return Err(e.into());
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    match &report.source_dir {
        Some(dir) => ui::field(Icons::DATABASE, "Migrations", &dir.display().to_string()),
        None => ui::warn(&format!("No .sql files found in {}", describe_dirs(runner.dirs()))),
    }
    for name in &report.skipped {
        ui::migration_skipped(name);
    }
    for name in &report.applied {
        ui::migration_applied(name);
    }
    ui::success(&format!(
        "{} applied, {} already up to date",
        report.applied.len(),
        report.skipped.len()
    ));
    Ok(())
}

fn describe_dirs(dirs: &[PathBuf]) -> String {
    dirs.iter()
        .map(|d| d.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
