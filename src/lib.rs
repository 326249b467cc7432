//! # AncestorTree desktop storage core
//!
//! Local, durable storage for the genealogy dataset when running offline.
//!
//! Provides:
//! - A lazily opened in-memory SQLite handle restored from a snapshot file
//! - Atomic snapshot flushing (write temp file, rename over canonical path)
//! - Ordered, exactly-once SQL migrations with a tracking table
//! - Descendant reachability queries over the families/children tables
//! - A small RPC dispatcher with a uniform `{data, error}` envelope
//! - A fixed single-user identity provider for desktop mode

pub mod auth;
pub mod config;
pub mod query;
pub mod rpc;
pub mod server;
pub mod storage;
pub mod ui;

// Re-exports for convenient access
pub use auth::{AuthProvider, DesktopAuth};
pub use query::SubtreeQuery;
pub use rpc::{RpcDispatcher, RpcResult};
pub use storage::{MigrationRunner, SnapshotLocation, Store};

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for store, migration and RPC operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Failed to initialize store at {path}: {reason}")]
    StoreInit {
        path: std::path::PathBuf,
        reason: String,
    },

    #[error("Query error: {0}")]
    Query(#[from] rusqlite::Error),

    #[error("Migration {name} failed: {source}")]
    Migration {
        name: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Migration source error: {0}")]
    MigrationSource(String),

    #[error("{0}")]
    Validation(String),

    #[error("Unknown RPC function: {0}")]
    UnknownFunction(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn store_init(path: &std::path::Path, reason: impl std::fmt::Display) -> Self {
        Error::StoreInit {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}
