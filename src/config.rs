use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment override for the data directory root
pub const DATA_DIR_ENV: &str = "DESKTOP_DATA_DIR";

/// Base name of the snapshot file (`<data-dir>/data/<name>.db`)
pub const STORE_NAME: &str = "ancestortree";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct AppConfig {
    pub data_dir: Option<String>,
    pub migrations_dir: Option<String>,
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("ancestortree.toml")
}

/// `<home>/AncestorTree`, or `./AncestorTree` when no home directory is known
pub fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("AncestorTree")
}

/// Resolve the data directory: CLI flag, then `DESKTOP_DATA_DIR`, then the
/// config file, then the platform default.
pub fn resolve_data_dir(cli: Option<&Path>, config: Option<&AppConfig>) -> PathBuf {
    let env = std::env::var(DATA_DIR_ENV).ok();
    resolve_data_dir_with(cli, env.as_deref(), config)
}

pub fn resolve_data_dir_with(
    cli: Option<&Path>,
    env: Option<&str>,
    config: Option<&AppConfig>,
) -> PathBuf {
    if let Some(dir) = cli {
        return dir.to_path_buf();
    }
    if let Some(dir) = env.filter(|d| !d.is_empty()) {
        return PathBuf::from(dir);
    }
    if let Some(dir) = config.and_then(|c| c.data_dir.as_deref()) {
        return PathBuf::from(dir);
    }
    default_data_dir()
}

/// Candidate migration directories in preference order.
///
/// The primary directory is the explicit override if one is given, otherwise
/// `<cwd>/../desktop/migrations`. The bundled fallback is `<data-dir>/migrations`.
pub fn migration_dirs(explicit: Option<&Path>, config: Option<&AppConfig>, data_dir: &Path) -> Vec<PathBuf> {
    let primary = explicit
        .map(Path::to_path_buf)
        .or_else(|| config.and_then(|c| c.migrations_dir.as_deref()).map(PathBuf::from))
        .unwrap_or_else(|| {
            std::env::current_dir()
                .unwrap_or_else(|_| PathBuf::from("."))
                .join("..")
                .join("desktop")
                .join("migrations")
        });

    vec![primary, data_dir.join("migrations")]
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<AppConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: AppConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &AppConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}
