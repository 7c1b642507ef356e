//! Configuration loading and data directory resolution

use crate::Result;
use std::path::PathBuf;

/// Environment variable naming the data directory
pub const DATA_DIR_ENV: &str = "SIMA_DATA_DIR";

/// Resolve the data directory, in priority order:
/// 1. Command-line argument (highest priority)
/// 2. `SIMA_DATA_DIR` environment variable
/// 3. `data_dir` key in the TOML config file
/// 4. OS-dependent default (fallback)
pub fn resolve_data_dir(cli_arg: Option<&str>) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(DATA_DIR_ENV) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Some(config_path) = config_file_path() {
        if let Ok(toml_content) = std::fs::read_to_string(&config_path) {
            if let Ok(config) = toml::from_str::<toml::Value>(&toml_content) {
                if let Some(data_dir) = config.get("data_dir").and_then(|v| v.as_str()) {
                    return PathBuf::from(data_dir);
                }
            }
        }
    }

    // Priority 4: OS-dependent default
    default_data_dir()
}

/// Configuration file path for the platform (~/.config/simanggota/config.toml
/// on Linux, the platform config dir elsewhere)
fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("simanggota").join("config.toml"))
}

/// OS-dependent default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("simanggota"))
        .unwrap_or_else(|| PathBuf::from(".simanggota"))
}

/// Create the data directory (and its imports/ subdirectory) if missing
pub fn ensure_data_dir(data_dir: &PathBuf) -> Result<()> {
    std::fs::create_dir_all(data_dir.join("imports"))?;
    Ok(())
}

/// Database file path inside the data directory
pub fn database_path(data_dir: &PathBuf) -> PathBuf {
    data_dir.join("simanggota.db")
}
