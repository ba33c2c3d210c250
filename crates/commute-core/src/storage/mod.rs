mod config;
pub mod database;

pub use config::{CommuteConfig, Config, EngineConfig, RefreshConfig, ScheduleConfig};
pub use database::{update_json, KvStore, MemoryStore, SqliteStore};

use std::path::PathBuf;

/// Returns `~/.config/commute[-dev]/` based on COMMUTE_ENV.
///
/// Set COMMUTE_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, std::io::Error> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("COMMUTE_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("commute-dev")
    } else {
        base_dir.join("commute")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
