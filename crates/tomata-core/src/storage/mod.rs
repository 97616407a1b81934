mod config;
pub mod database;

pub use config::{Config, NotificationsConfig, TimerConfig, UiConfig};
pub use database::Database;

use std::path::PathBuf;

/// Returns the data directory, `~/.config/tomata/` by default.
///
/// Set TOMATA_DATA_DIR to use a different location.
///
/// # Errors
/// Returns an error if the directory cannot be created.
pub fn data_dir() -> Result<PathBuf, std::io::Error> {
    let dir = match std::env::var_os("TOMATA_DATA_DIR") {
        Some(custom) => PathBuf::from(custom),
        None => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("tomata"),
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
