//! Application directories.

use std::path::PathBuf;

const APP_DIR: &str = "palimpsest";

/// `<config dir>/palimpsest`, home of the user config, identity and log.
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR))
}

pub fn user_config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

pub fn user_identity_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("user.toml"))
}

/// Log file, falling back to the working directory when no config dir exists.
pub fn log_path() -> PathBuf {
    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("palimpsest.log")
}

/// `<data dir>/palimpsest`.
pub fn data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join(APP_DIR))
}

pub fn projects_dir() -> Option<PathBuf> {
    data_dir().map(|d| d.join("projects"))
}

pub fn samples_dir() -> Option<PathBuf> {
    data_dir().map(|d| d.join("samples"))
}

/// Default location for a new project named `name`.
pub fn default_project_path(name: &str) -> Option<PathBuf> {
    projects_dir().map(|d| d.join(format!("{}.palimpsest", name)))
}
