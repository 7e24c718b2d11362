use std::env;
use std::fs;
use std::path::PathBuf;

const APP_DIR_NAME: &str = "wwmru";

/// Returns the private data directory used by the installer.
pub fn default_app_dir() -> PathBuf {
    let base = match env::consts::OS {
        "windows" => env::var_os("LOCALAPPDATA")
            .or_else(|| env::var_os("APPDATA"))
            .map(PathBuf::from),
        "macos" => env::var_os("HOME")
            .map(PathBuf::from)
            .map(|home| home.join("Library").join("Application Support")),
        _ => env::var_os("HOME")
            .map(PathBuf::from)
            .map(|home| home.join(".local").join("share")),
    }
    .unwrap_or_else(|| PathBuf::from("."));

    base.join(APP_DIR_NAME)
}

pub fn config_path() -> PathBuf {
    default_app_dir().join("config.json")
}

/// Pristine copies of the game's translation files live here, never inside the game tree.
pub fn backup_dir() -> PathBuf {
    default_app_dir().join("backup").join("original")
}

/// Create the on-disk folder layout expected by the installer.
pub fn ensure_base_dirs() -> std::io::Result<()> {
    fs::create_dir_all(default_app_dir())
}
