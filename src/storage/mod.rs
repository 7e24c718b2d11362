use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::env;
use crate::error::InstallError;

pub const RECENT_VERSIONS_LIMIT: usize = 5;
pub const VERSION_PLACEHOLDER: &str = "—";

const DEFAULT_GITHUB_OWNER: &str = "zvgna";
const DEFAULT_GITHUB_REPO: &str = "translate";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub game_root: String,
    #[serde(default = "default_installed_version")]
    pub installed_version: String,
    #[serde(default = "default_true")]
    pub backup_enabled: bool,
    #[serde(default)]
    pub backup_done: bool,
    #[serde(default)]
    pub recent_versions: Vec<String>,
    #[serde(default = "default_github_owner")]
    pub github_owner: String,
    #[serde(default = "default_github_repo")]
    pub github_repo: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            game_root: String::new(),
            installed_version: default_installed_version(),
            backup_enabled: true,
            backup_done: false,
            recent_versions: Vec::new(),
            github_owner: default_github_owner(),
            github_repo: default_github_repo(),
        }
    }
}

impl Settings {
    /// Whether any version has been applied by this installer yet.
    pub fn has_installed_version(&self) -> bool {
        let version = self.installed_version.trim();
        !version.is_empty() && version != VERSION_PLACEHOLDER
    }

    pub fn set_recent_versions(&mut self, versions: Vec<String>) {
        self.recent_versions = versions;
        self.recent_versions.truncate(RECENT_VERSIONS_LIMIT);
    }
}

fn default_true() -> bool {
    true
}

fn default_installed_version() -> String {
    VERSION_PLACEHOLDER.to_owned()
}

fn default_github_owner() -> String {
    DEFAULT_GITHUB_OWNER.to_owned()
}

fn default_github_repo() -> String {
    DEFAULT_GITHUB_REPO.to_owned()
}

/// Single writer of persisted settings. Mutations stay in memory until `persist` is called,
/// so callers decide when a change becomes durable.
pub trait SettingsStore: Send + Sync {
    fn get(&self) -> Settings;
    /// Apply `change` to the in-memory settings as one step.
    fn update(&self, change: &mut dyn FnMut(&mut Settings));
    fn persist(&self) -> Result<(), InstallError>;
}

pub struct JsonSettingsStore {
    path: PathBuf,
    current: Mutex<Settings>,
}

impl JsonSettingsStore {
    /// Open the settings file in the application data directory.
    pub fn open_default() -> Self {
        // Best-effort directory creation; failures are surfaced on persist.
        let _ = env::ensure_base_dirs();
        let store = Self::load(env::config_path());
        debug!("settings: using {}", store.path().display());
        store
    }

    /// Load settings from `path`. A missing or unreadable document yields the defaults.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let settings = read_settings(&path).unwrap_or_default();
        Self {
            path,
            current: Mutex::new(settings),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, Settings> {
        self.current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SettingsStore for JsonSettingsStore {
    fn get(&self) -> Settings {
        self.lock().clone()
    }

    fn update(&self, change: &mut dyn FnMut(&mut Settings)) {
        change(&mut self.lock());
    }

    fn persist(&self) -> Result<(), InstallError> {
        let raw = {
            let settings = self.lock();
            serde_json::to_string_pretty(&*settings)
                .map_err(|e| InstallError::Unknown(format!("unable to serialize settings: {e}")))?
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| InstallError::io(parent, e))?;
        }
        fs::write(&self.path, raw).map_err(|e| InstallError::io(&self.path, e))?;
        debug!("settings: saved {}", self.path.display());
        Ok(())
    }
}

fn read_settings(path: &Path) -> Option<Settings> {
    let raw = fs::read_to_string(path).ok()?;
    match serde_json::from_str(&raw) {
        Ok(settings) => Some(settings),
        Err(err) => {
            warn!(
                "settings: ignoring unreadable {} ({err}); using defaults",
                path.display()
            );
            None
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::{Settings, SettingsStore};
    use crate::error::InstallError;

    /// In-memory store that counts how often a caller asked for persistence.
    #[derive(Default)]
    pub struct MemorySettingsStore {
        settings: Mutex<Settings>,
        persisted: Mutex<usize>,
    }

    impl MemorySettingsStore {
        pub fn with(settings: Settings) -> Self {
            Self {
                settings: Mutex::new(settings),
                persisted: Mutex::new(0),
            }
        }

        pub fn persist_count(&self) -> usize {
            *self.persisted.lock().unwrap()
        }
    }

    impl SettingsStore for MemorySettingsStore {
        fn get(&self) -> Settings {
            self.settings.lock().unwrap().clone()
        }

        fn update(&self, change: &mut dyn FnMut(&mut Settings)) {
            change(&mut self.settings.lock().unwrap());
        }

        fn persist(&self) -> Result<(), InstallError> {
            *self.persisted.lock().unwrap() += 1;
            Ok(())
        }
    }
}
