use crate::install::{InstallOutcome, InstallStage};
use crate::updater::UpdateStatus;

// Everything the engine reports back to the UI or CLI.
#[derive(Clone, Debug)]
pub enum EngineEvent {
    UpdateChecked(Result<UpdateStatus, String>),
    RecentVersions(Result<Vec<String>, String>),
    Installing {
        stage: InstallStage,
        progress: f32,
        speed: Option<String>,
    },
    InstallFinished(InstallOutcome),
    Restored(Result<Vec<String>, String>),
    SettingsSaveFailed(String),
}

// Actions triggered by the user from the UI layer.
#[derive(Clone, Debug)]
pub enum UserAction {
    CheckForUpdates,
    LoadRecentVersions,
    Install {
        game_root: String,
        version: Option<String>,
    },
    RestoreBackup {
        game_root: String,
    },
    SetBackupEnabled(bool),
    SetGameRoot(String),
}
