use log::info;

use crate::error::InstallError;
use crate::release::ReleaseSource;
use crate::storage::VERSION_PLACEHOLDER;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateStatus {
    NotInstalled { latest_version: String },
    UpToDate { version: String },
    UpdateAvailable { latest_version: String, notes: String },
}

impl UpdateStatus {
    pub fn latest_version(&self) -> &str {
        match self {
            UpdateStatus::NotInstalled { latest_version }
            | UpdateStatus::UpdateAvailable { latest_version, .. } => latest_version,
            UpdateStatus::UpToDate { version } => version,
        }
    }
}

/// Compare the installed translation with the latest published release.
///
/// # Errors
/// Returns the release host error if the latest release cannot be fetched.
pub async fn check_for_updates<S: ReleaseSource>(
    source: &S,
    installed_version: &str,
) -> Result<UpdateStatus, InstallError> {
    let release = source.latest().await?;
    let status = evaluate(installed_version, &release.version, &release.notes);
    info!("check_for_updates: installed={installed_version} status={status:?}");
    Ok(status)
}

/// Any difference from the latest tag counts as an update, so rollbacks are offered
/// the newest version again.
pub fn evaluate(installed: &str, latest: &str, notes: &str) -> UpdateStatus {
    let installed_trimmed = installed.trim();
    if installed_trimmed.is_empty() || installed_trimmed == VERSION_PLACEHOLDER {
        return UpdateStatus::NotInstalled {
            latest_version: latest.to_owned(),
        };
    }
    if normalize_version(installed_trimmed) == normalize_version(latest) {
        UpdateStatus::UpToDate {
            version: latest.to_owned(),
        }
    } else {
        UpdateStatus::UpdateAvailable {
            latest_version: latest.to_owned(),
            notes: notes.to_owned(),
        }
    }
}

/// Normalize version string by removing 'v' prefix and cleaning up.
fn normalize_version(version: &str) -> String {
    version
        .trim()
        .trim_start_matches(['v', 'V'])
        .to_owned()
}
