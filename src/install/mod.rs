use std::any::Any;
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use futures_util::FutureExt;
use log::{debug, error, info, warn};

use crate::backup::{BackupManager, BackupReport};
use crate::error::{ErrorKind, InstallError};
use crate::release::{
    AssetDescriptor, DownloadProgress, ReleaseDescriptor, ReleaseSelector, ReleaseSource,
};
use crate::resolver;

/// Mandatory translation table shipped with every release.
pub const ASSET_MAIN: &str = "translate_words_map_en";
/// Optional companion table; many releases do not carry it.
pub const ASSET_DIFF: &str = "translate_words_map_en_diff";

const PENDING_SUFFIX: &str = ".wwmru-part";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InstallStage {
    Fetching,
    Resolving,
    BackingUp,
    Staging { asset: String },
    Committing { asset: String },
    Done,
}

impl fmt::Display for InstallStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstallStage::Fetching => write!(f, "fetching release"),
            InstallStage::Resolving => write!(f, "resolving game folder"),
            InstallStage::BackingUp => write!(f, "backing up originals"),
            InstallStage::Staging { asset } => write!(f, "downloading {asset}"),
            InstallStage::Committing { asset } => write!(f, "installing {asset}"),
            InstallStage::Done => write!(f, "done"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct InstallProgress {
    pub stage: InstallStage,
    pub download: Option<DownloadProgress>,
}

pub type ProgressCallback<'a> = Option<&'a mut (dyn FnMut(InstallProgress) + Send)>;

fn emit_progress(
    cb: &mut ProgressCallback<'_>,
    stage: InstallStage,
    download: Option<DownloadProgress>,
) {
    if let Some(callback) = cb.as_deref_mut() {
        callback(InstallProgress { stage, download });
    }
}

/// Structured result of one install attempt. Always produced, never an error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstallOutcome {
    pub success: bool,
    pub version: String,
    pub message: String,
    pub kind: Option<ErrorKind>,
    pub installed: Vec<String>,
    pub locale_dir: Option<PathBuf>,
    pub warnings: Vec<String>,
}

impl InstallOutcome {
    pub(crate) fn failure(version: &str, err: &InstallError) -> Self {
        let message = match err.kind() {
            ErrorKind::Permission => format!(
                "Insufficient privileges to write to the game folder ({err}). \
                 Run WWMRU as administrator or move the game to a folder you can write to."
            ),
            ErrorKind::Busy => format!("{err}. Wait for it to finish and try again."),
            _ => format!("Error: {err}"),
        };
        Self {
            success: false,
            version: version.to_owned(),
            message,
            kind: Some(err.kind()),
            installed: Vec::new(),
            locale_dir: None,
            warnings: Vec::new(),
        }
    }
}

struct InstallReport {
    installed: Vec<String>,
    locale_dir: PathBuf,
    diff_published: bool,
    warnings: Vec<String>,
}

impl InstallReport {
    fn into_outcome(self, version: &str) -> InstallOutcome {
        let mut message = format!(
            "Installed version: {version}\nFiles: {}\nPath: {}",
            self.installed.join(", "),
            self.locale_dir.display()
        );
        if !self.diff_published {
            message.push_str(&format!(
                "\n({ASSET_DIFF} is not part of this release; this is normal)"
            ));
        }
        for warning in &self.warnings {
            message.push_str("\nWarning: ");
            message.push_str(warning);
        }
        InstallOutcome {
            success: true,
            version: version.to_owned(),
            message,
            kind: None,
            installed: self.installed,
            locale_dir: Some(self.locale_dir),
            warnings: self.warnings,
        }
    }
}

/// Drives one release from the host into the game's locale directory.
pub struct Installer<S> {
    source: S,
    backup: BackupManager,
    active: Mutex<HashSet<PathBuf>>,
}

/// Held while an install writes into a locale directory.
struct TargetGuard<'a> {
    active: &'a Mutex<HashSet<PathBuf>>,
    target: PathBuf,
}

impl Drop for TargetGuard<'_> {
    fn drop(&mut self) {
        lock_targets(self.active).remove(&self.target);
    }
}

fn lock_targets(active: &Mutex<HashSet<PathBuf>>) -> MutexGuard<'_, HashSet<PathBuf>> {
    active
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<S: ReleaseSource> Installer<S> {
    pub fn new(source: S, backup: BackupManager) -> Self {
        Self {
            source,
            backup,
            active: Mutex::new(HashSet::new()),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn backup(&self) -> &BackupManager {
        &self.backup
    }

    /// Install the selected release into the game found at or near `game_path`.
    ///
    /// Every failure, including a panic inside the operation, comes back as an outcome
    /// with `success == false`.
    pub async fn install(
        &self,
        game_path: &Path,
        selector: &ReleaseSelector,
        mut progress: ProgressCallback<'_>,
    ) -> InstallOutcome {
        let attempt = AssertUnwindSafe(self.run(game_path, selector, &mut progress))
            .catch_unwind()
            .await;
        match attempt {
            Ok(outcome) => outcome,
            Err(panic) => {
                let detail = panic_detail(panic.as_ref());
                error!("install: aborted by internal fault: {detail}");
                InstallOutcome::failure(
                    selector.label(),
                    &InstallError::Unknown(format!("internal error: {detail}")),
                )
            }
        }
    }

    /// Put the backed-up originals back into the game's locale directory.
    pub fn restore(&self, game_path: &Path) -> Result<Vec<String>, InstallError> {
        let locale_dir = resolver::locale_dir(&resolver::resolve_base(game_path));
        let _guard = self.acquire(&locale_dir)?;
        self.backup.restore(&locale_dir, &[ASSET_MAIN, ASSET_DIFF])
    }

    async fn run(
        &self,
        game_path: &Path,
        selector: &ReleaseSelector,
        progress: &mut ProgressCallback<'_>,
    ) -> InstallOutcome {
        emit_progress(progress, InstallStage::Fetching, None);
        let release = match self.source.fetch(selector).await {
            Ok(release) => release,
            Err(err) => {
                warn!("install: unable to fetch {selector:?}: {err}");
                return InstallOutcome::failure(selector.label(), &err);
            }
        };
        info!("install: applying release {}", release.version);

        match self.apply(game_path, &release, progress).await {
            Ok(report) => {
                info!(
                    "install: version {} installed into {}",
                    release.version,
                    report.locale_dir.display()
                );
                report.into_outcome(&release.version)
            }
            Err(err) => {
                error!("install: version {} failed: {err}", release.version);
                InstallOutcome::failure(&release.version, &err)
            }
        }
    }

    async fn apply(
        &self,
        game_path: &Path,
        release: &ReleaseDescriptor,
        progress: &mut ProgressCallback<'_>,
    ) -> Result<InstallReport, InstallError> {
        emit_progress(progress, InstallStage::Resolving, None);
        let base = resolver::resolve_base(game_path);
        let locale_dir = resolver::locale_dir(&base);
        debug!(
            "install: base={} locale_dir={}",
            base.display(),
            locale_dir.display()
        );

        let main_asset = release.find_asset(ASSET_MAIN).ok_or_else(|| {
            InstallError::not_found(format!(
                "file '{ASSET_MAIN}' in release {}",
                release.version
            ))
        })?;
        let diff_asset = release.find_asset(ASSET_DIFF);

        let _guard = self.acquire(&locale_dir)?;
        fs::create_dir_all(&locale_dir).map_err(|e| InstallError::io(&locale_dir, e))?;

        let target_main = locale_dir.join(ASSET_MAIN);
        let target_diff = locale_dir.join(ASSET_DIFF);

        emit_progress(progress, InstallStage::BackingUp, None);
        match self
            .backup
            .ensure_backup(&[target_main.clone(), target_diff.clone()])?
        {
            BackupReport::Created { files } => {
                debug!("install: backed up originals {files:?}")
            }
            BackupReport::AlreadyDone | BackupReport::Disabled => {}
        }

        let staging = tempfile::Builder::new()
            .prefix("wwmru-")
            .tempdir()
            .map_err(|e| InstallError::io(std::env::temp_dir(), e))?;

        let mut installed = Vec::new();
        let mut warnings = Vec::new();

        self.stage_and_commit(main_asset, staging.path(), &target_main, progress)
            .await?;
        installed.push(ASSET_MAIN.to_owned());

        if let Some(diff_asset) = diff_asset {
            match self
                .stage_and_commit(diff_asset, staging.path(), &target_diff, progress)
                .await
            {
                Ok(()) => installed.push(ASSET_DIFF.to_owned()),
                Err(err) => {
                    warn!("install: optional {ASSET_DIFF} failed after {ASSET_MAIN} was installed: {err}");
                    warnings.push(format!("{ASSET_DIFF} was not installed: {err}"));
                }
            }
        }

        emit_progress(progress, InstallStage::Done, None);
        Ok(InstallReport {
            installed,
            locale_dir,
            diff_published: diff_asset.is_some(),
            warnings,
        })
    }

    /// Download into the staging dir first; the destination is touched only after the
    /// transfer completed.
    async fn stage_and_commit(
        &self,
        asset: &AssetDescriptor,
        staging_dir: &Path,
        dest: &Path,
        progress: &mut ProgressCallback<'_>,
    ) -> Result<(), InstallError> {
        let staged = staging_dir.join(&asset.name);
        emit_progress(
            progress,
            InstallStage::Staging {
                asset: asset.name.clone(),
            },
            None,
        );
        let asset_name = asset.name.clone();
        let mut forward = |update: DownloadProgress| {
            emit_progress(
                progress,
                InstallStage::Staging {
                    asset: asset_name.clone(),
                },
                Some(update),
            );
        };
        let bytes = self.source.download(asset, &staged, &mut forward).await?;
        debug!("install: staged {} ({bytes} bytes)", asset.name);

        emit_progress(
            progress,
            InstallStage::Committing {
                asset: asset.name.clone(),
            },
            None,
        );
        commit_staged(&staged, dest)
    }

    fn acquire(&self, locale_dir: &Path) -> Result<TargetGuard<'_>, InstallError> {
        let target = guard_key(locale_dir);
        let mut active = lock_targets(&self.active);
        if !active.insert(target.clone()) {
            warn!(
                "install: refusing concurrent install into {}",
                locale_dir.display()
            );
            return Err(InstallError::Busy {
                path: locale_dir.to_path_buf(),
            });
        }
        Ok(TargetGuard {
            active: &self.active,
            target,
        })
    }
}

/// Canonical form of `locale_dir`, so symlinked or differently cased spellings of one
/// directory share a guard. Missing trailing components are appended to the deepest
/// ancestor that exists.
fn guard_key(locale_dir: &Path) -> PathBuf {
    let mut missing = Vec::new();
    let mut current = locale_dir;
    loop {
        if let Ok(canonical) = fs::canonicalize(current) {
            return missing
                .iter()
                .rev()
                .fold(canonical, |path: PathBuf, part| path.join(part));
        }
        match (current.parent(), current.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                current = parent;
            }
            _ => return locale_dir.to_path_buf(),
        }
    }
}

/// Copy next to the destination, then rename over it so readers never see a partial file.
fn commit_staged(staged: &Path, dest: &Path) -> Result<(), InstallError> {
    let file_name = dest
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let pending = dest.with_file_name(format!("{file_name}{PENDING_SUFFIX}"));

    if let Err(err) = fs::copy(staged, &pending) {
        let _ = fs::remove_file(&pending);
        return Err(InstallError::io(dest, err));
    }
    if let Err(err) = fs::rename(&pending, dest) {
        let _ = fs::remove_file(&pending);
        return Err(InstallError::io(dest, err));
    }
    Ok(())
}

fn panic_detail(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_owned()
    }
}
