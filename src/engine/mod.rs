use std::path::Path;
use std::sync::Arc;

use log::{info, warn};
use tokio::sync::mpsc;

use crate::backup::{BackupManager, BackupManifest};
use crate::engine::state::{EngineEvent, UserAction};
use crate::env;
use crate::error::InstallError;
use crate::install::{InstallOutcome, InstallProgress, InstallStage, Installer, ProgressCallback};
use crate::release::{GithubReleases, ReleaseSelector, ReleaseSource};
use crate::storage::{RECENT_VERSIONS_LIMIT, Settings, SettingsStore, VERSION_PLACEHOLDER};
use crate::updater::{self, UpdateStatus};
use crate::util::progress_percent;

pub mod state;

/// Application-level owner of settings and the installer. Shared by the UI and the CLI.
pub struct UpdaterEngine<S = GithubReleases> {
    store: Arc<dyn SettingsStore>,
    installer: Installer<S>,
}

impl UpdaterEngine<GithubReleases> {
    /// Engine talking to the release repository named in the settings.
    pub fn new(store: Arc<dyn SettingsStore>) -> Self {
        let settings = store.get();
        let source = GithubReleases::new(&settings.github_owner, &settings.github_repo);
        Self::with_source(store, source, env::backup_dir())
    }
}

impl<S: ReleaseSource> UpdaterEngine<S> {
    pub fn with_source(
        store: Arc<dyn SettingsStore>,
        source: S,
        backup_dir: std::path::PathBuf,
    ) -> Self {
        let backup = BackupManager::new(store.clone(), backup_dir);
        Self {
            store,
            installer: Installer::new(source, backup),
        }
    }

    pub fn settings(&self) -> Settings {
        self.store.get()
    }

    pub fn backup_dir(&self) -> &Path {
        self.installer.backup().backup_dir()
    }

    pub fn backup_manifest(&self) -> Option<BackupManifest> {
        self.installer.backup().manifest()
    }

    pub async fn check_for_updates(&self) -> Result<UpdateStatus, InstallError> {
        let installed = self.store.get().installed_version;
        updater::check_for_updates(self.installer.source(), &installed).await
    }

    /// Fetch the newest tagged releases and remember them for the rollback list.
    pub async fn refresh_recent_versions(&self) -> Result<Vec<String>, InstallError> {
        let releases = self
            .installer
            .source()
            .recent(RECENT_VERSIONS_LIMIT)
            .await?;
        let versions: Vec<String> = releases.into_iter().map(|r| r.version).collect();
        info!("refresh_recent_versions: {versions:?}");
        self.save(|settings| settings.set_recent_versions(versions.clone()))?;
        Ok(self.store.get().recent_versions)
    }

    /// Install `version` (or the latest release) into the game found at `game_root`.
    ///
    /// The game root is remembered before the attempt; the installed version only after
    /// a successful one. Settings that fail to save are logged and do not change the
    /// outcome, since the files on disk are already correct.
    pub async fn install(
        &self,
        game_root: &str,
        version: Option<&str>,
        progress: ProgressCallback<'_>,
    ) -> InstallOutcome {
        let selector = match version.map(str::trim) {
            Some(tag) if !tag.is_empty() => ReleaseSelector::Tag(tag.to_owned()),
            _ => ReleaseSelector::Latest,
        };
        let game_root = game_root.trim();
        if game_root.is_empty() {
            warn!("install: no game folder selected");
            return InstallOutcome::failure(
                selector.label(),
                &InstallError::not_found("game folder (choose it first)"),
            );
        }

        if let Err(err) = self.save(|settings| settings.game_root = game_root.to_owned()) {
            warn!("install: unable to remember game folder: {err}");
        }

        let outcome = self
            .installer
            .install(Path::new(game_root), &selector, progress)
            .await;
        if outcome.success {
            let version = outcome.version.clone();
            if let Err(err) = self.save(|settings| settings.installed_version = version.clone()) {
                warn!("install: unable to remember installed version: {err}");
            }
        }
        outcome
    }

    /// Put the original files back. The installed version is cleared afterwards.
    pub fn restore_backup(&self, game_root: &str) -> Result<Vec<String>, InstallError> {
        let game_root = game_root.trim();
        if game_root.is_empty() {
            return Err(InstallError::not_found("game folder (choose it first)"));
        }
        let restored = self.installer.restore(Path::new(game_root))?;
        self.save(|settings| settings.installed_version = VERSION_PLACEHOLDER.to_owned())?;
        Ok(restored)
    }

    pub fn set_backup_enabled(&self, enabled: bool) -> Result<(), InstallError> {
        self.save(|settings| settings.backup_enabled = enabled)
    }

    pub fn set_game_root(&self, game_root: &str) -> Result<(), InstallError> {
        let game_root = game_root.trim().to_owned();
        self.save(|settings| settings.game_root = game_root.clone())
    }

    pub async fn handle_action(
        &self,
        action: UserAction,
        updates: &mpsc::UnboundedSender<EngineEvent>,
    ) {
        match action {
            UserAction::CheckForUpdates => {
                info!("action: CheckForUpdates");
                let result = self.check_for_updates().await.map_err(|e| e.to_string());
                updates.send(EngineEvent::UpdateChecked(result)).ok();
            }
            UserAction::LoadRecentVersions => {
                info!("action: LoadRecentVersions");
                let result = self
                    .refresh_recent_versions()
                    .await
                    .map_err(|e| e.to_string());
                updates.send(EngineEvent::RecentVersions(result)).ok();
            }
            UserAction::Install { game_root, version } => {
                info!("action: Install version={version:?}");
                let mut forward = |update: InstallProgress| {
                    updates.send(installing_event(update)).ok();
                };
                let outcome = self
                    .install(&game_root, version.as_deref(), Some(&mut forward))
                    .await;
                updates.send(EngineEvent::InstallFinished(outcome)).ok();
            }
            UserAction::RestoreBackup { game_root } => {
                info!("action: RestoreBackup");
                let result = self.restore_backup(&game_root).map_err(|e| e.to_string());
                updates.send(EngineEvent::Restored(result)).ok();
            }
            UserAction::SetBackupEnabled(enabled) => {
                if let Err(err) = self.set_backup_enabled(enabled) {
                    updates
                        .send(EngineEvent::SettingsSaveFailed(err.to_string()))
                        .ok();
                }
            }
            UserAction::SetGameRoot(game_root) => {
                if let Err(err) = self.set_game_root(&game_root) {
                    updates
                        .send(EngineEvent::SettingsSaveFailed(err.to_string()))
                        .ok();
                }
            }
        }
    }

    fn save(&self, mut change: impl FnMut(&mut Settings)) -> Result<(), InstallError> {
        self.store.update(&mut change);
        self.store.persist()
    }
}

fn installing_event(update: InstallProgress) -> EngineEvent {
    let (progress, speed) = match update.download {
        Some(download) => (
            progress_percent(download.downloaded, download.total),
            Some(download.speed),
        ),
        None if update.stage == InstallStage::Done => (100.0, None),
        None => (0.0, None),
    };
    EngineEvent::Installing {
        stage: update.stage,
        progress,
        speed,
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use super::*;
    use crate::error::ErrorKind;
    use crate::install::{ASSET_DIFF, ASSET_MAIN};
    use crate::release::testing::{FakeSource, Payload};
    use crate::resolver;
    use crate::storage::testing::MemorySettingsStore;

    struct Fixture {
        _dir: tempfile::TempDir,
        game_root: PathBuf,
        locale: PathBuf,
        store: Arc<MemorySettingsStore>,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let game_root = dir.path().join("Games");
        let locale = resolver::locale_dir(&game_root);
        fs::create_dir_all(&locale).unwrap();
        Fixture {
            game_root,
            locale,
            store: Arc::new(MemorySettingsStore::with(Settings::default())),
            _dir: dir,
        }
    }

    fn engine(fx: &Fixture, source: FakeSource) -> UpdaterEngine<FakeSource> {
        let backup_dir = fx.game_root.parent().unwrap().join("backup");
        UpdaterEngine::with_source(fx.store.clone(), source, backup_dir)
    }

    fn root(fx: &Fixture) -> String {
        fx.game_root.display().to_string()
    }

    #[tokio::test]
    async fn successful_install_remembers_root_and_version() {
        let fx = fixture();
        let engine = engine(
            &fx,
            FakeSource::new("v1.3", &[(ASSET_MAIN, Payload::Bytes(b"m".to_vec()))]),
        );

        let outcome = engine.install(&root(&fx), None, None).await;
        assert!(outcome.success, "{}", outcome.message);

        let settings = engine.settings();
        assert_eq!(settings.installed_version, "v1.3");
        assert_eq!(settings.game_root, root(&fx));
        assert!(settings.backup_done);
    }

    #[tokio::test]
    async fn failed_install_keeps_previous_version() {
        let fx = fixture();
        fx.store
            .update(&mut |settings| settings.installed_version = "v1.0".into());
        let engine = engine(
            &fx,
            FakeSource::new("v1.1", &[(ASSET_DIFF, Payload::Bytes(b"d".to_vec()))]),
        );

        let outcome = engine.install(&root(&fx), Some("v1.1"), None).await;
        assert!(!outcome.success);
        assert_eq!(engine.settings().installed_version, "v1.0");
        assert_eq!(engine.settings().game_root, root(&fx));
    }

    #[tokio::test]
    async fn empty_game_root_is_rejected_up_front() {
        let fx = fixture();
        let engine = engine(
            &fx,
            FakeSource::new("v1", &[(ASSET_MAIN, Payload::Bytes(b"m".to_vec()))]),
        );

        let outcome = engine.install("   ", None, None).await;
        assert!(!outcome.success);
        assert_eq!(outcome.kind, Some(ErrorKind::NotFound));
        assert_eq!(fx.store.persist_count(), 0);
        assert!(!fx.locale.join(ASSET_MAIN).exists());
    }

    #[tokio::test]
    async fn blank_version_means_latest() {
        let fx = fixture();
        let engine = engine(
            &fx,
            FakeSource::new("v2", &[(ASSET_MAIN, Payload::Bytes(b"m".to_vec()))]),
        );
        let outcome = engine.install(&root(&fx), Some(" "), None).await;
        assert!(outcome.success, "{}", outcome.message);
        assert_eq!(outcome.version, "v2");
    }

    #[tokio::test]
    async fn check_for_updates_uses_installed_version() {
        let fx = fixture();
        let engine = engine(
            &fx,
            FakeSource::new("v3", &[(ASSET_MAIN, Payload::Bytes(b"m".to_vec()))]),
        );
        assert_eq!(
            engine.check_for_updates().await.unwrap(),
            UpdateStatus::NotInstalled {
                latest_version: "v3".into()
            }
        );

        engine.install(&root(&fx), None, None).await;
        assert_eq!(
            engine.check_for_updates().await.unwrap(),
            UpdateStatus::UpToDate {
                version: "v3".into()
            }
        );
    }

    #[tokio::test]
    async fn recent_versions_are_persisted() {
        let fx = fixture();
        let engine = engine(
            &fx,
            FakeSource::new("v4", &[(ASSET_MAIN, Payload::Bytes(b"m".to_vec()))]),
        );
        let versions = engine.refresh_recent_versions().await.unwrap();
        assert_eq!(versions, vec!["v4".to_string()]);
        assert_eq!(fx.store.get().recent_versions, versions);
        assert_eq!(fx.store.persist_count(), 1);
    }

    #[tokio::test]
    async fn restore_resets_installed_version() {
        let fx = fixture();
        fs::write(fx.locale.join(ASSET_MAIN), b"original").unwrap();
        let engine = engine(
            &fx,
            FakeSource::new("v5", &[(ASSET_MAIN, Payload::Bytes(b"patched".to_vec()))]),
        );
        assert!(engine.install(&root(&fx), None, None).await.success);

        let manifest = engine.backup_manifest().unwrap();
        assert_eq!(manifest.files, vec![ASSET_MAIN.to_string()]);

        let restored = engine.restore_backup(&root(&fx)).unwrap();
        assert_eq!(restored, vec![ASSET_MAIN.to_string()]);
        assert_eq!(fs::read(fx.locale.join(ASSET_MAIN)).unwrap(), b"original");
        assert_eq!(engine.settings().installed_version, VERSION_PLACEHOLDER);
    }

    #[tokio::test]
    async fn install_action_streams_progress_then_outcome() {
        let fx = fixture();
        let engine = engine(
            &fx,
            FakeSource::new("v6", &[(ASSET_MAIN, Payload::Bytes(b"m".to_vec()))]),
        );
        let (tx, mut rx) = mpsc::unbounded_channel();

        engine
            .handle_action(
                UserAction::Install {
                    game_root: root(&fx),
                    version: None,
                },
                &tx,
            )
            .await;
        drop(tx);

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        assert!(matches!(
            events.first(),
            Some(EngineEvent::Installing {
                stage: InstallStage::Fetching,
                ..
            })
        ));
        assert!(events.iter().any(|event| matches!(
            event,
            EngineEvent::Installing { speed: Some(_), progress, .. } if *progress == 100.0
        )));
        match events.last() {
            Some(EngineEvent::InstallFinished(outcome)) => {
                assert!(outcome.success, "{}", outcome.message)
            }
            other => panic!("unexpected last event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn settings_actions_persist() {
        let fx = fixture();
        let engine = engine(
            &fx,
            FakeSource::new("v7", &[(ASSET_MAIN, Payload::Bytes(b"m".to_vec()))]),
        );
        let (tx, mut rx) = mpsc::unbounded_channel();

        engine
            .handle_action(UserAction::SetBackupEnabled(false), &tx)
            .await;
        engine
            .handle_action(UserAction::SetGameRoot("  D:\\Games ".into()), &tx)
            .await;

        let settings = fx.store.get();
        assert!(!settings.backup_enabled);
        assert_eq!(settings.game_root, "D:\\Games");
        assert_eq!(fx.store.persist_count(), 2);
        assert!(rx.try_recv().is_err());
    }
}
