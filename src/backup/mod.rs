use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use filetime::FileTime;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::error::InstallError;
use crate::storage::SettingsStore;

const MANIFEST_FILE: &str = "backup.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupManifest {
    pub created_at: String,
    pub source_dir: Option<PathBuf>,
    pub files: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupReport {
    Disabled,
    AlreadyDone,
    Created { files: Vec<String> },
}

/// Keeps a single snapshot of the game's original translation files.
#[derive(Clone)]
pub struct BackupManager {
    store: Arc<dyn SettingsStore>,
    backup_dir: PathBuf,
}

impl BackupManager {
    pub fn new(store: Arc<dyn SettingsStore>, backup_dir: PathBuf) -> Self {
        Self { store, backup_dir }
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// Snapshot `targets` once per installation lifetime.
    ///
    /// Targets that do not exist yet are skipped. The done flag is set and persisted even
    /// when nothing was copied, so files already overwritten by a first install are never
    /// mistaken for originals later. A failed copy leaves the flag untouched.
    pub fn ensure_backup(&self, targets: &[PathBuf]) -> Result<BackupReport, InstallError> {
        let settings = self.store.get();
        if !settings.backup_enabled {
            info!("ensure_backup: backups disabled; skipping");
            return Ok(BackupReport::Disabled);
        }
        if settings.backup_done {
            info!("ensure_backup: originals already captured");
            return Ok(BackupReport::AlreadyDone);
        }

        fs::create_dir_all(&self.backup_dir).map_err(|e| InstallError::io(&self.backup_dir, e))?;

        let mut files = Vec::new();
        for target in targets.iter().filter(|target| target.is_file()) {
            let Some(name) = target.file_name() else {
                continue;
            };
            let dest = self.backup_dir.join(name);
            copy_preserving(target, &dest)?;
            files.push(name.to_string_lossy().into_owned());
        }

        let manifest = BackupManifest {
            created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            source_dir: targets
                .first()
                .and_then(|target| target.parent())
                .map(Path::to_path_buf),
            files: files.clone(),
        };
        self.write_manifest(&manifest)?;

        self.store.update(&mut |settings| settings.backup_done = true);
        self.store.persist()?;

        info!(
            "ensure_backup: captured {} original file(s) into {}",
            files.len(),
            self.backup_dir.display()
        );
        Ok(BackupReport::Created { files })
    }

    pub fn manifest(&self) -> Option<BackupManifest> {
        let raw = fs::read_to_string(self.backup_dir.join(MANIFEST_FILE)).ok()?;
        serde_json::from_str(&raw).ok()
    }

    /// Return `locale_dir` to the state recorded by the snapshot.
    ///
    /// Every file listed in the manifest is copied back. Names in `managed` that had no
    /// original are deleted, since they can only have been written by an install.
    pub fn restore(
        &self,
        locale_dir: &Path,
        managed: &[&str],
    ) -> Result<Vec<String>, InstallError> {
        let manifest = self.manifest().ok_or_else(|| {
            InstallError::not_found(format!(
                "backup of original files in {}",
                self.backup_dir.display()
            ))
        })?;
        if let Some(source_dir) = &manifest.source_dir
            && !same_dir(source_dir, locale_dir)
        {
            warn!(
                "restore: snapshot was taken from {} but is restored into {}",
                source_dir.display(),
                locale_dir.display()
            );
        }
        for stray in self.unlisted_files(&manifest) {
            warn!(
                "restore: ignoring {} (not part of the current snapshot)",
                stray.display()
            );
        }

        fs::create_dir_all(locale_dir).map_err(|e| InstallError::io(locale_dir, e))?;
        let mut restored = Vec::new();
        for name in &manifest.files {
            let original = self.backup_dir.join(name);
            if !original.is_file() {
                return Err(InstallError::not_found(format!(
                    "backed-up {name} in {}",
                    self.backup_dir.display()
                )));
            }
            copy_preserving(&original, &locale_dir.join(name))?;
            restored.push(name.clone());
        }

        let mut removed = 0;
        for name in managed
            .iter()
            .filter(|name| !manifest.files.iter().any(|listed| listed.as_str() == **name))
        {
            let path = locale_dir.join(name);
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => return Err(InstallError::io(&path, err)),
            }
        }
        info!(
            "restore: copied {} file(s) back and removed {removed} installed file(s) in {}",
            restored.len(),
            locale_dir.display()
        );
        Ok(restored)
    }

    /// Files in the backup directory that the manifest does not list.
    fn unlisted_files(&self, manifest: &BackupManifest) -> Vec<PathBuf> {
        if !self.backup_dir.is_dir() {
            return Vec::new();
        }
        let mut files: Vec<PathBuf> = WalkDir::new(&self.backup_dir)
            .max_depth(1)
            .into_iter()
            .flatten()
            .filter(|entry| entry.file_type().is_file() && entry.file_name() != MANIFEST_FILE)
            .filter(|entry| {
                let name = entry.file_name().to_string_lossy();
                !manifest.files.iter().any(|listed| *listed == name)
            })
            .map(|entry| entry.into_path())
            .collect();
        files.sort();
        files
    }

    fn write_manifest(&self, manifest: &BackupManifest) -> Result<(), InstallError> {
        let path = self.backup_dir.join(MANIFEST_FILE);
        let raw = serde_json::to_string_pretty(manifest)
            .map_err(|e| InstallError::Unknown(format!("unable to serialize backup manifest: {e}")))?;
        fs::write(&path, raw).map_err(|e| InstallError::io(&path, e))
    }
}

fn same_dir(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Copy content and permissions, then carry over the modification time.
fn copy_preserving(src: &Path, dest: &Path) -> Result<(), InstallError> {
    fs::copy(src, dest).map_err(|e| InstallError::io(dest, e))?;
    match fs::metadata(src) {
        Ok(meta) => {
            let mtime = FileTime::from_last_modification_time(&meta);
            if let Err(err) = filetime::set_file_mtime(dest, mtime) {
                warn!("backup: unable to keep mtime on {}: {err}", dest.display());
            }
        }
        Err(err) => warn!("backup: unable to stat {}: {err}", src.display()),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Settings;
    use crate::storage::testing::MemorySettingsStore;

    struct Fixture {
        _dir: tempfile::TempDir,
        locale: PathBuf,
        store: Arc<MemorySettingsStore>,
        manager: BackupManager,
    }

    fn fixture(settings: Settings) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let locale = dir.path().join("locale");
        fs::create_dir_all(&locale).unwrap();
        let store = Arc::new(MemorySettingsStore::with(settings));
        let manager = BackupManager::new(store.clone(), dir.path().join("backup"));
        Fixture {
            _dir: dir,
            locale,
            store,
            manager,
        }
    }

    const MANAGED: &[&str] = &["words", "words_diff"];

    fn targets(locale: &Path) -> Vec<PathBuf> {
        vec![locale.join("words"), locale.join("words_diff")]
    }

    #[test]
    fn copies_existing_originals_once() {
        let fx = fixture(Settings::default());
        fs::write(fx.locale.join("words"), b"original").unwrap();

        let report = fx.manager.ensure_backup(&targets(&fx.locale)).unwrap();
        assert_eq!(
            report,
            BackupReport::Created {
                files: vec!["words".into()]
            }
        );
        assert_eq!(
            fs::read(fx.manager.backup_dir().join("words")).unwrap(),
            b"original"
        );
        assert!(!fx.manager.backup_dir().join("words_diff").exists());
        assert!(fx.store.get().backup_done);
        assert_eq!(fx.store.persist_count(), 1);

        fs::write(fx.locale.join("words"), b"patched").unwrap();
        let second = fx.manager.ensure_backup(&targets(&fx.locale)).unwrap();
        assert_eq!(second, BackupReport::AlreadyDone);
        assert_eq!(
            fs::read(fx.manager.backup_dir().join("words")).unwrap(),
            b"original"
        );
        assert_eq!(fx.store.persist_count(), 1);
    }

    #[test]
    fn disabled_backup_never_copies_or_marks_done() {
        let settings = Settings {
            backup_enabled: false,
            ..Settings::default()
        };
        let fx = fixture(settings);
        fs::write(fx.locale.join("words"), b"original").unwrap();

        let report = fx.manager.ensure_backup(&targets(&fx.locale)).unwrap();
        assert_eq!(report, BackupReport::Disabled);
        assert!(!fx.manager.backup_dir().exists());
        assert!(!fx.store.get().backup_done);
        assert_eq!(fx.store.persist_count(), 0);
    }

    #[test]
    fn marks_done_even_when_no_originals_exist() {
        let fx = fixture(Settings::default());
        let report = fx.manager.ensure_backup(&targets(&fx.locale)).unwrap();
        assert_eq!(report, BackupReport::Created { files: Vec::new() });
        assert!(fx.store.get().backup_done);

        fs::write(fx.locale.join("words"), b"first install").unwrap();
        let second = fx.manager.ensure_backup(&targets(&fx.locale)).unwrap();
        assert_eq!(second, BackupReport::AlreadyDone);
        assert!(!fx.manager.backup_dir().join("words").exists());
    }

    #[test]
    fn preserves_modification_time() {
        let fx = fixture(Settings::default());
        let original = fx.locale.join("words");
        fs::write(&original, b"original").unwrap();
        let stamp = FileTime::from_unix_time(1_600_000_000, 0);
        filetime::set_file_mtime(&original, stamp).unwrap();

        fx.manager.ensure_backup(&targets(&fx.locale)).unwrap();
        let meta = fs::metadata(fx.manager.backup_dir().join("words")).unwrap();
        assert_eq!(FileTime::from_last_modification_time(&meta), stamp);
    }

    #[test]
    fn writes_manifest_with_source_dir() {
        let fx = fixture(Settings::default());
        fs::write(fx.locale.join("words_diff"), b"diff").unwrap();
        fx.manager.ensure_backup(&targets(&fx.locale)).unwrap();

        let manifest = fx.manager.manifest().unwrap();
        assert_eq!(manifest.files, vec!["words_diff".to_string()]);
        assert_eq!(manifest.source_dir.as_deref(), Some(fx.locale.as_path()));
        assert!(!manifest.created_at.is_empty());
    }

    #[test]
    fn restore_puts_originals_back() {
        let fx = fixture(Settings::default());
        fs::write(fx.locale.join("words"), b"original").unwrap();
        fs::write(fx.locale.join("words_diff"), b"original diff").unwrap();
        fx.manager.ensure_backup(&targets(&fx.locale)).unwrap();

        fs::write(fx.locale.join("words"), b"patched").unwrap();
        fs::write(fx.locale.join("words_diff"), b"patched diff").unwrap();

        let restored = fx.manager.restore(&fx.locale, MANAGED).unwrap();
        assert_eq!(restored, vec!["words".to_string(), "words_diff".to_string()]);
        assert_eq!(fs::read(fx.locale.join("words")).unwrap(), b"original");
        assert_eq!(
            fs::read(fx.locale.join("words_diff")).unwrap(),
            b"original diff"
        );
    }

    #[test]
    fn restore_without_backup_is_not_found() {
        let fx = fixture(Settings::default());
        let err = fx.manager.restore(&fx.locale, MANAGED).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::NotFound);
    }

    #[test]
    fn restore_removes_installed_files_without_original() {
        let fx = fixture(Settings::default());
        fs::write(fx.locale.join("words"), b"original").unwrap();
        fx.manager.ensure_backup(&targets(&fx.locale)).unwrap();

        fs::write(fx.locale.join("words"), b"patched").unwrap();
        fs::write(fx.locale.join("words_diff"), b"patched diff").unwrap();
        fs::write(fx.locale.join("unrelated"), b"game data").unwrap();

        let restored = fx.manager.restore(&fx.locale, MANAGED).unwrap();
        assert_eq!(restored, vec!["words".to_string()]);
        assert_eq!(fs::read(fx.locale.join("words")).unwrap(), b"original");
        assert!(!fx.locale.join("words_diff").exists());
        assert_eq!(fs::read(fx.locale.join("unrelated")).unwrap(), b"game data");
    }

    #[test]
    fn restore_follows_manifest_not_directory_contents() {
        let fx = fixture(Settings::default());
        fx.manager.ensure_backup(&targets(&fx.locale)).unwrap();
        fs::write(fx.manager.backup_dir().join("words"), b"stale snapshot").unwrap();
        fs::write(fx.locale.join("words"), b"patched").unwrap();

        let restored = fx.manager.restore(&fx.locale, MANAGED).unwrap();
        assert!(restored.is_empty());
        assert!(!fx.locale.join("words").exists());
    }

    #[test]
    fn restore_into_another_directory_still_copies() {
        let fx = fixture(Settings::default());
        fs::write(fx.locale.join("words"), b"original").unwrap();
        fx.manager.ensure_backup(&targets(&fx.locale)).unwrap();

        let elsewhere = fx.locale.parent().unwrap().join("moved_locale");
        let restored = fx.manager.restore(&elsewhere, MANAGED).unwrap();
        assert_eq!(restored, vec!["words".to_string()]);
        assert_eq!(fs::read(elsewhere.join("words")).unwrap(), b"original");
        assert!(same_dir(
            fx.manager.manifest().unwrap().source_dir.as_deref().unwrap(),
            &fx.locale
        ));
        assert!(!same_dir(&fx.locale, &elsewhere));
    }
}
