use super::{Tab, Theme};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    English,
    Russian,
}

impl Language {
    pub const fn display_name(self) -> &'static str {
        match self {
            Language::English => "English",
            Language::Russian => "Русский",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct I18n {
    language: Language,
}

impl I18n {
    #[must_use]
    pub const fn new(language: Language) -> Self {
        Self { language }
    }

    fn pick<'a>(self, english: &'a str, russian: &'a str) -> &'a str {
        match self.language {
            Language::English => english,
            Language::Russian => russian,
        }
    }

    pub fn theme_label(self, theme: Theme) -> &'static str {
        match (theme, self.language) {
            (Theme::Dark, Language::English) => "Dark",
            (Theme::Dark, Language::Russian) => "Тёмная",
            (Theme::Light, Language::English) => "Light",
            (Theme::Light, Language::Russian) => "Светлая",
        }
    }

    pub fn tab_label(self, tab: Tab) -> &'static str {
        match tab {
            Tab::Install => self.pick("Install", "Установка"),
            Tab::Settings => self.pick("Settings", "Настройки"),
        }
    }

    pub fn heading(self) -> &'static str {
        "WWMRU"
    }

    pub fn tagline(self) -> &'static str {
        self.pick(
            "Russian localization for Where Winds Meet",
            "Русификатор Where Winds Meet",
        )
    }

    pub fn current_version(self, version: &str) -> String {
        match self.language {
            Language::English => format!("Current version: {version}"),
            Language::Russian => format!("Текущая версия: {version}"),
        }
    }

    pub fn app_version(self, version: &str) -> String {
        match self.language {
            Language::English => format!("Installer v{version}"),
            Language::Russian => format!("Установщик v{version}"),
        }
    }

    pub fn refresh_button(self) -> &'static str {
        self.pick("Refresh", "Обновить")
    }

    pub fn checking(self) -> &'static str {
        self.pick("Checking…", "Проверяю…")
    }

    pub fn check_failed(self, err: &str) -> String {
        match self.language {
            Language::English => format!("Could not check for updates: {err}"),
            Language::Russian => format!("Не удалось проверить обновления: {err}"),
        }
    }

    pub fn up_to_date(self, latest: &str) -> String {
        match self.language {
            Language::English => format!("No updates. Latest version: {latest}"),
            Language::Russian => format!("Обновлений нет. Последняя версия: {latest}"),
        }
    }

    pub fn update_available(self, latest: &str) -> String {
        match self.language {
            Language::English => format!("Version available: {latest}"),
            Language::Russian => format!("Доступна версия: {latest}"),
        }
    }

    pub fn release_notes(self) -> &'static str {
        self.pick("Release notes", "Что нового")
    }

    pub fn game_dir_heading(self) -> &'static str {
        self.pick("Game directory", "Директория игры")
    }

    pub fn game_dir_placeholder(self) -> &'static str {
        self.pick("Choose the game folder...", "Выберите папку с игрой...")
    }

    pub fn browse_button(self) -> &'static str {
        self.pick("Browse", "Обзор")
    }

    pub fn browse_title(self) -> &'static str {
        self.pick(
            "Choose the game folder (or the folder above it)",
            "Выбери папку игры (или папку уровнем выше)",
        )
    }

    pub fn locale_missing_hint(self) -> &'static str {
        self.pick(
            "The game's locale folder was not found here; it will be created on install.",
            "Папка locale игры здесь не найдена; она будет создана при установке.",
        )
    }

    pub fn checklist_heading(self) -> &'static str {
        self.pick("Before installing, make sure that:", "Перед установкой убедитесь, что:")
    }

    pub fn checklist(self) -> &'static str {
        self.pick(
            "• The game is closed\n• The correct game directory is selected\n• There is enough free disk space",
            "• Игра закрыта\n• Выбрана корректная директория игры\n• Достаточно свободного места на диске",
        )
    }

    pub fn install_button(self) -> &'static str {
        self.pick("Install localization", "Установить русификатор")
    }

    pub fn reinstall_button(self) -> &'static str {
        self.pick("Reinstall localization", "Переустановить русификатор")
    }

    pub fn install_version_button(self, version: &str) -> String {
        match self.language {
            Language::English => format!("Install version {version}"),
            Language::Russian => format!("Установить версию {version}"),
        }
    }

    pub fn installing_button(self) -> &'static str {
        self.pick("Installing…", "Устанавливаю…")
    }

    pub fn choose_game_dir(self) -> &'static str {
        self.pick("Choose the game folder.", "Укажи папку игры.")
    }

    pub fn choose_game_dir_on_install_tab(self) -> &'static str {
        self.pick(
            "Choose the game folder on the Install tab.",
            "Укажи папку игры на вкладке «Установка».",
        )
    }

    pub fn stage_label(self, stage: &crate::install::InstallStage) -> String {
        use crate::install::InstallStage;
        match (stage, self.language) {
            (InstallStage::Fetching, Language::English) => "Fetching release…".into(),
            (InstallStage::Fetching, Language::Russian) => "Получаю релиз…".into(),
            (InstallStage::Resolving, Language::English) => "Locating the game…".into(),
            (InstallStage::Resolving, Language::Russian) => "Ищу папку игры…".into(),
            (InstallStage::BackingUp, Language::English) => "Backing up originals…".into(),
            (InstallStage::BackingUp, Language::Russian) => "Сохраняю оригиналы…".into(),
            (InstallStage::Staging { asset }, Language::English) => {
                format!("Downloading {asset}…")
            }
            (InstallStage::Staging { asset }, Language::Russian) => format!("Скачиваю {asset}…"),
            (InstallStage::Committing { asset }, Language::English) => {
                format!("Replacing {asset}…")
            }
            (InstallStage::Committing { asset }, Language::Russian) => {
                format!("Заменяю {asset}…")
            }
            (InstallStage::Done, Language::English) => "Done".into(),
            (InstallStage::Done, Language::Russian) => "Готово".into(),
        }
    }

    pub fn progress(self, progress: f32, speed: &str) -> String {
        format!("{progress:.1}% · {speed}")
    }

    pub fn backup_toggle(self) -> &'static str {
        self.pick("Create a backup", "Создавать резервную копию")
    }

    pub fn backup_toggle_hint(self) -> &'static str {
        self.pick(
            "Keep the original files, only before the first install",
            "Сохранить оригинальные файлы только перед первой установкой",
        )
    }

    pub fn rollback_heading(self) -> &'static str {
        self.pick("Version rollback", "Откат версии")
    }

    pub fn no_versions(self) -> &'static str {
        self.pick("No data", "Нет данных")
    }

    pub fn installed_marker(self, version: &str) -> String {
        match self.language {
            Language::English => format!("{version} (installed)"),
            Language::Russian => format!("{version} (установлено)"),
        }
    }

    pub fn install_selected_button(self) -> &'static str {
        self.pick("Install selected", "Установить выбранную")
    }

    pub fn no_version_selected(self) -> &'static str {
        self.pick("No version selected.", "Не выбрана версия.")
    }

    pub fn installing_version(self, version: &str) -> String {
        match self.language {
            Language::English => format!("Installing {version}…"),
            Language::Russian => format!("Устанавливаю {version}…"),
        }
    }

    pub fn releases_failed(self, err: &str) -> String {
        match self.language {
            Language::English => format!("Could not load releases: {err}"),
            Language::Russian => format!("Не удалось загрузить релизы: {err}"),
        }
    }

    pub fn restore_button(self) -> &'static str {
        self.pick("Restore original files", "Вернуть оригинальные файлы")
    }

    pub fn restored(self, files: &[String]) -> String {
        if files.is_empty() {
            return self
                .pick(
                    "Installed files removed; the game had no originals to restore.",
                    "Установленные файлы удалены; оригиналов для восстановления не было.",
                )
                .to_owned();
        }
        match self.language {
            Language::English => format!("Restored: {}", files.join(", ")),
            Language::Russian => format!("Восстановлено: {}", files.join(", ")),
        }
    }

    pub fn restore_failed(self, err: &str) -> String {
        match self.language {
            Language::English => format!("Restore failed: {err}"),
            Language::Russian => format!("Не удалось восстановить: {err}"),
        }
    }

    pub fn open_backup_button(self) -> &'static str {
        self.pick("Open backup folder", "Открыть папку бэкапа")
    }

    pub fn settings_save_failed(self, err: &str) -> String {
        match self.language {
            Language::English => format!("Settings were not saved: {err}"),
            Language::Russian => format!("Настройки не сохранены: {err}"),
        }
    }

    pub fn retry_hint(self) -> &'static str {
        self.pick(
            "This is usually temporary. Try again in a moment.",
            "Обычно это временно. Попробуйте ещё раз чуть позже.",
        )
    }

    pub fn backup_taken(self, created_at: &str) -> String {
        match self.language {
            Language::English => format!("• Backup taken: {created_at}"),
            Language::Russian => format!("• Бэкап создан: {created_at}"),
        }
    }

    pub fn info_heading(self) -> &'static str {
        self.pick("Information", "Информация")
    }

    pub fn info_text(self, backup_dir: &str) -> String {
        match self.language {
            Language::English => format!(
                "• Source: GitHub Releases\n• Original files backup: {backup_dir}\n• Files: translate_words_map_en (+ diff when present)"
            ),
            Language::Russian => format!(
                "• Источник: GitHub Releases\n• Бэкап оригиналов: {backup_dir}\n• Файлы: translate_words_map_en (+ diff при наличии)"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marks_installed_version_in_both_languages() {
        assert_eq!(
            I18n::new(Language::English).installed_marker("v1.2"),
            "v1.2 (installed)"
        );
        assert_eq!(
            I18n::new(Language::Russian).installed_marker("v1.2"),
            "v1.2 (установлено)"
        );
    }

    #[test]
    fn progress_text_includes_speed() {
        let text = I18n::new(Language::English).progress(42.0, "1.5 MB/s");
        assert_eq!(text, "42.0% · 1.5 MB/s");
    }
}
