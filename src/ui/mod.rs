use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use eframe::egui::{
    self, Align, Color32, CornerRadius, Frame, Layout, Margin, RichText, Stroke, Vec2,
};
use log::{error, warn};
use tokio::runtime::{Builder, Runtime};
use tokio::sync::mpsc;

use crate::engine::UpdaterEngine;
use crate::engine::state::{EngineEvent, UserAction};
use crate::error::ErrorKind;
use crate::install::{InstallOutcome, InstallStage};
use crate::resolver;
use crate::storage::{JsonSettingsStore, SettingsStore};
use crate::updater::UpdateStatus;

mod i18n;
use self::i18n::{I18n, Language};

const PROGRESS_REPAINT_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Dark,
    Light,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Install,
    Settings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ThemePalette {
    bg: Color32,
    panel: Color32,
    surface: Color32,
    sunken_surface: Color32,
    border: Color32,
    text_primary: Color32,
    text_muted: Color32,
    accent: Color32,
    accent_soft: Color32,
    info: Color32,
    warning: Color32,
    danger: Color32,
}

impl ThemePalette {
    const fn dark() -> Self {
        Self {
            bg: Color32::from_rgb(11, 14, 19),
            panel: Color32::from_rgb(17, 22, 29),
            surface: Color32::from_rgb(24, 31, 39),
            sunken_surface: Color32::from_rgb(14, 18, 24),
            border: Color32::from_rgb(45, 57, 72),
            text_primary: Color32::from_rgb(228, 235, 244),
            text_muted: Color32::from_rgb(167, 182, 197),
            accent: Color32::from_rgb(92, 219, 195),
            accent_soft: Color32::from_rgb(63, 140, 125),
            info: Color32::from_rgb(122, 186, 255),
            warning: Color32::from_rgb(246, 195, 111),
            danger: Color32::from_rgb(239, 117, 117),
        }
    }

    const fn light() -> Self {
        Self {
            bg: Color32::from_rgb(240, 245, 252),
            panel: Color32::from_rgb(226, 234, 243),
            surface: Color32::from_rgb(245, 249, 255),
            sunken_surface: Color32::from_rgb(217, 225, 236),
            border: Color32::from_rgb(195, 205, 221),
            text_primary: Color32::from_rgb(28, 38, 52),
            text_muted: Color32::from_rgb(80, 99, 121),
            accent: Color32::from_rgb(27, 170, 152),
            accent_soft: Color32::from_rgb(152, 223, 212),
            info: Color32::from_rgb(64, 120, 212),
            warning: Color32::from_rgb(235, 164, 70),
            danger: Color32::from_rgb(219, 83, 83),
        }
    }
}

impl Theme {
    const fn palette(self) -> ThemePalette {
        match self {
            Theme::Dark => ThemePalette::dark(),
            Theme::Light => ThemePalette::light(),
        }
    }
}

const LOCALE_LANGUAGE_CODES: [(&[&str], Language); 2] = [
    (&["ru", "rus"], Language::Russian),
    (&["en", "eng"], Language::English),
];

fn parse_locale_token(token: &str) -> Option<Language> {
    let normalized = token
        .split(['.', '@'])
        .next()
        .unwrap_or(token)
        .replace('-', "_")
        .to_ascii_lowercase();
    let language_code = normalized.split('_').next().unwrap_or(&normalized);

    LOCALE_LANGUAGE_CODES.iter().find_map(|(codes, language)| {
        codes
            .iter()
            .any(|code| *code == language_code)
            .then_some(*language)
    })
}

fn detect_system_language() -> Language {
    for var in ["LC_ALL", "LANGUAGE", "LANG"] {
        if let Ok(value) = std::env::var(var) {
            for token in value.split(':') {
                if let Some(language) = parse_locale_token(token) {
                    return language;
                }
            }
        }
    }

    Language::Russian
}

/// `None` until a folder is chosen.
fn locale_found(game_root: &str) -> Option<bool> {
    let game_root = game_root.trim();
    if game_root.is_empty() {
        return None;
    }
    Some(resolver::has_locale_dir(&resolver::resolve_base(Path::new(game_root))))
}

fn build_runtime() -> Arc<Runtime> {
    match Runtime::new() {
        Ok(rt) => Arc::new(rt),
        Err(err) => {
            warn!("ui: failed to create multithreaded runtime ({err}); trying single-threaded runtime");
            match Builder::new_current_thread().enable_all().build() {
                Ok(rt) => Arc::new(rt),
                Err(fallback_err) => {
                    error!("ui: failed to create any Tokio runtime ({fallback_err}); terminating");
                    std::process::exit(1);
                }
            }
        }
    }
}

enum UpdateView {
    Checking,
    Checked(UpdateStatus),
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InstallTrigger {
    Latest,
    Rollback,
}

struct InstallView {
    stage: InstallStage,
    progress: f32,
    speed: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tone {
    Neutral,
    Success,
    Warning,
    Error,
}

struct StatusLine {
    text: String,
    tone: Tone,
}

impl StatusLine {
    fn new(text: impl Into<String>, tone: Tone) -> Self {
        Self {
            text: text.into(),
            tone,
        }
    }

    fn color(&self, colors: &ThemePalette) -> Color32 {
        match self.tone {
            Tone::Neutral => colors.text_muted,
            Tone::Success => colors.accent,
            Tone::Warning => colors.warning,
            Tone::Error => colors.danger,
        }
    }
}

pub struct UpdaterApp {
    runtime: Arc<Runtime>,
    engine: Arc<UpdaterEngine>,
    updates_rx: mpsc::UnboundedReceiver<EngineEvent>,
    updates_tx: mpsc::UnboundedSender<EngineEvent>,
    app_version: &'static str,
    language: Language,
    theme: Theme,
    tab: Tab,
    game_root: String,
    saved_game_root: String,
    locale_found: Option<bool>,
    installed_version: String,
    backup_enabled: bool,
    backup_dir: String,
    backup_taken: Option<String>,
    recent_versions: Vec<String>,
    selected_version: Option<String>,
    update_view: UpdateView,
    install_running: Option<InstallTrigger>,
    install_progress: Option<InstallView>,
    restore_running: bool,
    install_status: Option<StatusLine>,
    rollback_status: Option<StatusLine>,
}

fn section_frame(colors: &ThemePalette) -> Frame {
    Frame::new()
        .fill(colors.surface)
        .stroke(Stroke::new(1.0, colors.border))
        .corner_radius(CornerRadius::same(14))
        .inner_margin(Margin::same(14))
}

fn info_frame(colors: &ThemePalette) -> Frame {
    Frame::new()
        .fill(colors.sunken_surface)
        .stroke(Stroke::new(1.0, colors.info))
        .corner_radius(CornerRadius::same(10))
        .inner_margin(Margin::symmetric(14, 12))
}

fn badge_frame(color: Color32) -> Frame {
    Frame::new()
        .stroke(Stroke::new(1.0, color))
        .corner_radius(CornerRadius::same(255))
        .inner_margin(Margin::symmetric(10, 4))
}

fn apply_theme(ctx: &egui::Context, colors: &ThemePalette, theme: Theme) {
    let mut visuals = match theme {
        Theme::Dark => egui::Visuals::dark(),
        Theme::Light => egui::Visuals::light(),
    };
    visuals.panel_fill = colors.bg;
    visuals.window_fill = colors.panel;
    visuals.override_text_color = Some(colors.text_primary);
    visuals.hyperlink_color = colors.accent;
    visuals.selection.bg_fill = colors.accent_soft;
    visuals.selection.stroke = Stroke::new(1.0, colors.accent);
    visuals.faint_bg_color = colors.sunken_surface;
    visuals.extreme_bg_color = colors.sunken_surface;
    ctx.set_visuals(visuals);

    let mut style = (*ctx.style()).clone();
    style.spacing.item_spacing = Vec2::new(10.0, 10.0);
    style.spacing.button_padding = Vec2::new(14.0, 8.0);
    ctx.set_style(style);
}

impl UpdaterApp {
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        let runtime = build_runtime();
        let store: Arc<dyn SettingsStore> = Arc::new(JsonSettingsStore::open_default());
        let engine = Arc::new(UpdaterEngine::new(store));
        let settings = engine.settings();
        let (tx, rx) = mpsc::unbounded_channel();

        let selected_version = settings.recent_versions.first().cloned();
        let mut app = Self {
            runtime,
            backup_dir: engine.backup_dir().display().to_string(),
            backup_taken: engine.backup_manifest().map(|manifest| manifest.created_at),
            engine,
            updates_rx: rx,
            updates_tx: tx,
            app_version: env!("CARGO_PKG_VERSION"),
            language: detect_system_language(),
            theme: Theme::Dark,
            tab: Tab::Install,
            saved_game_root: settings.game_root.clone(),
            locale_found: locale_found(&settings.game_root),
            game_root: settings.game_root,
            installed_version: settings.installed_version,
            backup_enabled: settings.backup_enabled,
            recent_versions: settings.recent_versions,
            selected_version,
            update_view: UpdateView::Checking,
            install_running: None,
            install_progress: None,
            restore_running: false,
            install_status: None,
            rollback_status: None,
        };

        app.start_update_check();
        app.trigger_action(UserAction::LoadRecentVersions);
        app
    }

    fn i18n(&self) -> I18n {
        I18n::new(self.language)
    }

    fn busy(&self) -> bool {
        self.install_running.is_some() || self.restore_running
    }

    fn trigger_action(&self, action: UserAction) {
        let engine = self.engine.clone();
        let tx = self.updates_tx.clone();
        let rt = self.runtime.clone();
        rt.spawn(async move {
            engine.handle_action(action, &tx).await;
        });
    }

    fn start_update_check(&mut self) {
        self.update_view = UpdateView::Checking;
        self.trigger_action(UserAction::CheckForUpdates);
    }

    fn commit_game_root(&mut self) {
        let trimmed = self.game_root.trim().to_owned();
        if trimmed == self.saved_game_root {
            return;
        }
        self.locale_found = locale_found(&trimmed);
        self.saved_game_root = trimmed.clone();
        self.trigger_action(UserAction::SetGameRoot(trimmed));
    }

    fn start_install(&mut self, trigger: InstallTrigger, version: Option<String>) {
        if self.busy() {
            return;
        }
        let i18n = self.i18n();
        let game_root = self.game_root.trim().to_owned();
        if game_root.is_empty() {
            let line = match trigger {
                InstallTrigger::Latest => {
                    StatusLine::new(i18n.choose_game_dir(), Tone::Warning)
                }
                InstallTrigger::Rollback => {
                    StatusLine::new(i18n.choose_game_dir_on_install_tab(), Tone::Warning)
                }
            };
            self.set_status(trigger, line);
            return;
        }
        if trigger == InstallTrigger::Rollback && version.is_none() {
            self.rollback_status = Some(StatusLine::new(i18n.no_version_selected(), Tone::Warning));
            return;
        }

        // The engine remembers the root itself before installing.
        self.saved_game_root = game_root.clone();
        let pending = match &version {
            Some(version) => i18n.installing_version(version),
            None => i18n.installing_button().to_owned(),
        };
        self.set_status(trigger, StatusLine::new(pending, Tone::Neutral));
        self.install_running = Some(trigger);
        self.install_progress = None;
        self.trigger_action(UserAction::Install { game_root, version });
    }

    fn start_restore(&mut self) {
        if self.busy() {
            return;
        }
        let game_root = self.game_root.trim().to_owned();
        if game_root.is_empty() {
            self.rollback_status = Some(StatusLine::new(
                self.i18n().choose_game_dir_on_install_tab(),
                Tone::Warning,
            ));
            return;
        }
        self.restore_running = true;
        self.trigger_action(UserAction::RestoreBackup { game_root });
    }

    fn open_backup_folder(&mut self) {
        let dir = self.engine.backup_dir().to_path_buf();
        if let Err(err) = fs::create_dir_all(&dir) {
            warn!("open_backup_folder: unable to create {}: {err}", dir.display());
        }
        if let Err(err) = open::that(&dir) {
            warn!("open_backup_folder: unable to open {}: {err}", dir.display());
            self.rollback_status = Some(StatusLine::new(err.to_string(), Tone::Error));
        }
    }

    fn set_status(&mut self, trigger: InstallTrigger, line: StatusLine) {
        match trigger {
            InstallTrigger::Latest => self.install_status = Some(line),
            InstallTrigger::Rollback => self.rollback_status = Some(line),
        }
    }

    fn sync_events(&mut self) {
        let i18n = self.i18n();
        while let Ok(event) = self.updates_rx.try_recv() {
            match event {
                EngineEvent::UpdateChecked(Ok(status)) => {
                    self.update_view = UpdateView::Checked(status);
                }
                EngineEvent::UpdateChecked(Err(err)) => {
                    self.update_view = UpdateView::Failed(err);
                }
                EngineEvent::RecentVersions(Ok(versions)) => {
                    let still_listed = self
                        .selected_version
                        .as_ref()
                        .is_some_and(|selected| versions.contains(selected));
                    if !still_listed {
                        self.selected_version = versions.first().cloned();
                    }
                    self.recent_versions = versions;
                    if self.install_running != Some(InstallTrigger::Rollback) {
                        self.rollback_status = None;
                    }
                }
                EngineEvent::RecentVersions(Err(err)) => {
                    self.rollback_status =
                        Some(StatusLine::new(i18n.releases_failed(&err), Tone::Error));
                }
                EngineEvent::Installing {
                    stage,
                    progress,
                    speed,
                } => {
                    self.install_progress = Some(InstallView {
                        stage,
                        progress,
                        speed,
                    });
                }
                EngineEvent::InstallFinished(outcome) => self.finish_install(outcome),
                EngineEvent::Restored(result) => {
                    self.restore_running = false;
                    self.rollback_status = Some(match result {
                        Ok(files) => {
                            self.installed_version = self.engine.settings().installed_version;
                            StatusLine::new(i18n.restored(&files), Tone::Success)
                        }
                        Err(err) => StatusLine::new(i18n.restore_failed(&err), Tone::Error),
                    });
                    self.start_update_check();
                }
                EngineEvent::SettingsSaveFailed(err) => {
                    error!("ui: settings save failed: {err}");
                    self.install_status =
                        Some(StatusLine::new(i18n.settings_save_failed(&err), Tone::Error));
                }
            }
        }
    }

    fn finish_install(&mut self, outcome: InstallOutcome) {
        let trigger = self.install_running.take().unwrap_or(InstallTrigger::Latest);
        self.install_progress = None;
        let tone = match (outcome.success, outcome.warnings.is_empty()) {
            (true, true) => Tone::Success,
            (true, false) => Tone::Warning,
            (false, _) => Tone::Error,
        };
        let mut message = outcome.message;
        if outcome.kind.is_some_and(ErrorKind::is_retryable) {
            message.push('\n');
            message.push_str(self.i18n().retry_hint());
        }
        self.set_status(trigger, StatusLine::new(message, tone));

        if outcome.success {
            self.locale_found = locale_found(&self.game_root);
            self.backup_taken = self.engine.backup_manifest().map(|manifest| manifest.created_at);
            self.installed_version = outcome.version;
            if trigger == InstallTrigger::Latest {
                self.trigger_action(UserAction::LoadRecentVersions);
            }
            self.start_update_check();
        }
    }

    fn primary_label(&self, i18n: I18n) -> String {
        if self.install_running == Some(InstallTrigger::Latest) {
            return i18n.installing_button().to_owned();
        }
        match &self.update_view {
            UpdateView::Checked(UpdateStatus::UpToDate { .. }) => {
                i18n.reinstall_button().to_owned()
            }
            UpdateView::Checked(status) => i18n.install_version_button(status.latest_version()),
            _ => i18n.install_button().to_owned(),
        }
    }

    fn version_label(&self, version: &str, i18n: I18n) -> String {
        if version == self.installed_version {
            i18n.installed_marker(version)
        } else {
            version.to_owned()
        }
    }

    fn render_top_bar(&mut self, ctx: &egui::Context, colors: &ThemePalette, i18n: I18n) {
        egui::TopBottomPanel::top("top_bar")
            .frame(
                Frame::new()
                    .fill(colors.panel)
                    .stroke(Stroke::new(1.0, colors.border))
                    .inner_margin(Margin::symmetric(16, 12)),
            )
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.vertical(|ui| {
                        ui.heading(RichText::new(i18n.heading()).color(colors.accent).strong());
                        ui.label(RichText::new(i18n.tagline()).color(colors.text_muted));
                        ui.horizontal(|ui| {
                            ui.label(i18n.current_version(&self.installed_version));
                            let checking = matches!(self.update_view, UpdateView::Checking);
                            let label = if checking {
                                i18n.checking()
                            } else {
                                i18n.refresh_button()
                            };
                            if ui.add_enabled(!checking, egui::Button::new(label)).clicked() {
                                self.start_update_check();
                            }
                        });
                    });
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        egui::ComboBox::from_id_salt("theme_combo")
                            .selected_text(i18n.theme_label(self.theme))
                            .show_ui(ui, |ui| {
                                for theme in [Theme::Dark, Theme::Light] {
                                    ui.selectable_value(
                                        &mut self.theme,
                                        theme,
                                        i18n.theme_label(theme),
                                    );
                                }
                            });
                        egui::ComboBox::from_id_salt("language_combo")
                            .selected_text(self.language.display_name())
                            .show_ui(ui, |ui| {
                                for language in [Language::Russian, Language::English] {
                                    ui.selectable_value(
                                        &mut self.language,
                                        language,
                                        language.display_name(),
                                    );
                                }
                            });
                    });
                });
            });
    }

    fn render_update_status(&self, ui: &mut egui::Ui, colors: &ThemePalette, i18n: I18n) {
        match &self.update_view {
            UpdateView::Checking => {
                ui.horizontal(|ui| {
                    ui.add(egui::Spinner::new());
                    ui.label(RichText::new(i18n.checking()).color(colors.text_muted));
                });
            }
            UpdateView::Failed(err) => {
                ui.colored_label(colors.danger, i18n.check_failed(err));
            }
            UpdateView::Checked(UpdateStatus::UpToDate { version }) => {
                ui.colored_label(colors.text_muted, i18n.up_to_date(version));
            }
            UpdateView::Checked(status) => {
                ui.colored_label(colors.info, i18n.update_available(status.latest_version()));
                if let UpdateStatus::UpdateAvailable { notes, .. } = status
                    && !notes.trim().is_empty()
                {
                    egui::CollapsingHeader::new(i18n.release_notes())
                        .id_salt("release_notes")
                        .show(ui, |ui| {
                            ui.label(RichText::new(notes).color(colors.text_muted).small());
                        });
                }
            }
        }
    }

    fn render_install_progress(&self, ui: &mut egui::Ui, colors: &ThemePalette, i18n: I18n) {
        let Some(view) = &self.install_progress else {
            ui.horizontal(|ui| {
                ui.add(egui::Spinner::new());
            });
            return;
        };
        ui.label(i18n.stage_label(&view.stage));
        let mut bar = egui::ProgressBar::new(view.progress / 100.0)
            .fill(colors.accent)
            .desired_height(20.0);
        if let Some(speed) = &view.speed {
            bar = bar.text(i18n.progress(view.progress, speed));
        }
        ui.add(bar);
    }

    fn render_install_tab(&mut self, ui: &mut egui::Ui, colors: &ThemePalette, i18n: I18n) {
        section_frame(colors).show(ui, |ui| {
            ui.set_width(ui.available_width());
            ui.label(RichText::new(i18n.game_dir_heading()).strong());
            let busy = self.busy();
            ui.horizontal(|ui| {
                let edit = egui::TextEdit::singleline(&mut self.game_root)
                    .hint_text(i18n.game_dir_placeholder())
                    .desired_width((ui.available_width() - 110.0).max(120.0));
                if ui.add_enabled(!busy, edit).lost_focus() {
                    self.commit_game_root();
                }
                if ui
                    .add_enabled(!busy, egui::Button::new(i18n.browse_button()))
                    .clicked()
                    && let Some(dir) = rfd::FileDialog::new()
                        .set_title(i18n.browse_title())
                        .pick_folder()
                {
                    self.game_root = dir.display().to_string();
                    self.commit_game_root();
                }
            });

            if self.locale_found == Some(false) {
                ui.colored_label(colors.warning, i18n.locale_missing_hint());
            }

            info_frame(colors).show(ui, |ui| {
                ui.set_width(ui.available_width());
                ui.label(RichText::new(i18n.checklist_heading()).color(colors.info).strong());
                ui.label(RichText::new(i18n.checklist()).color(colors.text_muted));
            });

            self.render_update_status(ui, colors, i18n);

            let label = RichText::new(self.primary_label(i18n)).strong();
            let button = egui::Button::new(label)
                .fill(colors.accent_soft)
                .min_size(Vec2::new(ui.available_width(), 36.0));
            if ui.add_enabled(!busy, button).clicked() {
                self.start_install(InstallTrigger::Latest, None);
            }

            if self.install_running == Some(InstallTrigger::Latest) {
                self.render_install_progress(ui, colors, i18n);
            }
            if let Some(status) = &self.install_status {
                ui.colored_label(status.color(colors), &status.text);
            }
        });
    }

    fn render_settings_tab(&mut self, ui: &mut egui::Ui, colors: &ThemePalette, i18n: I18n) {
        section_frame(colors).show(ui, |ui| {
            ui.set_width(ui.available_width());
            let busy = self.busy();

            ui.horizontal(|ui| {
                ui.vertical(|ui| {
                    ui.label(RichText::new(i18n.backup_toggle()).strong());
                    ui.label(RichText::new(i18n.backup_toggle_hint()).color(colors.text_muted));
                });
                ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                    if ui.checkbox(&mut self.backup_enabled, "").changed() {
                        self.trigger_action(UserAction::SetBackupEnabled(self.backup_enabled));
                    }
                });
            });
            ui.separator();

            ui.label(RichText::new(i18n.rollback_heading()).strong());
            let options: Vec<(String, String)> = self
                .recent_versions
                .iter()
                .map(|version| (version.clone(), self.version_label(version, i18n)))
                .collect();
            let selected_text = self
                .selected_version
                .as_deref()
                .map(|version| self.version_label(version, i18n))
                .unwrap_or_else(|| i18n.no_versions().to_owned());
            ui.horizontal(|ui| {
                egui::ComboBox::from_id_salt("rollback_versions")
                    .selected_text(selected_text)
                    .width((ui.available_width() - 190.0).max(140.0))
                    .show_ui(ui, |ui| {
                        if options.is_empty() {
                            ui.label(i18n.no_versions());
                        }
                        for (version, label) in options {
                            ui.selectable_value(&mut self.selected_version, Some(version), label);
                        }
                    });
                if ui
                    .add_enabled(!busy, egui::Button::new(i18n.install_selected_button()))
                    .clicked()
                {
                    let version = self.selected_version.clone();
                    self.start_install(InstallTrigger::Rollback, version);
                }
            });
            if self.install_running == Some(InstallTrigger::Rollback) {
                self.render_install_progress(ui, colors, i18n);
            }

            ui.horizontal(|ui| {
                if ui
                    .add_enabled(!busy, egui::Button::new(i18n.restore_button()))
                    .clicked()
                {
                    self.start_restore();
                }
                if ui.button(i18n.open_backup_button()).clicked() {
                    self.open_backup_folder();
                }
            });
            if let Some(status) = &self.rollback_status {
                ui.colored_label(status.color(colors), &status.text);
            }
            ui.separator();

            ui.label(RichText::new(i18n.info_heading()).strong());
            ui.label(RichText::new(i18n.info_text(&self.backup_dir)).color(colors.text_muted));
            if let Some(created_at) = &self.backup_taken {
                ui.label(RichText::new(i18n.backup_taken(created_at)).color(colors.text_muted));
            }
        });
    }
}

impl eframe::App for UpdaterApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.sync_events();
        let colors = self.theme.palette();
        apply_theme(ctx, &colors, self.theme);
        let i18n = self.i18n();

        self.render_top_bar(ctx, &colors, i18n);

        egui::TopBottomPanel::bottom("bottom_bar")
            .frame(
                Frame::new()
                    .fill(colors.panel)
                    .stroke(Stroke::new(1.0, colors.border))
                    .inner_margin(Margin::symmetric(16, 8)),
            )
            .show(ctx, |ui| {
                ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                    badge_frame(colors.border).show(ui, |ui| {
                        ui.label(RichText::new(i18n.app_version(self.app_version)).small());
                    });
                });
            });

        egui::CentralPanel::default()
            .frame(
                Frame::new()
                    .fill(colors.bg)
                    .inner_margin(Margin::symmetric(14, 12)),
            )
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    for tab in [Tab::Install, Tab::Settings] {
                        ui.selectable_value(&mut self.tab, tab, i18n.tab_label(tab));
                    }
                });
                ui.add_space(6.0);
                egui::ScrollArea::vertical().show(ui, |ui| match self.tab {
                    Tab::Install => self.render_install_tab(ui, &colors, i18n),
                    Tab::Settings => self.render_settings_tab(ui, &colors, i18n),
                });
            });

        // Engine events arrive off-thread; keep polling while something is in flight.
        if self.busy() || matches!(self.update_view, UpdateView::Checking) {
            ctx.request_repaint_after(PROGRESS_REPAINT_INTERVAL);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Language, parse_locale_token};

    #[test]
    fn parses_supported_languages_from_locale_tokens() {
        let samples = [
            ("en_US.UTF-8", Language::English),
            ("ru_RU.UTF-8", Language::Russian),
            ("ru-RU", Language::Russian),
            ("rus_RU", Language::Russian),
            ("eng_US", Language::English),
        ];

        for (token, expected) in samples {
            assert_eq!(parse_locale_token(token), Some(expected));
        }
    }

    #[test]
    fn ignores_unknown_language_tokens() {
        assert_eq!(parse_locale_token("pl_PL"), None);
    }
}
