use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use env_logger::Env;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error};

mod backup;
mod engine;
mod env;
mod error;
mod install;
mod release;
mod resolver;
mod storage;
mod ui;
mod updater;
mod util;

use crate::engine::UpdaterEngine;
use crate::error::ErrorKind;
use crate::install::{InstallProgress, InstallStage};
use crate::storage::{JsonSettingsStore, SettingsStore};
use crate::updater::UpdateStatus;

#[derive(Parser, Debug)]
#[command(
    name = "WWMRU",
    author,
    version,
    about = "Installs and updates the Russian localization of Where Winds Meet"
)]
struct Cli {
    /// Run one operation without opening the window.
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Install the latest release, or the one named by --tag.
    Install {
        /// Game folder, its parent, or the folder holding "Where Winds Meet".
        #[arg(long)]
        game_root: Option<String>,
        #[arg(long, value_name = "TAG")]
        tag: Option<String>,
    },
    /// List the most recent published versions.
    Versions,
    /// Compare the installed version with the latest release.
    Check,
    /// Copy the backed-up original files back into the game.
    Restore {
        #[arg(long)]
        game_root: Option<String>,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Some(command) => run_headless(command),
        None => match run_window() {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                error!("ui: {err}");
                ExitCode::FAILURE
            }
        },
    }
}

fn run_window() -> eframe::Result<()> {
    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_icon(default_icon())
            .with_inner_size(eframe::egui::vec2(760.0, 640.0))
            .with_min_inner_size(eframe::egui::vec2(560.0, 480.0)),
        ..Default::default()
    };
    eframe::run_native(
        "WWMRU",
        options,
        Box::new(|cc| Ok(Box::new(ui::UpdaterApp::new(cc)))),
    )
}

fn run_headless(command: Command) -> ExitCode {
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            error!("cli: failed to create Tokio runtime: {err}");
            return ExitCode::FAILURE;
        }
    };
    let store: Arc<dyn SettingsStore> = Arc::new(JsonSettingsStore::open_default());
    let engine = UpdaterEngine::new(store);

    runtime.block_on(async {
        match command {
            Command::Install { game_root, tag } => {
                let game_root = game_root.unwrap_or_else(|| engine.settings().game_root);
                install(&engine, &game_root, tag.as_deref()).await
            }
            Command::Versions => match engine.refresh_recent_versions().await {
                Ok(versions) => {
                    let settings = engine.settings();
                    for version in versions {
                        let installed = settings.has_installed_version()
                            && version == settings.installed_version;
                        let marker = if installed { " (installed)" } else { "" };
                        println!("{version}{marker}");
                    }
                    ExitCode::SUCCESS
                }
                Err(err) => {
                    eprintln!("Could not load releases: {err}");
                    ExitCode::FAILURE
                }
            },
            Command::Check => match engine.check_for_updates().await {
                Ok(status) => {
                    match status {
                        UpdateStatus::NotInstalled { latest_version } => {
                            println!("Not installed. Latest version: {latest_version}");
                        }
                        UpdateStatus::UpToDate { version } => {
                            println!("No updates. Latest version: {version}");
                        }
                        UpdateStatus::UpdateAvailable {
                            latest_version,
                            notes,
                        } => {
                            println!("Version available: {latest_version}");
                            if !notes.trim().is_empty() {
                                println!("\n{}", notes.trim());
                            }
                        }
                    }
                    ExitCode::SUCCESS
                }
                Err(err) => {
                    eprintln!("Could not check for updates: {err}");
                    ExitCode::FAILURE
                }
            },
            Command::Restore { game_root } => {
                let game_root = game_root.unwrap_or_else(|| engine.settings().game_root);
                match engine.restore_backup(&game_root) {
                    Ok(files) => {
                        if files.is_empty() {
                            println!("Installed files removed; there were no originals to restore.");
                        } else {
                            println!("Restored: {}", files.join(", "));
                        }
                        if let Some(manifest) = engine.backup_manifest() {
                            println!("Backup taken {}", manifest.created_at);
                        }
                        ExitCode::SUCCESS
                    }
                    Err(err) => {
                        eprintln!("Restore failed: {err}");
                        ExitCode::FAILURE
                    }
                }
            }
        }
    })
}

async fn install(engine: &UpdaterEngine, game_root: &str, tag: Option<&str>) -> ExitCode {
    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:30.cyan/blue}] {pos:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
    );
    bar.enable_steady_tick(Duration::from_millis(100));

    let mut report = |update: InstallProgress| {
        match &update.download {
            Some(download) => {
                let percent = util::progress_percent(download.downloaded, download.total);
                bar.set_position(percent.round() as u64);
                bar.set_message(format!("{} ({})", update.stage, download.speed));
            }
            None => {
                if update.stage == InstallStage::Done {
                    bar.set_position(100);
                }
                bar.set_message(update.stage.to_string());
            }
        }
    };
    let outcome = engine.install(game_root, tag, Some(&mut report)).await;
    bar.finish_and_clear();

    if outcome.success {
        if let Some(dir) = &outcome.locale_dir {
            debug!("cli: {} file(s) placed in {}", outcome.installed.len(), dir.display());
        }
        println!("{}", outcome.message);
        ExitCode::SUCCESS
    } else {
        eprintln!("{}", outcome.message);
        if outcome.kind.is_some_and(ErrorKind::is_retryable) {
            eprintln!("This is usually temporary; run the command again.");
        }
        ExitCode::FAILURE
    }
}

fn default_icon() -> eframe::egui::IconData {
    // 2x2: dark background with a teal accent.
    let rgba: Vec<u8> = vec![
        20, 24, 32, 255, 92, 219, 195, 255, //
        20, 24, 32, 255, 63, 140, 125, 255,
    ];
    eframe::egui::IconData {
        rgba,
        width: 2,
        height: 2,
    }
}
