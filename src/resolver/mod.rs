use std::path::{Path, PathBuf};

use log::debug;

/// Name of the game's own folder inside whatever library directory the user picked.
pub const GAME_FOLDER_NAME: &str = "Where Winds Meet";

const LOCALE_SEGMENTS: [&str; 4] = ["Package", "HD", "oversea", "locale"];

/// Locale directory relative to the installation base, e.g.
/// `Where Winds Meet/Package/HD/oversea/locale`.
pub fn relative_locale_subpath() -> PathBuf {
    LOCALE_SEGMENTS
        .iter()
        .fold(PathBuf::from(GAME_FOLDER_NAME), |path, segment| {
            path.join(segment)
        })
}

pub fn locale_dir(base: &Path) -> PathBuf {
    base.join(relative_locale_subpath())
}

pub fn has_locale_dir(base: &Path) -> bool {
    locale_dir(base).exists()
}

/// Work out the installation base from a path the user believes is at or near the game.
///
/// Accepts either the game folder itself or the folder containing it. This never fails;
/// when nothing matches, the absolutized input is returned so a later `create_dir_all`
/// can still build the structure.
pub fn resolve_base(user_path: &Path) -> PathBuf {
    let input = absolutize(user_path);

    if has_locale_dir(&input) {
        debug!("resolve_base: {} already holds the locale dir", input.display());
        return input;
    }

    if is_game_folder(&input)
        && let Some(parent) = input.parent()
    {
        debug!(
            "resolve_base: {} is the game folder; using its parent",
            input.display()
        );
        return parent.to_path_buf();
    }

    if let Some(parent) = input.parent()
        && has_locale_dir(parent)
    {
        debug!(
            "resolve_base: locale dir found next to {}; using parent",
            input.display()
        );
        return parent.to_path_buf();
    }

    debug!("resolve_base: no match for {}; using as-is", input.display());
    input
}

fn is_game_folder(path: &Path) -> bool {
    path.file_name()
        .map(|name| {
            name.to_string_lossy()
                .to_lowercase()
                .eq(&GAME_FOLDER_NAME.to_lowercase())
        })
        .unwrap_or(false)
}

fn absolutize(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
