//! Font discovery for the PDF rendering engine.

use std::env;
use std::io;
use std::path::{Path, PathBuf};

use genpdf::error::Error;
use genpdf::fonts::{self, FontData, FontFamily};

/// Environment variable pointing at a directory with the report fonts.
pub const FONTS_DIR_ENV: &str = "RDLC_FONTS_DIR";

/// Name of the font family reports are typeset in.
pub const REPORT_FONT_FAMILY_NAME: &str = "Roboto";

const FONT_FILES: &[&str] = &[
    "Roboto-Regular.ttf",
    "Roboto-Bold.ttf",
    "Roboto-Italic.ttf",
    "Roboto-BoldItalic.ttf",
];

fn font_directory_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    if let Some(path) = env::var_os(FONTS_DIR_ENV).filter(|value| !value.is_empty()) {
        candidates.push(PathBuf::from(path));
    }

    if let Some(bin_dir) = env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        candidates.push(bin_dir.join("assets/fonts"));
    }

    let manifest = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets/fonts");
    if !candidates.contains(&manifest) {
        candidates.push(manifest);
    }

    candidates
}

fn is_complete(directory: &Path) -> bool {
    directory.is_dir() && FONT_FILES.iter().all(|name| directory.join(name).is_file())
}

fn resolve_font_directory() -> Result<PathBuf, Error> {
    let candidates = font_directory_candidates();
    if let Some(found) = candidates.iter().find(|candidate| is_complete(candidate)) {
        log::debug!("using report fonts from {}", found.display());
        return Ok(found.clone());
    }

    let checked = candidates
        .iter()
        .map(|path| path.display().to_string())
        .collect::<Vec<_>>()
        .join(", ");
    Err(Error::new(
        format!(
            "Report fonts not found. Checked: {checked}. Set {FONTS_DIR_ENV} to a directory with {}.",
            FONT_FILES.join(", ")
        ),
        io::Error::new(io::ErrorKind::NotFound, "report fonts directory not found"),
    ))
}

/// Loads the report font family from the first complete font directory.
pub fn report_font_family() -> Result<FontFamily<FontData>, Error> {
    let directory = resolve_font_directory()?;

    fonts::from_files(&directory, REPORT_FONT_FAMILY_NAME, None).map_err(|err| {
        Error::new(
            format!(
                "Failed to load font family '{}' from {}: {}",
                REPORT_FONT_FAMILY_NAME,
                directory.display(),
                err
            ),
            io::Error::new(io::ErrorKind::Other, err.to_string()),
        )
    })
}

/// Indicates whether a complete set of report fonts can be found.
pub fn report_fonts_available() -> bool {
    font_directory_candidates()
        .iter()
        .any(|candidate| is_complete(candidate))
}
