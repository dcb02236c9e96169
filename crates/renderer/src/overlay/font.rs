use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Fonts tried, in order, when no overlay font is configured.
pub const SYSTEM_FONT_CANDIDATES: [&str; 5] = [
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/noto/NotoSans-Regular.ttf",
    "/usr/share/fonts/truetype/noto/NotoSans-Regular.ttf",
];

#[derive(Debug, Error)]
pub enum FontLoadError {
    #[error("failed to read overlay font {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse overlay font {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },
    #[error("no overlay font found in {} system locations", .searched)]
    NotFound { searched: usize },
}

/// Loads the overlay font from `explicit`, or from the first readable system
/// candidate when no path is given.
pub fn load_overlay_font(explicit: Option<&Path>) -> Result<fontdue::Font, FontLoadError> {
    match explicit {
        Some(path) => load_font_file(path),
        None => {
            let candidates: Vec<PathBuf> =
                SYSTEM_FONT_CANDIDATES.iter().map(PathBuf::from).collect();
            find_font(&candidates)
        }
    }
}

fn find_font(candidates: &[PathBuf]) -> Result<fontdue::Font, FontLoadError> {
    for path in candidates {
        let Ok(bytes) = fs::read(path) else {
            continue;
        };
        match parse_font(path, &bytes) {
            Ok(font) => return Ok(font),
            Err(err) => tracing::debug!(error = %err, "skipping unusable system font"),
        }
    }
    Err(FontLoadError::NotFound {
        searched: candidates.len(),
    })
}

fn load_font_file(path: &Path) -> Result<fontdue::Font, FontLoadError> {
    let bytes = fs::read(path).map_err(|source| FontLoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_font(path, &bytes)
}

fn parse_font(path: &Path, bytes: &[u8]) -> Result<fontdue::Font, FontLoadError> {
    let font = fontdue::Font::from_bytes(bytes, fontdue::FontSettings::default()).map_err(
        |message| FontLoadError::Parse {
            path: path.to_path_buf(),
            message: message.to_string(),
        },
    )?;
    tracing::debug!(path = %path.display(), "loaded overlay font");
    Ok(font)
}
