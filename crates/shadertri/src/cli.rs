use std::path::PathBuf;

use clap::Parser;
use renderer::{DEFAULT_FRAGMENT_SHADER, DEFAULT_TITLE, DEFAULT_VERTEX_SHADER};

#[derive(Parser, Debug)]
#[command(
    name = "shadertri",
    author,
    version,
    about = "Render a GLSL fragment shader over a fullscreen triangle"
)]
pub struct Cli {
    /// Vertex shader source (GLSL 4.50).
    #[arg(
        long,
        value_name = "PATH",
        env = "SHADERTRI_VERTEX",
        default_value = DEFAULT_VERTEX_SHADER
    )]
    pub vertex: PathBuf,

    /// Fragment shader source (GLSL 4.50).
    #[arg(
        long,
        value_name = "PATH",
        env = "SHADERTRI_FRAGMENT",
        default_value = DEFAULT_FRAGMENT_SHADER
    )]
    pub fragment: PathBuf,

    /// Initial window size (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT", default_value = "640x480", value_parser = parse_size)]
    pub size: (u32, u32),

    /// Window title.
    #[arg(long, default_value = DEFAULT_TITLE)]
    pub title: String,

    /// Draw the frame-rate readout in the top-left corner.
    #[arg(long)]
    pub fps_overlay: bool,

    /// Font used by the frame-rate readout (TTF/OTF); common system fonts are
    /// tried when omitted.
    #[arg(long, value_name = "PATH", env = "SHADERTRI_OVERLAY_FONT")]
    pub overlay_font: Option<PathBuf>,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_size(value: &str) -> Result<(u32, u32), String> {
    let trimmed = value.trim();
    let (width, height) = trimmed
        .split_once(['x', 'X', '×'])
        .ok_or_else(|| "expected WIDTHxHEIGHT, e.g. 1280x720".to_string())?;

    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| format!("invalid width '{}'", width.trim()))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| format!("invalid height '{}'", height.trim()))?;

    if width == 0 || height == 0 {
        return Err("window dimensions must be greater than zero".to_string());
    }

    Ok((width, height))
}
