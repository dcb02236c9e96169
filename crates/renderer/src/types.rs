use std::fmt;
use std::path::PathBuf;

use wgpu::naga::ShaderStage;

/// Vertex shader path used when the caller does not override it.
pub const DEFAULT_VERTEX_SHADER: &str = "./shaders/shader.vert";
/// Fragment shader path used when the caller does not override it.
pub const DEFAULT_FRAGMENT_SHADER: &str = "./shaders/shader.frag";
/// Initial window size in physical pixels.
pub const DEFAULT_SURFACE_SIZE: (u32, u32) = (640, 480);
/// Initial window title.
pub const DEFAULT_TITLE: &str = "OpenGL Triangle";

/// Name of the `vec2` uniform carrying the framebuffer size in pixels.
pub const RESOLUTION_UNIFORM: &str = "iResolution";
/// Name of the `float` uniform carrying elapsed seconds.
pub const TIME_UNIFORM: &str = "iTime";

/// Programmable stage a shader source belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    Vertex,
    Fragment,
}

impl StageKind {
    pub(crate) fn to_naga(self) -> ShaderStage {
        match self {
            StageKind::Vertex => ShaderStage::Vertex,
            StageKind::Fragment => ShaderStage::Fragment,
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageKind::Vertex => f.write_str("vertex"),
            StageKind::Fragment => f.write_str("fragment"),
        }
    }
}

/// Locations of the two GLSL sources that make up the program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderPaths {
    pub vertex: PathBuf,
    pub fragment: PathBuf,
}

impl ShaderPaths {
    pub fn new(vertex: impl Into<PathBuf>, fragment: impl Into<PathBuf>) -> Self {
        Self {
            vertex: vertex.into(),
            fragment: fragment.into(),
        }
    }
}

impl Default for ShaderPaths {
    fn default() -> Self {
        Self::new(DEFAULT_VERTEX_SHADER, DEFAULT_FRAGMENT_SHADER)
    }
}

/// Immutable configuration passed to the renderer at start-up.
///
/// The defaults reproduce the fixed demo setup: a 640×480 resizable window
/// titled "OpenGL Triangle" rendering `./shaders/shader.{vert,frag}` without
/// the frame-rate overlay.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Initial window size in physical pixels.
    pub surface_size: (u32, u32),
    /// Window title.
    pub title: String,
    /// Vertex and fragment shader locations.
    pub shaders: ShaderPaths,
    /// Draw the frame-rate readout on top of the shader output.
    pub fps_overlay: bool,
    /// TrueType/OpenType font for the readout; common system fonts are tried
    /// when unset.
    pub overlay_font: Option<PathBuf>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            surface_size: DEFAULT_SURFACE_SIZE,
            title: DEFAULT_TITLE.to_string(),
            shaders: ShaderPaths::default(),
            fps_overlay: false,
            overlay_font: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_demo_window() {
        let config = RendererConfig::default();
        assert_eq!(config.surface_size, (640, 480));
        assert_eq!(config.title, "OpenGL Triangle");
        assert_eq!(
            config.shaders.vertex,
            PathBuf::from("./shaders/shader.vert")
        );
        assert_eq!(
            config.shaders.fragment,
            PathBuf::from("./shaders/shader.frag")
        );
        assert!(!config.fps_overlay);
        assert!(config.overlay_font.is_none());
    }

    #[test]
    fn stage_kind_displays_lowercase_name() {
        assert_eq!(StageKind::Vertex.to_string(), "vertex");
        assert_eq!(StageKind::Fragment.to_string(), "fragment");
    }
}
