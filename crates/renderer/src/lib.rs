//! Renderer crate for shadertri, a fullscreen-triangle GLSL viewer.
//!
//! A vertex and a fragment shader are read from disk, compiled and checked on
//! the CPU, then drawn every frame over a single triangle that covers the
//! window. The fragment shader sees two uniforms: `iResolution` (framebuffer
//! size in pixels) and `iTime` (seconds since start-up). The overall flow is:
//!
//! ```text
//!   CLI / shadertri
//!          │ RendererConfig
//!          ▼
//!   Renderer::run ──▶ ShaderSources::load ──▶ CompiledProgram::compile
//!                                                     │
//!                                                     ▼
//!                     window::run ──▶ GpuState (surface, pipeline, uniforms)
//!                          │
//!                          └─▶ winit event loop ──▶ FrameLoop::run_frame()
//! ```
//!
//! Every shader failure is reported before a window is opened except those
//! only the GPU device can detect, which surface as [`RendererError::Link`].

mod compile;
mod error;
mod frame;
mod gpu;
mod interface;
mod overlay;
mod preprocess;
mod runtime;
mod source;
mod types;
mod window;

pub use compile::{compile_stage, CompiledProgram, CompiledStage};
pub use error::RendererError;
pub use frame::{FrameLoop, FrameOutcome, FrameSurface, LoopState};
pub use interface::{BlockLayout, BlockMember, ProgramInterface, UniformLocation, UniformType};
pub use overlay::{
    format_fps, load_overlay_font, FontLoadError, FpsOverlay, Overlay, OverlayTarget,
};
pub use preprocess::{HostBlock, LooseUniform};
pub use runtime::{
    BoxedTimeSource, FrameTiming, FrameUniforms, SystemTimeSource, TimeSample, TimeSource,
};
pub use source::ShaderSources;
pub use types::{
    RendererConfig, ShaderPaths, StageKind, DEFAULT_FRAGMENT_SHADER, DEFAULT_SURFACE_SIZE,
    DEFAULT_TITLE, DEFAULT_VERTEX_SHADER, RESOLUTION_UNIFORM, TIME_UNIFORM,
};

/// High-level entry point that owns the chosen configuration.
pub struct Renderer {
    config: RendererConfig,
}

impl Renderer {
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }

    /// Loads and compiles the shaders, then opens the window and renders
    /// until it is closed.
    pub fn run(&self) -> Result<(), RendererError> {
        let program = self.prepare()?;
        let overlay_font = self.overlay_font();
        window::run(&self.config, program, overlay_font)
    }

    /// Everything `run` does before touching the windowing system.
    pub fn prepare(&self) -> Result<CompiledProgram, RendererError> {
        let sources = ShaderSources::load(&self.config.shaders)?;
        CompiledProgram::compile(&sources)
    }

    /// The readout font, or `None` when the overlay is off or no usable font
    /// exists. A missing font only disables the overlay.
    fn overlay_font(&self) -> Option<fontdue::Font> {
        if !self.config.fps_overlay {
            return None;
        }
        match load_overlay_font(self.config.overlay_font.as_deref()) {
            Ok(font) => Some(font),
            Err(err) => {
                tracing::warn!(error = %err, "frame-rate overlay disabled");
                None
            }
        }
    }
}
