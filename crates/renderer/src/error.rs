use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::types::StageKind;

/// Failures surfaced by [`crate::Renderer::run`].
///
/// Everything except [`RendererError::Surface`] happens before the first frame
/// is drawn; callers are expected to treat those as fatal.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("failed to read {stage} shader at {}", .path.display())]
    ShaderRead {
        stage: StageKind,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{stage} shader failed to compile:\n{log}")]
    Compile { stage: StageKind, log: String },

    #[error("shader program failed to link:\n{log}")]
    Link { log: String },

    #[error("failed to create window")]
    Window(#[from] winit::error::OsError),

    #[error("event loop error")]
    EventLoop(#[from] winit::error::EventLoopError),

    #[error(transparent)]
    Gpu(#[from] anyhow::Error),

    #[error("surface error while presenting")]
    Surface(#[source] wgpu::SurfaceError),
}

impl RendererError {
    /// Diagnostic log attached to compile and link failures.
    pub fn log(&self) -> Option<&str> {
        match self {
            RendererError::Compile { log, .. } | RendererError::Link { log } => Some(log),
            _ => None,
        }
    }

    /// Stage that failed, for read and compile failures.
    pub fn stage(&self) -> Option<StageKind> {
        match self {
            RendererError::ShaderRead { stage, .. } | RendererError::Compile { stage, .. } => {
                Some(*stage)
            }
            _ => None,
        }
    }
}
