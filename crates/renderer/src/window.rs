use std::sync::Arc;

use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowBuilder};

use crate::compile::CompiledProgram;
use crate::error::RendererError;
use crate::frame::{FrameLoop, FrameSurface};
use crate::gpu::GpuState;
use crate::overlay::Overlay;
use crate::runtime::{FrameUniforms, SystemTimeSource};
use crate::types::RendererConfig;

/// GPU state plus the window it presents to.
///
/// Field order matters: the surface inside `gpu` must be dropped before the
/// window it was created from.
struct WindowState {
    gpu: GpuState,
    window: Arc<Window>,
}

impl WindowState {
    fn new(window: Arc<Window>, program: &CompiledProgram) -> Result<Self, RendererError> {
        let size = window.inner_size();
        let gpu = GpuState::new(window.as_ref(), size, program)?;
        Ok(Self { gpu, window })
    }

    fn window(&self) -> &Window {
        &self.window
    }
}

impl FrameSurface for WindowState {
    fn framebuffer_size(&self) -> PhysicalSize<u32> {
        self.window.inner_size()
    }

    fn resize_viewport(&mut self, size: PhysicalSize<u32>) {
        self.gpu.resize(size);
    }

    fn draw_frame(
        &mut self,
        uniforms: &FrameUniforms,
        overlay: Option<&mut dyn Overlay>,
    ) -> Result<(), wgpu::SurfaceError> {
        self.gpu.render(uniforms, overlay)
    }
}

/// Opens the window, links the program on the GPU and runs frames until the
/// window is closed or Escape is pressed.
pub(crate) fn run(
    config: &RendererConfig,
    program: CompiledProgram,
    overlay_font: Option<fontdue::Font>,
) -> Result<(), RendererError> {
    let event_loop = EventLoop::new()?;

    let (width, height) = config.surface_size;
    let window = WindowBuilder::new()
        .with_title(config.title.as_str())
        .with_inner_size(PhysicalSize::new(width, height))
        .with_resizable(true)
        .build(&event_loop)?;
    let window = Arc::new(window);

    let mut state = WindowState::new(window, &program)?;
    drop(program);

    let overlay: Option<Box<dyn Overlay>> = overlay_font
        .map(|font| Box::new(state.gpu.create_fps_overlay(font)) as Box<dyn Overlay>);
    let fps_overlay = overlay.is_some();
    let mut frames = FrameLoop::new(Box::new(SystemTimeSource::new()), overlay);

    tracing::info!(
        width = state.gpu.size().width,
        height = state.gpu.size().height,
        fps_overlay,
        "renderer started"
    );

    let mut fatal: Option<RendererError> = None;
    let window_id = state.window().id();

    event_loop.run(|event, elwt| {
        elwt.set_control_flow(ControlFlow::Poll);
        match event {
            Event::WindowEvent {
                window_id: id,
                event,
            } if id == window_id => match event {
                WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                    frames.request_close();
                    elwt.exit();
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    if event.state == ElementState::Pressed
                        && matches!(event.logical_key, Key::Named(NamedKey::Escape))
                    {
                        frames.request_close();
                        elwt.exit();
                    }
                }
                WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                    frames.invalidate_viewport();
                }
                WindowEvent::RedrawRequested => match frames.run_frame(&mut state) {
                    Ok(_) => {}
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        state.gpu.recover_surface();
                        frames.invalidate_viewport();
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        tracing::error!("surface out of memory; exiting");
                        fatal = Some(RendererError::Surface(wgpu::SurfaceError::OutOfMemory));
                        frames.request_close();
                        elwt.exit();
                    }
                    Err(wgpu::SurfaceError::Timeout) => {
                        tracing::warn!("surface timeout; retrying next frame");
                    }
                    Err(other) => {
                        tracing::warn!(error = ?other, "surface error; retrying next frame");
                    }
                },
                _ => {}
            },
            Event::AboutToWait => {
                if frames.is_running() {
                    state.window().request_redraw();
                }
            }
            _ => {}
        }
    })?;

    tracing::info!("renderer stopped");

    match fatal {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
