use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use winit::dpi::PhysicalSize;

use crate::compile::CompiledProgram;
use crate::error::RendererError;
use crate::overlay::{FpsOverlay, Overlay, OverlayTarget};
use crate::runtime::FrameUniforms;

use super::context::GpuContext;
use super::pipeline::ShaderProgram;

pub(crate) struct GpuState {
    context: GpuContext,
    program: ShaderProgram,
}

impl GpuState {
    pub(crate) fn new<T>(
        target: &T,
        initial_size: PhysicalSize<u32>,
        program: &CompiledProgram,
    ) -> Result<Self, RendererError>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let context = GpuContext::new(target, initial_size)?;
        let program = ShaderProgram::link(&context.device, context.surface_format, program)?;
        Ok(Self { context, program })
    }

    pub(crate) fn size(&self) -> PhysicalSize<u32> {
        self.context.size
    }

    pub(crate) fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.context.resize(new_size);
    }

    /// Reconfigures the surface after it reported `Lost` or `Outdated`.
    pub(crate) fn recover_surface(&mut self) {
        self.context.reconfigure();
    }

    pub(crate) fn create_fps_overlay(&self, font: fontdue::Font) -> FpsOverlay {
        FpsOverlay::new(&self.context.device, self.context.surface_format, font)
    }

    /// Clears to black, draws the triangle, lets the overlay draw on top and
    /// presents the frame.
    pub(crate) fn render(
        &mut self,
        uniforms: &FrameUniforms,
        overlay: Option<&mut dyn Overlay>,
    ) -> Result<(), wgpu::SurfaceError> {
        let frame = self.context.surface.get_current_texture()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.program
            .set_frame_uniforms(&self.context.queue, uniforms);

        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("frame encoder"),
                });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("render pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            self.program.draw(&mut render_pass);
        }

        if let Some(overlay) = overlay {
            let mut target = OverlayTarget {
                device: &self.context.device,
                queue: &self.context.queue,
                encoder: &mut encoder,
                view: &view,
                size: self.context.size,
            };
            overlay.draw(&mut target);
            overlay.end_frame();
        }

        self.context.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }
}
