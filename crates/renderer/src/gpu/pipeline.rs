use wgpu::util::DeviceExt;

use crate::compile::CompiledProgram;
use crate::error::RendererError;
use crate::interface::{UniformLocation, UniformType};
use crate::runtime::FrameUniforms;
use crate::types::{RESOLUTION_UNIFORM, TIME_UNIFORM};

use super::uniforms::UniformBlock;

/// Clip-space corners of the triangle that covers the whole viewport.
pub(crate) const FULLSCREEN_TRIANGLE: [[f32; 2]; 3] = [[-1.0, -1.0], [3.0, -1.0], [-1.0, 3.0]];

const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];

struct UniformBinding {
    block: UniformBlock,
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

/// The linked program: render pipeline, vertex buffer and the host block.
pub(crate) struct ShaderProgram {
    pipeline: wgpu::RenderPipeline,
    vertex_buffer: wgpu::Buffer,
    uniforms: Option<UniformBinding>,
    resolution: UniformLocation,
    time: UniformLocation,
}

impl ShaderProgram {
    /// Builds the GPU pipeline for an already compiled program.
    ///
    /// Validation errors raised by the device while creating the pipeline
    /// are captured and returned as a link failure.
    pub fn link(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        program: &CompiledProgram,
    ) -> Result<Self, RendererError> {
        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let vertex_module = program.vertex.create_module(device);
        let fragment_module = program.fragment.create_module(device);

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("fullscreen triangle"),
            contents: bytemuck::cast_slice(&FULLSCREEN_TRIANGLE),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let uniform_resources = program.interface.block().map(|layout| {
            let block = UniformBlock::new(layout);
            let bind_group_layout =
                device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("uniform layout"),
                    entries: &[wgpu::BindGroupLayoutEntry {
                        binding: layout.binding,
                        visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: None,
                        },
                        count: None,
                    }],
                });
            let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("uniform block"),
                contents: block.as_bytes(),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("uniform bind group"),
                layout: &bind_group_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: block.binding(),
                    resource: buffer.as_entire_binding(),
                }],
            });
            (
                bind_group_layout,
                UniformBinding {
                    block,
                    buffer,
                    bind_group,
                },
            )
        });

        let bind_group_layouts: Vec<&wgpu::BindGroupLayout> = uniform_resources
            .iter()
            .map(|(layout, _)| layout)
            .collect();
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("shader pipeline layout"),
            bind_group_layouts: &bind_group_layouts,
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("shader pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &vertex_module,
                entry_point: Some("main"),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &VERTEX_ATTRIBUTES,
                }],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &fragment_module,
                entry_point: Some("main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview: None,
            cache: None,
        });

        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(RendererError::Link {
                log: err.to_string(),
            });
        }

        let resolution = program
            .interface
            .uniform_location(RESOLUTION_UNIFORM, UniformType::Vec2);
        let time = program
            .interface
            .uniform_location(TIME_UNIFORM, UniformType::Float);
        tracing::debug!(?resolution, ?time, "linked shader program");

        Ok(Self {
            pipeline,
            vertex_buffer,
            uniforms: uniform_resources.map(|(_, binding)| binding),
            resolution,
            time,
        })
    }

    /// Writes this frame's values into the block and uploads it.
    pub fn set_frame_uniforms(&mut self, queue: &wgpu::Queue, values: &FrameUniforms) {
        let Some(uniforms) = self.uniforms.as_mut() else {
            return;
        };
        uniforms.block.set_vec2(self.resolution, values.resolution);
        uniforms.block.set_float(self.time, values.time);
        queue.write_buffer(&uniforms.buffer, 0, uniforms.block.as_bytes());
    }

    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_pipeline(&self.pipeline);
        if let Some(uniforms) = &self.uniforms {
            pass.set_bind_group(0, &uniforms.bind_group, &[]);
        }
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.draw(0..FULLSCREEN_TRIANGLE.len() as u32, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triangle_covers_clip_space() {
        // The three vertices span [-1, 3] on both axes, which contains [-1, 1].
        let xs = FULLSCREEN_TRIANGLE.map(|v| v[0]);
        let ys = FULLSCREEN_TRIANGLE.map(|v| v[1]);
        assert_eq!(xs.iter().cloned().fold(f32::INFINITY, f32::min), -1.0);
        assert_eq!(ys.iter().cloned().fold(f32::INFINITY, f32::min), -1.0);
        assert_eq!(xs.iter().cloned().fold(f32::NEG_INFINITY, f32::max), 3.0);
        assert_eq!(ys.iter().cloned().fold(f32::NEG_INFINITY, f32::max), 3.0);
    }

    #[test]
    fn vertex_layout_is_two_floats_at_location_zero() {
        assert_eq!(VERTEX_ATTRIBUTES.len(), 1);
        assert_eq!(VERTEX_ATTRIBUTES[0].shader_location, 0);
        assert_eq!(VERTEX_ATTRIBUTES[0].offset, 0);
        assert_eq!(VERTEX_ATTRIBUTES[0].format, wgpu::VertexFormat::Float32x2);
        assert_eq!(bytemuck::cast_slice::<_, u8>(&FULLSCREEN_TRIANGLE).len(), 24);
    }
}
