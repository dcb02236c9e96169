//! Debug overlay drawn on top of the shader output.
//!
//! The frame loop only knows the [`Overlay`] trait. [`FpsOverlay`] is the
//! built-in implementation: a translucent panel in the top-left corner showing
//! the frame rate. The readout is laid out and rasterized with `fontdue` into a
//! glyph atlas, then drawn as instanced textured quads in a second render pass
//! that loads (not clears) the frame.

mod atlas;
mod font;

use fontdue::layout::{CoordinateSystem, Layout, LayoutSettings, TextStyle};
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;

use crate::runtime::FrameTiming;

use atlas::{build_instances, GlyphAtlas, PanelStyle, PlacedGlyph, QuadInstance};
pub use font::{load_overlay_font, FontLoadError};

/// Resources an overlay may record into for the current frame.
pub struct OverlayTarget<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    pub encoder: &'a mut wgpu::CommandEncoder,
    pub view: &'a wgpu::TextureView,
    pub size: PhysicalSize<u32>,
}

/// Per-frame hooks invoked by the frame loop, in order, once per presented
/// frame.
pub trait Overlay {
    /// Called before the scene is drawn with the timing of this frame.
    fn begin_frame(&mut self, timing: &FrameTiming);
    /// Records overlay drawing after the scene pass.
    fn draw(&mut self, target: &mut OverlayTarget<'_>);
    /// Called after drawing, before the frame is presented.
    fn end_frame(&mut self) {}
}

const ATLAS_SIZE: u32 = 256;
const FONT_PX: f32 = 18.0;
/// Panel plus the longest readout, "9999.9 FPS".
const MAX_INSTANCES: usize = 16;
const READOUT_CHARS: &str = "0123456789.-FPS";

const PANEL_ORIGIN: [f32; 2] = [8.0, 8.0];
const PANEL_PADDING: f32 = 6.0;
const BACKGROUND: [f32; 4] = [0.0, 0.0, 0.0, 0.6];
const FOREGROUND: [f32; 4] = [0.3, 1.0, 0.45, 1.0];

const QUAD_CORNERS: [[f32; 2]; 4] = [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
const QUAD_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

/// Readout text for a frame rate.
pub fn format_fps(fps: f64) -> String {
    if !fps.is_finite() || fps < 0.0 {
        return "--.- FPS".to_string();
    }
    format!("{:.1} FPS", fps.min(9999.9))
}

/// Lays out `text` on one line and returns the glyphs that have pixels.
fn place_text(
    layout: &mut Layout,
    font: &fontdue::Font,
    text: &str,
    px: f32,
) -> Vec<PlacedGlyph> {
    layout.reset(&LayoutSettings::default());
    layout.append(&[font], &TextStyle::new(text, px, 0));
    layout
        .glyphs()
        .iter()
        .filter(|g| g.char_data.rasterize() && g.width > 0 && g.height > 0)
        .map(|g| PlacedGlyph {
            ch: g.parent,
            x: g.x,
            y: g.y,
            width: g.width as f32,
            height: g.height as f32,
        })
        .collect()
}

fn rasterize_into(atlas: &mut GlyphAtlas, font: &fontdue::Font, ch: char) {
    let (metrics, bitmap) = font.rasterize(ch, FONT_PX);
    if metrics.width == 0 || metrics.height == 0 {
        return;
    }
    if atlas
        .insert(ch, metrics.width as u32, metrics.height as u32, &bitmap)
        .is_none()
    {
        tracing::warn!(%ch, "overlay glyph atlas is full");
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct ViewportUniform {
    size: [f32; 2],
    _padding: [f32; 2],
}

/// Frame-rate readout rendered with a dedicated pipeline.
pub struct FpsOverlay {
    font: fontdue::Font,
    layout: Layout,
    atlas: GlyphAtlas,
    style: PanelStyle,
    text: String,
    instances: Vec<QuadInstance>,
    in_frame: bool,

    pipeline: wgpu::RenderPipeline,
    bind_group: wgpu::BindGroup,
    viewport_buffer: wgpu::Buffer,
    atlas_texture: wgpu::Texture,
    quad_vertices: wgpu::Buffer,
    quad_indices: wgpu::Buffer,
    instance_buffer: wgpu::Buffer,
}

impl FpsOverlay {
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        font: fontdue::Font,
    ) -> Self {
        let mut atlas = GlyphAtlas::new(ATLAS_SIZE);
        for ch in READOUT_CHARS.chars() {
            rasterize_into(&mut atlas, &font, ch);
        }
        let line_height = font
            .horizontal_line_metrics(FONT_PX)
            .map(|metrics| metrics.new_line_size)
            .unwrap_or(FONT_PX * 1.2);
        let style = PanelStyle {
            origin: PANEL_ORIGIN,
            padding: PANEL_PADDING,
            line_height,
            background: BACKGROUND,
            foreground: FOREGROUND,
        };

        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("fps overlay"),
            source: wgpu::ShaderSource::Wgsl(OVERLAY_WGSL.into()),
        });

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("fps overlay layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let viewport_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("fps overlay viewport"),
            size: std::mem::size_of::<ViewportUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let atlas_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("fps overlay glyph atlas"),
            size: wgpu::Extent3d {
                width: ATLAS_SIZE,
                height: ATLAS_SIZE,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::R8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let atlas_view = atlas_texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("fps overlay sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("fps overlay bind group"),
            layout: &layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: viewport_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&atlas_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("fps overlay pipeline layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let quad_layout = wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &wgpu::vertex_attr_array![0 => Float32x2],
        };

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("fps overlay pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &module,
                entry_point: Some("vs_main"),
                buffers: &[quad_layout, QuadInstance::layout()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &module,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview: None,
            cache: None,
        });

        let quad_vertices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("fps overlay quad"),
            contents: bytemuck::cast_slice(&QUAD_CORNERS),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let quad_indices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("fps overlay quad indices"),
            contents: bytemuck::cast_slice(&QUAD_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        });
        let instance_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("fps overlay instances"),
            size: (MAX_INSTANCES * std::mem::size_of::<QuadInstance>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut overlay = Self {
            font,
            layout: Layout::new(CoordinateSystem::PositiveYDown),
            atlas,
            style,
            text: String::new(),
            instances: Vec::new(),
            in_frame: false,
            pipeline,
            bind_group,
            viewport_buffer,
            atlas_texture,
            quad_vertices,
            quad_indices,
            instance_buffer,
        };
        overlay.set_text(format_fps(0.0));
        overlay
    }

    fn set_text(&mut self, text: String) {
        self.text = text;
        let placed = place_text(&mut self.layout, &self.font, &self.text, FONT_PX);
        for glyph in &placed {
            if self.atlas.get(glyph.ch).is_none() {
                rasterize_into(&mut self.atlas, &self.font, glyph.ch);
            }
        }
        self.instances = build_instances(&placed, &self.atlas, &self.style);
        self.instances.truncate(MAX_INSTANCES);
    }

    fn upload_atlas(&mut self, queue: &wgpu::Queue) {
        if !self.atlas.take_dirty() {
            return;
        }
        let size = self.atlas.size();
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.atlas_texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            self.atlas.pixels(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(size),
                rows_per_image: Some(size),
            },
            wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 1,
            },
        );
    }
}

impl Overlay for FpsOverlay {
    fn begin_frame(&mut self, timing: &FrameTiming) {
        let text = format_fps(timing.fps());
        if text != self.text {
            self.set_text(text);
        }
        self.in_frame = true;
    }

    fn draw(&mut self, target: &mut OverlayTarget<'_>) {
        if !self.in_frame || self.instances.is_empty() {
            return;
        }
        self.upload_atlas(target.queue);

        let viewport = ViewportUniform {
            size: [target.size.width.max(1) as f32, target.size.height.max(1) as f32],
            _padding: [0.0; 2],
        };
        target
            .queue
            .write_buffer(&self.viewport_buffer, 0, bytemuck::bytes_of(&viewport));
        target
            .queue
            .write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(&self.instances));

        let mut pass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("fps overlay pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.view,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.set_vertex_buffer(0, self.quad_vertices.slice(..));
        pass.set_vertex_buffer(1, self.instance_buffer.slice(..));
        pass.set_index_buffer(self.quad_indices.slice(..), wgpu::IndexFormat::Uint16);
        pass.draw_indexed(0..QUAD_INDICES.len() as u32, 0, 0..self.instances.len() as u32);
    }

    fn end_frame(&mut self) {
        self.in_frame = false;
    }
}

const OVERLAY_WGSL: &str = r"
struct Viewport {
    size: vec2<f32>,
    _padding: vec2<f32>,
};

@group(0) @binding(0) var<uniform> viewport: Viewport;
@group(0) @binding(1) var atlas_texture: texture_2d<f32>;
@group(0) @binding(2) var atlas_sampler: sampler;

struct VertexInput {
    @location(0) corner: vec2<f32>,
    @location(1) dst_min: vec2<f32>,
    @location(2) dst_max: vec2<f32>,
    @location(3) uv_min: vec2<f32>,
    @location(4) uv_max: vec2<f32>,
    @location(5) color: vec4<f32>,
};

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
    @location(1) color: vec4<f32>,
};

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    let pixel = mix(input.dst_min, input.dst_max, input.corner);
    let ndc = vec2<f32>(
        pixel.x / viewport.size.x * 2.0 - 1.0,
        1.0 - pixel.y / viewport.size.y * 2.0,
    );

    var out: VertexOutput;
    out.position = vec4<f32>(ndc, 0.0, 1.0);
    out.uv = mix(input.uv_min, input.uv_max, input.corner);
    out.color = input.color;
    return out;
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    let coverage = textureSample(atlas_texture, atlas_sampler, input.uv).r;
    return vec4<f32>(input.color.rgb, input.color.a * coverage);
}
";
