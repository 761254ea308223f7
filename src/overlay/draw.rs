use crate::gpu::GpuContext;

use super::font::FontAtlas;
use super::layout::{Color, Rect, Shape};

/// Vertex for overlay quads and glyphs, in pixels.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex2d {
    pub position: [f32; 2],
    pub uv: [f32; 2],
    pub color: [f32; 4],
}

impl Vertex2d {
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex2d>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            // position
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x2,
            },
            // uv
            wgpu::VertexAttribute {
                offset: 8,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x2,
            },
            // color
            wgpu::VertexAttribute {
                offset: 16,
                shader_location: 2,
                format: wgpu::VertexFormat::Float32x4,
            },
        ],
    };
}

#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct OverlayUniforms {
    resolution: [f32; 2],
    _padding: [f32; 2],
}

const MAX_VERTICES: usize = 16384;

/// Six vertices covering `(x, y, w, h)` with the given UV rectangle.
fn quad(rect: Rect, uv: [f32; 4], color: Color) -> [Vertex2d; 6] {
    let Rect { x, y, w, h } = rect;
    let [u0, v0, u1, v1] = uv;
    let c = color.to_array();
    let v = |px: f32, py: f32, u: f32, vv: f32| Vertex2d {
        position: [px, py],
        uv: [u, vv],
        color: c,
    };
    [
        v(x, y, u0, v0),
        v(x + w, y, u1, v0),
        v(x, y + h, u0, v1),
        v(x + w, y, u1, v0),
        v(x + w, y + h, u1, v1),
        v(x, y + h, u0, v1),
    ]
}

/// Glyph quads for `text` with its top-left at `(x, y)`.
pub fn text_vertices(font: &FontAtlas, x: f32, y: f32, text: &str, color: Color) -> Vec<Vertex2d> {
    let mut vertices = Vec::with_capacity(text.len() * 6);
    let mut cursor_x = x;
    let baseline_y = y + font.size();

    for ch in text.chars() {
        let Some(glyph) = font.glyph(ch) else {
            cursor_x += font.size() * 0.5;
            continue;
        };
        if glyph.width > 0 && glyph.height > 0 {
            // fontdue's ymin is the glyph bottom relative to the baseline.
            let gy = baseline_y - glyph.offset_y - glyph.height as f32;
            let rect = Rect::new(
                cursor_x + glyph.offset_x,
                gy,
                glyph.width as f32,
                glyph.height as f32,
            );
            let [u, v, w, h] = glyph.uv;
            vertices.extend_from_slice(&quad(rect, [u, v, u + w, v + h], color));
        }
        cursor_x += glyph.advance;
    }
    vertices
}

/// Batched 2D drawing for labels, panels and text.
///
/// Shapes are queued with [`Overlay2d::prepare`] and drawn in one go by
/// [`Overlay2d::render`] on top of the finished 3D frame.
pub struct Overlay2d {
    colored_pipeline: wgpu::RenderPipeline,
    textured_pipeline: wgpu::RenderPipeline,
    vertex_buffer: wgpu::Buffer,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    font_bind_group: Option<wgpu::BindGroup>,
    colored_vertices: Vec<Vertex2d>,
    text_vertices: Vec<Vertex2d>,
}

impl Overlay2d {
    pub fn new(gpu: &GpuContext, font: Option<&FontAtlas>) -> Self {
        let device = &gpu.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Overlay Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/overlay.wgsl").into()),
        });

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Overlay Uniforms"),
            size: std::mem::size_of::<OverlayUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let uniform_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Overlay Uniform Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });
        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Overlay Uniform Bind Group"),
            layout: &uniform_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let texture_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Overlay Font Layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            });

        let font_bind_group = font.map(|font| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Overlay Font Bind Group"),
                layout: &texture_bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&font.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&font.sampler),
                    },
                ],
            })
        });

        let colored_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Overlay Colored Pipeline Layout"),
            bind_group_layouts: &[&uniform_bind_group_layout],
            push_constant_ranges: &[],
        });
        let textured_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Overlay Textured Pipeline Layout"),
            bind_group_layouts: &[&uniform_bind_group_layout, &texture_bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = |label: &str, layout: &wgpu::PipelineLayout, fragment: &str| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs"),
                    buffers: &[Vertex2d::LAYOUT],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some(fragment),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: gpu.config.format,
                        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        };
        let colored_pipeline = pipeline("Overlay Colored Pipeline", &colored_layout, "fs_colored");
        let textured_pipeline =
            pipeline("Overlay Textured Pipeline", &textured_layout, "fs_textured");

        let vertex_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Overlay Vertex Buffer"),
            size: (MAX_VERTICES * std::mem::size_of::<Vertex2d>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            colored_pipeline,
            textured_pipeline,
            vertex_buffer,
            uniform_buffer,
            uniform_bind_group,
            font_bind_group,
            colored_vertices: Vec::with_capacity(1024),
            text_vertices: Vec::with_capacity(4096),
        }
    }

    /// Replace the queued geometry with `shapes`. Text is skipped without a font.
    pub fn prepare(&mut self, shapes: &[Shape], font: Option<&FontAtlas>) {
        self.colored_vertices.clear();
        self.text_vertices.clear();

        for shape in shapes {
            match shape {
                Shape::Rect { rect, color } => {
                    self.colored_vertices
                        .extend_from_slice(&quad(*rect, [0.0; 4], *color));
                }
                Shape::Text { x, y, text, color } => {
                    if let Some(font) = font {
                        self.text_vertices
                            .extend(text_vertices(font, *x, *y, text, *color));
                    }
                }
            }
        }

        let total = self.colored_vertices.len() + self.text_vertices.len();
        if total > MAX_VERTICES {
            tracing::warn!(total, max = MAX_VERTICES, "overlay vertex budget exceeded, truncating");
            self.colored_vertices.truncate(MAX_VERTICES);
            let room = MAX_VERTICES - self.colored_vertices.len();
            self.text_vertices.truncate(room - room % 6);
        }
    }

    pub fn render(&self, gpu: &GpuContext, render_pass: &mut wgpu::RenderPass) {
        let uniforms = OverlayUniforms {
            resolution: [gpu.width() as f32, gpu.height() as f32],
            _padding: [0.0, 0.0],
        };
        gpu.queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniforms]));

        if !self.colored_vertices.is_empty() {
            gpu.queue.write_buffer(
                &self.vertex_buffer,
                0,
                bytemuck::cast_slice(&self.colored_vertices),
            );
            render_pass.set_pipeline(&self.colored_pipeline);
            render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
            render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
            render_pass.draw(0..self.colored_vertices.len() as u32, 0..1);
        }

        let Some(font_bind_group) = &self.font_bind_group else {
            return;
        };
        if self.text_vertices.is_empty() {
            return;
        }
        let offset = self.colored_vertices.len();
        gpu.queue.write_buffer(
            &self.vertex_buffer,
            (offset * std::mem::size_of::<Vertex2d>()) as u64,
            bytemuck::cast_slice(&self.text_vertices),
        );
        render_pass.set_pipeline(&self.textured_pipeline);
        render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
        render_pass.set_bind_group(1, font_bind_group, &[]);
        render_pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        render_pass.draw(offset as u32..(offset + self.text_vertices.len()) as u32, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quad_covers_rect_corners() {
        let vertices = quad(Rect::new(10.0, 20.0, 30.0, 40.0), [0.0, 0.0, 1.0, 1.0], Color::WHITE);
        let min = vertices
            .iter()
            .fold([f32::MAX; 2], |m, v| [m[0].min(v.position[0]), m[1].min(v.position[1])]);
        let max = vertices
            .iter()
            .fold([f32::MIN; 2], |m, v| [m[0].max(v.position[0]), m[1].max(v.position[1])]);
        assert_eq!(min, [10.0, 20.0]);
        assert_eq!(max, [40.0, 60.0]);
        assert!(vertices.iter().all(|v| v.color == [1.0; 4]));
    }

    #[test]
    fn vertex_layout_matches_struct() {
        assert_eq!(Vertex2d::LAYOUT.array_stride, 32);
    }
}
