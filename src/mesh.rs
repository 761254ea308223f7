//! GPU vertex formats and mesh buffers.
//!
//! - [`Vertex3d`]: position, normal and UV; used by the planet, water and grass blade.
//! - [`GrassInstance`]: per-instance data for the scattered grass field.
//! - [`Mesh`]: GPU-resident vertex and index buffers built from [`RawGeometry`].
//!
//! # Vertex Layout
//!
//! | Attribute   | Format    | Offset | Shader Location | Step     |
//! |-------------|-----------|--------|-----------------|----------|
//! | position    | Float32x3 | 0      | 0               | vertex   |
//! | normal      | Float32x3 | 12     | 1               | vertex   |
//! | uv          | Float32x2 | 24     | 2               | vertex   |
//! | translate   | Float32x3 | 0      | 3               | instance |
//! | scale_rot   | Float32x2 | 12     | 4               | instance |

use crate::geometry::RawGeometry;
use crate::gpu::GpuContext;

/// A vertex for 3D mesh rendering with position, normal, and texture coordinates.
///
/// `#[repr(C)]` keeps the layout predictable for GPU upload, and the
/// [`bytemuck::Pod`] derive allows casting slices straight to bytes.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex3d {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex3d {
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex3d>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            // position
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x3,
            },
            // normal
            wgpu::VertexAttribute {
                offset: 12,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x3,
            },
            // uv
            wgpu::VertexAttribute {
                offset: 24,
                shader_location: 2,
                format: wgpu::VertexFormat::Float32x2,
            },
        ],
    };

    pub fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }
}

/// One blade (or flower) of grass.
///
/// `translate` is the blade root on the planet surface in the planet's local frame.
/// `scale_rot` packs a size multiplier and a Y rotation in radians; the rotation also
/// selects which cell of the four-cell grass atlas is drawn.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GrassInstance {
    pub translate: [f32; 3],
    pub scale_rot: [f32; 2],
}

impl GrassInstance {
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<GrassInstance>() as u64,
        step_mode: wgpu::VertexStepMode::Instance,
        attributes: &[
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 3,
                format: wgpu::VertexFormat::Float32x3,
            },
            wgpu::VertexAttribute {
                offset: 12,
                shader_location: 4,
                format: wgpu::VertexFormat::Float32x2,
            },
        ],
    };
}

/// GPU-resident geometry.
#[derive(Debug)]
pub struct Mesh {
    pub(crate) vertex_buffer: wgpu::Buffer,
    pub(crate) index_buffer: wgpu::Buffer,
    pub(crate) index_count: u32,
}

impl Mesh {
    pub fn new(gpu: &GpuContext, vertices: &[Vertex3d], indices: &[u32], label: &str) -> Self {
        use wgpu::util::DeviceExt;

        let vertex_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{label} Vertex Buffer")),
                contents: bytemuck::cast_slice(vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });

        let index_buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{label} Index Buffer")),
                contents: bytemuck::cast_slice(indices),
                usage: wgpu::BufferUsages::INDEX,
            });

        Self {
            vertex_buffer,
            index_buffer,
            index_count: indices.len() as u32,
        }
    }

    /// Upload CPU geometry.
    pub fn from_geometry(gpu: &GpuContext, geometry: &RawGeometry, label: &str) -> Self {
        Self::new(gpu, &geometry.vertices, &geometry.indices, label)
    }
}

/// Per-instance buffer for the grass field.
#[derive(Debug)]
pub struct InstanceBuffer {
    pub(crate) buffer: wgpu::Buffer,
    pub(crate) count: u32,
}

impl InstanceBuffer {
    pub fn new(gpu: &GpuContext, instances: &[GrassInstance]) -> Self {
        use wgpu::util::DeviceExt;

        let buffer = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Grass Instance Buffer"),
                contents: bytemuck::cast_slice(instances),
                usage: wgpu::BufferUsages::VERTEX,
            });

        Self {
            buffer,
            count: instances.len() as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layouts_match_struct_sizes() {
        assert_eq!(std::mem::size_of::<Vertex3d>(), 32);
        assert_eq!(Vertex3d::LAYOUT.array_stride, 32);
        assert_eq!(std::mem::size_of::<GrassInstance>(), 20);
        assert_eq!(GrassInstance::LAYOUT.array_stride, 20);
    }
}
