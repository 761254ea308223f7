use crate::gpu::{DEPTH_FORMAT, GpuContext};

/// Off-screen colour and depth written by the pre-pass, plus the depth buffer the main
/// pass draws against.
///
/// The pre-pass depth cannot be attached and sampled in the same pass, so the main pass
/// keeps its own depth attachment. All three are recreated together when the surface
/// size changes.
#[derive(Debug)]
pub struct PrepassTarget {
    pub color: wgpu::Texture,
    pub color_view: wgpu::TextureView,
    pub depth: wgpu::Texture,
    pub depth_view: wgpu::TextureView,
    pub main_depth_view: wgpu::TextureView,
    width: u32,
    height: u32,
}

impl PrepassTarget {
    /// Create targets matching the surface. Returns `None` for a zero-area surface.
    pub fn new(gpu: &GpuContext) -> Option<Self> {
        let (width, height) = (gpu.width(), gpu.height());
        if width == 0 || height == 0 {
            return None;
        }

        let color = create_texture(
            gpu,
            "Prepass Color",
            gpu.config.format,
            width,
            height,
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        );
        let depth = create_texture(
            gpu,
            "Prepass Depth",
            DEPTH_FORMAT,
            width,
            height,
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        );
        let main_depth = create_texture(
            gpu,
            "Main Depth",
            DEPTH_FORMAT,
            width,
            height,
            wgpu::TextureUsages::RENDER_ATTACHMENT,
        );

        tracing::debug!(width, height, "prepass target created");
        Some(Self {
            color_view: color.create_view(&wgpu::TextureViewDescriptor::default()),
            depth_view: depth.create_view(&wgpu::TextureViewDescriptor::default()),
            main_depth_view: main_depth.create_view(&wgpu::TextureViewDescriptor::default()),
            color,
            depth,
            width,
            height,
        })
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn matches(&self, gpu: &GpuContext) -> bool {
        self.size() == (gpu.width(), gpu.height())
    }
}

/// Keep `slot` in step with the surface size. Returns `true` when the target was
/// (re)created.
pub fn ensure_target(slot: &mut Option<PrepassTarget>, gpu: &GpuContext) -> bool {
    if slot.as_ref().is_some_and(|t| t.matches(gpu)) {
        return false;
    }
    *slot = PrepassTarget::new(gpu);
    slot.is_some()
}

fn create_texture(
    gpu: &GpuContext,
    label: &str,
    format: wgpu::TextureFormat,
    width: u32,
    height: u32,
    usage: wgpu::TextureUsages,
) -> wgpu::Texture {
    gpu.device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage,
        view_formats: &[],
    })
}
