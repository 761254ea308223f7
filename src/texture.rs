use std::path::Path;

use image::{Rgba, RgbaImage};

use crate::error::Result;
use crate::geometry::hash;
use crate::gpu::GpuContext;

/// Width of one atlas cell; the grass atlas is four cells side by side.
const CELL_WIDTH: u32 = 32;
const CELL_HEIGHT: u32 = 64;

/// A sampled 2D texture.
#[derive(Debug)]
pub struct Texture {
    #[allow(dead_code)]
    pub(crate) texture: wgpu::Texture,
    pub(crate) view: wgpu::TextureView,
    pub(crate) sampler: wgpu::Sampler,
    pub width: u32,
    pub height: u32,
}

impl Texture {
    pub fn from_rgba(gpu: &GpuContext, data: &[u8], width: u32, height: u32, label: &str) -> Self {
        use wgpu::util::DeviceExt;

        let texture = gpu.device.create_texture_with_data(
            &gpu.queue,
            &wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                // Channels are masks, not colours, so no sRGB decode.
                format: wgpu::TextureFormat::Rgba8Unorm,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            data,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let sampler = gpu.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&format!("{label} Sampler")),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
            width,
            height,
        }
    }

    pub fn from_image(gpu: &GpuContext, image: &RgbaImage, label: &str) -> Self {
        let (width, height) = image.dimensions();
        Self::from_rgba(gpu, image.as_raw(), width, height, label)
    }
}

/// Load the grass atlas from disk, or generate the default one.
///
/// Channel meaning: red is brightness, green marks flower petals, blue is coverage
/// (the shader discards texels below 0.78).
pub fn load_grass_atlas(path: Option<&Path>, seed: u32) -> Result<RgbaImage> {
    match path {
        Some(path) => {
            let image = image::open(path)?.to_rgba8();
            tracing::debug!(path = %path.display(), "loaded grass atlas");
            Ok(image)
        }
        None => Ok(grass_atlas(seed)),
    }
}

/// Generate a four-cell atlas: two grass tufts followed by two flowers.
pub fn grass_atlas(seed: u32) -> RgbaImage {
    let mut image = RgbaImage::new(CELL_WIDTH * 4, CELL_HEIGHT);

    for cell in 0..4 {
        for y in 0..CELL_HEIGHT {
            for x in 0..CELL_WIDTH {
                // u across the cell, v up the blade (0 at the root).
                let u = (x as f32 + 0.5) / CELL_WIDTH as f32;
                let v = 1.0 - (y as f32 + 0.5) / CELL_HEIGHT as f32;
                let texel = if cell < 2 {
                    tuft_texel(u, v, cell, seed)
                } else {
                    flower_texel(u, v, x, y, seed)
                };
                image.put_pixel(cell * CELL_WIDTH + x, y, texel);
            }
        }
    }

    image
}

fn tuft_texel(u: f32, v: f32, cell: u32, seed: u32) -> Rgba<u8> {
    // Three tapering blades of different heights.
    let blades: [(f32, f32); 3] = if cell == 0 {
        [(0.3, 0.75), (0.5, 1.0), (0.72, 0.85)]
    } else {
        [(0.25, 0.9), (0.55, 0.7), (0.78, 0.95)]
    };
    let lean = (hash(cell, 0, seed) % 7) as f32 * 0.01;

    for (center, height) in blades {
        if v > height {
            continue;
        }
        let half_width = 0.07 * (1.0 - v / height);
        if (u - center - lean * v).abs() <= half_width.max(0.012) {
            let brightness = (110.0 + 120.0 * v).min(255.0) as u8;
            return Rgba([brightness, 0, 255, 255]);
        }
    }
    Rgba([0, 0, 0, 0])
}

fn flower_texel(u: f32, v: f32, x: u32, y: u32, seed: u32) -> Rgba<u8> {
    let head = (u - 0.5).powi(2) + ((v - 0.78) * 0.5).powi(2);
    if head < 0.18f32.powi(2) {
        let speckle = (hash(x, y, seed) % 30) as u8;
        return Rgba([225 - speckle, 255, 255, 255]);
    }
    if v < 0.72 && (u - 0.5).abs() < 0.03 {
        return Rgba([140, 0, 255, 255]);
    }
    Rgba([0, 0, 0, 0])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atlas_has_four_cells_with_coverage() {
        let atlas = grass_atlas(1);
        assert_eq!(atlas.dimensions(), (CELL_WIDTH * 4, CELL_HEIGHT));
        for cell in 0..4 {
            let covered = (0..CELL_HEIGHT)
                .flat_map(|y| (0..CELL_WIDTH).map(move |x| (x, y)))
                .filter(|&(x, y)| atlas.get_pixel(cell * CELL_WIDTH + x, y)[2] == 255)
                .count();
            assert!(covered > 20, "cell {cell} has only {covered} covered texels");
        }
    }

    #[test]
    fn flowers_mark_green_channel() {
        let atlas = grass_atlas(1);
        let head = atlas.get_pixel(2 * CELL_WIDTH + CELL_WIDTH / 2, CELL_HEIGHT / 5);
        assert_eq!(head[1], 255);
        let tuft = atlas.get_pixel(CELL_WIDTH / 2, CELL_HEIGHT - 2);
        assert_eq!(tuft[1], 0);
    }

    #[test]
    fn missing_atlas_file_is_an_error() {
        assert!(load_grass_atlas(Some(Path::new("/nonexistent/grass.png")), 1).is_err());
    }
}
