use std::collections::HashMap;
use std::path::Path;

use fontdue::{Font, FontSettings};

use crate::error::{Error, Result};
use crate::gpu::GpuContext;

/// Placement of one glyph in the atlas.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlyphInfo {
    /// UV rectangle in the atlas (x, y, width, height), normalized to [0, 1].
    pub uv: [f32; 4],
    pub width: u32,
    pub height: u32,
    /// Offset from the pen position to the glyph's bottom-left corner.
    pub offset_x: f32,
    pub offset_y: f32,
    pub advance: f32,
}

/// Width and line height of laid-out text.
pub trait TextMetrics {
    fn measure(&self, text: &str) -> f32;
    fn line_height(&self) -> f32;
}

/// Row-pack rectangles into a power-of-two atlas, starting at 256x256 and doubling the
/// smaller side until everything fits. Returns the atlas size and each rectangle's
/// top-left corner.
pub fn pack_glyphs(sizes: &[(u32, u32)], padding: u32) -> (u32, u32, Vec<(u32, u32)>) {
    let mut width = 256u32;
    let mut height = 256u32;

    loop {
        let mut positions = Vec::with_capacity(sizes.len());
        let (mut x, mut y, mut row_height) = (padding, padding, 0u32);
        let mut fits = true;

        for &(w, h) in sizes {
            if x + w + padding > width {
                x = padding;
                y += row_height + padding;
                row_height = 0;
            }
            if y + h + padding > height || w + 2 * padding > width {
                fits = false;
                break;
            }
            positions.push((x, y));
            x += w + padding;
            row_height = row_height.max(h);
        }

        if fits {
            return (width, height, positions);
        }
        if width <= height {
            width *= 2;
        } else {
            height *= 2;
        }
    }
}

/// Rasterized printable ASCII for one font at one size.
pub struct FontAtlas {
    pub(crate) view: wgpu::TextureView,
    pub(crate) sampler: wgpu::Sampler,
    glyphs: HashMap<char, GlyphInfo>,
    size: f32,
    line_height: f32,
}

impl std::fmt::Debug for FontAtlas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontAtlas")
            .field("glyphs", &self.glyphs.len())
            .field("size", &self.size)
            .finish()
    }
}

impl FontAtlas {
    /// Load a TTF/OTF file and rasterize it at `size` pixels.
    pub fn load(gpu: &GpuContext, path: &Path, size: f32) -> Result<Self> {
        let data = std::fs::read(path)?;
        let atlas = Self::from_bytes(gpu, &data, size)?;
        tracing::info!(path = %path.display(), size, "font loaded");
        Ok(atlas)
    }

    pub fn from_bytes(gpu: &GpuContext, font_data: &[u8], size: f32) -> Result<Self> {
        let font = Font::from_bytes(font_data, FontSettings::default())
            .map_err(|e| Error::Font(e.to_string()))?;

        let rasterized: Vec<(char, fontdue::Metrics, Vec<u8>)> = (32u8..=126u8)
            .map(char::from)
            .map(|c| {
                let (metrics, bitmap) = font.rasterize(c, size);
                (c, metrics, bitmap)
            })
            .collect();

        let sizes: Vec<(u32, u32)> = rasterized
            .iter()
            .map(|(_, m, _)| (m.width as u32, m.height as u32))
            .collect();
        let (atlas_width, atlas_height, positions) = pack_glyphs(&sizes, 1);

        let mut atlas_data = vec![0u8; (atlas_width * atlas_height) as usize];
        let mut glyphs = HashMap::with_capacity(rasterized.len());
        for ((c, metrics, bitmap), &(x, y)) in rasterized.iter().zip(&positions) {
            let (glyph_w, glyph_h) = (metrics.width as u32, metrics.height as u32);
            for gy in 0..glyph_h {
                let src = (gy * glyph_w) as usize;
                let dst = ((y + gy) * atlas_width + x) as usize;
                atlas_data[dst..dst + glyph_w as usize]
                    .copy_from_slice(&bitmap[src..src + glyph_w as usize]);
            }
            glyphs.insert(
                *c,
                GlyphInfo {
                    uv: [
                        x as f32 / atlas_width as f32,
                        y as f32 / atlas_height as f32,
                        glyph_w as f32 / atlas_width as f32,
                        glyph_h as f32 / atlas_height as f32,
                    ],
                    width: glyph_w,
                    height: glyph_h,
                    offset_x: metrics.xmin as f32,
                    offset_y: metrics.ymin as f32,
                    advance: metrics.advance_width,
                },
            );
        }

        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Font Atlas"),
            size: wgpu::Extent3d {
                width: atlas_width,
                height: atlas_height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::R8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        gpu.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &atlas_data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(atlas_width),
                rows_per_image: Some(atlas_height),
            },
            wgpu::Extent3d {
                width: atlas_width,
                height: atlas_height,
                depth_or_array_layers: 1,
            },
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = gpu.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Font Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let line_height = font
            .horizontal_line_metrics(size)
            .map_or(size * 1.2, |m| m.new_line_size);

        Ok(Self {
            view,
            sampler,
            glyphs,
            size,
            line_height,
        })
    }

    pub fn glyph(&self, c: char) -> Option<&GlyphInfo> {
        self.glyphs.get(&c)
    }

    pub fn size(&self) -> f32 {
        self.size
    }
}

impl TextMetrics for FontAtlas {
    fn measure(&self, text: &str) -> f32 {
        text.chars()
            .map(|c| self.glyphs.get(&c).map_or(self.size * 0.5, |g| g.advance))
            .sum()
    }

    fn line_height(&self) -> f32 {
        self.line_height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_set_fits_default_atlas() {
        let (w, h, positions) = pack_glyphs(&[(10, 12), (8, 12), (0, 0)], 1);
        assert_eq!((w, h), (256, 256));
        assert_eq!(positions, vec![(1, 1), (12, 1), (21, 1)]);
    }

    #[test]
    fn rows_wrap_and_atlas_grows() {
        let sizes = vec![(60, 60); 30];
        let (w, h, positions) = pack_glyphs(&sizes, 2);
        assert!(w >= 256 && h >= 256);
        assert!(w * h > 256 * 256, "30 cells of 60px cannot fit 256x256");
        for (&(x, y), &(gw, gh)) in positions.iter().zip(&sizes) {
            assert!(x + gw <= w && y + gh <= h);
        }
        // Second row starts below the first.
        assert!(positions.iter().any(|&(_, y)| y > 2));
    }
}
