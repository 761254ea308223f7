//! 2D overlay: content labels, state text, the item popup and the loading indicator.

mod draw;
mod font;
mod layout;

pub use draw::{Overlay2d, Vertex2d, text_vertices};
pub use font::{FontAtlas, GlyphInfo, TextMetrics, pack_glyphs};
pub use layout::{Color, OverlayInput, Rect, Shape, layout, wrap_text};

use crate::config::AssetConfig;
use crate::gpu::GpuContext;

/// Owns the overlay batcher and the optional font.
pub struct OverlayRenderer {
    draw: Overlay2d,
    font: Option<FontAtlas>,
}

impl OverlayRenderer {
    /// Load the configured font, if any. A font that fails to load is logged and the
    /// overlay falls back to markers only.
    pub fn new(gpu: &GpuContext, assets: &AssetConfig) -> Self {
        let font = assets.font.as_deref().and_then(|path| {
            FontAtlas::load(gpu, path, assets.font_size)
                .inspect_err(|e| tracing::warn!(path = %path.display(), error = %e, "font unavailable, labels drawn as markers"))
                .ok()
        });
        let draw = Overlay2d::new(gpu, font.as_ref());
        Self { draw, font }
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Lay out this frame's overlay and queue it for drawing.
    pub fn prepare(&mut self, input: &OverlayInput) {
        let metrics = self.font.as_ref().map(|f| f as &dyn TextMetrics);
        let shapes = layout(input, metrics);
        self.draw.prepare(&shapes, self.font.as_ref());
    }

    pub fn render(&self, gpu: &GpuContext, pass: &mut wgpu::RenderPass) {
        self.draw.render(gpu, pass);
    }
}
