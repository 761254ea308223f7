//! Depth-difference blending, mirrored from the water and grass shaders.
//!
//! Depth values are in wgpu's `[0, 1]` range (0 at the near plane). The shaders do the
//! same arithmetic per fragment; keeping it here lets the blend curves be tested.

/// Convert a depth-buffer value to view-space distance from the camera.
pub fn linearize_depth(z: f32, near: f32, far: f32) -> f32 {
    near * far / (far - z * (far - near))
}

/// Fraction of `max_depth` covered by a depth difference, clamped to `[0, 1]`.
///
/// Only the size of the difference matters, so the sign convention of the caller
/// doesn't.
pub fn depth_blend_factor(difference: f32, max_depth: f32) -> f32 {
    if max_depth <= 0.0 {
        return 1.0;
    }
    (difference.abs() / max_depth).clamp(0.0, 1.0)
}

/// Water colour factor: ramps up to `max_depth`, then drops back to 0 (shallow colour)
/// once the difference passes `cutoff`.
pub fn water_depth_factor(difference: f32, max_depth: f32, cutoff: f32) -> f32 {
    if difference.abs() > cutoff {
        0.0
    } else {
        depth_blend_factor(difference, max_depth)
    }
}

/// Grass blade alpha. Blades fade into the ground near their root (`uv_y = 0`) and are
/// opaque at the tip.
pub fn grass_alpha(depth_factor: f32, uv_y: f32) -> f32 {
    1.0 - (1.0 - depth_factor) * (1.0 - uv_y)
}
