use glam::{Mat3, Mat4, Vec3};

/// A perspective camera aimed at a look-at point.
///
/// Orientation is never stored: it is derived from `position` and `target` whenever a
/// matrix is requested. The transition engine only ever interpolates those two points
/// and the field of view.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    /// Point the camera looks at.
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    /// Viewport width / height.
    pub aspect: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 6.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov: 35.0,
            near: 0.1,
            far: 100.0,
            aspect: 4.0 / 3.0,
        }
    }
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn looking_at(mut self, target: Vec3) -> Self {
        self.target = target;
        self
    }

    pub fn with_fov(mut self, fov_degrees: f32) -> Self {
        self.fov = fov_degrees;
        self
    }

    pub fn with_clip(mut self, near: f32, far: f32) -> Self {
        self.near = near;
        self.far = far;
        self
    }

    /// Update the aspect ratio from a viewport size. Zero-area sizes are ignored.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    /// Unit vector from the camera towards its target.
    pub fn forward(&self) -> Vec3 {
        (self.target - self.position).normalize_or(Vec3::NEG_Z)
    }

    /// World-to-camera transform.
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    /// Camera-to-clip transform with a [0, 1] depth range.
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov.to_radians(), self.aspect, self.near, self.far)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Inverse-transpose of the view matrix's rotation block.
    pub fn normal_matrix(&self) -> Mat3 {
        Mat3::from_mat4(self.view_matrix()).inverse().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_projects_to_ndc_center() {
        let camera = Camera::new().at(Vec3::new(0.0, 0.0, 5.0));
        let ndc = camera.view_projection().project_point3(Vec3::ZERO);
        assert_eq!(ndc.x, 0.0);
        assert_eq!(ndc.y, 0.0);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }

    #[test]
    fn forward_points_at_target() {
        let camera = Camera::new()
            .at(Vec3::new(0.0, 2.0, 2.0))
            .looking_at(Vec3::new(0.0, 1.2, 0.0));
        let expected = Vec3::new(0.0, -0.8, -2.0).normalize();
        assert!(camera.forward().abs_diff_eq(expected, 1e-6));
    }

    #[test]
    fn zero_viewport_keeps_aspect() {
        let mut camera = Camera::new();
        camera.set_viewport(1600, 1200);
        camera.set_viewport(0, 1200);
        assert!((camera.aspect - 4.0 / 3.0).abs() < 1e-6);
    }
}
