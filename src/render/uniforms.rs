use crate::camera::Camera;
use crate::config::ShadingConfig;
use crate::scene::BlendMaterial;

/// Per-frame camera data shared by every pipeline (group 0).
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FrameUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub view: [[f32; 4]; 4],
    pub camera_pos: [f32; 3],
    pub _pad: f32,
}

impl FrameUniforms {
    pub fn new(camera: &Camera) -> Self {
        Self {
            view_proj: camera.view_projection().to_cols_array_2d(),
            view: camera.view_matrix().to_cols_array_2d(),
            camera_pos: camera.position.to_array(),
            _pad: 0.0,
        }
    }
}

/// Per-node transform (group 1, dynamic offset).
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelUniforms {
    pub model: [[f32; 4]; 4],
    /// Inverse transpose of `model`.
    pub normal_matrix: [[f32; 4]; 4],
}

impl ModelUniforms {
    pub fn new(model: glam::Mat4) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            normal_matrix: model.inverse().transpose().to_cols_array_2d(),
        }
    }
}

/// Uniform block of a depth-blended material (group 2, binding 0).
///
/// Layout matches `MaterialUniforms` in `water.wgsl` and `grass.wgsl`.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniforms {
    /// `(w, h, 1/w, 1/h)` of the render target.
    pub screen_size: [f32; 4],
    pub time: f32,
    pub camera_near: f32,
    pub camera_far: f32,
    pub max_depth: f32,
    /// Water only: depth difference past which the shallow colour returns.
    pub cutoff_depth: f32,
    /// Water only: share of the pre-pass colour showing through.
    pub clarity: f32,
    /// Grass only: blade scale multiplier.
    pub scale: f32,
    pub _pad: f32,
}

impl MaterialUniforms {
    pub fn water(shading: &ShadingConfig, camera: &Camera) -> Self {
        Self {
            camera_near: camera.near,
            camera_far: camera.far,
            max_depth: shading.water_max_depth,
            cutoff_depth: shading.water_cutoff_depth,
            clarity: shading.water_clarity,
            ..Self::zeroed_with_scale(1.0)
        }
    }

    pub fn grass(shading: &ShadingConfig, camera: &Camera) -> Self {
        Self {
            camera_near: camera.near,
            camera_far: camera.far,
            max_depth: shading.grass_max_depth,
            ..Self::zeroed_with_scale(shading.grass_scale)
        }
    }

    fn zeroed_with_scale(scale: f32) -> Self {
        Self {
            scale,
            ..bytemuck::Zeroable::zeroed()
        }
    }
}

/// Screen-size vector the shaders expect: `(w, h, 1/w, 1/h)`.
pub fn screen_size(width: u32, height: u32) -> [f32; 4] {
    let (w, h) = (width as f32, height as f32);
    [w, h, 1.0 / w, 1.0 / h]
}

/// Uniform values for every registered blend material.
///
/// A material is registered once its resources exist; until then it is skipped by
/// resize and time updates without error.
#[derive(Clone, Debug, Default)]
pub struct MaterialSet {
    materials: Vec<(BlendMaterial, MaterialUniforms)>,
    screen: Option<[f32; 4]>,
}

impl MaterialSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a material. It picks up the current screen size if one has
    /// been set.
    pub fn register(&mut self, material: BlendMaterial, mut uniforms: MaterialUniforms) {
        if let Some(screen) = self.screen {
            uniforms.screen_size = screen;
        }
        match self.materials.iter_mut().find(|(m, _)| *m == material) {
            Some((_, slot)) => *slot = uniforms,
            None => self.materials.push((material, uniforms)),
        }
        tracing::debug!(?material, "material registered");
    }

    pub fn get(&self, material: BlendMaterial) -> Option<&MaterialUniforms> {
        self.materials
            .iter()
            .find(|(m, _)| *m == material)
            .map(|(_, u)| u)
    }

    pub fn is_registered(&self, material: BlendMaterial) -> bool {
        self.get(material).is_some()
    }

    /// Both blend materials are present, so the pre-pass can run.
    pub fn is_complete(&self) -> bool {
        self.is_registered(BlendMaterial::Water) && self.is_registered(BlendMaterial::Grass)
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (BlendMaterial, &MaterialUniforms)> {
        self.materials.iter().map(|(m, u)| (*m, u))
    }

    /// Set the screen size on every material. Returns how many were updated.
    pub fn set_screen_size(&mut self, width: u32, height: u32) -> usize {
        if width == 0 || height == 0 {
            return 0;
        }
        let screen = screen_size(width, height);
        self.screen = Some(screen);
        for (_, uniforms) in &mut self.materials {
            uniforms.screen_size = screen;
        }
        self.materials.len()
    }

    pub fn advance_time(&mut self, dt: f32) {
        for (_, uniforms) in &mut self.materials {
            uniforms.time += dt;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn materials() -> MaterialSet {
        let shading = ShadingConfig::default();
        let camera = Camera::new();
        let mut set = MaterialSet::new();
        set.register(BlendMaterial::Water, MaterialUniforms::water(&shading, &camera));
        set.register(BlendMaterial::Grass, MaterialUniforms::grass(&shading, &camera));
        set
    }

    #[test]
    fn layout_is_std140_sized() {
        assert_eq!(std::mem::size_of::<MaterialUniforms>(), 48);
        assert_eq!(std::mem::size_of::<FrameUniforms>(), 144);
        assert_eq!(std::mem::size_of::<ModelUniforms>(), 128);
    }

    #[test]
    fn resize_updates_every_material() {
        let mut set = materials();
        assert_eq!(set.set_screen_size(800, 600), 2);
        assert_eq!(set.set_screen_size(1600, 1200), 2);
        for (_, uniforms) in set.iter() {
            assert_eq!(uniforms.screen_size, [1600.0, 1200.0, 1.0 / 1600.0, 1.0 / 1200.0]);
        }
    }

    #[test]
    fn zero_area_resize_is_ignored() {
        let mut set = materials();
        set.set_screen_size(800, 600);
        assert_eq!(set.set_screen_size(0, 600), 0);
        let water = set.get(BlendMaterial::Water).unwrap();
        assert_eq!(water.screen_size[0], 800.0);
    }

    #[test]
    fn unregistered_material_is_skipped() {
        let shading = ShadingConfig::default();
        let mut set = MaterialSet::new();
        set.register(BlendMaterial::Water, MaterialUniforms::water(&shading, &Camera::new()));
        assert_eq!(set.set_screen_size(640, 480), 1);
        assert!(!set.is_complete());

        // A late registration still sees the last size.
        set.register(BlendMaterial::Grass, MaterialUniforms::grass(&shading, &Camera::new()));
        assert_eq!(set.get(BlendMaterial::Grass).unwrap().screen_size[0], 640.0);
        assert!(set.is_complete());
    }

    #[test]
    fn time_advances_on_all_materials() {
        let mut set = materials();
        set.advance_time(0.5);
        set.advance_time(0.25);
        for (_, uniforms) in set.iter() {
            assert!((uniforms.time - 0.75).abs() < 1e-6);
        }
    }

    #[test]
    fn water_defaults() {
        let water = MaterialUniforms::water(&ShadingConfig::default(), &Camera::new());
        assert_eq!(water.max_depth, 2.0);
        assert_eq!(water.cutoff_depth, 3.0);
        assert_eq!(water.camera_near, 0.1);
        assert_eq!(water.camera_far, 100.0);
    }
}
