//! CPU-side geometry: STL loading, procedural planet meshes and grass scattering.
//!
//! Everything here is plain data with no GPU handles, so it can be built on the scene
//! loading thread and uploaded later with [`Mesh::from_geometry`](crate::mesh::Mesh::from_geometry).
//!
//! # Loading a model
//!
//! ```no_run
//! use planetfolio::geometry::PendingGeometry;
//!
//! let planet = PendingGeometry::from_stl("assets/planet.stl")
//!     .centered()
//!     .normalized()
//!     .scaled(2.0)
//!     .smooth_normals()
//!     .build()?;
//! # Ok::<(), planetfolio::Error>(())
//! ```

use std::f32::consts::{PI, TAU};
use std::path::Path;

use glam::Vec3;

use crate::error::{Error, Result};
use crate::mesh::{GrassInstance, Vertex3d};

/// Vertex and index data ready for upload.
#[derive(Clone, Debug, Default)]
pub struct RawGeometry {
    pub vertices: Vec<Vertex3d>,
    pub indices: Vec<u32>,
}

impl RawGeometry {
    pub fn new(vertices: Vec<Vertex3d>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Axis-aligned bounding box as `(min, max)`.
    pub fn bounds(&self) -> (Vec3, Vec3) {
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);

        for v in &self.vertices {
            let p = Vec3::from(v.position);
            min = min.min(p);
            max = max.max(p);
        }

        (min, max)
    }

    pub fn center(&self) -> Vec3 {
        let (min, max) = self.bounds();
        (min + max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        let (min, max) = self.bounds();
        max - min
    }

    pub fn translate(&mut self, offset: Vec3) {
        for v in &mut self.vertices {
            v.position = (Vec3::from(v.position) + offset).into();
        }
    }

    pub fn scale(&mut self, factor: f32) {
        for v in &mut self.vertices {
            v.position = (Vec3::from(v.position) * factor).into();
        }
    }

    /// Move the bounding box center to the origin.
    pub fn recenter(&mut self) {
        let center = self.center();
        self.translate(-center);
    }

    /// Scale so the largest dimension becomes 1.0.
    pub fn normalize(&mut self) {
        let size = self.size();
        let max_dim = size.x.max(size.y).max(size.z);
        if max_dim > 0.0 {
            self.scale(1.0 / max_dim);
        }
    }

    /// Replace normals with area-weighted averages of the adjacent face normals.
    pub fn recalculate_normals(&mut self) {
        for v in &mut self.vertices {
            v.normal = [0.0, 0.0, 0.0];
        }

        for tri in self.indices.chunks_exact(3) {
            let [i0, i1, i2] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            if i0.max(i1).max(i2) >= self.vertices.len() {
                continue;
            }

            let p0 = Vec3::from(self.vertices[i0].position);
            let p1 = Vec3::from(self.vertices[i1].position);
            let p2 = Vec3::from(self.vertices[i2].position);
            let face_normal = (p1 - p0).cross(p2 - p0);

            for i in [i0, i1, i2] {
                let n = Vec3::from(self.vertices[i].normal) + face_normal;
                self.vertices[i].normal = n.into();
            }
        }

        for v in &mut self.vertices {
            v.normal = Vec3::from(v.normal).normalize_or_zero().into();
        }
    }

    /// A UV sphere of the given radius centred on the origin.
    pub fn uv_sphere(segments: u32, rings: u32, radius: f32) -> Self {
        Self::displaced_sphere(segments, rings, |_| radius)
    }

    /// A sphere whose surface radius along each unit direction comes from `radius_at`.
    fn displaced_sphere(segments: u32, rings: u32, radius_at: impl Fn(Vec3) -> f32) -> Self {
        let segments = segments.max(3);
        let rings = rings.max(2);
        let mut vertices = Vec::with_capacity(((segments + 1) * (rings + 1)) as usize);
        let mut indices = Vec::with_capacity((segments * rings * 6) as usize);

        for ring in 0..=rings {
            let phi = PI * ring as f32 / rings as f32;
            let y = phi.cos();
            let ring_radius = phi.sin();

            for seg in 0..=segments {
                let theta = TAU * seg as f32 / segments as f32;
                let dir = Vec3::new(ring_radius * theta.cos(), y, ring_radius * theta.sin());
                let position = dir * radius_at(dir);
                let uv = [seg as f32 / segments as f32, ring as f32 / rings as f32];
                vertices.push(Vertex3d::new(position.into(), dir.into(), uv));
            }
        }

        for ring in 0..rings {
            for seg in 0..segments {
                let current = ring * (segments + 1) + seg;
                let next = current + segments + 1;

                indices.extend_from_slice(&[current, current + 1, next]);
                indices.extend_from_slice(&[current + 1, next + 1, next]);
            }
        }

        Self::new(vertices, indices)
    }

    /// A single upright blade quad, one unit tall, with its root at the origin.
    ///
    /// `uv.y` runs from 0 at the root to 1 at the tip.
    pub fn grass_blade() -> Self {
        let vertices = vec![
            Vertex3d::new([-0.5, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 0.0]),
            Vertex3d::new([0.5, 0.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0]),
            Vertex3d::new([0.5, 1.0, 0.0], [0.0, 0.0, 1.0], [1.0, 1.0]),
            Vertex3d::new([-0.5, 1.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0]),
        ];
        Self::new(vertices, vec![0, 1, 2, 2, 3, 0])
    }
}

/// Procedural terrain for the default planet.
///
/// Land height is fractal value noise over the unit sphere. The water sphere sits at
/// radius 1.0, so anything above it is shore and grass.
#[derive(Clone, Copy, Debug)]
pub struct PlanetShape {
    pub seed: u32,
    /// Mean land radius.
    pub base_radius: f32,
    /// Peak-to-mean displacement.
    pub amplitude: f32,
    /// Noise frequency over the unit sphere.
    pub frequency: f32,
}

impl Default for PlanetShape {
    fn default() -> Self {
        Self {
            seed: 7,
            base_radius: 0.98,
            amplitude: 0.16,
            frequency: 1.8,
        }
    }
}

impl PlanetShape {
    pub fn with_seed(seed: u32) -> Self {
        Self {
            seed,
            ..Default::default()
        }
    }

    /// Surface radius along unit direction `dir`.
    pub fn height(&self, dir: Vec3) -> f32 {
        let n = fbm(dir * self.frequency, self.seed);
        self.base_radius + self.amplitude * (n * 2.0 - 1.0)
    }

    /// Smooth-shaded planet mesh.
    pub fn mesh(&self, segments: u32, rings: u32) -> RawGeometry {
        let mut geometry = RawGeometry::displaced_sphere(segments, rings, |dir| self.height(dir));
        geometry.recalculate_normals();
        geometry
    }

    /// Scatter up to `count` grass blades on land at least `margin` above `water_level`.
    ///
    /// Candidates are drawn deterministically from the seed, so the same shape always
    /// grows the same field.
    pub fn scatter_grass(&self, count: u32, water_level: f32, margin: f32) -> Vec<GrassInstance> {
        let mut instances = Vec::with_capacity(count as usize);
        let attempts = count.saturating_mul(8);

        for i in 0..attempts {
            if instances.len() as u32 >= count {
                break;
            }
            // Uniform direction on the sphere from two hashed unit values.
            let u = unit_hash(i, 0, self.seed ^ 0x9e37);
            let v = unit_hash(i, 1, self.seed ^ 0x9e37);
            let z = 1.0 - 2.0 * u;
            let r = (1.0 - z * z).max(0.0).sqrt();
            let theta = TAU * v;
            let dir = Vec3::new(r * theta.cos(), z, r * theta.sin());

            let height = self.height(dir);
            if height < water_level + margin {
                continue;
            }

            let scale = 0.6 + 0.8 * unit_hash(i, 2, self.seed);
            let rotation = PI * unit_hash(i, 3, self.seed);
            instances.push(GrassInstance {
                translate: (dir * height).into(),
                scale_rot: [scale, rotation],
            });
        }

        tracing::debug!(requested = count, placed = instances.len(), "scattered grass");
        instances
    }
}

/// Deterministic integer hash.
pub(crate) fn hash(x: u32, y: u32, seed: u32) -> u32 {
    let mut h = seed;
    h = h.wrapping_add(x.wrapping_mul(374761393));
    h = h.wrapping_add(y.wrapping_mul(668265263));
    h ^= h >> 13;
    h = h.wrapping_mul(1274126177);
    h ^= h >> 16;
    h
}

/// Hash mapped into `[0, 1)`.
pub(crate) fn unit_hash(x: u32, y: u32, seed: u32) -> f32 {
    (hash(x, y, seed) >> 8) as f32 / (1u32 << 24) as f32
}

fn lattice(x: i32, y: i32, z: i32, seed: u32) -> f32 {
    let zh = hash(z as u32, 0x5bd1, seed);
    unit_hash(x as u32, (y as u32) ^ zh, seed)
}

/// Trilinear value noise in `[0, 1)`.
fn value_noise(p: Vec3, seed: u32) -> f32 {
    let cell = p.floor();
    let f = p - cell;
    let s = f * f * (Vec3::splat(3.0) - 2.0 * f);
    let (x, y, z) = (cell.x as i32, cell.y as i32, cell.z as i32);

    let lerp = |a: f32, b: f32, t: f32| a + (b - a) * t;
    let x00 = lerp(lattice(x, y, z, seed), lattice(x + 1, y, z, seed), s.x);
    let x10 = lerp(lattice(x, y + 1, z, seed), lattice(x + 1, y + 1, z, seed), s.x);
    let x01 = lerp(lattice(x, y, z + 1, seed), lattice(x + 1, y, z + 1, seed), s.x);
    let x11 = lerp(lattice(x, y + 1, z + 1, seed), lattice(x + 1, y + 1, z + 1, seed), s.x);
    lerp(lerp(x00, x10, s.y), lerp(x01, x11, s.y), s.z)
}

/// Three octaves of value noise, normalized to `[0, 1)`.
fn fbm(p: Vec3, seed: u32) -> f32 {
    let mut sum = 0.0;
    let mut amp = 0.5;
    let mut freq = 1.0;
    let mut norm = 0.0;
    for octave in 0..3 {
        sum += amp * value_noise(p * freq, seed.wrapping_add(octave));
        norm += amp;
        amp *= 0.5;
        freq *= 2.0;
    }
    sum / norm
}

/// Geometry that is loaded (or failed to load) and queued for processing.
///
/// Processing steps are recorded by the builder methods and applied in a fixed order
/// by [`build`](Self::build): center, normalize, scale, smooth normals.
#[derive(Clone, Debug)]
pub struct PendingGeometry {
    result: std::result::Result<RawGeometry, String>,
    center: bool,
    normalize: bool,
    smooth_normals: bool,
    scale_factor: Option<f32>,
}

impl PendingGeometry {
    fn with_result(result: std::result::Result<RawGeometry, String>) -> Self {
        Self {
            result,
            center: false,
            normalize: false,
            smooth_normals: false,
            scale_factor: None,
        }
    }

    /// Load geometry from a file, picking the format from its extension.
    pub fn from_file(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|s| s.to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "stl" => Self::from_stl(path),
            _ => Self::with_result(Err(format!(
                "unknown geometry format '{ext}' for {}",
                path.display()
            ))),
        }
    }

    pub fn from_stl(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let result = std::fs::File::open(path)
            .map_err(|e| format!("{}: {e}", path.display()))
            .and_then(|file| {
                let mut reader = std::io::BufReader::new(file);
                parse_stl(&mut reader)
            });
        Self::with_result(result)
    }

    pub fn from_stl_bytes(bytes: &[u8]) -> Self {
        let mut cursor = std::io::Cursor::new(bytes);
        Self::with_result(parse_stl(&mut cursor))
    }

    /// Center the geometry at the origin based on its bounding box.
    pub fn centered(mut self) -> Self {
        self.center = true;
        self
    }

    /// Normalize to fit in a unit cube.
    pub fn normalized(mut self) -> Self {
        self.normalize = true;
        self
    }

    pub fn smooth_normals(mut self) -> Self {
        self.smooth_normals = true;
        self
    }

    pub fn scaled(mut self, factor: f32) -> Self {
        self.scale_factor = Some(factor);
        self
    }

    /// Apply the recorded processing and return the final geometry.
    pub fn build(self) -> Result<RawGeometry> {
        let mut geometry = self.result.map_err(Error::Geometry)?;

        if self.center {
            geometry.recenter();
        }
        if self.normalize {
            geometry.normalize();
        }
        if let Some(scale) = self.scale_factor {
            geometry.scale(scale);
        }
        if self.smooth_normals {
            geometry.recalculate_normals();
        }

        Ok(geometry)
    }
}

fn parse_stl<R: std::io::Read + std::io::Seek>(
    reader: &mut R,
) -> std::result::Result<RawGeometry, String> {
    let stl = stl_io::read_stl(reader).map_err(|e| format!("STL parse error: {e}"))?;

    let mut vertices = Vec::with_capacity(stl.faces.len() * 3);
    let mut indices = Vec::with_capacity(stl.faces.len() * 3);

    // stl_io returns an IndexedMesh; flatten it so each face keeps its own normal.
    for (i, face) in stl.faces.iter().enumerate() {
        let normal: [f32; 3] = face.normal.into();

        for &vertex_idx in &face.vertices {
            let vertex = stl
                .vertices
                .get(vertex_idx)
                .ok_or_else(|| format!("face {i} references missing vertex {vertex_idx}"))?;
            let position: [f32; 3] = (*vertex).into();
            // STL has no UVs
            vertices.push(Vertex3d::new(position, normal, [0.0, 0.0]));
        }

        let base = (i * 3) as u32;
        indices.extend_from_slice(&[base, base + 1, base + 2]);
    }

    Ok(RawGeometry::new(vertices, indices))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIANGLE_STL: &str = "solid tri
  facet normal 0 0 1
    outer loop
      vertex 0 0 0
      vertex 2 0 0
      vertex 0 2 0
    endloop
  endfacet
endsolid tri
";

    #[test]
    fn uv_sphere_has_expected_counts() {
        let sphere = RawGeometry::uv_sphere(16, 8, 1.0);
        assert_eq!(sphere.vertices.len(), 17 * 9);
        assert_eq!(sphere.triangle_count(), 16 * 8 * 2);
        for v in &sphere.vertices {
            assert!((Vec3::from(v.position).length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn planet_heights_stay_in_band() {
        let shape = PlanetShape::default();
        let mesh = shape.mesh(24, 12);
        let min = shape.base_radius - shape.amplitude - 1e-4;
        let max = shape.base_radius + shape.amplitude + 1e-4;
        for v in &mesh.vertices {
            let r = Vec3::from(v.position).length();
            assert!(r >= min && r <= max, "radius {r} outside [{min}, {max}]");
            let n = Vec3::from(v.normal);
            assert!(n == Vec3::ZERO || (n.length() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn grass_only_grows_above_water() {
        let shape = PlanetShape::with_seed(3);
        let grass = shape.scatter_grass(200, 1.0, 0.02);
        assert!(!grass.is_empty());
        for blade in &grass {
            assert!(Vec3::from(blade.translate).length() >= 1.02 - 1e-4);
            assert!(blade.scale_rot[1] >= 0.0 && blade.scale_rot[1] < PI);
        }
        assert_eq!(grass, shape.scatter_grass(200, 1.0, 0.02));
    }

    #[test]
    fn unit_hash_stays_in_range() {
        for i in 0..1000 {
            let v = unit_hash(i, i * 7, 42);
            assert!((0.0..1.0).contains(&v));
        }
    }

    #[test]
    fn pending_geometry_processes_stl() {
        let geometry = PendingGeometry::from_stl_bytes(TRIANGLE_STL.as_bytes())
            .centered()
            .normalized()
            .build()
            .unwrap();
        assert_eq!(geometry.triangle_count(), 1);
        let size = geometry.size();
        assert!((size.x.max(size.y) - 1.0).abs() < 1e-6);
        assert!(geometry.center().abs_diff_eq(Vec3::ZERO, 1e-6));
    }

    #[test]
    fn unknown_extension_fails_on_build() {
        let err = PendingGeometry::from_file("planet.obj").build();
        assert!(matches!(err, Err(Error::Geometry(_))));
    }
}
