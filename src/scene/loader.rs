//! Background scene construction.
//!
//! Building the planet mesh and scattering grass is done on a worker thread so the
//! window can show its loading overlay straight away. The frame loop polls the task
//! once per frame; until it resolves, nothing that depends on the scene runs.

use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use image::RgbaImage;

use super::graph::{BlendMaterial, MeshId, NodeCategory, SceneGraph};
use super::handles::{GrassHandle, PlanetHandle, SceneHandles, WaterHandle};
use crate::config::AssetConfig;
use crate::error::{Error, Result};
use crate::geometry::{PendingGeometry, PlanetShape, RawGeometry};
use crate::mesh::GrassInstance;
use crate::texture::load_grass_atlas;

/// Water surface radius; land below this is underwater.
pub const WATER_LEVEL: f32 = 1.0;

pub const PLANET_MESH: MeshId = MeshId(0);
pub const WATER_MESH: MeshId = MeshId(1);
pub const GRASS_MESH: MeshId = MeshId(2);

/// Everything the renderer and frame loop need from a finished load.
#[derive(Debug)]
pub struct LoadedScene {
    pub graph: SceneGraph,
    pub handles: SceneHandles,
    /// CPU geometry indexed by [`MeshId`].
    pub meshes: Vec<RawGeometry>,
    pub grass_instances: Vec<GrassInstance>,
    pub grass_atlas: RgbaImage,
}

/// Build the scene synchronously.
pub fn build_scene(assets: &AssetConfig) -> Result<LoadedScene> {
    let shape = PlanetShape::with_seed(assets.seed);

    let planet = match &assets.planet_stl {
        Some(path) => PendingGeometry::from_file(path)
            .centered()
            .normalized()
            .scaled(2.0)
            .smooth_normals()
            .build()?,
        None => shape.mesh(96, 48),
    };
    let water = match &assets.water_stl {
        Some(path) => PendingGeometry::from_file(path)
            .centered()
            .normalized()
            .scaled(2.0 * WATER_LEVEL)
            .build()?,
        None => RawGeometry::uv_sphere(64, 32, WATER_LEVEL),
    };
    let grass_instances = if assets.planet_stl.is_some() {
        // No height function for imported models; skip the procedural field.
        Vec::new()
    } else {
        shape.scatter_grass(assets.grass_count, WATER_LEVEL, 0.015)
    };
    let grass_atlas = load_grass_atlas(assets.grass_atlas.as_deref(), assets.seed)?;

    let mut graph = SceneGraph::new();
    let planet_id = graph.add_child(graph.root(), "planet", NodeCategory::Opaque)?;
    graph.node_mut(planet_id)?.mesh = Some(PLANET_MESH);
    let water_id = graph.add_child(
        planet_id,
        "water",
        NodeCategory::TranslucentBlend(BlendMaterial::Water),
    )?;
    graph.node_mut(water_id)?.mesh = Some(WATER_MESH);
    let grass_id = graph.add_child(
        planet_id,
        "grass",
        NodeCategory::TranslucentBlend(BlendMaterial::Grass),
    )?;
    graph.node_mut(grass_id)?.mesh = Some(GRASS_MESH);

    tracing::info!(
        planet_triangles = planet.triangle_count(),
        water_triangles = water.triangle_count(),
        grass = grass_instances.len(),
        "scene built"
    );

    Ok(LoadedScene {
        graph,
        handles: SceneHandles {
            planet: PlanetHandle(planet_id),
            water: WaterHandle(water_id),
            grass: GrassHandle(grass_id),
        },
        meshes: vec![planet, water, RawGeometry::grass_blade()],
        grass_instances,
        grass_atlas,
    })
}

/// A scene build running on a worker thread.
#[derive(Debug)]
pub struct SceneLoadTask {
    receiver: Option<Receiver<Result<LoadedScene>>>,
}

impl SceneLoadTask {
    /// Start building the scene in the background.
    pub fn spawn(assets: AssetConfig) -> Result<Self> {
        let (sender, receiver) = mpsc::channel();
        thread::Builder::new()
            .name("scene-loader".into())
            .spawn(move || {
                let result = build_scene(&assets);
                // The receiver is gone if the app closed mid-load.
                let _ = sender.send(result);
            })?;
        tracing::debug!("scene load started");
        Ok(Self {
            receiver: Some(receiver),
        })
    }

    /// Wrap an already-built result, for callers that load synchronously.
    pub fn ready(result: Result<LoadedScene>) -> Self {
        let (sender, receiver) = mpsc::channel();
        let _ = sender.send(result);
        Self {
            receiver: Some(receiver),
        }
    }

    /// Non-blocking check for the result. Yields `Some` exactly once.
    pub fn poll(&mut self) -> Option<Result<LoadedScene>> {
        let receiver = self.receiver.as_ref()?;
        match receiver.try_recv() {
            Ok(result) => {
                self.receiver = None;
                Some(result)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.receiver = None;
                Some(Err(Error::SceneGraph(
                    "scene loader exited without a result".into(),
                )))
            }
        }
    }

    pub fn is_pending(&self) -> bool {
        self.receiver.is_some()
    }
}
