//! Scene graph, typed node handles and background scene loading.
//!
//! The planet scene is a small tree:
//!
//! ```text
//! root
//! └── planet        Opaque
//!     ├── water     TranslucentBlend(Water)
//!     └── grass     TranslucentBlend(Grass), instanced
//! ```
//!
//! Render passes select nodes by [`NodeCategory`]; the frame loop reaches the nodes it
//! animates through [`SceneHandles`] built alongside the graph.

mod graph;
mod handles;
mod loader;
mod transform;

pub use graph::{BlendMaterial, MAX_DEPTH, MeshId, Node, NodeCategory, NodeId, SceneGraph};
pub use handles::{GrassHandle, PlanetHandle, SceneHandles, WaterHandle};
pub use loader::{
    GRASS_MESH, LoadedScene, PLANET_MESH, SceneLoadTask, WATER_LEVEL, WATER_MESH, build_scene,
};
pub use transform::Transform;
