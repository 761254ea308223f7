use super::graph::NodeId;

/// The rotating planet body. Labels, water and grass are all parented to it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlanetHandle(pub NodeId);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WaterHandle(pub NodeId);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GrassHandle(pub NodeId);

/// Typed handles to the nodes the frame loop drives directly.
///
/// Assigned once when the scene is built; nothing is looked up by name afterwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SceneHandles {
    pub planet: PlanetHandle,
    pub water: WaterHandle,
    pub grass: GrassHandle,
}
