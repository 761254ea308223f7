use crate::scene::{BlendMaterial, NodeCategory, NodeId, SceneGraph};

/// Where a pass draws.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PassTarget {
    /// The off-screen colour and depth pair sampled by the second pass.
    Offscreen,
    /// The swapchain image.
    Surface,
}

/// Which nodes one render pass draws.
#[derive(Clone, Debug, PartialEq)]
pub struct PassPlan {
    pub target: PassTarget,
    /// Opaque nodes with a mesh, drawn first with depth writes.
    pub opaque: Vec<NodeId>,
    /// Translucent nodes, drawn after the opaque ones without depth writes.
    pub translucent: Vec<(NodeId, BlendMaterial)>,
    /// Whether the translucent materials sample the pre-pass textures.
    pub bind_prepass: bool,
}

impl PassPlan {
    pub fn draw_count(&self) -> usize {
        self.opaque.len() + self.translucent.len()
    }
}

fn drawable(graph: &SceneGraph) -> impl Iterator<Item = (NodeId, NodeCategory)> + '_ {
    graph.depth_first().into_iter().filter_map(|id| {
        let node = graph.node(id).ok()?;
        let visible = graph.is_effectively_visible(id).unwrap_or(false);
        (visible && node.mesh.is_some()).then_some((id, node.category))
    })
}

/// Split the scene into the two passes of a frame.
///
/// Pass 1 renders into the off-screen target with every translucent node left out.
/// Pass 2 renders everything to the surface, with translucent nodes sampling pass 1.
pub fn plan_frame(graph: &SceneGraph) -> [PassPlan; 2] {
    let mut opaque = Vec::new();
    let mut translucent = Vec::new();
    for (id, category) in drawable(graph) {
        match category {
            NodeCategory::Opaque => opaque.push(id),
            NodeCategory::TranslucentBlend(material) => translucent.push((id, material)),
        }
    }

    [
        PassPlan {
            target: PassTarget::Offscreen,
            opaque: opaque.clone(),
            translucent: Vec::new(),
            bind_prepass: false,
        },
        PassPlan {
            target: PassTarget::Surface,
            opaque,
            translucent,
            bind_prepass: true,
        },
    ]
}

/// Single-pass fallback used while the pre-pass resources are missing.
pub fn plan_opaque_only(graph: &SceneGraph) -> PassPlan {
    PassPlan {
        target: PassTarget::Surface,
        opaque: drawable(graph)
            .filter(|(_, category)| !category.is_translucent())
            .map(|(id, _)| id)
            .collect(),
        translucent: Vec::new(),
        bind_prepass: false,
    }
}
