//! Arena-backed scene graph.
//!
//! Nodes live in a single `Vec` and refer to each other by [`NodeId`]. A child's parent
//! is a plain index back into the arena; ownership flows only from parent to children.

use glam::{Mat4, Quat};

use super::transform::Transform;
use crate::error::{Error, Result};

/// Longest parent chain a root walk will follow before reporting a cycle.
pub const MAX_DEPTH: usize = 256;

/// Index of a node in its [`SceneGraph`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Index of an uploaded mesh in the renderer's mesh list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MeshId(pub usize);

/// Materials that blend against the depth pre-pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlendMaterial {
    Water,
    Grass,
}

/// How a node takes part in the two render passes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum NodeCategory {
    /// Drawn in both passes and written to depth.
    #[default]
    Opaque,
    /// Hidden in the pre-pass; drawn last in the main pass, sampling pre-pass depth.
    TranslucentBlend(BlendMaterial),
}

impl NodeCategory {
    pub fn is_translucent(self) -> bool {
        matches!(self, NodeCategory::TranslucentBlend(_))
    }
}

#[derive(Clone, Debug)]
pub struct Node {
    pub name: String,
    pub transform: Transform,
    pub category: NodeCategory,
    pub visible: bool,
    pub mesh: Option<MeshId>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    fn new(name: impl Into<String>, category: NodeCategory) -> Self {
        Self {
            name: name.into(),
            transform: Transform::default(),
            category,
            visible: true,
            mesh: None,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// A tree of nodes with exactly one root.
#[derive(Clone, Debug)]
pub struct SceneGraph {
    nodes: Vec<Node>,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph {
    /// Create a graph containing only the root node.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new("root", NodeCategory::Opaque)],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        // The root always exists.
        false
    }

    /// Append a new child under `parent`.
    pub fn add_child(
        &mut self,
        parent: NodeId,
        name: impl Into<String>,
        category: NodeCategory,
    ) -> Result<NodeId> {
        self.check(parent)?;
        let id = NodeId(self.nodes.len());
        let mut node = Node::new(name, category);
        node.parent = Some(parent);
        self.nodes.push(node);
        self.nodes[parent.0].children.push(id);
        Ok(id)
    }

    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes
            .get(id.0)
            .ok_or_else(|| Error::SceneGraph(format!("no node with id {}", id.0)))
    }

    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes
            .get_mut(id.0)
            .ok_or_else(|| Error::SceneGraph(format!("no node with id {}", id.0)))
    }

    pub fn transform_mut(&mut self, id: NodeId) -> Result<&mut Transform> {
        Ok(&mut self.node_mut(id)?.transform)
    }

    fn check(&self, id: NodeId) -> Result<()> {
        self.node(id).map(|_| ())
    }

    /// Move `node` under `new_parent`. Refuses to move the root or create a cycle.
    pub fn set_parent(&mut self, node: NodeId, new_parent: NodeId) -> Result<()> {
        self.check(node)?;
        self.check(new_parent)?;
        if node == self.root() {
            return Err(Error::SceneGraph("the root cannot be re-parented".into()));
        }
        if self.is_ancestor(node, new_parent)? {
            return Err(Error::SceneGraph(format!(
                "moving node {} under {} would create a cycle",
                node.0, new_parent.0
            )));
        }

        if let Some(old) = self.nodes[node.0].parent {
            self.nodes[old.0].children.retain(|&c| c != node);
        }
        self.nodes[node.0].parent = Some(new_parent);
        self.nodes[new_parent.0].children.push(node);
        Ok(())
    }

    /// Whether `ancestor` is `node` or lies on its chain of parents.
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> Result<bool> {
        let mut found = false;
        self.walk_up(node, |id| {
            found |= id == ancestor;
        })?;
        Ok(found)
    }

    /// Follow parent links from `id` to the root.
    ///
    /// The walk is capped at [`MAX_DEPTH`] steps; a longer chain means the parent links
    /// loop and is reported as [`Error::SceneGraph`].
    pub fn find_root(&self, id: NodeId) -> Result<NodeId> {
        let mut last = id;
        self.walk_up(id, |n| last = n)?;
        Ok(last)
    }

    fn walk_up(&self, start: NodeId, mut visit: impl FnMut(NodeId)) -> Result<()> {
        let mut current = start;
        for _ in 0..=MAX_DEPTH {
            visit(current);
            match self.node(current)?.parent {
                Some(parent) => current = parent,
                None => return Ok(()),
            }
        }
        Err(Error::SceneGraph(format!(
            "parent chain from node {} exceeds {MAX_DEPTH} links; the graph has a cycle",
            start.0
        )))
    }

    /// Local-to-world matrix of a node, composed through its ancestors.
    pub fn world_matrix(&self, id: NodeId) -> Result<Mat4> {
        let mut chain = Vec::new();
        self.walk_up(id, |n| chain.push(n))?;
        Ok(chain
            .iter()
            .rev()
            .fold(Mat4::IDENTITY, |acc, n| acc * self.nodes[n.0].transform.matrix()))
    }

    /// World rotation of a node, ignoring translation and scale.
    pub fn world_rotation(&self, id: NodeId) -> Result<Quat> {
        let mut chain = Vec::new();
        self.walk_up(id, |n| chain.push(n))?;
        Ok(chain
            .iter()
            .rev()
            .fold(Quat::IDENTITY, |acc, n| acc * self.nodes[n.0].transform.quat()))
    }

    /// Whether a node and all of its ancestors are visible.
    pub fn is_effectively_visible(&self, id: NodeId) -> Result<bool> {
        let mut visible = true;
        self.walk_up(id, |n| visible &= self.nodes[n.0].visible)?;
        Ok(visible)
    }

    /// Nodes in depth-first order starting from the root.
    pub fn depth_first(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            if order.len() > self.nodes.len() {
                break;
            }
            order.push(id);
            for &child in self.nodes[id.0].children.iter().rev() {
                stack.push(child);
            }
        }
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn planet_graph() -> (SceneGraph, NodeId, NodeId) {
        let mut graph = SceneGraph::new();
        let planet = graph
            .add_child(graph.root(), "planet", NodeCategory::Opaque)
            .unwrap();
        let water = graph
            .add_child(
                planet,
                "water",
                NodeCategory::TranslucentBlend(BlendMaterial::Water),
            )
            .unwrap();
        (graph, planet, water)
    }

    #[test]
    fn find_root_walks_to_root() {
        let (graph, planet, water) = planet_graph();
        assert_eq!(graph.find_root(water).unwrap(), graph.root());
        assert_eq!(graph.find_root(planet).unwrap(), graph.root());
        assert_eq!(graph.node(water).unwrap().parent(), Some(planet));
    }

    #[test]
    fn corrupted_parent_links_report_cycle() {
        let (mut graph, planet, water) = planet_graph();
        graph.nodes[planet.0].parent = Some(water);
        assert!(matches!(graph.find_root(water), Err(Error::SceneGraph(_))));
    }

    #[test]
    fn set_parent_refuses_cycles() {
        let (mut graph, planet, water) = planet_graph();
        assert!(graph.set_parent(planet, water).is_err());
        assert!(graph.set_parent(graph.root(), water).is_err());

        let moon = graph
            .add_child(graph.root(), "moon", NodeCategory::Opaque)
            .unwrap();
        graph.set_parent(water, moon).unwrap();
        assert!(graph.node(planet).unwrap().children().is_empty());
        assert_eq!(graph.node(moon).unwrap().children(), &[water]);
    }

    #[test]
    fn children_inherit_parent_rotation() {
        let (mut graph, planet, water) = planet_graph();
        graph.transform_mut(planet).unwrap().rotation.y = std::f32::consts::FRAC_PI_2;
        let p = graph.world_matrix(water).unwrap().transform_point3(Vec3::Z);
        assert!(p.abs_diff_eq(Vec3::X, 1e-6));
        let q = graph.world_rotation(water).unwrap() * Vec3::Z;
        assert!(q.abs_diff_eq(Vec3::X, 1e-6));
    }

    #[test]
    fn hidden_parent_hides_children() {
        let (mut graph, planet, water) = planet_graph();
        graph.node_mut(planet).unwrap().visible = false;
        assert!(!graph.is_effectively_visible(water).unwrap());
    }

    #[test]
    fn depth_first_visits_every_node_once() {
        let (graph, planet, water) = planet_graph();
        assert_eq!(graph.depth_first(), vec![graph.root(), planet, water]);
    }

    #[test]
    fn unknown_ids_are_errors() {
        let mut graph = SceneGraph::new();
        assert!(graph.node(NodeId(9)).is_err());
        assert!(graph.add_child(NodeId(9), "x", NodeCategory::Opaque).is_err());
    }
}
