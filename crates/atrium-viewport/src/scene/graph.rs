use glam::Vec3;

use super::helpers::LineSet;

/// Stable node identifier. Ids are allocated by the graph and stay valid
/// across detach/re-attach cycles.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u64);

/// Renderable payload of a scene node.
///
/// Scene *content* is intentionally narrow: hosts contribute line sets, and
/// the viewport contributes its helper nodes. The frustum helper carries no
/// geometry — the backend derives its lines from the live camera each frame
/// so the helper tracks damped camera motion.
#[derive(Debug, Clone)]
pub enum NodeKind {
    Lines(LineSet),
    CameraFrustum,
    AmbientLight { color: [f32; 3], intensity: f32 },
}

#[derive(Debug, Clone)]
pub struct SceneNode {
    pub id: NodeId,
    pub name: String,
    pub kind: NodeKind,
}

/// Flat scene root.
///
/// Nodes are kept in insertion order. `attach`/`detach` are idempotent:
/// attaching a node whose id is already present (or detaching an absent id)
/// is a no-op, not an error. `mutation_count` counts only effective
/// transitions, which is what the toggle-idempotence contract is measured
/// against.
#[derive(Debug, Default)]
pub struct SceneGraph {
    nodes: Vec<SceneNode>,
    next_id: u64,
    mutations: u64,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves an id for a node that may be attached later.
    pub fn allocate_id(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Adds `node` to the root. Returns `false` (and drops the argument)
    /// when a node with the same id is already attached.
    pub fn attach(&mut self, node: SceneNode) -> bool {
        if self.contains(node.id) {
            return false;
        }
        self.nodes.push(node);
        self.mutations += 1;
        true
    }

    /// Removes the node with `id`. Returns `false` when it was not attached.
    pub fn detach(&mut self, id: NodeId) -> bool {
        let before = self.nodes.len();
        self.nodes.retain(|n| n.id != id);
        if self.nodes.len() == before {
            return false;
        }
        self.mutations += 1;
        true
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.iter().any(|n| n.id == id)
    }

    pub fn get(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SceneNode> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of effective attach/detach transitions so far.
    pub fn mutation_count(&self) -> u64 {
        self.mutations
    }

    /// Detaches every node. Id allocation state survives so stale handles
    /// cannot collide with later nodes.
    pub fn clear(&mut self) {
        if !self.nodes.is_empty() {
            self.mutations += 1;
        }
        self.nodes.clear();
    }

    /// Accumulated ambient light term, `[r, g, b] * intensity` summed over
    /// attached light nodes. `None` when no light is attached.
    pub fn ambient_term(&self) -> Option<[f32; 3]> {
        let mut acc = None;
        for node in &self.nodes {
            if let NodeKind::AmbientLight { color, intensity } = node.kind {
                let acc = acc.get_or_insert([0.0f32; 3]);
                for (dst, src) in acc.iter_mut().zip(color) {
                    *dst += src * intensity;
                }
            }
        }
        acc
    }

    /// Axis-aligned bounds of a node's geometry, if it has any.
    pub fn node_bounds(&self, id: NodeId) -> Option<(Vec3, Vec3)> {
        match &self.get(id)?.kind {
            NodeKind::Lines(lines) => lines.bounds(),
            NodeKind::CameraFrustum | NodeKind::AmbientLight { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::helpers::axes_helper_node;

    #[test]
    fn attach_is_idempotent() {
        let mut scene = SceneGraph::new();
        let id = scene.allocate_id();
        assert!(scene.attach(axes_helper_node(id, 1.0)));
        assert!(!scene.attach(axes_helper_node(id, 1.0)));
        assert_eq!(scene.len(), 1);
        assert_eq!(scene.mutation_count(), 1);
    }

    #[test]
    fn detach_is_idempotent() {
        let mut scene = SceneGraph::new();
        let id = scene.allocate_id();
        scene.attach(axes_helper_node(id, 1.0));
        assert!(scene.detach(id));
        assert!(!scene.detach(id));
        assert!(scene.is_empty());
        assert_eq!(scene.mutation_count(), 2);
    }

    #[test]
    fn clear_detaches_everything_but_keeps_id_state() {
        let mut scene = SceneGraph::new();
        let a = scene.allocate_id();
        scene.attach(axes_helper_node(a, 1.0));
        scene.clear();
        assert!(scene.is_empty());
        let b = scene.allocate_id();
        assert_ne!(a, b);
    }

    #[test]
    fn ambient_term_sums_attached_lights() {
        use crate::scene::helpers::ambient_light_node;

        let mut scene = SceneGraph::new();
        assert_eq!(scene.ambient_term(), None);

        let id = scene.allocate_id();
        scene.attach(ambient_light_node(id, [1.0, 0.5, 0.0], 0.5));
        let term = scene.ambient_term().unwrap();
        assert!((term[0] - 0.5).abs() < 1e-6);
        assert!((term[1] - 0.25).abs() < 1e-6);
        assert_eq!(term[2], 0.0);
    }
}
