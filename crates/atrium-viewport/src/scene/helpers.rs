use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use super::graph::{NodeId, NodeKind, SceneNode};

/// One endpoint of a line segment. Matches the GPU vertex layout directly.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct LineVertex {
    pub position: [f32; 3],
    pub color: [f32; 4],
}

/// A batch of colored line segments (consecutive vertex pairs).
#[derive(Debug, Clone, Default)]
pub struct LineSet {
    pub vertices: Vec<LineVertex>,
}

impl LineSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one segment.
    pub fn segment(&mut self, from: Vec3, to: Vec3, color: [f32; 4]) -> &mut Self {
        self.vertices.push(LineVertex {
            position: from.to_array(),
            color,
        });
        self.vertices.push(LineVertex {
            position: to.to_array(),
            color,
        });
        self
    }

    /// Axis-aligned bounds over all endpoints. `None` when empty.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let mut iter = self.vertices.iter().map(|v| Vec3::from_array(v.position));
        let first = iter.next()?;
        let (min, max) = iter.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
        Some((min, max))
    }
}

/// Coordinate-axes helper: X red, Y green, Z blue, each `size` units long.
pub fn axes_helper_node(id: NodeId, size: f32) -> SceneNode {
    let mut lines = LineSet::new();
    lines
        .segment(Vec3::ZERO, Vec3::X * size, [1.0, 0.2, 0.2, 1.0])
        .segment(Vec3::ZERO, Vec3::Y * size, [0.2, 1.0, 0.2, 1.0])
        .segment(Vec3::ZERO, Vec3::Z * size, [0.2, 0.4, 1.0, 1.0]);
    SceneNode {
        id,
        name: "axes-helper".to_string(),
        kind: NodeKind::Lines(lines),
    }
}

/// Camera-frustum helper marker. Geometry is derived from the live camera at
/// render time (see [`frustum_lines`]).
pub fn camera_helper_node(id: NodeId) -> SceneNode {
    SceneNode {
        id,
        name: "camera-helper".to_string(),
        kind: NodeKind::CameraFrustum,
    }
}

/// Ambient light node.
pub fn ambient_light_node(id: NodeId, color: [f32; 3], intensity: f32) -> SceneNode {
    SceneNode {
        id,
        name: "ambient-light".to_string(),
        kind: NodeKind::AmbientLight { color, intensity },
    }
}

/// Wireframe for a frustum given its eight world-space corners (near plane
/// bl/br/tr/tl, then far plane in the same winding).
pub fn frustum_lines(corners: &[Vec3; 8]) -> LineSet {
    const COLOR: [f32; 4] = [1.0, 1.0, 1.0, 0.6];
    let mut lines = LineSet::new();
    for i in 0..4 {
        let j = (i + 1) % 4;
        // Near ring, far ring, and the edge connecting them.
        lines.segment(corners[i], corners[j], COLOR);
        lines.segment(corners[4 + i], corners[4 + j], COLOR);
        lines.segment(corners[i], corners[4 + i], COLOR);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axes_helper_extends_to_its_size() {
        let mut graph = crate::scene::SceneGraph::new();
        let id = graph.allocate_id();
        let node = axes_helper_node(id, 5.0);
        let NodeKind::Lines(lines) = &node.kind else {
            panic!("axes helper must carry line geometry");
        };
        assert_eq!(lines.vertices.len(), 6);
        let (min, max) = lines.bounds().unwrap();
        assert_eq!(min, Vec3::ZERO);
        assert_eq!(max, Vec3::splat(5.0));
    }

    #[test]
    fn frustum_wireframe_has_twelve_edges() {
        let corners = [
            Vec3::new(-1.0, -1.0, -1.0),
            Vec3::new(1.0, -1.0, -1.0),
            Vec3::new(1.0, 1.0, -1.0),
            Vec3::new(-1.0, 1.0, -1.0),
            Vec3::new(-2.0, -2.0, -5.0),
            Vec3::new(2.0, -2.0, -5.0),
            Vec3::new(2.0, 2.0, -5.0),
            Vec3::new(-2.0, 2.0, -5.0),
        ];
        let lines = frustum_lines(&corners);
        assert_eq!(lines.vertices.len(), 24);
    }

    #[test]
    fn line_bounds_cover_all_segments() {
        let mut lines = LineSet::new();
        lines.segment(Vec3::new(-2.0, 0.0, 1.0), Vec3::new(3.0, 4.0, -1.0), [1.0; 4]);
        let (min, max) = lines.bounds().unwrap();
        assert_eq!(min, Vec3::new(-2.0, 0.0, -1.0));
        assert_eq!(max, Vec3::new(3.0, 4.0, 1.0));
    }
}
