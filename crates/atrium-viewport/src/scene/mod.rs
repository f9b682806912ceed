//! Scene graph and toggleable visual aids.
//!
//! Responsibilities:
//! - hold the set of attached nodes in insertion order
//! - keep attach/detach idempotent so toggle wiring never double-mutates
//! - provide the helper node constructors (axes, camera frustum, ambient
//!   light) used by the viewport's visibility toggles

mod graph;
mod helpers;
mod toggle;

pub use graph::{NodeId, NodeKind, SceneGraph, SceneNode};
pub use helpers::{
    LineSet, LineVertex, ambient_light_node, axes_helper_node, camera_helper_node, frustum_lines,
};
pub use toggle::{ToggleHandle, VisibilityToggle};
