//! Debug overlay binding surface.
//!
//! The overlay panel itself is an external collaborator; this module only
//! exposes the handles it binds to. Every handle is a cheap clone of shared
//! state owned by the viewport, so panel writes take effect synchronously.

use std::cell::RefCell;
use std::rc::Rc;

use crate::controls::OrbitControls;
use crate::scene::ToggleHandle;
use crate::time::FrameStats;

/// Shared handle to the orbit controls (auto-rotate state/speed live here).
pub type ControlsHandle = Rc<RefCell<OrbitControls>>;

/// Shared handle to the frame-timing sampler backing the FPS graph.
pub type FrameGraphHandle = Rc<RefCell<FrameStats>>;

/// Read/write handles handed to the debug overlay.
///
/// Toggle semantics are the viewport's: setting a helper toggle
/// synchronously attaches/detaches its scene node; repeated sets are no-ops.
/// Auto-rotate speed accepts values in the range documented by
/// [`crate::controls::AUTO_ROTATE_SPEED_RANGE`] (out-of-range writes clamp).
#[derive(Clone)]
pub struct DebugBindings {
    pub camera_helper: ToggleHandle,
    pub ambient_light: ToggleHandle,
    pub axes_helper: ToggleHandle,
    /// Visibility of the stats readout. No scene resource behind it.
    pub stats: ToggleHandle,
    /// Visibility of the panel itself (the host shows/hides its widget).
    pub panel: ToggleHandle,
    pub controls: ControlsHandle,
    pub frame_graph: FrameGraphHandle,
}
