//! Atrium viewport crate.
//!
//! This crate owns the lifecycle plumbing that binds a wgpu render loop to a
//! host surface: attach/resize/teardown sequencing, the two-mode render path
//! (direct vs. composited), toggleable scene helpers, and the event channel
//! the host subscribes to.

pub mod camera;
pub mod compositor;
pub mod config;
pub mod controls;
pub mod coords;
pub mod device;
pub mod events;
pub mod overlay;
pub mod render;
pub mod runtime;
pub mod scene;
pub mod time;
pub mod viewport;

pub mod logging;

pub use config::ViewportOptions;
pub use viewport::{FrameControl, Viewport};
