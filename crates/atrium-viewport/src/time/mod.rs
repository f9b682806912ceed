//! Frame timing.
//!
//! `FrameClock` produces per-tick timing snapshots; `FrameStats` measures the
//! render portion of each tick and backs the debug overlay's FPS graph.

mod frame_clock;
mod stats;

pub use frame_clock::{FrameClock, FrameTime};
pub use stats::FrameStats;
