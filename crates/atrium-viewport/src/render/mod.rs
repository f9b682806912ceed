//! Renderer seam.
//!
//! The coordinator talks to its renderer through [`RenderBackend`] so the
//! lifecycle machinery is exercisable without a GPU. The shipped backend is
//! `device::GpuRenderer`.

mod backend;

pub use backend::{FrameOutcome, RenderBackend, RenderPath};
