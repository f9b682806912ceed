//! wgpu-backed renderer.
//!
//! This module is responsible for:
//! - creating the wgpu Instance/Adapter/Device/Queue (headless-capable)
//! - binding and configuring the output Surface when the host attaches one
//! - realizing the direct and composited render paths on the GPU

mod gpu;

pub use gpu::GpuRenderer;
