use anyhow::Result;

use crate::camera::ProjectionCamera;
use crate::compositor::CompositorPipeline;
use crate::scene::SceneGraph;

/// Per-frame render path, chosen by the coordinator when the frame starts.
#[derive(Copy, Clone)]
pub enum RenderPath<'a> {
    /// Single pass straight to the output target.
    Direct,
    /// Through the post-processing chain described by the pipeline.
    Composited(&'a CompositorPipeline),
}

/// What happened to a frame.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    Rendered,
    /// The frame was intentionally dropped (zero-sized target, transient
    /// surface error, disposed renderer). Not an error.
    Skipped,
}

/// Contract between the lifecycle coordinator and a renderer.
///
/// Implementations own the GPU context and every size-dependent buffer. The
/// coordinator guarantees single-threaded calls and that `dispose` /
/// `force_context_loss` are invoked at most once each, during teardown.
pub trait RenderBackend {
    /// Host handle the output surface binds to.
    type AttachTarget;

    /// Binds the renderer's output to a concrete host surface. Called at
    /// most once per surface; rendering before this call must target an
    /// internal (unattached) context without failing.
    fn attach(&mut self, target: Self::AttachTarget) -> Result<()>;

    /// Sets the effective device-pixel ratio used to derive physical sizes.
    fn set_pixel_ratio(&mut self, ratio: f64);

    /// Sets the logical output size. A zero dimension must be tolerated
    /// (surface configuration is deferred, not an error).
    fn set_logical_size(&mut self, width: f32, height: f32);

    /// Reallocates composited-path buffers to the pipeline's current sizes.
    /// Only called on resize while compositing is enabled — this is what
    /// produces the compositor's documented sizing staleness.
    fn apply_compositor_resize(&mut self, pipeline: &CompositorPipeline) -> Result<()>;

    /// Renders one frame along `path`.
    ///
    /// Transient conditions are reported as `Ok(FrameOutcome::Skipped)`;
    /// an `Err` is fatal for the owning coordinator (context loss, OOM).
    fn render(
        &mut self,
        scene: &SceneGraph,
        camera: &ProjectionCamera,
        path: RenderPath<'_>,
    ) -> Result<FrameOutcome>;

    /// Releases GPU resources. Rendering afterwards skips.
    fn dispose(&mut self) -> Result<()>;

    /// Forces the underlying GPU context to be lost/destroyed.
    fn force_context_loss(&mut self) -> Result<()>;
}
