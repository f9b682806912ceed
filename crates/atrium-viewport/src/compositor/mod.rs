//! Post-processing pass chain.
//!
//! The pipeline here is bookkeeping: which passes exist, how they are
//! configured, and what size their buffers were last given. GPU resources
//! that realize these passes are owned by the render backend and follow this
//! state (see `device::GpuRenderer::apply_compositor_resize`).

mod passes;

pub use passes::{
    AaPass, AaSettings, CopyPass, EdgeDetectionMode, OutputPass, PassSize, PredicationMode,
    ScenePass, SmaaPreset,
};

/// Optional composited render path.
///
/// When enabled, a frame runs: scene pass into an offscreen HDR target, the
/// anti-aliasing effect pass, and the output pass to the screen; a
/// pass-through copy pass is kept disabled but sized, ready to replace the
/// effect pass. When disabled, the render loop bypasses all of this and
/// draws the scene directly.
#[derive(Debug)]
pub struct CompositorPipeline {
    enabled: bool,
    buffer: PassSize,
    pub scene_pass: ScenePass,
    pub aa_pass: AaPass,
    pub copy_pass: CopyPass,
    pub output_pass: OutputPass,
}

impl CompositorPipeline {
    pub fn new(settings: AaSettings) -> Self {
        Self {
            enabled: false,
            buffer: PassSize::default(),
            scene_pass: ScenePass::default(),
            aa_pass: AaPass::new(settings),
            copy_pass: CopyPass::default(),
            output_pass: OutputPass::default(),
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Selects between the composited and direct render path, effective on
    /// the very next frame.
    ///
    /// Sizing contract: direct-render buffers track the live container size
    /// at all times; composited-render buffers reflect the size as of the
    /// last resize after the most recent enable. Enabling never reallocates
    /// buffers — only the next [`resize`](Self::resize) does. A pipeline
    /// enabled before any resize has zero-sized buffers and the backend
    /// falls back to a direct render until a resize arrives.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Resizes the composer framebuffer and every per-pass buffer.
    ///
    /// Dimensions are physical pixels (`logical * pixel_ratio`); the caller
    /// only invokes this while the pipeline is enabled, which is what
    /// produces the documented staleness window.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.buffer = PassSize { width, height };
        self.scene_pass.set_size(width, height);
        self.aa_pass.set_size(width, height);
        self.copy_pass.set_size(width, height);
        self.output_pass.set_size(width, height);
    }

    /// Composer framebuffer size as of the last resize.
    pub fn buffer_size(&self) -> PassSize {
        self.buffer
    }

    /// True when the buffers have a renderable (non-zero) size.
    pub fn has_sized_buffers(&self) -> bool {
        self.buffer.width > 0 && self.buffer.height > 0
    }
}

impl Default for CompositorPipeline {
    fn default() -> Self {
        Self::new(AaSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resize_sizes_every_pass() {
        let mut pipeline = CompositorPipeline::default();
        pipeline.resize(1600, 1200);

        let expected = PassSize {
            width: 1600,
            height: 1200,
        };
        assert_eq!(pipeline.buffer_size(), expected);
        assert_eq!(pipeline.scene_pass.size(), expected);
        assert_eq!(pipeline.aa_pass.size(), expected);
        assert_eq!(pipeline.copy_pass.size(), expected);
        assert_eq!(pipeline.output_pass.size(), expected);
    }

    #[test]
    fn enabling_does_not_touch_buffer_sizes() {
        let mut pipeline = CompositorPipeline::default();
        pipeline.resize(800, 600);
        pipeline.set_enabled(true);
        assert_eq!(
            pipeline.buffer_size(),
            PassSize {
                width: 800,
                height: 600
            }
        );
        assert!(pipeline.enabled());
    }

    #[test]
    fn copy_pass_stays_disabled_but_sized() {
        let mut pipeline = CompositorPipeline::default();
        pipeline.resize(640, 480);
        assert!(!pipeline.copy_pass.enabled);
        assert_eq!(
            pipeline.copy_pass.size(),
            PassSize {
                width: 640,
                height: 480
            }
        );
    }

    #[test]
    fn fresh_pipeline_has_no_sized_buffers() {
        let pipeline = CompositorPipeline::default();
        assert!(!pipeline.has_sized_buffers());
    }
}
