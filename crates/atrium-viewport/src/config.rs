//! Construction-time configuration.
//!
//! Options are validated once, at viewport construction; invalid numeric
//! ranges fail fast rather than surfacing later as degenerate projections.

use anyhow::Result;

use crate::compositor::AaSettings;

/// Backend tuning forwarded to the renderer.
///
/// The boolean flags mirror the classic GL-context creation flags: `alpha`
/// selects a transparent surface, `antialias` enables 4x MSAA on the direct
/// path, `depth`/`stencil` request those attachments.
#[derive(Debug, Clone)]
pub struct RendererOptions {
    pub power_preference: wgpu::PowerPreference,
    pub alpha: bool,
    pub antialias: bool,
    pub stencil: bool,
    pub depth: bool,
    /// Prefer an sRGB surface format when available.
    pub prefer_srgb: bool,
    pub present_mode: wgpu::PresentMode,
    pub desired_maximum_frame_latency: u32,
}

impl Default for RendererOptions {
    fn default() -> Self {
        Self {
            power_preference: wgpu::PowerPreference::HighPerformance,
            alpha: true,
            antialias: false,
            stencil: false,
            depth: false,
            prefer_srgb: true,
            present_mode: wgpu::PresentMode::Fifo,
            desired_maximum_frame_latency: 2,
        }
    }
}

/// Perspective camera parameters.
#[derive(Debug, Clone)]
pub struct CameraOptions {
    /// Vertical field of view, degrees.
    pub fov_y_deg: f32,
    /// Optional aspect override, in effect until the first resize.
    pub aspect: Option<f32>,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraOptions {
    fn default() -> Self {
        Self {
            fov_y_deg: 45.0,
            aspect: None,
            near: 0.1,
            far: 1000.0,
        }
    }
}

/// Ambient light configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum AmbientLightOptions {
    Disabled,
    /// White at intensity 0.5.
    Enabled,
    Custom { color: [f32; 3], intensity: f32 },
}

impl AmbientLightOptions {
    pub fn initially_visible(&self) -> bool {
        !matches!(self, AmbientLightOptions::Disabled)
    }

    pub fn color_and_intensity(&self) -> ([f32; 3], f32) {
        match self {
            AmbientLightOptions::Custom { color, intensity } => (*color, *intensity),
            _ => ([1.0, 1.0, 1.0], 0.5),
        }
    }
}

/// Axes helper configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum AxesHelperOptions {
    Disabled,
    /// Ten units per axis.
    Enabled,
    Sized(f32),
}

impl AxesHelperOptions {
    pub fn initially_visible(&self) -> bool {
        !matches!(self, AxesHelperOptions::Disabled)
    }

    pub fn size(&self) -> f32 {
        match self {
            AxesHelperOptions::Sized(size) => *size,
            _ => 10.0,
        }
    }
}

/// Everything the viewport needs at construction.
#[derive(Debug, Clone)]
pub struct ViewportOptions {
    pub renderer: RendererOptions,
    pub camera: CameraOptions,
    pub camera_helper: bool,
    pub ambient_light: AmbientLightOptions,
    pub stats: bool,
    pub axes_helper: AxesHelperOptions,
    pub controls: bool,
    pub anti_aliasing: AaSettings,
}

impl Default for ViewportOptions {
    fn default() -> Self {
        Self {
            renderer: RendererOptions::default(),
            camera: CameraOptions::default(),
            camera_helper: false,
            ambient_light: AmbientLightOptions::Enabled,
            stats: true,
            axes_helper: AxesHelperOptions::Enabled,
            controls: true,
            anti_aliasing: AaSettings::default(),
        }
    }
}

impl ViewportOptions {
    /// Fails fast on invalid numeric ranges.
    pub fn validate(&self) -> Result<()> {
        let camera = &self.camera;
        anyhow::ensure!(
            camera.fov_y_deg > 0.0 && camera.fov_y_deg < 180.0,
            "camera field of view must be in (0, 180) degrees, got {}",
            camera.fov_y_deg
        );
        anyhow::ensure!(
            camera.near > 0.0 && camera.near.is_finite(),
            "camera near plane must be positive and finite, got {}",
            camera.near
        );
        anyhow::ensure!(
            camera.near < camera.far,
            "camera near plane ({}) must be closer than far plane ({})",
            camera.near,
            camera.far
        );
        if let Some(aspect) = camera.aspect {
            anyhow::ensure!(
                aspect > 0.0 && aspect.is_finite(),
                "camera aspect override must be positive and finite, got {aspect}"
            );
        }
        if let AxesHelperOptions::Sized(size) = self.axes_helper {
            anyhow::ensure!(
                size > 0.0 && size.is_finite(),
                "axes helper size must be positive and finite, got {size}"
            );
        }
        if let AmbientLightOptions::Custom { intensity, .. } = self.ambient_light {
            anyhow::ensure!(
                intensity >= 0.0 && intensity.is_finite(),
                "ambient light intensity must be non-negative, got {intensity}"
            );
        }
        anyhow::ensure!(
            self.anti_aliasing.edge_threshold > 0.0,
            "anti-aliasing edge threshold must be positive"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        ViewportOptions::default().validate().unwrap();
    }

    #[test]
    fn negative_fov_is_rejected() {
        let mut options = ViewportOptions::default();
        options.camera.fov_y_deg = -10.0;
        assert!(options.validate().is_err());
    }

    #[test]
    fn near_beyond_far_is_rejected() {
        let mut options = ViewportOptions::default();
        options.camera.near = 2000.0;
        assert!(options.validate().is_err());
    }

    #[test]
    fn zero_axes_size_is_rejected() {
        let options = ViewportOptions {
            axes_helper: AxesHelperOptions::Sized(0.0),
            ..ViewportOptions::default()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn helper_defaults_resolve() {
        assert_eq!(AxesHelperOptions::Enabled.size(), 10.0);
        assert_eq!(AxesHelperOptions::Sized(5.0).size(), 5.0);
        assert!(!AxesHelperOptions::Disabled.initially_visible());

        let (color, intensity) = AmbientLightOptions::Enabled.color_and_intensity();
        assert_eq!(color, [1.0, 1.0, 1.0]);
        assert_eq!(intensity, 0.5);
    }
}
