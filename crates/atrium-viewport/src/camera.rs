//! Perspective camera with a derived aspect ratio.
//!
//! Aspect is never set directly by callers: it is recomputed from the
//! observed surface size on every resize (a configured override only holds
//! until the first non-degenerate resize). The projection matrix is rebuilt
//! synchronously whenever the aspect changes, so the next frame always
//! renders with up-to-date state.

use glam::{Mat4, Vec3, Vec4, Vec4Swizzles};

use crate::config::CameraOptions;

/// Perspective camera (right-handed, 0..1 depth).
#[derive(Debug, Clone)]
pub struct ProjectionCamera {
    fov_y_deg: f32,
    near: f32,
    far: f32,
    aspect: f32,
    projection: Mat4,

    position: Vec3,
    target: Vec3,
    up: Vec3,
}

impl ProjectionCamera {
    /// Builds a camera from validated options.
    ///
    /// Until the first resize, aspect is the configured override (or 1.0),
    /// mirroring a surface that has not been laid out yet.
    pub fn new(options: &CameraOptions) -> Self {
        let aspect = options.aspect.unwrap_or(1.0);
        let mut camera = Self {
            fov_y_deg: options.fov_y_deg,
            near: options.near,
            far: options.far,
            aspect,
            projection: Mat4::IDENTITY,
            position: Vec3::new(0.0, 5.0, 10.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
        };
        camera.rebuild_projection();
        camera
    }

    /// Recomputes aspect and projection from a logical surface size.
    ///
    /// Returns `false` without touching the projection when either dimension
    /// is zero or not finite — transient zero-size layouts are absorbed, not
    /// errors.
    pub fn set_viewport_size(&mut self, width: f32, height: f32) -> bool {
        if width <= 0.0 || height <= 0.0 || !width.is_finite() || !height.is_finite() {
            return false;
        }
        self.aspect = width / height;
        self.rebuild_projection();
        true
    }

    fn rebuild_projection(&mut self) {
        self.projection = Mat4::perspective_rh(
            self.fov_y_deg.to_radians(),
            self.aspect.max(f32::MIN_POSITIVE),
            self.near,
            self.far,
        );
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn fov_y_deg(&self) -> f32 {
        self.fov_y_deg
    }

    pub fn near(&self) -> f32 {
        self.near
    }

    pub fn far(&self) -> f32 {
        self.far
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view()
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    pub fn set_target(&mut self, target: Vec3) {
        self.target = target;
    }

    /// World-space frustum corners: near plane first (bl, br, tr, tl), then
    /// the far plane in the same winding. Used by the frustum helper.
    pub fn frustum_corners_world(&self) -> [Vec3; 8] {
        let inverse = self.view_projection().inverse();
        let mut corners = [Vec3::ZERO; 8];
        // wgpu clip space: x,y in [-1, 1], z in [0, 1].
        let ndc = [
            [-1.0f32, -1.0, 0.0],
            [1.0, -1.0, 0.0],
            [1.0, 1.0, 0.0],
            [-1.0, 1.0, 0.0],
            [-1.0, -1.0, 1.0],
            [1.0, -1.0, 1.0],
            [1.0, 1.0, 1.0],
            [-1.0, 1.0, 1.0],
        ];
        for (corner, [x, y, z]) in corners.iter_mut().zip(ndc) {
            let clip = inverse * Vec4::new(x, y, z, 1.0);
            *corner = clip.xyz() / clip.w;
        }
        corners
    }

    /// Builds a world-space picking ray through normalized device coordinates.
    pub fn pick_ray(&self, ndc_x: f32, ndc_y: f32) -> Ray {
        let inverse = self.view_projection().inverse();
        let near = inverse * Vec4::new(ndc_x, ndc_y, 0.0, 1.0);
        let far = inverse * Vec4::new(ndc_x, ndc_y, 1.0, 1.0);
        let origin = near.xyz() / near.w;
        let through = far.xyz() / far.w;
        Ray {
            origin,
            direction: (through - origin).normalize_or_zero(),
        }
    }
}

/// Converts surface-local pointer coordinates into normalized device
/// coordinates (`x` right, `y` up, both in [-1, 1]).
pub fn surface_to_ndc(x: f32, y: f32, width: f32, height: f32) -> (f32, f32) {
    if width <= 0.0 || height <= 0.0 {
        return (0.0, 0.0);
    }
    ((x / width) * 2.0 - 1.0, -((y / height) * 2.0 - 1.0))
}

/// World-space ray used for scene picking.
#[derive(Debug, Copy, Clone)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    /// Slab test against an axis-aligned box.
    pub fn intersects_aabb(&self, min: Vec3, max: Vec3) -> bool {
        let mut t_min = f32::NEG_INFINITY;
        let mut t_max = f32::INFINITY;

        for axis in 0..3 {
            let origin = self.origin[axis];
            let dir = self.direction[axis];
            if dir.abs() < f32::EPSILON {
                if origin < min[axis] || origin > max[axis] {
                    return false;
                }
                continue;
            }
            let inv = 1.0 / dir;
            let (t0, t1) = {
                let a = (min[axis] - origin) * inv;
                let b = (max[axis] - origin) * inv;
                if a < b { (a, b) } else { (b, a) }
            };
            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
            if t_min > t_max {
                return false;
            }
        }

        t_max >= 0.0
    }
}
