//! Damped orbit controls.
//!
//! Input nudges a desired spherical pose around the target; `update`
//! interpolates the actual pose toward it over several frames instead of
//! snapping. Auto-rotate slowly advances the desired azimuth while enabled.

use std::f32::consts::{PI, TAU};

use glam::Vec3;

use crate::camera::ProjectionCamera;

/// Auto-rotate speed bounds exposed on the debug binding surface.
pub const AUTO_ROTATE_SPEED_RANGE: (f32, f32) = (0.1, 10.0);

/// Polar clamp keeping the camera off the exact poles.
const POLAR_EPSILON: f32 = 0.01;

#[derive(Debug, Clone)]
pub struct OrbitControls {
    enabled: bool,
    damping_factor: f32,

    auto_rotate: bool,
    auto_rotate_speed: f32,

    target: Vec3,
    radius: f32,
    azimuth: f32,
    polar: f32,

    desired_radius: f32,
    desired_azimuth: f32,
    desired_polar: f32,
}

impl OrbitControls {
    /// Derives the initial orbit pose from the camera's position and target.
    pub fn from_camera(camera: &ProjectionCamera) -> Self {
        let offset = camera.position() - camera.target();
        let radius = offset.length().max(0.001);
        let azimuth = offset.x.atan2(offset.z);
        let polar = (offset.y / radius).clamp(-1.0, 1.0).acos();

        Self {
            enabled: true,
            damping_factor: 0.05,
            auto_rotate: false,
            auto_rotate_speed: 2.0,
            target: camera.target(),
            radius,
            azimuth,
            polar,
            desired_radius: radius,
            desired_azimuth: azimuth,
            desired_polar: polar,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn auto_rotate(&self) -> bool {
        self.auto_rotate
    }

    pub fn set_auto_rotate(&mut self, enabled: bool) {
        self.auto_rotate = enabled;
    }

    pub fn auto_rotate_speed(&self) -> f32 {
        self.auto_rotate_speed
    }

    /// Sets the auto-rotate speed, clamped to [`AUTO_ROTATE_SPEED_RANGE`].
    pub fn set_auto_rotate_speed(&mut self, speed: f32) {
        let (min, max) = AUTO_ROTATE_SPEED_RANGE;
        self.auto_rotate_speed = speed.clamp(min, max);
    }

    /// Applies a pointer-drag rotation, in radians.
    pub fn rotate_by(&mut self, d_azimuth: f32, d_polar: f32) {
        if !self.enabled {
            return;
        }
        self.desired_azimuth += d_azimuth;
        self.desired_polar =
            (self.desired_polar + d_polar).clamp(POLAR_EPSILON, PI - POLAR_EPSILON);
    }

    /// Scales the orbit radius (wheel zoom). Factors above 1.0 move away.
    pub fn dolly(&mut self, factor: f32) {
        if !self.enabled || !(factor > 0.0) {
            return;
        }
        self.desired_radius = (self.desired_radius * factor).clamp(0.01, 1.0e6);
    }

    /// Advances damping and auto-rotation, then writes the camera pose.
    ///
    /// Returns `true` while the pose is still converging (useful for
    /// damping-aware redraw scheduling).
    pub fn update(&mut self, delta_seconds: f32, camera: &mut ProjectionCamera) -> bool {
        if !self.enabled {
            return false;
        }

        if self.auto_rotate {
            // One full revolution per 60 s at speed 1.0.
            self.desired_azimuth += TAU / 60.0 * self.auto_rotate_speed * delta_seconds;
        }

        // Per-frame exponential approach, normalized to a 60 Hz step so the
        // feel is frame-rate independent.
        let step = 1.0 - (1.0 - self.damping_factor).powf(delta_seconds * 60.0);
        self.azimuth += (self.desired_azimuth - self.azimuth) * step;
        self.polar += (self.desired_polar - self.polar) * step;
        self.radius += (self.desired_radius - self.radius) * step;

        let offset = Vec3::new(
            self.radius * self.polar.sin() * self.azimuth.sin(),
            self.radius * self.polar.cos(),
            self.radius * self.polar.sin() * self.azimuth.cos(),
        );
        camera.set_target(self.target);
        camera.set_position(self.target + offset);

        (self.desired_azimuth - self.azimuth).abs() > 1e-4
            || (self.desired_polar - self.polar).abs() > 1e-4
            || (self.desired_radius - self.radius).abs() > 1e-4
    }

    /// Disables the controls. Subsequent input and updates are no-ops.
    pub fn dispose(&mut self) {
        self.enabled = false;
        self.auto_rotate = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CameraOptions;

    fn rig() -> (OrbitControls, ProjectionCamera) {
        let mut camera = ProjectionCamera::new(&CameraOptions::default());
        camera.set_position(Vec3::new(0.0, 0.0, 10.0));
        camera.set_target(Vec3::ZERO);
        let controls = OrbitControls::from_camera(&camera);
        (controls, camera)
    }

    #[test]
    fn damping_converges_to_the_desired_pose() {
        let (mut controls, mut camera) = rig();
        controls.rotate_by(1.0, 0.0);

        let first = camera.position();
        controls.update(1.0 / 60.0, &mut camera);
        let after_one = camera.position();
        assert_ne!(first, after_one, "one tick must move the camera");

        for _ in 0..600 {
            controls.update(1.0 / 60.0, &mut camera);
        }
        // Azimuth 1.0 around +Y from (0,0,10), radius preserved.
        assert!((camera.position().length() - 10.0).abs() < 1e-2);
        let expected = Vec3::new(10.0 * 1.0f32.sin(), 0.0, 10.0 * 1.0f32.cos());
        assert!((camera.position() - expected).length() < 0.05);
    }

    #[test]
    fn auto_rotate_advances_without_input() {
        let (mut controls, mut camera) = rig();
        controls.set_auto_rotate(true);
        let start = camera.position();
        for _ in 0..60 {
            controls.update(1.0 / 60.0, &mut camera);
        }
        assert!((camera.position() - start).length() > 0.1);
    }

    #[test]
    fn speed_is_clamped_to_the_documented_range() {
        let (mut controls, _) = rig();
        controls.set_auto_rotate_speed(50.0);
        assert_eq!(controls.auto_rotate_speed(), 10.0);
        controls.set_auto_rotate_speed(0.0);
        assert_eq!(controls.auto_rotate_speed(), 0.1);
    }

    #[test]
    fn disposed_controls_ignore_everything() {
        let (mut controls, mut camera) = rig();
        controls.dispose();
        controls.rotate_by(1.0, 1.0);
        controls.dolly(2.0);
        let before = camera.position();
        assert!(!controls.update(1.0 / 60.0, &mut camera));
        assert_eq!(camera.position(), before);
    }

    #[test]
    fn polar_stays_off_the_poles() {
        let (mut controls, mut camera) = rig();
        controls.rotate_by(0.0, 100.0);
        for _ in 0..600 {
            controls.update(1.0 / 60.0, &mut camera);
        }
        assert!(camera.position().y > -10.0);
        // Pose stays finite and on the orbit sphere.
        assert!((camera.position().length() - 10.0).abs() < 1e-2);
    }
}
