use anyhow::Result;
use glam::Vec3;
use winit::dpi::LogicalSize;

use atrium_viewport::config::{AxesHelperOptions, ViewportOptions};
use atrium_viewport::coords::spherical_to_cartesian;
use atrium_viewport::logging::{LogConfig, init_logging};
use atrium_viewport::runtime::{RuntimeConfig, ViewportRuntime};
use atrium_viewport::scene::LineSet;
use atrium_viewport::Viewport;

fn main() -> Result<()> {
    init_logging(LogConfig::default());

    println!();
    println!("  atrium studio");
    println!("  keys: A axes · H camera helper · L light · C composer · R auto-rotate · Esc quit");
    println!();

    let options = ViewportOptions {
        axes_helper: AxesHelperOptions::Sized(5.0),
        camera_helper: false,
        ..ViewportOptions::default()
    };

    let mut viewport = Viewport::new(options)?;
    viewport.add_lines(ground_grid(10, 1.0), "ground-grid");
    viewport.add_lines(orbit_ring(4.0, 48), "orbit-ring");

    ViewportRuntime::run(
        viewport,
        RuntimeConfig {
            title: "atrium studio".to_string(),
            initial_size: LogicalSize::new(1280.0, 720.0),
        },
    )
}

/// Square grid on the XZ plane, centered on the origin.
fn ground_grid(half_extent: i32, spacing: f32) -> LineSet {
    let mut lines = LineSet::new();
    let reach = half_extent as f32 * spacing;
    let color = [0.35, 0.35, 0.4, 1.0];
    for i in -half_extent..=half_extent {
        let offset = i as f32 * spacing;
        lines.segment(
            Vec3::new(offset, 0.0, -reach),
            Vec3::new(offset, 0.0, reach),
            color,
        );
        lines.segment(
            Vec3::new(-reach, 0.0, offset),
            Vec3::new(reach, 0.0, offset),
            color,
        );
    }
    lines
}

/// Ring of segments along the equator of a sphere, demo content for the
/// spherical coordinate helper.
fn orbit_ring(radius: f32, segments: u32) -> LineSet {
    let mut lines = LineSet::new();
    let color = [0.9, 0.7, 0.2, 1.0];
    for i in 0..segments {
        let a = 360.0 * i as f32 / segments as f32;
        let b = 360.0 * (i + 1) as f32 / segments as f32;
        lines.segment(
            spherical_to_cartesian(radius, a, 0.0, 1.0),
            spherical_to_cartesian(radius, b, 0.0, 1.0),
            color,
        );
    }
    lines
}
