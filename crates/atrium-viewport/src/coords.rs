//! Small coordinate helpers for placing scene content.

use glam::Vec3;

/// Converts a longitude/latitude pair on a sphere of radius `radius` into a
/// cartesian position.
///
/// Longitude is negated so that +Z corresponds to longitude -90°, matching
/// the screen-space convention used by globe-style scenes. `offset` scales
/// the radius (1.0 places the point on the surface, >1.0 floats above it).
pub fn spherical_to_cartesian(radius: f32, longitude_deg: f32, latitude_deg: f32, offset: f32) -> Vec3 {
    let lon = -longitude_deg.to_radians();
    let lat = latitude_deg.to_radians();

    let r = radius * offset;
    Vec3::new(
        r * lat.cos() * lon.cos(),
        r * lat.sin(),
        r * lat.cos() * lon.sin(),
    )
}
