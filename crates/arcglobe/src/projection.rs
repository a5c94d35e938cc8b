//! Radial projection between concentric spheres.
//!
//! Marker tops sit on a sphere slightly larger than the globe. Scaling along
//! the ray from the origin gives the raised counterpart directly, with no
//! hemisphere special-casing.

use glam::Vec3;

use crate::{GLOBE_RADIUS, TOWER_HEIGHT};

/// Project `point`, lying on a sphere of radius `from_radius`, onto the
/// concentric sphere of radius `to_radius` along the same ray.
#[must_use]
pub fn raise(point: Vec3, from_radius: f32, to_radius: f32) -> Vec3 {
    point * (to_radius / from_radius)
}

/// The raised counterpart of a globe surface point: where the marker top goes.
#[must_use]
pub fn raise_to_top(point: Vec3) -> Vec3 {
    raise(point, GLOBE_RADIUS, GLOBE_RADIUS + TOWER_HEIGHT)
}
