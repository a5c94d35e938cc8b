//! Ray intersection tests for hover picking.
//!
//! Scene objects are approximated by simple shapes: the globe and marker tops
//! are spheres, towers are capsules around their axis.

use glam::Vec3;

/// A pickable shape.
#[derive(Debug, Clone, Copy)]
pub enum PickShape {
    Sphere { center: Vec3, radius: f32 },
    Capsule { a: Vec3, b: Vec3, radius: f32 },
}

impl PickShape {
    /// Distance along the ray to the first hit, if any.
    ///
    /// `direction` must be normalized. Hits behind the origin are ignored.
    #[must_use]
    pub fn intersect(&self, origin: Vec3, direction: Vec3) -> Option<f32> {
        match *self {
            PickShape::Sphere { center, radius } => ray_sphere(origin, direction, center, radius),
            PickShape::Capsule { a, b, radius } => ray_capsule(origin, direction, a, b, radius),
        }
    }
}

/// Find the closest target hit by the ray.
pub fn nearest_hit<T>(
    origin: Vec3,
    direction: Vec3,
    targets: impl IntoIterator<Item = (T, PickShape)>,
) -> Option<(T, f32)> {
    targets
        .into_iter()
        .filter_map(|(target, shape)| {
            shape
                .intersect(origin, direction)
                .map(|distance| (target, distance))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

fn ray_sphere(origin: Vec3, direction: Vec3, center: Vec3, radius: f32) -> Option<f32> {
    let oc = origin - center;
    let b = oc.dot(direction);
    let c = oc.length_squared() - radius * radius;
    let discriminant = b * b - c;
    if discriminant < 0.0 {
        return None;
    }
    let root = discriminant.sqrt();
    let near = -b - root;
    if near >= 0.0 {
        return Some(near);
    }
    // Origin inside the sphere.
    let far = -b + root;
    (far >= 0.0).then_some(far)
}

/// Approximate ray/capsule test via closest approach between ray and axis.
fn ray_capsule(origin: Vec3, direction: Vec3, a: Vec3, b: Vec3, radius: f32) -> Option<f32> {
    let axis = b - a;
    let axis_len_sq = axis.length_squared();
    if axis_len_sq < 1e-12 {
        return ray_sphere(origin, direction, a, radius);
    }

    let w0 = origin - a;
    let d_dot_axis = direction.dot(axis);
    let denom = axis_len_sq - d_dot_axis * d_dot_axis;

    // Parameter along the axis of the closest point, clamped to the segment.
    let s = if denom.abs() < 1e-9 {
        0.0
    } else {
        ((axis.dot(w0) - d_dot_axis * direction.dot(w0)) / denom).clamp(0.0, 1.0)
    };
    let on_axis = a + axis * s;
    let t = (on_axis - origin).dot(direction).max(0.0);
    let on_ray = origin + direction * t;

    (on_ray.distance_squared(on_axis) <= radius * radius).then_some(t)
}
