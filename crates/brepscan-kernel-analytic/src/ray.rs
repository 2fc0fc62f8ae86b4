//! Ray representation and closed-form ray/surface intersection.

use brepscan_math::{Dir3, Point3, Vec3};

use crate::part::AxisFrame;

/// A ray in 3D space defined by origin and direction.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    /// Origin point of the ray.
    pub origin: Point3,
    /// Unit direction of the ray.
    pub direction: Dir3,
}

impl Ray {
    /// Create a new ray. The direction will be normalized.
    pub fn new(origin: Point3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: Dir3::new_normalize(direction),
        }
    }

    /// Evaluate the ray at parameter `t`: `origin + t * direction`.
    #[inline]
    pub fn at(&self, t: f64) -> Point3 {
        self.origin + t * self.direction.as_ref()
    }
}

/// Intersect a ray with the axis-aligned plane `p[frame.k] == level`.
///
/// Returns `None` if the ray is parallel to the plane. Negative `t` is
/// returned as-is; callers filter by their own range.
pub fn intersect_axis_plane(ray: &Ray, frame: &AxisFrame, level: f64) -> Option<f64> {
    let denom = ray.direction[frame.k];
    if denom.abs() < 1e-12 {
        return None;
    }
    Some((level - ray.origin[frame.k]) / denom)
}

/// Intersect a ray with the infinite cylinder of `radius` around the axis
/// line through `center` (in frame `a`/`b` coordinates) along `frame.k`.
///
/// Returns up to 2 ray parameters, sorted ascending.
pub fn intersect_axis_cylinder(
    ray: &Ray,
    frame: &AxisFrame,
    center: [f64; 2],
    radius: f64,
) -> Vec<f64> {
    let d = ray.direction.as_ref();
    // Components perpendicular to the axis
    let (da, db) = (d[frame.a], d[frame.b]);
    let (oa, ob) = (
        ray.origin[frame.a] - center[0],
        ray.origin[frame.b] - center[1],
    );

    let a = da * da + db * db;
    let b = 2.0 * (oa * da + ob * db);
    let c = oa * oa + ob * ob - radius * radius;

    // Ray is parallel to axis
    if a.abs() < 1e-12 {
        return Vec::new();
    }

    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return Vec::new();
    }

    let sqrt_disc = discriminant.sqrt();
    let t1 = (-b - sqrt_disc) / (2.0 * a);
    let t2 = (-b + sqrt_disc) / (2.0 * a);
    if sqrt_disc < 1e-12 {
        vec![t1]
    } else {
        vec![t1, t2]
    }
}
